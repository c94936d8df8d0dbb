use regex::Regex;
use std::path::Path;

use crate::errors::{AppError, AppResult};

/// Largest file the CLI will read into memory for a single upload
pub const MAX_UPLOAD_SIZE: u64 = 50 * 1024 * 1024;

pub struct InputValidator;

impl InputValidator {
    pub fn validate_base_url(url: &str) -> AppResult<()> {
        let trimmed = url.trim();

        if trimmed.is_empty() {
            return Err(AppError::validation("base_url", "Server URL cannot be empty"));
        }

        let url_pattern = Regex::new(r"^https?://[^\s/?#]+(/[^\s]*)?$")?;
        if !url_pattern.is_match(trimmed) {
            return Err(AppError::validation(
                "base_url",
                "Server URL must start with http:// or https://",
            ));
        }

        if trimmed.len() > 500 {
            return Err(AppError::validation("base_url", "Server URL too long"));
        }

        Ok(())
    }

    pub fn validate_file_path(path: &str) -> AppResult<()> {
        if path.trim().is_empty() {
            return Err(AppError::validation("file_path", "File path cannot be empty"));
        }

        let path_obj = Path::new(path);

        if !path_obj.exists() {
            return Err(AppError::file_not_found(path));
        }

        if !path_obj.is_file() {
            return Err(AppError::validation("file_path", "Path is not a file"));
        }

        let metadata = std::fs::metadata(path_obj)?;
        if metadata.len() > MAX_UPLOAD_SIZE {
            return Err(AppError::validation(
                "file_path",
                "File too large. Maximum size is 50MB.",
            ));
        }

        Ok(())
    }

    /// Filename safe to put in a multipart header
    pub fn sanitize_filename(filename: &str) -> String {
        let sanitized: String = filename
            .trim()
            .chars()
            .map(|c| match c {
                '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
                c if c.is_control() => '_',
                c => c,
            })
            .collect();

        if sanitized.chars().count() > 255 {
            let truncated: String = sanitized.chars().take(252).collect();
            format!("{}...", truncated)
        } else {
            sanitized
        }
    }
}

use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid file type: {file_name}. Only .csv and .txt files are supported.")]
    Classification { file_name: String },

    #[error("Could not determine upload URL: {reason}")]
    EndpointResolution { reason: String },

    #[error("Upload failed for {file_name}: {detail}")]
    UploadFailed {
        file_name: String,
        status: Option<u16>,
        detail: String,
    },

    #[error("Update target not found: {target}")]
    Reconciliation { target: String },

    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Custom result type
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(field: &str, message: &str) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    pub fn file_not_found(path: &str) -> Self {
        Self::FileNotFound {
            path: path.to_string(),
        }
    }

    pub fn classification(file_name: &str) -> Self {
        Self::Classification {
            file_name: file_name.to_string(),
        }
    }

    pub fn endpoint_resolution(reason: &str) -> Self {
        Self::EndpointResolution {
            reason: reason.to_string(),
        }
    }

    pub fn upload_failed(file_name: &str, status: Option<u16>, detail: &str) -> Self {
        Self::UploadFailed {
            file_name: file_name.to_string(),
            status,
            detail: detail.to_string(),
        }
    }

    pub fn reconciliation(target: &str) -> Self {
        Self::Reconciliation {
            target: target.to_string(),
        }
    }

    /// Errors that fail a single file but let the run carry on.
    pub fn is_submission_failure(&self) -> bool {
        matches!(self, AppError::UploadFailed { .. } | AppError::Network(_))
    }
}

/// Lock shared state, recovering the guard if a previous holder panicked.
pub fn lock_or_recover<'a, T>(state: &'a Mutex<T>, operation: &str) -> MutexGuard<'a, T> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            log::error!(
                "Lock poisoned during {} (recovering, non-critical)",
                operation
            );
            poisoned.into_inner()
        }
    }
}

use async_trait::async_trait;
use reqwest::{multipart, Client, Response};
use tokio::time::Duration;

use crate::errors::{AppError, AppResult};
use crate::security::InputValidator;

use super::classify::QueuedFile;
use super::endpoint::ScenarioRef;
use super::Transport;

/// Header asking the server for a partial fragment instead of a full page
const PARTIAL_REQUEST_HEADER: &str = "HX-Request";

/// HTTP client for the study server's scenario routes
pub struct StudyClient {
    client: Client,
    base_url: String,
}

impl StudyClient {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> AppResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Self::with_client(builder.build()?, base_url)
    }

    /// Use a preconfigured reqwest client (proxy, TLS or timeout settings)
    pub fn with_client(client: Client, base_url: &str) -> AppResult<Self> {
        InputValidator::validate_base_url(base_url)?;

        Ok(Self {
            client,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an endpoint that may be a bare path
    pub fn absolute_url(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else if endpoint.starts_with('/') {
            format!("{}{}", self.base_url, endpoint)
        } else {
            format!("{}/{}", self.base_url, endpoint)
        }
    }

    /// Ask the server to run processing for a scenario whose files are uploaded
    pub async fn process_scenario(&self, scenario: ScenarioRef) -> AppResult<String> {
        let url = self.absolute_url(&scenario.process_path());
        log::info!("Requesting processing at {}", url);

        let response = self
            .client
            .post(&url)
            .header(PARTIAL_REQUEST_HEADER, "true")
            .send()
            .await?;

        read_fragment(response, &scenario.page_path()).await
    }
}

#[async_trait]
impl Transport for StudyClient {
    async fn submit(&self, endpoint: &str, file: &QueuedFile) -> AppResult<String> {
        let url = self.absolute_url(endpoint);
        let form = UploadPayload::from_queued(file).build_form()?;

        log::debug!(
            "POST {} ({}, {} bytes, {})",
            url,
            file.name(),
            file.source.size(),
            file.file_type
        );

        let response = self
            .client
            .post(&url)
            .header(PARTIAL_REQUEST_HEADER, "true")
            .multipart(form)
            .send()
            .await?;

        read_fragment(response, file.name()).await
    }
}

/// Successful bodies are markup; anything else is the server's diagnostic text
async fn read_fragment(response: Response, subject: &str) -> AppResult<String> {
    let status = response.status();

    if status.is_success() {
        let markup = response.text().await?;
        log::debug!(
            "Response for {} (first 300 chars): {}",
            subject,
            markup.chars().take(300).collect::<String>()
        );
        return Ok(markup);
    }

    let detail = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    let detail = if detail.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string()
    } else {
        detail
    };

    Err(AppError::upload_failed(subject, Some(status.as_u16()), &detail))
}

/// Multipart body for one file: the content under `file` plus its `file_type` tag
#[derive(Debug, Clone)]
pub struct UploadPayload {
    file_name: String,
    data: Vec<u8>,
    mime_type: &'static str,
    file_type: &'static str,
}

impl UploadPayload {
    pub fn from_queued(file: &QueuedFile) -> Self {
        Self {
            file_name: InputValidator::sanitize_filename(file.name()),
            data: file.source.data.clone(),
            mime_type: file.file_type.mime_type(),
            file_type: file.file_type.as_tag(),
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn build_form(&self) -> AppResult<multipart::Form> {
        let part = multipart::Part::bytes(self.data.clone())
            .file_name(self.file_name.clone())
            .mime_str(self.mime_type)?;

        Ok(multipart::Form::new()
            .text("file_type", self.file_type)
            .part("file", part))
    }
}

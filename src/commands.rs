use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::time::Duration;

use crate::config::Config;
use crate::errors::{lock_or_recover, AppError, AppResult};
use crate::uploader::endpoint::{parse_scenario_path, ScenarioRef};
use crate::uploader::{
    classify, BatchOutcome, FileType, Notice, Notifier, RunTiming, SourceFile, StudyClient,
    Surface, Uploader,
};

/// Form settings for a command-line upload
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub base_url: Option<String>,
    pub page_path: String,
    pub action_url: Option<String>,
    pub update_target: Option<String>,
    pub output: Option<PathBuf>,
    pub process_after: bool,
    pub file_paths: Vec<String>,
}

/// What `upload` did, for the summary printed by the binary
#[derive(Debug)]
pub struct UploadSummary {
    pub unreadable: Vec<String>,
    pub outcome: BatchOutcome,
    pub processing: Option<String>,
}

impl UploadSummary {
    pub fn is_success(&self) -> bool {
        self.unreadable.is_empty()
            && self.outcome.rejected.is_empty()
            && self.outcome.run.as_ref().map_or(false, |run| run.is_clean())
    }
}

/// Writes each reconciled fragment to a file, or logs it when no file is given
pub struct CliSurface {
    action_url: Option<String>,
    page_path: String,
    update_target: String,
    output: Option<PathBuf>,
    last_fragment: Mutex<Option<String>>,
}

impl CliSurface {
    pub fn new(
        action_url: Option<String>,
        page_path: String,
        update_target: String,
        output: Option<PathBuf>,
    ) -> Self {
        Self {
            action_url,
            page_path,
            update_target,
            output,
            last_fragment: Mutex::new(None),
        }
    }

    pub fn last_fragment(&self) -> Option<String> {
        lock_or_recover(&self.last_fragment, "fragment read").clone()
    }
}

impl Surface for CliSurface {
    fn action_url(&self) -> Option<String> {
        self.action_url.clone()
    }

    fn page_path(&self) -> String {
        self.page_path.clone()
    }

    fn update_target(&self) -> Option<String> {
        Some(self.update_target.clone())
    }

    fn splice(&self, target: &str, markup: &str) -> AppResult<()> {
        if target != self.update_target {
            return Err(AppError::reconciliation(target));
        }

        match &self.output {
            Some(path) => {
                fs::write(path, markup)?;
                log::debug!("Wrote {} bytes of markup to {}", markup.len(), path.display());
            }
            None => log::debug!("Markup for {}: {}", target, markup),
        }

        *lock_or_recover(&self.last_fragment, "fragment write") = Some(markup.to_string());
        Ok(())
    }
}

/// Prints notices to the terminal
#[derive(Debug, Default)]
pub struct ConsoleNotifier {
    history: Mutex<Vec<Notice>>,
}

impl ConsoleNotifier {
    pub fn history(&self) -> Vec<Notice> {
        lock_or_recover(&self.history, "notice history").clone()
    }
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: Notice) {
        if notice.is_error() {
            log::warn!("{}", notice.detail);
            eprintln!("✗ {}", notice.detail);
        } else {
            log::info!("{}", notice.detail);
            println!("✓ {}", notice.detail);
        }

        lock_or_recover(&self.history, "notice history").push(notice);
    }
}

fn study_client(config: &Config, base_url: Option<&str>) -> AppResult<StudyClient> {
    StudyClient::new(
        base_url.unwrap_or(&config.base_url),
        config.request_timeout_secs.map(Duration::from_secs),
    )
}

/// Upload the given files as one batch and optionally trigger processing
pub async fn upload(config: &Config, request: UploadRequest) -> AppResult<UploadSummary> {
    let client = study_client(config, request.base_url.as_deref())?;
    let surface = CliSurface::new(
        request.action_url.clone().or_else(|| config.action_url.clone()),
        request.page_path.clone(),
        request
            .update_target
            .clone()
            .unwrap_or_else(|| config.update_target.clone()),
        request.output.clone(),
    );
    let uploader = Uploader::new(client, ConsoleNotifier::default(), surface)
        .with_timing(RunTiming::from(config));

    let mut files = Vec::with_capacity(request.file_paths.len());
    let mut unreadable = Vec::new();

    for path in &request.file_paths {
        match SourceFile::from_path(path).await {
            Ok(file) => files.push(file),
            Err(e) => {
                log::error!("Could not read {}: {}", path, e);
                uploader
                    .notifier()
                    .notify(Notice::error(format!("Could not read {}: {}", path, e)));
                unreadable.push(path.clone());
            }
        }
    }

    let outcome = uploader.handle_batch(files).await;

    let mut summary = UploadSummary {
        unreadable,
        outcome,
        processing: None,
    };

    if request.process_after {
        if summary.is_success() {
            let scenario = scenario_from_path(&request.page_path)?;
            summary.processing = Some(uploader.transport().process_scenario(scenario).await?);
        } else {
            log::warn!("Skipping processing because not every file uploaded");
        }
    }

    Ok(summary)
}

fn scenario_from_path(page_path: &str) -> AppResult<ScenarioRef> {
    parse_scenario_path(page_path)?.ok_or_else(|| {
        AppError::validation(
            "page_path",
            "Processing needs a /study/{id}/scenario/{id} page path",
        )
    })
}

/// Classification for each name, in order
pub fn classify_names(names: &[String]) -> Vec<(String, AppResult<FileType>)> {
    names
        .iter()
        .map(|name| (name.clone(), classify(name)))
        .collect()
}

/// Trigger server-side processing for a scenario
pub async fn process(
    config: &Config,
    base_url: Option<&str>,
    scenario: ScenarioRef,
) -> AppResult<String> {
    study_client(config, base_url)?.process_scenario(scenario).await
}

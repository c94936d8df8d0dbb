use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use super::classify::{FileType, QueuedFile, SourceFile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Active,
    Completed,
    Aborted,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedUpload {
    pub index: usize,
    pub file_name: String,
    pub file_type: FileType,
    pub error: String,
    #[serde(skip)]
    pub source: Arc<SourceFile>,
}

impl FailedUpload {
    pub fn to_queued(&self) -> QueuedFile {
        QueuedFile {
            source: self.source.clone(),
            file_type: self.file_type,
        }
    }
}

/// Outcome of one pass of the submission loop
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub total: usize,
    pub attempted: usize,
    pub successful_uploads: Vec<String>,
    pub failed_uploads: Vec<FailedUpload>,
    pub status: RunStatus,
    pub abort_reason: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunReport {
    pub fn new(total: usize) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            total,
            attempted: 0,
            successful_uploads: Vec::new(),
            failed_uploads: Vec::new(),
            status: RunStatus::Active,
            abort_reason: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.status == RunStatus::Completed && self.failed_uploads.is_empty()
    }
}

/// Note which file the run is about to submit
pub fn update_progress_current(report: &RunReport, index: usize, item: &QueuedFile) {
    log::debug!(
        "Run {}: uploading {} as {} ({}/{})",
        report.run_id,
        item.name(),
        item.file_type,
        index + 1,
        report.total
    );
}

/// Mark a file upload as successful
pub fn update_progress_success(report: &mut RunReport, item: &QueuedFile) {
    report.attempted += 1;
    report.successful_uploads.push(item.name().to_string());

    log::info!(
        "Progress: Successfully uploaded {} as {} ({}/{})",
        item.name(),
        item.file_type,
        report.attempted,
        report.total
    );
}

/// Mark a file upload as failed
pub fn update_progress_failure(
    report: &mut RunReport,
    index: usize,
    item: &QueuedFile,
    error: String,
) {
    report.attempted += 1;

    log::warn!(
        "Progress: Failed to upload {} (index {}) - {} ({}/{})",
        item.name(),
        index,
        error,
        report.attempted,
        report.total
    );

    report.failed_uploads.push(FailedUpload {
        index,
        file_name: item.name().to_string(),
        file_type: item.file_type,
        error,
        source: item.source.clone(),
    });
}

/// Mark run as completed
pub fn mark_run_completed(report: &mut RunReport) {
    report.status = RunStatus::Completed;
    report.finished_at = Some(Utc::now());

    log::info!(
        "Run {} completed: {}/{} successful, {} failed",
        report.run_id,
        report.successful_uploads.len(),
        report.total,
        report.failed_uploads.len()
    );
}

/// Mark run as aborted before it could finish
pub fn mark_run_aborted(report: &mut RunReport, reason: String) {
    log::error!(
        "Run {} aborted after {}/{} files: {}",
        report.run_id,
        report.attempted,
        report.total,
        reason
    );

    report.status = RunStatus::Aborted;
    report.abort_reason = Some(reason);
    report.finished_at = Some(Utc::now());
}

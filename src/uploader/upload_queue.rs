use std::sync::{Arc, Mutex};
use tokio::time::sleep;

use crate::errors::{lock_or_recover, AppError};

use super::classify::QueuedFile;
use super::endpoint::resolve_endpoint;
use super::progress_tracker::*;
use super::{Notice, Notifier, RunTiming, Surface, Transport};

/// Shared queue state
pub type QueueState = Arc<Mutex<UploadQueue>>;

/// Files waiting for submission plus the run bookkeeping
#[derive(Debug, Default)]
pub struct UploadQueue {
    items: Vec<QueuedFile>,
    cursor: usize,
    is_processing: bool,
}

/// Point-in-time view of the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueSnapshot {
    pub len: usize,
    pub cursor: usize,
    pub is_processing: bool,
}

impl UploadQueue {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_processing(&self) -> bool {
        self.is_processing
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            len: self.items.len(),
            cursor: self.cursor,
            is_processing: self.is_processing,
        }
    }

    /// Swap in a new batch. The cursor belongs to an active run and is left alone.
    pub fn replace(&mut self, items: Vec<QueuedFile>) {
        self.items = items;
        if !self.is_processing {
            self.cursor = 0;
        }
    }

    /// Claim the queue for a new run, returning the items that run will walk
    pub fn begin_run(&mut self) -> Option<Vec<QueuedFile>> {
        if self.is_processing || self.items.is_empty() {
            return None;
        }

        self.is_processing = true;
        self.cursor = 0;
        Some(self.items.clone())
    }

    fn advance(&mut self) -> usize {
        self.cursor += 1;
        self.cursor
    }

    /// Run drained: empty the queue and release the guard
    fn finish(&mut self) {
        self.items.clear();
        self.is_processing = false;
    }

    /// Run could not continue: release the guard but keep the items for inspection
    fn abandon(&mut self) {
        self.is_processing = false;
    }
}

/// Submit every item in order, one request in flight at a time.
///
/// A failed file is reported and skipped; the run only stops early when no
/// destination URL can be resolved.
pub(crate) async fn process_upload_queue<T, N, S>(
    transport: &T,
    notifier: &N,
    surface: &S,
    queue: &QueueState,
    items: Vec<QueuedFile>,
    timing: RunTiming,
) -> RunReport
where
    T: Transport,
    N: Notifier,
    S: Surface,
{
    let mut report = RunReport::new(items.len());

    log::info!(
        "Starting upload run {} with {} file(s)",
        report.run_id,
        items.len()
    );

    loop {
        let index = lock_or_recover(queue, "cursor read").cursor();

        let Some(item) = items.get(index) else {
            lock_or_recover(queue, "run finish").finish();
            mark_run_completed(&mut report);
            return report;
        };

        let endpoint = match resolve_endpoint(surface.action_url().as_deref(), &surface.page_path())
        {
            Ok(endpoint) => endpoint,
            Err(e) => {
                notifier.notify(Notice::error(format!("Upload aborted: {}", e)));
                lock_or_recover(queue, "run abort").abandon();
                mark_run_aborted(&mut report, e.to_string());
                return report;
            }
        };

        update_progress_current(&report, index, item);

        let result = transport.submit(&endpoint, item).await;
        let next = lock_or_recover(queue, "cursor advance").advance();
        let more_remaining = next < items.len();

        match result {
            Ok(markup) => {
                update_progress_success(&mut report, item);
                notifier.notify(Notice::success(format!(
                    "Uploaded {} as {}",
                    item.name(),
                    item.file_type.label()
                )));
                reconcile(surface, notifier, &markup, item);

                if more_remaining {
                    sleep(timing.success_delay).await;
                }
            }
            Err(e) => {
                notifier.notify(Notice::error(format!(
                    "Error uploading {}: {}",
                    item.name(),
                    describe_failure(&e)
                )));
                update_progress_failure(&mut report, index, item, e.to_string());

                if more_remaining {
                    sleep(timing.failure_delay).await;
                }
            }
        }
    }
}

/// Put the server's fragment into the form's update target
fn reconcile<N, S>(surface: &S, notifier: &N, markup: &str, item: &QueuedFile)
where
    N: Notifier,
    S: Surface,
{
    let result = match surface.update_target() {
        Some(target) => surface.splice(&target, markup),
        None => Err(AppError::reconciliation("(no update target declared)")),
    };

    if let Err(e) = result {
        log::error!("Could not show upload result for {}: {}", item.name(), e);
        notifier.notify(Notice::error(format!(
            "Uploaded {} but the page could not be updated: {}",
            item.name(),
            e
        )));
    }
}

fn describe_failure(error: &AppError) -> String {
    match error {
        AppError::UploadFailed {
            status: Some(status),
            detail,
            ..
        } => format!("HTTP {}: {}", status, detail),
        AppError::UploadFailed { detail, .. } => detail.clone(),
        other => other.to_string(),
    }
}

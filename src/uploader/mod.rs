// Main uploader module - owns the queue and drives sequential submission
//
// Page and network side effects live behind the Transport, Notifier and Surface
// traits so the queue logic runs the same under the CLI, the page model and tests.

pub mod binding;
pub mod classify;
pub mod endpoint;
pub mod progress_tracker;
pub mod retry;
pub mod study_client;
pub mod upload_queue;

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::time::Duration;

use crate::config::Config;
use crate::errors::{lock_or_recover, AppResult};

pub use classify::{classify, classify_batch, FileType, QueuedFile, SourceFile};
pub use progress_tracker::{FailedUpload, RunReport, RunStatus};
pub use study_client::StudyClient;
pub use upload_queue::{QueueSnapshot, QueueState, UploadQueue};

/// Sends one file to the study server and returns the rendered fragment
#[async_trait]
pub trait Transport: Send + Sync {
    async fn submit(&self, endpoint: &str, file: &QueuedFile) -> AppResult<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A user-visible notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub detail: String,
}

impl Notice {
    pub fn success(detail: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            detail: detail.into(),
        }
    }

    pub fn error(detail: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            detail: detail.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Page side of the upload form
pub trait Surface: Send + Sync {
    /// The form's pre-configured action, if any
    fn action_url(&self) -> Option<String>;

    /// Current page location, used to derive the endpoint when the action is unusable
    fn page_path(&self) -> String;

    /// Selector of the element receiving response markup
    fn update_target(&self) -> Option<String>;

    /// Replace the target's content and let the page framework wire up the new markup
    fn splice(&self, target: &str, markup: &str) -> AppResult<()>;
}

/// Pauses between consecutive submissions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunTiming {
    pub success_delay: Duration,
    pub failure_delay: Duration,
}

impl Default for RunTiming {
    fn default() -> Self {
        Self {
            success_delay: Duration::from_millis(100),
            failure_delay: Duration::from_millis(500),
        }
    }
}

impl From<&Config> for RunTiming {
    fn from(config: &Config) -> Self {
        Self {
            success_delay: Duration::from_millis(config.success_delay_ms),
            failure_delay: Duration::from_millis(config.failure_delay_ms),
        }
    }
}

/// Result of handing one batch to the uploader
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// Classified files handed to the queue; ignored when a run was already active
    pub queued: usize,
    pub rejected: Vec<String>,
    /// Present when this batch started a run
    pub run: Option<RunReport>,
}

impl BatchOutcome {
    pub fn started_run(&self) -> bool {
        self.run.is_some()
    }
}

pub struct Uploader<T, N, S> {
    transport: T,
    notifier: N,
    surface: S,
    queue: QueueState,
    timing: RunTiming,
}

impl<T, N, S> Uploader<T, N, S>
where
    T: Transport,
    N: Notifier,
    S: Surface,
{
    pub fn new(transport: T, notifier: N, surface: S) -> Self {
        Self {
            transport,
            notifier,
            surface,
            queue: Arc::new(Mutex::new(UploadQueue::default())),
            timing: RunTiming::default(),
        }
    }

    pub fn with_timing(mut self, timing: RunTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn timing(&self) -> RunTiming {
        self.timing
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn queue_snapshot(&self) -> QueueSnapshot {
        lock_or_recover(&self.queue, "queue snapshot").snapshot()
    }

    /// Classify a batch of files, replace the queue, and run it if the uploader is idle.
    ///
    /// Rejected names are reported together in one notice. A batch arriving while a run
    /// is in flight replaces the queued items but does not start a second run, and the
    /// user is told those files were ignored.
    pub async fn handle_batch(&self, files: Vec<SourceFile>) -> BatchOutcome {
        let (accepted, rejected) = classify_batch(files);

        if !rejected.is_empty() {
            self.notifier.notify(Notice::error(format!(
                "Invalid file type for: {}. Only .csv and .txt files are supported.",
                rejected.join(", ")
            )));
        }

        let mut outcome = self.enqueue(accepted).await;
        outcome.rejected = rejected;
        outcome
    }

    /// Replace the queue with already classified files and run it if idle
    pub(crate) async fn enqueue(&self, items: Vec<QueuedFile>) -> BatchOutcome {
        let queued = items.len();
        let names: Vec<String> = items.iter().map(|item| item.name().to_string()).collect();

        let snapshot = {
            let mut queue = lock_or_recover(&self.queue, "batch intake");
            queue.replace(items);
            queue.begin_run()
        };

        let Some(items) = snapshot else {
            if !names.is_empty() {
                // the active run walks its own copy and clears the queue when it drains
                log::warn!(
                    "Upload already in progress, ignoring {} file(s): {}",
                    queued,
                    names.join(", ")
                );
                self.notifier.notify(Notice::error(format!(
                    "Upload already in progress. Ignored: {}. Add them again once it finishes.",
                    names.join(", ")
                )));
            }
            return BatchOutcome {
                queued,
                rejected: Vec::new(),
                run: None,
            };
        };

        let report = upload_queue::process_upload_queue(
            &self.transport,
            &self.notifier,
            &self.surface,
            &self.queue,
            items,
            self.timing,
        )
        .await;

        BatchOutcome {
            queued,
            rejected: Vec::new(),
            run: Some(report),
        }
    }
}

use super::progress_tracker::RunReport;
use super::{BatchOutcome, Notifier, Surface, Transport, Uploader};

impl<T, N, S> Uploader<T, N, S>
where
    T: Transport,
    N: Notifier,
    S: Surface,
{
    /// Queue the failed files of a finished run again, keeping their inferred types.
    ///
    /// Goes through the same intake guard as a fresh batch, so nothing happens while
    /// another run is in flight beyond replacing the queued items.
    pub async fn retry_failed(&self, report: &RunReport) -> BatchOutcome {
        let items: Vec<_> = report
            .failed_uploads
            .iter()
            .map(|failed| failed.to_queued())
            .collect();

        if items.is_empty() {
            log::info!("Run {} has no failed uploads to retry", report.run_id);
            return BatchOutcome {
                queued: 0,
                rejected: Vec::new(),
                run: None,
            };
        }

        log::info!(
            "Retrying {} failed upload(s) from run {}",
            items.len(),
            report.run_id
        );

        self.enqueue(items).await
    }
}

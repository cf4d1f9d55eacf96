//! Debounced autosave where an explicit save always wins
//!
//! `schedule` replaces any pending autosave with a new one that fires after
//! the debounce delay. `save_now` bumps the save generation, waits for an
//! in-flight write to finish, cancels whatever is still pending and then
//! writes. Writes are serialized by a lock and a debounced task re-checks
//! the generation under that lock, so an explicit save is always the last
//! write the writer receives.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reportability_engine::TransactionRecord;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::error::SaveError;

/// Destination of saved records (usually the report API)
#[async_trait]
pub trait ReportWriter: Send + Sync + 'static {
    async fn write(&self, report_id: &str, record: &TransactionRecord) -> Result<(), SaveError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutosaveConfig {
    pub debounce: Duration,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(1500),
        }
    }
}

struct Shared<W> {
    report_id: String,
    writer: W,
    generation: AtomicU64,
    write_lock: Mutex<()>,
}

pub struct Autosaver<W: ReportWriter> {
    shared: Arc<Shared<W>>,
    pending: Option<JoinHandle<()>>,
    config: AutosaveConfig,
}

impl<W: ReportWriter> Autosaver<W> {
    pub fn new(report_id: impl Into<String>, writer: W, config: AutosaveConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                report_id: report_id.into(),
                writer,
                generation: AtomicU64::new(0),
                write_lock: Mutex::new(()),
            }),
            pending: None,
            config,
        }
    }

    pub fn writer(&self) -> &W {
        &self.shared.writer
    }

    pub fn has_pending(&self) -> bool {
        self.pending
            .as_ref()
            .map_or(false, |handle| !handle.is_finished())
    }

    /// Best-effort save after the debounce delay; must run inside a Tokio runtime
    pub fn schedule(&mut self, record: TransactionRecord) {
        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.cancel_pending();

        let shared = Arc::clone(&self.shared);
        let delay = self.config.debounce;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let _guard = shared.write_lock.lock().await;
            if shared.generation.load(Ordering::SeqCst) != generation {
                tracing::trace!(report_id = %shared.report_id, "autosave superseded");
                return;
            }
            match shared.writer.write(&shared.report_id, &record).await {
                Ok(()) => tracing::debug!(report_id = %shared.report_id, "autosaved record"),
                Err(e) => tracing::warn!(report_id = %shared.report_id, "autosave failed: {}", e),
            }
        }));
    }

    /// Write now, superseding any pending or in-flight autosave
    pub async fn save_now(&mut self, record: &TransactionRecord) -> Result<(), SaveError> {
        self.shared.generation.fetch_add(1, Ordering::SeqCst);

        // An autosave holding the lock is mid-write; let it complete rather
        // than dropping a request the writer may already have applied.
        let shared = Arc::clone(&self.shared);
        let _guard = shared.write_lock.lock().await;
        self.cancel_pending();
        shared.writer.write(&shared.report_id, record).await?;
        tracing::debug!(report_id = %shared.report_id, "saved record");
        Ok(())
    }

    fn cancel_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::RecordingWriter;
    use super::*;
    use reportability_engine::YesNo;

    fn record(residential: YesNo) -> TransactionRecord {
        TransactionRecord {
            is_residential: Some(residential),
            ..Default::default()
        }
    }

    fn config() -> AutosaveConfig {
        AutosaveConfig {
            debounce: Duration::from_millis(500),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_collapses_rapid_edits() {
        let mut saver = Autosaver::new("r1", RecordingWriter::default(), config());
        saver.schedule(TransactionRecord::new());
        saver.schedule(record(YesNo::No));
        saver.schedule(record(YesNo::Yes));
        assert!(saver.has_pending());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(saver.writer().writes(), vec![record(YesNo::Yes)]);
        assert!(!saver.has_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_nothing_written_before_delay() {
        let mut saver = Autosaver::new("r1", RecordingWriter::default(), config());
        saver.schedule(record(YesNo::No));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(saver.writer().writes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_now_cancels_pending_autosave() {
        let mut saver = Autosaver::new("r1", RecordingWriter::default(), config());
        saver.schedule(record(YesNo::No));
        saver.save_now(&record(YesNo::Yes)).await.unwrap();

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(saver.writer().writes(), vec![record(YesNo::Yes)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_explicit_save_lands_after_in_flight_autosave() {
        let writer = RecordingWriter::slow(Duration::from_millis(200));
        let mut saver = Autosaver::new("r1", writer, config());
        saver.schedule(record(YesNo::No));

        // Debounced write has started and is inside the slow writer.
        tokio::time::sleep(Duration::from_millis(600)).await;
        saver.save_now(&record(YesNo::Yes)).await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;

        // The in-flight autosave completes first; the explicit save lands last.
        assert_eq!(
            saver.writer().writes(),
            vec![record(YesNo::No), record(YesNo::Yes)]
        );
    }
}

//! Best-effort usage/outcome log.
//!
//! Recording must never fail the operation it describes, so the log is a
//! fire-and-forget channel: producers push events onto an unbounded sender
//! and a single writer task drains them into SQLite. Writer errors are
//! logged and swallowed; a closed channel only bumps a drop counter.
use crate::db;
use crate::model::{BatchReport, UsageRecord};
use sqlx::SqlitePool;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::warn;

#[derive(Debug, Clone)]
pub enum UsageEvent {
    Api(UsageRecord),
    Batch(BatchReport),
}

/// Cloneable handle for recording usage events.
#[derive(Debug, Clone)]
pub struct UsageLog {
    tx: UnboundedSender<UsageEvent>,
    dropped: Arc<AtomicU64>,
}

impl UsageLog {
    /// Create a log handle plus the receiver its writer should drain.
    pub fn channel() -> (UsageLog, UnboundedReceiver<UsageEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            UsageLog {
                tx,
                dropped: Arc::new(AtomicU64::new(0)),
            },
            rx,
        )
    }

    pub fn record_api(&self, record: UsageRecord) {
        self.push(UsageEvent::Api(record));
    }

    pub fn record_batch(&self, report: BatchReport) {
        self.push(UsageEvent::Batch(report));
    }

    /// Events dropped because the writer was gone.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn push(&self, event: UsageEvent) {
        if self.tx.send(event).is_err() {
            let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            warn!(dropped, "usage log writer gone; event dropped");
        }
    }
}

/// Drain usage events into the database until all senders are dropped.
/// Insert failures are logged and do not stop the writer.
pub async fn run_writer(pool: SqlitePool, mut rx: UnboundedReceiver<UsageEvent>) {
    while let Some(event) = rx.recv().await {
        let res = match &event {
            UsageEvent::Api(record) => db::insert_usage_record(&pool, record).await,
            UsageEvent::Batch(report) => db::insert_batch_report(&pool, report).await,
        };
        if let Err(err) = res {
            warn!(?err, ?event, "failed to persist usage event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> UsageRecord {
        UsageRecord {
            service: "openai",
            operation: "chat.completion",
            tokens: Some(42),
            images: None,
            success: true,
            error: None,
        }
    }

    #[tokio::test]
    async fn events_reach_the_receiver() {
        let (log, mut rx) = UsageLog::channel();
        log.record_api(sample_record());
        log.record_batch(BatchReport::default());

        assert!(matches!(rx.recv().await, Some(UsageEvent::Api(_))));
        assert!(matches!(rx.recv().await, Some(UsageEvent::Batch(_))));
        assert_eq!(log.dropped(), 0);
    }

    #[tokio::test]
    async fn closed_receiver_only_counts_drops() {
        let (log, rx) = UsageLog::channel();
        drop(rx);
        log.record_api(sample_record());
        log.record_api(sample_record());
        assert_eq!(log.dropped(), 2);
    }
}

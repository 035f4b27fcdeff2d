//! Asynchronous `PostgreSQL` log sink.
//!
//! The scheduler appends from synchronous code, so [`PostgresSink`] only
//! enqueues. A single writer task drains the channel and inserts records
//! in the order they were appended. Insert failures are logged at `warn`
//! and counted; they never reach the game.

use airlock_core::sink::{LogSink, SinkError};
use airlock_types::LogRecord;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::log_store::LogStore;
use crate::postgres::PostgresPool;

/// Sending half: implements [`LogSink`].
#[derive(Debug, Clone)]
pub struct PostgresSink {
    tx: mpsc::UnboundedSender<LogRecord>,
}

/// Handle on the writer task.
#[derive(Debug)]
pub struct SinkWriter {
    handle: JoinHandle<WriterReport>,
}

/// What the writer did before it stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterReport {
    /// Records inserted.
    pub written: u64,
    /// Records whose insert failed.
    pub failed: u64,
}

impl PostgresSink {
    /// Spawn the writer task on the current runtime.
    ///
    /// The writer stops once every clone of the returned sink is dropped
    /// and the queue is drained.
    pub fn spawn(pool: PostgresPool) -> (Self, SinkWriter) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(write_loop(pool, rx));
        (Self { tx }, SinkWriter { handle })
    }
}

impl LogSink for PostgresSink {
    fn append(&self, record: LogRecord) -> Result<(), SinkError> {
        self.tx.send(record).map_err(|_closed| SinkError::Closed)
    }
}

impl SinkWriter {
    /// Wait for the writer to drain and stop.
    ///
    /// Only returns after every [`PostgresSink`] clone is dropped.
    pub async fn finish(self) -> WriterReport {
        match self.handle.await {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "log writer task failed");
                WriterReport::default()
            }
        }
    }
}

async fn write_loop(
    pool: PostgresPool,
    mut rx: mpsc::UnboundedReceiver<LogRecord>,
) -> WriterReport {

    let store = LogStore::new(pool.pool());
    let mut report = WriterReport::default();
    while let Some(record) = rx.recv().await {
        match store.insert(&record).await {
            Ok(()) => report.written = report.written.saturating_add(1),
            Err(e) => {
                report.failed = report.failed.saturating_add(1);
                warn!(
                    error = %e,
                    game_id = %record.game_id(),
                    round = ?record.round(),
                    "failed to persist log record"
                );
            }
        }
    }
    debug!(written = report.written, failed = report.failed, "log writer drained");
    report
}

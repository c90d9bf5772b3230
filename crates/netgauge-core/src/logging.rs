/// Session lifecycle logging.
///
/// Every transfer session reports its start and its single terminal
/// outcome through a [`TransferLogger`]. Production code logs through
/// `tracing`; tests swap in a recorder.

use std::fmt;

use uuid::Uuid;

use crate::session::TransferKind;

/// One log entry, correlated by session id.
#[derive(Debug, Clone)]
pub struct TransferLog {
    pub kind: TransferKind,
    pub session_id: Uuid,
    pub event: TransferEvent,
}

/// Lifecycle events of a transfer session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEvent {
    /// Download accepted; `requested` is the raw caller hint, if any.
    DownloadStarted {
        requested: Option<String>,
        effective: u64,
    },
    /// Upload accepted with the given ceiling.
    UploadStarted {
        ceiling: u64,
    },
    Completed {
        bytes: u64,
        elapsed_ms: u64,
    },
    /// Peer went away, or the consumer failed to take a chunk.
    Aborted {
        bytes: u64,
        elapsed_ms: u64,
        reason: String,
    },
    /// Upload crossed its ceiling.
    Oversized {
        bytes: u64,
        max: u64,
        elapsed_ms: u64,
    },
    Errored {
        bytes: u64,
        elapsed_ms: u64,
        message: String,
    },
}

impl TransferEvent {
    /// Whether this event ends a session.
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            Self::DownloadStarted { .. } | Self::UploadStarted { .. }
        )
    }
}

impl fmt::Display for TransferEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DownloadStarted { requested, effective } => {
                write!(
                    f,
                    "download_started requested={} effective={}",
                    requested.as_deref().unwrap_or("-"),
                    effective
                )
            }
            Self::UploadStarted { ceiling } => {
                write!(f, "upload_started ceiling={}", ceiling)
            }
            Self::Completed { bytes, elapsed_ms } => {
                write!(f, "completed bytes={} elapsed_ms={}", bytes, elapsed_ms)
            }
            Self::Aborted { bytes, elapsed_ms, reason } => {
                write!(f, "aborted bytes={} elapsed_ms={} reason={}", bytes, elapsed_ms, reason)
            }
            Self::Oversized { bytes, max, elapsed_ms } => {
                write!(f, "oversized bytes={} max={} elapsed_ms={}", bytes, max, elapsed_ms)
            }
            Self::Errored { bytes, elapsed_ms, message } => {
                write!(f, "errored bytes={} elapsed_ms={} error: {}", bytes, elapsed_ms, message)
            }
        }
    }
}

/// Sink for session lifecycle logs.
pub trait TransferLogger: Send + Sync {
    fn log(&self, entry: TransferLog);
}

/// Logger that uses the `tracing` crate.
pub struct TracingLogger;

impl TransferLogger for TracingLogger {
    fn log(&self, entry: TransferLog) {
        let kind = entry.kind.as_str();
        let sid = entry.session_id;
        match &entry.event {
            TransferEvent::Aborted { .. } | TransferEvent::Oversized { .. } => {
                tracing::warn!(kind, session_id = %sid, "{}", entry.event);
            }
            TransferEvent::Errored { .. } => {
                tracing::error!(kind, session_id = %sid, "{}", entry.event);
            }
            _ => {
                tracing::debug!(kind, session_id = %sid, "{}", entry.event);
            }
        }
    }
}

/// No-op logger that discards all log entries.
pub struct NullLogger;

impl TransferLogger for NullLogger {
    fn log(&self, _entry: TransferLog) {}
}

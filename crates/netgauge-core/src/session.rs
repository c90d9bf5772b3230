use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

use crate::logging::{TransferEvent, TransferLog, TransferLogger};

/// Direction of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
    Download,
    Upload,
}

impl TransferKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Download => "download",
            Self::Upload => "upload",
        }
    }
}

/// Final outcome of a session. Set once, never changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalState {
    Completed,
    Aborted,
    Oversized,
    Errored,
}

/// Why a session is being finalized. Carries what the log line needs.
#[derive(Debug, Clone)]
pub enum Finish {
    Completed,
    Aborted { reason: String },
    Oversized { max: u64 },
    Errored { message: String },
}

impl Finish {
    fn state(&self) -> TerminalState {
        match self {
            Self::Completed => TerminalState::Completed,
            Self::Aborted { .. } => TerminalState::Aborted,
            Self::Oversized { .. } => TerminalState::Oversized,
            Self::Errored { .. } => TerminalState::Errored,
        }
    }
}

/// One download or upload, from open to its single terminal outcome.
///
/// Every event handler funnels into [`TransferSession::transition_to`];
/// only the first call has any effect. A session dropped while still open
/// finalizes as `Aborted`, which covers hosts that cancel the owning task
/// when the peer disconnects.
pub struct TransferSession {
    id: Uuid,
    kind: TransferKind,
    started: Instant,
    /// Declared length for downloads, zero for uploads.
    total_bytes: u64,
    /// Handed to the consumer (download) or received (upload).
    bytes_so_far: u64,
    terminal: Option<TerminalState>,
    logger: Arc<dyn TransferLogger>,
}

impl TransferSession {
    /// Open a download session and log its start.
    pub fn open_download(
        requested: Option<&str>,
        effective: u64,
        logger: Arc<dyn TransferLogger>,
    ) -> Self {
        let session = Self::new(TransferKind::Download, effective, logger);
        session.emit(TransferEvent::DownloadStarted {
            requested: requested.map(str::to_owned),
            effective,
        });
        session
    }

    /// Open an upload session and log its start.
    pub fn open_upload(ceiling: u64, logger: Arc<dyn TransferLogger>) -> Self {
        let session = Self::new(TransferKind::Upload, 0, logger);
        session.emit(TransferEvent::UploadStarted { ceiling });
        session
    }

    fn new(kind: TransferKind, total_bytes: u64, logger: Arc<dyn TransferLogger>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            started: Instant::now(),
            total_bytes,
            bytes_so_far: 0,
            terminal: None,
            logger,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> TransferKind {
        self.kind
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn bytes_so_far(&self) -> u64 {
        self.bytes_so_far
    }

    pub fn terminal_state(&self) -> Option<TerminalState> {
        self.terminal
    }

    pub fn is_finished(&self) -> bool {
        self.terminal.is_some()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    /// Add `n` bytes to the running total and return the new total.
    /// Ignored once the session is finished.
    pub fn record(&mut self, n: u64) -> u64 {
        if self.terminal.is_none() {
            self.bytes_so_far = self.bytes_so_far.saturating_add(n);
        }
        self.bytes_so_far
    }

    /// Move to a terminal state. Returns `false` (and does nothing) if the
    /// session already finished.
    pub fn transition_to(&mut self, finish: Finish) -> bool {
        if self.terminal.is_some() {
            return false;
        }
        self.terminal = Some(finish.state());

        let bytes = self.bytes_so_far;
        let elapsed_ms = self.elapsed_ms();
        let event = match finish {
            Finish::Completed => TransferEvent::Completed { bytes, elapsed_ms },
            Finish::Aborted { reason } => TransferEvent::Aborted {
                bytes,
                elapsed_ms,
                reason,
            },
            Finish::Oversized { max } => TransferEvent::Oversized {
                bytes,
                max,
                elapsed_ms,
            },
            Finish::Errored { message } => TransferEvent::Errored {
                bytes,
                elapsed_ms,
                message,
            },
        };
        self.emit(event);
        true
    }

    fn emit(&self, event: TransferEvent) {
        self.logger.log(TransferLog {
            kind: self.kind,
            session_id: self.id,
            event,
        });
    }
}

impl Drop for TransferSession {
    fn drop(&mut self) {
        self.transition_to(Finish::Aborted {
            reason: "session dropped before completion".into(),
        });
    }
}

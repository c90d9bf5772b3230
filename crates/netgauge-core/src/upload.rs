use std::sync::Arc;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};

use crate::error::SourceError;
use crate::logging::TransferLogger;
use crate::session::{Finish, TerminalState, TransferSession};

/// What the caller gets back from an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadReport {
    Completed { bytes: u64, millis: u64 },
    Oversized { bytes: u64, max: u64 },
    /// Peer gone; there is nobody left to answer.
    Aborted { bytes: u64 },
    Errored { message: String },
}

impl UploadReport {
    pub fn state(&self) -> TerminalState {
        match self {
            Self::Completed { .. } => TerminalState::Completed,
            Self::Oversized { .. } => TerminalState::Oversized,
            Self::Aborted { .. } => TerminalState::Aborted,
            Self::Errored { .. } => TerminalState::Errored,
        }
    }
}

/// Counts an inbound body against a hard ceiling.
pub struct UploadAccountant {
    session: TransferSession,
    ceiling: u64,
}

impl UploadAccountant {
    pub fn open(ceiling: u64, logger: Arc<dyn TransferLogger>) -> Self {
        Self {
            session: TransferSession::open_upload(ceiling, logger),
            ceiling,
        }
    }

    pub fn session(&self) -> &TransferSession {
        &self.session
    }

    /// Drain `source`, counting every fragment.
    ///
    /// The ceiling is checked after each fragment. On a breach the source
    /// is dropped without being polled again, so nothing buffered behind
    /// the breaching fragment is read.
    pub async fn run<S>(mut self, source: S) -> UploadReport
    where
        S: Stream<Item = Result<Bytes, SourceError>> + Send,
    {
        let mut source = std::pin::pin!(source);

        while let Some(fragment) = source.next().await {
            match fragment {
                Ok(data) => {
                    let total = self.session.record(data.len() as u64);
                    if total > self.ceiling {
                        self.session.transition_to(Finish::Oversized { max: self.ceiling });
                        return UploadReport::Oversized {
                            bytes: total,
                            max: self.ceiling,
                        };
                    }
                }
                Err(SourceError::PeerGone) => {
                    self.session.transition_to(Finish::Aborted {
                        reason: SourceError::PeerGone.to_string(),
                    });
                    return UploadReport::Aborted {
                        bytes: self.session.bytes_so_far(),
                    };
                }
                Err(SourceError::Transport(message)) => {
                    self.session.transition_to(Finish::Errored {
                        message: message.clone(),
                    });
                    return UploadReport::Errored { message };
                }
            }
        }

        let millis = self.session.elapsed_ms();
        self.session.transition_to(Finish::Completed);
        UploadReport::Completed {
            bytes: self.session.bytes_so_far(),
            millis,
        }
    }
}

/// Failures a transfer can end with, as seen at the request boundary.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// Something went wrong before any byte was streamed.
    #[error("setup failed: {0}")]
    Setup(String),

    #[error("peer disconnected")]
    PeerAbort,

    #[error("payload exceeds {max} bytes")]
    SizeViolation { max: u64 },

    #[error("transport error: {0}")]
    Transport(String),
}

/// Errors reported by a [`ChunkSink`](crate::download::ChunkSink).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    #[error("consumer disconnected")]
    Disconnected,

    #[error("write failed: {0}")]
    Write(String),
}

/// Errors yielded by an inbound upload source.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// The peer abandoned the connection mid-body.
    #[error("peer went away")]
    PeerGone,

    #[error("read failed: {0}")]
    Transport(String),
}

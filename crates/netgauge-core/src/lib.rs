/// netgauge core: the throughput-measurement transfer engine.
///
/// - Download generator: random 64 KiB chunks pushed into a flow-controlled sink
/// - Upload accountant: byte counting against a hard ceiling, fail-fast on breach
/// - Transfer session: one terminal outcome per transfer, logged exactly once
/// - Size policy: default/clamp resolution of requested sizes

pub mod download;
pub mod error;
pub mod logging;
pub mod session;
pub mod size_policy;
pub mod upload;

// Re-export key types for convenience.
pub use download::{CHUNK_SIZE, ChannelSink, ChunkSink, DownloadGenerator, SINK_DEPTH, channel_sink};
pub use error::{SinkError, SourceError, TransferError};
pub use logging::{NullLogger, TracingLogger, TransferEvent, TransferLog, TransferLogger};
pub use session::{Finish, TerminalState, TransferKind, TransferSession};
pub use size_policy::SizeLimits;
pub use upload::{UploadAccountant, UploadReport};

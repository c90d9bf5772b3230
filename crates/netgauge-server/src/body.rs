use std::error::Error as StdError;
use std::io;

use axum::body::Body;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use netgauge_core::SourceError;

/// Request body as an upload source, with errors sorted into "peer left"
/// and everything else.
pub fn inbound(body: Body) -> impl Stream<Item = Result<Bytes, SourceError>> + Send {
    body.into_data_stream().map(|frame| frame.map_err(classify))
}

/// Walk the error chain looking for a disconnect.
pub fn classify(err: axum::Error) -> SourceError {
    let inner = err.into_inner();
    let mut cause: Option<&(dyn StdError + 'static)> = Some(&*inner as &(dyn StdError + 'static));

    while let Some(e) = cause {
        if let Some(h) = e.downcast_ref::<hyper::Error>() {
            if h.is_incomplete_message() || h.is_canceled() {
                return SourceError::PeerGone;
            }
        }
        if let Some(io) = e.downcast_ref::<io::Error>() {
            if matches!(
                io.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::UnexpectedEof
            ) {
                return SourceError::PeerGone;
            }
            // io::Error::source() skips the wrapped error itself.
            if let Some(wrapped) = io.get_ref() {
                cause = Some(wrapped as &(dyn StdError + 'static));
                continue;
            }
        }
        cause = e.source();
    }

    SourceError::Transport(inner.to_string())
}

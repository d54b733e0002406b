use std::sync::Arc;
use thiserror::Error;

/// Failure modes surfaced by the transport layer (component G).
///
/// `Disconnected` is terminal: once observed, the transport is closed and
/// every further operation (and every pending `send_cmd` upstream) sees it.
#[derive(Debug, Error, Clone)]
pub enum TransportError {
    #[error("serial I/O error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("serial port disconnected")]
    Disconnected,

    #[error("frame decode error: {reason}")]
    Framing { reason: String },
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        TransportError::Io(Arc::new(err))
    }
}

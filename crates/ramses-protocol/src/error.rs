use thiserror::Error;

/// Failure modes surfaced by the QoS layer (component H).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("send failed after {retries} retries")]
    SendFailed { retries: u32 },

    #[error("send cancelled")]
    Cancelled,

    #[error("connection lost")]
    ConnectionLost,
}

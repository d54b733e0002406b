use thiserror::Error;

/// Failure modes surfaced to a binding initiator (component I).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BindingError {
    #[error("binding deadline elapsed without reaching Bound")]
    Timeout,

    #[error("binding cancelled")]
    Cancelled,
}

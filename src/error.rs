use ramses_binding::BindingError;
use ramses_entity::DispatchError;
use ramses_protocol::ProtocolError;
use ramses_schedule::ScheduleError;
use ramses_transport::TransportError;
use thiserror::Error;

/// Failure modes surfaced by the gateway façade (component K).
#[derive(Debug, Error)]
pub enum GatewayError {
    /// `disable_sending` is set; no outbound command may be issued.
    #[error("sending is disabled by configuration")]
    SendingDisabled,

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Binding(#[from] BindingError),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error("malformed inbound frame: {reason}")]
    MalformedMessage { reason: String },

    #[error("loading persisted state failed: {reason}")]
    InvalidState { reason: String },
}

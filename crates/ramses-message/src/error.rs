use ramses_packet::{Code, PacketError, Verb};
use thiserror::Error;

/// Failure modes for turning a grammar-valid [`ramses_packet::Packet`] into
/// a [`crate::Message`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MessageError {
    #[error(transparent)]
    Packet(#[from] PacketError),

    #[error("unknown code: {0}")]
    UnknownCode(Code),

    #[error("unknown verb/code pair: {verb}/{code}")]
    UnknownVerbCodePair { verb: Verb, code: Code },

    #[error("payload parser for {code} failed: {reason}")]
    PayloadParseFailed { code: Code, reason: String },
}

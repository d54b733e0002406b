use thiserror::Error;

/// Failure modes for lexing and validating a wire frame.
///
/// All three variants are recoverable: the packet in question is dropped
/// and logged, the stream is not poisoned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PacketError {
    #[error("invalid packet: {reason}")]
    PacketInvalid { reason: String },

    #[error("invalid address set: {reason}")]
    PacketAddrSetInvalid { reason: String },

    #[error("invalid payload for code/verb: {reason}")]
    PacketPayloadInvalid { reason: String },
}

impl PacketError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        PacketError::PacketInvalid {
            reason: reason.into(),
        }
    }

    pub fn addr_set_invalid(reason: impl Into<String>) -> Self {
        PacketError::PacketAddrSetInvalid {
            reason: reason.into(),
        }
    }

    pub fn payload_invalid(reason: impl Into<String>) -> Self {
        PacketError::PacketPayloadInvalid {
            reason: reason.into(),
        }
    }
}

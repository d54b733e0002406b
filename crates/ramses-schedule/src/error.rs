use thiserror::Error;

/// Failure modes surfaced to a schedule read/write initiator (component J).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("schedule request timed out after {retries} retries")]
    Timeout { retries: u32 },

    /// A fragment arrived out of sequence, or the reported `total_frags`
    /// changed mid-transfer -- the aggregator is discarded rather than
    /// risk handing a caller a schedule stitched from two transfers.
    #[error("fragment gap: {reason}")]
    FragmentGap { reason: String },

    #[error("decompressing schedule fragments failed: {reason}")]
    CodecFailed { reason: String },

    /// §4.J step 3 of `set_schedule`: the version must strictly increase
    /// after a write.
    #[error("schedule version did not advance after write (was {before}, still {after})")]
    VersionDidNotAdvance { before: u16, after: u16 },

    #[error("schedule request cancelled")]
    Cancelled,

    #[error("connection lost while fetching schedule")]
    ConnectionLost,
}

impl From<ramses_protocol::ProtocolError> for ScheduleError {
    fn from(err: ramses_protocol::ProtocolError) -> Self {
        match err {
            ramses_protocol::ProtocolError::SendFailed { retries } => ScheduleError::Timeout { retries },
            ramses_protocol::ProtocolError::Cancelled => ScheduleError::Cancelled,
            ramses_protocol::ProtocolError::ConnectionLost => ScheduleError::ConnectionLost,
        }
    }
}

use ramses_address::Address;
use ramses_packet::{Code, Verb};
use thiserror::Error;

/// Failure modes surfaced while dispatching a validated [`ramses_message::Message`]
/// to the device registry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("invalid address set: {reason}")]
    PacketAddrSetInvalid { reason: String },

    /// Device auto-creation failed while eavesdropping is disabled. Per the
    /// source, this is swallowed for destinations (we just don't promote an
    /// unknown dst) but re-raised for sources: a message with no real
    /// source device can't be processed any further.
    #[error("could not resolve {} device {addr}", if *is_src { "source" } else { "destination" })]
    LookupError { addr: Address, is_src: bool },

    /// A device's class slug doesn't recognise `(code, verb)` as something
    /// it should originate (as src) or answer (as dst). Only raised in
    /// strict mode; otherwise this is a logged warning and processing
    /// continues.
    #[error("{addr} (role invalid): unexpected {verb}/{code}")]
    RoleInvalid {
        addr: Address,
        code: Code,
        verb: Verb,
    },
}

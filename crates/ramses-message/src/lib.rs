//! Turning grammar-valid [`ramses_packet::Packet`]s into structured,
//! index-tagged [`Message`]s.

mod error;
mod hex;
mod index;
mod message;
mod payload;

pub use error::MessageError;
pub use message::Message;
pub use payload::PayloadValue;

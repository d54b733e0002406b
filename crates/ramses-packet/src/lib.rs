//! Wire-frame lexing and payload grammar validation for the RAMSES-II
//! protocol.
//!
//! [`Packet::from_frame`] turns one `\r\n`-terminated serial line into a
//! validated [`Packet`]; [`grammar`] holds the `(code, verb) -> regex`
//! table and the code classification sets that drive index derivation and
//! array-fragment detection.

pub mod grammar;
mod code;
mod error;
mod lifespan;
mod packet;
mod verb;

pub use code::Code;
pub use error::PacketError;
pub use lifespan::Lifespan;
pub use packet::{Ctx, Packet};
pub use verb::Verb;

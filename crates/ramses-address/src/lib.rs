//! Device address parsing and device-type classification for the
//! RAMSES-II protocol.
//!
//! See [`Address`] for the `TT:NNNNNN` wire address, and [`DevType`] for the
//! device-class slug table (`CTL`, `TRV`, `HGI`, ...).

mod address;
mod dev_type;

pub use address::{Address, AddressError, BROADCAST_ADDR_ID, NULL_ADDR_ID};
pub use dev_type::{DevType, ZoneRole};

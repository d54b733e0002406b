//! Serial transport (component G): owns the radio, frames `\r\n`-terminated
//! lines, enforces the minimum inter-write gap, and exposes evofw3
//! detection and cooperative pause/resume backpressure.

mod error;
mod hgi;
mod port;
mod transport;

pub use error::TransportError;
pub use hgi::{GENERIC_HGI_ID, substitute_generic_hgi_id};
pub use port::SerialPort;
pub use transport::{BAUD_RATE, Transport, TransportConfig};

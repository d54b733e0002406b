//! The schedule read/write pipeline (component J): a multi-fragment
//! `0404` transfer guarded by a `0006` version probe, pure fragment
//! accumulation, and zlib/hex wire codec.

mod aggregator;
mod client;
mod codec;
mod dom;
mod error;

pub use aggregator::{FragmentAggregator, Outcome as AggregatorOutcome};
pub use client::ScheduleClient;
pub use codec::FRAGMENT_SIZE;
pub use dom::{DayOfWeek, Schedule, SwitchPoint, ZoneRef};
pub use error::ScheduleError;

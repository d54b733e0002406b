//! The QoS / transport-client layer (component H): priority-ordered
//! command queue, echo/reply matching, retries, and inbound handler
//! fan-out, built on [`ramses_transport::Transport`].

mod command;
mod error;
mod handler;
mod inflight;
mod priority;
mod protocol;
mod queue;

pub use command::{
    Command, DEFAULT_ECHO_TIMEOUT, DEFAULT_GAP_DURATION, DEFAULT_MAX_RETRIES, DEFAULT_NUM_REPEATS,
    DEFAULT_REPLY_TIMEOUT,
};
pub use error::ProtocolError;
pub use handler::{Filter, HandlerFn, HandlerId, HandlerRegistry};
pub use inflight::{InFlight, Outcome, Phase};
pub use priority::Priority;
pub use protocol::{Protocol, ProtocolHandle};
pub use queue::{CommandQueue, Prioritized};

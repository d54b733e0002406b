//! A controllable instant source for driving the pure FSMs
//! (`ramses_protocol::InFlight`, `ramses_binding::BindingContext`,
//! `ramses_schedule::FragmentAggregator`'s callers) deterministically --
//! every one of them already takes `now: DateTime<Utc>` as a plain
//! argument, so tests need a convenient generator for those instants
//! rather than a real clock to mock.

use chrono::{DateTime, TimeZone, Utc};

/// An arbitrary, fixed epoch tests anchor to; its value is irrelevant, it
/// just needs to be a valid instant `chrono` will not reject.
const EPOCH_SECS: i64 = 1_700_000_000;

#[derive(Debug, Clone, Copy)]
pub struct FakeClock {
    current: DateTime<Utc>,
}

impl Default for FakeClock {
    fn default() -> Self {
        FakeClock::at(0)
    }
}

impl FakeClock {
    /// A clock starting `offset_secs` past the fixed epoch.
    pub fn at(offset_secs: i64) -> FakeClock {
        FakeClock {
            current: Utc.timestamp_opt(EPOCH_SECS + offset_secs, 0).unwrap(),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.current
    }

    /// Move the clock forward by `secs` seconds, returning the new instant.
    pub fn advance_secs(&mut self, secs: i64) -> DateTime<Utc> {
        self.current += chrono::Duration::seconds(secs);
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_moves_now_forward() {
        let mut clock = FakeClock::at(0);
        let t0 = clock.now();
        let t1 = clock.advance_secs(3);
        assert!(t1 > t0);
        assert_eq!((t1 - t0).num_seconds(), 3);
    }
}

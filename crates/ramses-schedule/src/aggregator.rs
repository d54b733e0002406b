//! The multi-fragment aggregator: per-zone/DHW state `{fragments,
//! total_frags}` that a schedule read accumulates into (§3 "Schedule
//! aggregator", §4.J step 3).
//!
//! Pure, like [`ramses_binding::BindingContext`]: every transition is a
//! function of one observed fragment, with no I/O of its own. The owning
//! reader drives it by feeding each `RP/0404` it receives and inspecting
//! the returned [`Outcome`].

use crate::error::ScheduleError;
use std::collections::BTreeMap;

/// What the caller should do after feeding a fragment to the aggregator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// More fragments are still expected; request `next` next.
    NeedMore { next: u8 },
    /// Every fragment `1..=total_frags` has arrived, in order, with no
    /// gaps; the concatenated raw bytes are ready for
    /// [`crate::codec::decompress`].
    Complete(Vec<u8>),
}

/// Accumulates `0404` fragments for a single read. Discarded (never
/// reused) on any inconsistency -- per spec §4.J's "no partial state leaks
/// to callers" -- rather than trying to repair a corrupted transfer.
#[derive(Debug, Default, Clone)]
pub struct FragmentAggregator {
    total_frags: Option<u8>,
    fragments: BTreeMap<u8, Vec<u8>>,
}

impl FragmentAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one `RP/0404` fragment. `frag_number` is 1-based per the wire
    /// format; `total_frags` is authoritative only on the first fragment
    /// received (§4.J step 3: "The first `RP/0404` carries both the
    /// current `frag_number` and the authoritative `total_frags`").
    pub fn ingest(&mut self, frag_number: u8, total_frags: u8, bytes: Vec<u8>) -> Result<Outcome, ScheduleError> {
        if frag_number == 0 || total_frags == 0 {
            return Err(ScheduleError::FragmentGap {
                reason: format!("invalid fragment header: {frag_number}/{total_frags}"),
            });
        }

        match self.total_frags {
            None => self.total_frags = Some(total_frags),
            Some(expected) if expected != total_frags => {
                return Err(ScheduleError::FragmentGap {
                    reason: format!("total_frags changed mid-transfer: {expected} -> {total_frags}"),
                });
            }
            Some(_) => {}
        }

        if frag_number > total_frags {
            return Err(ScheduleError::FragmentGap {
                reason: format!("frag_number {frag_number} exceeds total_frags {total_frags}"),
            });
        }

        self.fragments.insert(frag_number, bytes);

        if self.fragments.len() as u8 == total_frags && self.is_contiguous(total_frags) {
            let concatenated = (1..=total_frags)
                .flat_map(|i| self.fragments[&i].clone())
                .collect();
            return Ok(Outcome::Complete(concatenated));
        }

        let next = (1..=total_frags).find(|i| !self.fragments.contains_key(i)).unwrap_or(total_frags);
        Ok(Outcome::NeedMore { next })
    }

    fn is_contiguous(&self, total_frags: u8) -> bool {
        (1..=total_frags).all(|i| self.fragments.contains_key(&i))
    }

    pub fn total_frags(&self) -> Option<u8> {
        self.total_frags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_fragment_completes_immediately() {
        let mut agg = FragmentAggregator::new();
        let outcome = agg.ingest(1, 1, vec![0xAB, 0xCD]).unwrap();
        assert_eq!(outcome, Outcome::Complete(vec![0xAB, 0xCD]));
    }

    #[test]
    fn multi_fragment_accumulates_in_order() {
        let mut agg = FragmentAggregator::new();
        assert_eq!(agg.ingest(1, 3, vec![1]).unwrap(), Outcome::NeedMore { next: 2 });
        assert_eq!(agg.ingest(2, 3, vec![2]).unwrap(), Outcome::NeedMore { next: 3 });
        assert_eq!(agg.ingest(3, 3, vec![3]).unwrap(), Outcome::Complete(vec![1, 2, 3]));
    }

    #[test]
    fn out_of_order_fragments_still_concatenate_in_number_order() {
        let mut agg = FragmentAggregator::new();
        agg.ingest(2, 3, vec![2]).unwrap();
        agg.ingest(1, 3, vec![1]).unwrap();
        let outcome = agg.ingest(3, 3, vec![3]).unwrap();
        assert_eq!(outcome, Outcome::Complete(vec![1, 2, 3]));
    }

    #[test]
    fn total_frags_changing_mid_transfer_is_a_gap() {
        let mut agg = FragmentAggregator::new();
        agg.ingest(1, 3, vec![1]).unwrap();
        let err = agg.ingest(2, 4, vec![2]).unwrap_err();
        assert!(matches!(err, ScheduleError::FragmentGap { .. }));
    }

    #[test]
    fn frag_number_beyond_total_is_rejected() {
        let mut agg = FragmentAggregator::new();
        let err = agg.ingest(5, 3, vec![1]).unwrap_err();
        assert!(matches!(err, ScheduleError::FragmentGap { .. }));
    }
}

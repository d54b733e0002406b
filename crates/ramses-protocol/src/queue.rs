use crate::command::Command;
use crate::priority::Priority;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Anything [`CommandQueue`] can order: just needs to expose its
/// [`Priority`]. Implemented for [`Command`] directly, and for whatever
/// wrapper pairs a command with its caller's reply channel, so a queued
/// request and its eventual completion can never drift apart.
pub trait Prioritized {
    fn priority(&self) -> Priority;
}

impl Prioritized for Command {
    fn priority(&self) -> Priority {
        self.priority
    }
}

/// One queued item plus the monotonic enqueue sequence that breaks
/// priority ties in FIFO order.
struct Entry<T> {
    seq: u64,
    item: T,
}

impl<T: Prioritized> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.item.priority() == other.item.priority() && self.seq == other.seq
    }
}
impl<T: Prioritized> Eq for Entry<T> {}

impl<T: Prioritized> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: Prioritized> Ord for Entry<T> {
    /// `BinaryHeap` is a max-heap; we want the *lowest* priority value
    /// (highest precedence, per `Priority`'s ordering) and, within a
    /// priority, the *lowest* (earliest) `seq` to pop first, so both
    /// comparisons are reversed here.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .item
            .priority()
            .cmp(&self.item.priority())
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// The command queue behind `send_cmd`: priority order, FIFO within a
/// priority (§4.H scheduling rules).
pub struct CommandQueue<T: Prioritized = Command> {
    heap: BinaryHeap<Entry<T>>,
    next_seq: u64,
}

impl<T: Prioritized> Default for CommandQueue<T> {
    fn default() -> Self {
        CommandQueue {
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }
}

impl<T: Prioritized> CommandQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: T) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Entry { seq, item });
    }

    pub fn pop(&mut self) -> Option<T> {
        self.heap.pop().map(|entry| entry.item)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ramses_address::Address;
    use ramses_packet::{Code, Verb};

    fn cmd(priority: Priority) -> Command {
        Command::new(Verb::RQ, Code::_2309, Address::parse("01:145038", false).unwrap(), "00")
            .with_priority(priority)
    }

    #[test]
    fn higher_priority_overtakes_lower() {
        let mut q: CommandQueue = CommandQueue::new();
        q.push(cmd(Priority::LOW));
        q.push(cmd(Priority::HIGHEST));
        q.push(cmd(Priority::DEFAULT));
        assert_eq!(q.pop().unwrap().priority, Priority::HIGHEST);
        assert_eq!(q.pop().unwrap().priority, Priority::DEFAULT);
        assert_eq!(q.pop().unwrap().priority, Priority::LOW);
    }

    #[test]
    fn equal_priority_is_fifo() {
        let mut q: CommandQueue = CommandQueue::new();
        let first = cmd(Priority::DEFAULT).with_src(Address::parse("18:000001", false).unwrap());
        let second = cmd(Priority::DEFAULT).with_src(Address::parse("18:000002", false).unwrap());
        q.push(first);
        q.push(second);
        assert_eq!(q.pop().unwrap().src, Some(Address::parse("18:000001", false).unwrap()));
        assert_eq!(q.pop().unwrap().src, Some(Address::parse("18:000002", false).unwrap()));
    }
}

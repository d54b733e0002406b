use ramses_packet::Packet;

pub type Filter = Box<dyn Fn(&Packet) -> bool + Send + Sync>;
pub type HandlerFn = Box<dyn FnMut(&Packet) + Send>;

/// An opaque token returned by [`HandlerRegistry::add`] so callers can
/// later unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

struct Entry {
    id: HandlerId,
    filter: Option<Filter>,
    handler: HandlerFn,
}

/// Inbound message fan-out: every registered handler whose filter matches
/// sees every packet, in registration order, synchronously (§4.H: "handlers
/// must not block").
#[derive(Default)]
pub struct HandlerRegistry {
    entries: Vec<Entry>,
    next_id: u64,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, handler: HandlerFn, filter: Option<Filter>) -> HandlerId {
        let id = HandlerId(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry { id, filter, handler });
        id
    }

    /// Unsubscribe the handler `id` names. A no-op if it was already
    /// removed.
    pub fn remove(&mut self, id: HandlerId) {
        self.entries.retain(|e| e.id != id);
    }

    pub fn dispatch(&mut self, pkt: &Packet) {
        for entry in &mut self.entries {
            if entry.filter.as_ref().is_none_or(|f| f(pkt)) {
                (entry.handler)(pkt);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::sync::{Arc, Mutex};

    fn pkt() -> Packet {
        Packet::from_frame(
            "045  I --- 01:145038 --:------ 01:145038 30C9 003 0007D0",
            Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn dispatches_to_all_matching_handlers_in_order() {
        let mut registry = HandlerRegistry::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let o1 = order.clone();
        registry.add(Box::new(move |_p| o1.lock().unwrap().push(1)), None);
        let o2 = order.clone();
        registry.add(Box::new(move |_p| o2.lock().unwrap().push(2)), None);

        registry.dispatch(&pkt());
        assert_eq!(*order.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn unsubscribed_handler_stops_receiving() {
        let mut registry = HandlerRegistry::new();
        let seen = Arc::new(Mutex::new(0));
        let s = seen.clone();
        let id = registry.add(Box::new(move |_p| *s.lock().unwrap() += 1), None);
        registry.dispatch(&pkt());
        registry.remove(id);
        registry.dispatch(&pkt());
        assert_eq!(*seen.lock().unwrap(), 1);
    }

    #[test]
    fn filter_excludes_non_matching_packets() {
        let mut registry = HandlerRegistry::new();
        let seen = Arc::new(Mutex::new(0));
        let s = seen.clone();
        registry.add(
            Box::new(move |_p| *s.lock().unwrap() += 1),
            Some(Box::new(|p: &Packet| p.code() == ramses_packet::Code::_1FC9)),
        );
        registry.dispatch(&pkt());
        assert_eq!(*seen.lock().unwrap(), 0);
    }
}

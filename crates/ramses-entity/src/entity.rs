use chrono::{DateTime, Utc};
use ramses_address::Address;
use ramses_message::Message;
use ramses_packet::{Code, Ctx, Verb};
use std::collections::HashMap;

/// The stable identity of an entity in the registry.
///
/// Systems, zones, DHW controllers and UFH circuits are all addressed
/// relative to the controller that owns them -- there is no owning Rust
/// reference from a zone back to its controller, only this key, which the
/// [`crate::Registry`] resolves by lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityId {
    Device(Address),
    System(Address),
    Zone { ctl: Address, zone_idx: u8 },
    Dhw { ctl: Address },
    UfhCircuit { ctl: Address, ufh_idx: u8 },
}

impl EntityId {
    /// The device address this entity is reached through on the wire --
    /// the controller, for anything zone/system/DHW-shaped.
    pub fn wire_address(&self) -> Address {
        match *self {
            EntityId::Device(addr) | EntityId::System(addr) => addr,
            EntityId::Zone { ctl, .. } | EntityId::Dhw { ctl } | EntityId::UfhCircuit { ctl, .. } => ctl,
        }
    }
}

/// Per-entity message store: `msgs[code][verb][ctx] = Message`, plus a
/// `latest[code]` view updated only by `I`/`RP` messages.
///
/// Expiry is a pull operation the owner must explicitly run via
/// [`EntityCache::sweep_expired`] -- reads never mutate. This is a
/// deliberate departure from the source, whose `expired()` free function
/// both queried and evicted in the same call.
#[derive(Debug, Default, Clone)]
pub struct EntityCache {
    msgs: HashMap<Code, HashMap<Verb, HashMap<Ctx, Message>>>,
    latest: HashMap<Code, Message>,
}

impl EntityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert-or-replace `msgs[code][verb][ctx]`; update `latest[code]`
    /// when `verb` is `I` or `RP`.
    pub fn handle_msg(&mut self, msg: Message) {
        let code = msg.code();
        let verb = msg.verb();
        let ctx = msg.packet().ctx().clone();

        if matches!(verb, Verb::I | Verb::RP) {
            self.latest.insert(code, msg.clone());
        }

        self.msgs
            .entry(code)
            .or_default()
            .entry(verb)
            .or_default()
            .insert(ctx, msg);
    }

    pub fn get(&self, code: Code, verb: Verb, ctx: &Ctx) -> Option<&Message> {
        self.msgs.get(&code)?.get(&verb)?.get(ctx)
    }

    /// The most recent `I`/`RP` message for `code`, regardless of expiry --
    /// callers that care about freshness should check
    /// [`ramses_message::Message::is_expired`] themselves, or rely on a
    /// prior [`EntityCache::sweep_expired`].
    pub fn latest(&self, code: Code) -> Option<&Message> {
        self.latest.get(&code)
    }

    /// Every code this cache currently holds a message for.
    pub fn codes(&self) -> impl Iterator<Item = Code> + '_ {
        self.msgs.keys().copied()
    }

    /// Remove every message (from both `msgs` and `latest`) that is expired
    /// as of `now`. Returns the number of distinct messages evicted -- a
    /// message counts once even though it may be removed from both stores.
    pub fn sweep_expired(&mut self, now: DateTime<Utc>) -> usize {
        let mut evicted = 0;

        self.latest.retain(|_, msg| !msg.is_expired(now));

        for by_verb in self.msgs.values_mut() {
            for by_ctx in by_verb.values_mut() {
                by_ctx.retain(|_, msg| {
                    let keep = !msg.is_expired(now);
                    if !keep {
                        evicted += 1;
                    }
                    keep
                });
            }
            by_verb.retain(|_, by_ctx| !by_ctx.is_empty());
        }
        self.msgs.retain(|_, by_verb| !by_verb.is_empty());

        evicted
    }
}

/// A registry-owned entity: a device, system, zone, DHW controller, or UFH
/// circuit. Each owns exactly one [`EntityCache`]; cross-entity references
/// (controller <-> zone, zone <-> TRV) are [`EntityId`] lookups through the
/// registry, never owning pointers.
#[derive(Debug, Clone)]
pub struct Entity {
    id: EntityId,
    cache: EntityCache,
}

impl Entity {
    pub fn new(id: EntityId) -> Self {
        Entity {
            id,
            cache: EntityCache::new(),
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn cache(&self) -> &EntityCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut EntityCache {
        &mut self.cache
    }

    pub fn handle_msg(&mut self, msg: Message) {
        self.cache.handle_msg(msg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ramses_packet::Packet;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn msg(frame: &str, dtm: DateTime<Utc>) -> Message {
        Message::build(Packet::from_frame(frame, dtm).unwrap()).unwrap()
    }

    #[test]
    fn handle_msg_updates_latest_only_for_i_and_rp() {
        let mut cache = EntityCache::new();
        cache.handle_msg(msg(
            "045  I --- 01:145038 --:------ 01:145038 2309 003 0107D0",
            at(0),
        ));
        assert!(cache.latest(Code::_2309).is_some());

        cache.handle_msg(msg(
            "045 RQ --- 18:000730 01:145038 --:------ 2309 001 01",
            at(1),
        ));
        // RQ doesn't update latest, but the previous I's view survives.
        assert_eq!(cache.latest(Code::_2309).unwrap().verb(), Verb::I);
    }

    #[test]
    fn sweep_expired_evicts_stale_entries_only() {
        let mut cache = EntityCache::new();
        cache.handle_msg(msg(
            "045  I --- 01:145038 --:------ 01:145038 2309 003 0107D0",
            at(0),
        ));
        assert_eq!(cache.sweep_expired(at(100)), 0);
        assert_eq!(cache.sweep_expired(at(5_000)), 1);
        assert!(cache.latest(Code::_2309).is_none());
    }
}

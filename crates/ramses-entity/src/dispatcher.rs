use crate::entity::EntityId;
use crate::error::DispatchError;
use crate::registry::Registry;
use ramses_address::{Address, DevType};
use ramses_message::Message;
use ramses_packet::grammar::{CODES_OF_HEAT_DOMAIN_ONLY, CODES_OF_HVAC_DOMAIN_ONLY, codes_by_dev_slug};
use ramses_packet::Verb;
use std::collections::HashSet;

/// How much of the normal dispatch pipeline runs, from full processing
/// down to "just parse and log".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub enum ReduceProcessing {
    Full,
    DontUpdateEntities,
    DontCreateEntities,
}

/// Hard-coded role exceptions the source carries regardless of a device's
/// resolved class: a controller may `RQ/3EF1` (relay demand probe), a
/// relay may answer `RQ/3EF0`, and any device may `W/0001`.
fn is_hard_coded_role_exception(slug: &str, verb: Verb, code: ramses_packet::Code) -> bool {
    use ramses_packet::Code;
    matches!(
        (slug, verb, code),
        ("CTL", Verb::RQ, Code::_3EF1) | ("BDR", Verb::RQ, Code::_3EF0) | (_, Verb::W, Code::_0001)
    )
}

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub enable_eavesdrop: bool,
    pub enforce_known_list: bool,
    pub known_list: HashSet<Address>,
    pub reduce_processing: ReduceProcessing,
    pub strict_mode: bool,
    pub dev_mode: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        DispatcherConfig {
            enable_eavesdrop: true,
            enforce_known_list: false,
            known_list: HashSet::new(),
            reduce_processing: ReduceProcessing::Full,
            strict_mode: false,
            dev_mode: false,
        }
    }
}

pub struct Dispatcher {
    config: DispatcherConfig,
}

impl Dispatcher {
    pub fn new(config: DispatcherConfig) -> Self {
        Dispatcher { config }
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// The main entry point: validate, create/resolve devices, validate
    /// roles, and route `msg` into the registry's entity caches.
    pub fn process(&self, registry: &mut Registry, msg: Message) -> Result<(), DispatchError> {
        self.check_msg_addrs(&msg)?;

        if self.config.enforce_known_list
            && !self.config.known_list.is_empty()
            && !self.config.known_list.contains(&msg.src())
        {
            tracing::debug!(src = %msg.src(), "dropping message from address outside known_list");
            return Ok(());
        }

        if self.config.reduce_processing < ReduceProcessing::DontCreateEntities {
            self.create_devices_from_addrs(registry, &msg)?;
        }

        self.check_src_slug(&msg)?;
        self.check_dst_slug(&msg)?;

        if self.config.reduce_processing < ReduceProcessing::DontUpdateEntities {
            self.route(registry, msg);
        }

        Ok(())
    }

    /// Step 1: address-set sanity. Two same-type-byte heat devices talking
    /// a heat-only code is always invalid; a heat-or-hvac-ambiguous code is
    /// a warning; an HVAC-only code is fine.
    fn check_msg_addrs(&self, msg: &Message) -> Result<(), DispatchError> {
        let src = msg.src();
        let dst = msg.dst();
        if src.is_null() || dst.is_null() || src == dst {
            return Ok(());
        }
        let same_type = src.type_byte() == dst.type_byte();
        // HGI (type 18) isn't in `HEAT_DEVICES` itself, but a same-type pair
        // of HGIs trading a heat-only code is exactly the address-set
        // abuse this check exists to catch (spec S2), so it counts here too.
        let is_heat_or_hgi = |a: &Address| a.device_type().is_some_and(|t| t.is_heat_device() || t == DevType::HGI);
        let both_heat = is_heat_or_hgi(&src) && is_heat_or_hgi(&dst);

        if same_type && both_heat {
            let code = msg.code();
            if CODES_OF_HEAT_DOMAIN_ONLY.contains(&code) {
                return Err(DispatchError::PacketAddrSetInvalid {
                    reason: format!("{code} is heat-only but src/dst share type byte {src}/{dst}"),
                });
            }
            if !CODES_OF_HVAC_DOMAIN_ONLY.contains(&code) {
                tracing::warn!(%src, %dst, %code, "heat-family address pair with an ambiguous code");
            }
        }
        Ok(())
    }

    /// Step 2: auto-create devices for src/dst. Destination creation is
    /// suppressed when eavesdropping is disabled; a `LookupError` for an
    /// unresolvable destination is swallowed, but the same failure for a
    /// source is fatal (there is no message to process without a real
    /// source).
    fn create_devices_from_addrs(&self, registry: &mut Registry, msg: &Message) -> Result<(), DispatchError> {
        let src = msg.src();
        if src.is_null() {
            return Err(DispatchError::LookupError { addr: src, is_src: true });
        }
        registry.get_or_create(EntityId::Device(src));

        let dst = msg.dst();
        if dst.is_null() || dst == src {
            return Ok(());
        }
        if !self.config.enable_eavesdrop && !registry.contains(EntityId::Device(dst)) {
            tracing::debug!(%dst, "eavesdropping disabled; not auto-creating destination device");
            return Ok(());
        }
        registry.get_or_create(EntityId::Device(dst));
        Ok(())
    }

    fn check_role(&self, addr: Address, msg: &Message, is_src: bool) -> Result<(), DispatchError> {
        let Some(class) = addr.device_type() else {
            return Ok(()); // unresolved/promotable class: nothing to check yet
        };
        if class.is_promotable() {
            return Ok(());
        }
        let slug = class.slug();
        let code = msg.code();
        let expected_verb = if is_src { msg.verb() } else { msg.verb().expected_reply().unwrap_or(msg.verb()) };

        if is_hard_coded_role_exception(slug, msg.verb(), code) {
            return Ok(());
        }

        let rules = codes_by_dev_slug(slug);
        let known = rules.iter().any(|&(c, verbs)| c == code && verbs.contains(&expected_verb));
        if !known {
            if self.config.strict_mode {
                return Err(DispatchError::RoleInvalid {
                    addr,
                    code,
                    verb: msg.verb(),
                });
            }
            tracing::debug!(%addr, slug, %code, verb = %msg.verb(), "role table has no entry for this device/code/verb");
        }
        Ok(())
    }

    fn check_src_slug(&self, msg: &Message) -> Result<(), DispatchError> {
        self.check_role(msg.src(), msg, true)
    }

    fn check_dst_slug(&self, msg: &Message) -> Result<(), DispatchError> {
        if msg.dst().is_null() || msg.dst() == msg.src() {
            return Ok(());
        }
        self.check_role(msg.dst(), msg, false)
    }

    /// Step 4: deliver to the source entity's cache, and to the
    /// destination's too when it's distinct from the source.
    ///
    /// The source's "call_soon"-style deferred handler fan-out (so a
    /// handler may enqueue further work without reentering the dispatcher)
    /// is the Gateway's job once this is wired to a cooperative scheduler;
    /// `route` itself just applies the update.
    fn route(&self, registry: &mut Registry, msg: Message) {
        let src = msg.src();
        let dst = msg.dst();

        if let Some(entity) = registry.get_mut(EntityId::Device(src)) {
            entity.handle_msg(msg.clone());
        }
        if dst != src && !dst.is_null() {
            if let Some(entity) = registry.get_mut(EntityId::Device(dst)) {
                entity.handle_msg(msg);
            }
        }
    }
}

/// `I/000A` and `I/22C9` array payloads sometimes arrive split across two
/// packets from the same source within a few seconds; this is the
/// predicate the dispatcher uses to recognise the second packet as a
/// continuation rather than a fresh update.
pub fn detect_array_fragment(prev: &Message, this: &Message) -> bool {
    use chrono::Duration;
    use ramses_packet::Code;

    if !matches!(prev.code(), Code::_000A | Code::_22C9) || prev.code() != this.code() {
        return false;
    }
    if prev.verb() != Verb::I || this.verb() != Verb::I {
        return false;
    }
    if prev.src() != this.src() {
        return false;
    }
    this.dtm() < prev.dtm() + Duration::seconds(3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use ramses_packet::Packet;

    fn addr(s: &str) -> Address {
        Address::parse(s, false).unwrap()
    }

    fn at(secs: i64) -> chrono::DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn msg(frame: &str, secs: i64) -> Message {
        Message::build(Packet::from_frame(frame, at(secs)).unwrap()).unwrap()
    }

    #[test]
    fn rejects_heat_only_code_between_two_hgis() {
        let dispatcher = Dispatcher::new(DispatcherConfig::default());
        let mut registry = Registry::new();
        let m = msg(
            "045  I --- 18:013393 18:000730 --:------ 0001 005 00FFFF0200",
            0,
        );
        assert!(matches!(
            dispatcher.process(&mut registry, m),
            Err(DispatchError::PacketAddrSetInvalid { .. })
        ));
    }

    #[test]
    fn creates_src_and_dst_devices_and_routes_message() {
        let dispatcher = Dispatcher::new(DispatcherConfig::default());
        let mut registry = Registry::new();
        let m = msg(
            "045 RQ --- 18:000730 01:145038 --:------ 2309 001 00",
            0,
        );
        dispatcher.process(&mut registry, m).unwrap();
        assert!(registry.contains(EntityId::Device(addr("18:000730"))));
        assert!(registry.contains(EntityId::Device(addr("01:145038"))));
    }

    #[test]
    fn reduce_processing_dont_create_entities_skips_registry_growth() {
        let mut config = DispatcherConfig::default();
        config.reduce_processing = ReduceProcessing::DontCreateEntities;
        let dispatcher = Dispatcher::new(config);
        let mut registry = Registry::new();
        let m = msg(
            "045 RQ --- 18:000730 01:145038 --:------ 2309 001 00",
            0,
        );
        dispatcher.process(&mut registry, m).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn detect_array_fragment_matches_same_source_within_window() {
        let first = msg(
            "045  I --- 01:158182 --:------ 01:158182 000A 012 001201F409C4011001F409C4",
            0,
        );
        let second = msg(
            "045  I --- 01:158182 --:------ 01:158182 000A 012 021001F409C4031001F409C4",
            2,
        );
        assert!(detect_array_fragment(&first, &second));
    }

    #[test]
    fn detect_array_fragment_rejects_different_source() {
        let first = msg(
            "045  I --- 01:158182 --:------ 01:158182 000A 012 001201F409C4011001F409C4",
            0,
        );
        let second = msg(
            "045  I --- 02:111111 --:------ 02:111111 000A 012 021001F409C4031001F409C4",
            1,
        );
        assert!(!detect_array_fragment(&first, &second));
    }
}

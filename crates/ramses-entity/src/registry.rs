use crate::entity::{Entity, EntityId};
use ramses_address::Address;
use std::collections::HashMap;

/// The single owner of every entity. Arena-allocated by [`EntityId`]: a
/// zone's reference to its controller, or a controller's reference to its
/// zones, is a key into this map, never an owning Rust reference -- this
/// is how the source's `Device <-> System/Zone` cycle is broken up.
#[derive(Debug, Default)]
pub struct Registry {
    entities: HashMap<EntityId, Entity>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Resolve `id`, creating it if it doesn't exist yet. Returns whether
    /// the entity was newly created, alongside the entity itself.
    pub fn get_or_create(&mut self, id: EntityId) -> (&mut Entity, bool) {
        let created = !self.entities.contains_key(&id);
        let entity = self.entities.entry(id).or_insert_with(|| Entity::new(id));
        (entity, created)
    }

    pub fn devices(&self) -> impl Iterator<Item = &Entity> {
        self.entities
            .values()
            .filter(|e| matches!(e.id(), EntityId::Device(_)))
    }

    /// Every entity, mutably -- for sweeps that need to touch each one's
    /// cache in turn (e.g. expiring stale messages) regardless of kind.
    pub fn entities_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.values_mut()
    }

    /// Every zone entity currently registered under `ctl`.
    pub fn zones_of(&self, ctl: Address) -> impl Iterator<Item = &Entity> {
        self.entities
            .values()
            .filter(move |e| matches!(e.id(), EntityId::Zone { ctl: c, .. } if c == ctl))
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Address {
        Address::parse(s, false).unwrap()
    }

    #[test]
    fn get_or_create_only_creates_once() {
        let mut reg = Registry::new();
        let id = EntityId::Device(addr("01:145038"));
        let (_, created_first) = reg.get_or_create(id);
        assert!(created_first);
        let (_, created_second) = reg.get_or_create(id);
        assert!(!created_second);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn zones_of_filters_by_controller() {
        let mut reg = Registry::new();
        let ctl = addr("01:145038");
        let other_ctl = addr("01:200000");
        reg.get_or_create(EntityId::Zone { ctl, zone_idx: 0 });
        reg.get_or_create(EntityId::Zone { ctl, zone_idx: 1 });
        reg.get_or_create(EntityId::Zone {
            ctl: other_ctl,
            zone_idx: 0,
        });
        assert_eq!(reg.zones_of(ctl).count(), 2);
    }
}

//! A zone: the unit of broadcast and of object ownership.

use std::time::Duration;

use dashmap::DashMap;
use log::trace;
use tokio::sync::mpsc;

use super::objects::ObjectRegistry;
use super::{ActorId, ZoneId};
use crate::config::ZoneConfig;
use crate::protocol::{Outbound, RemovalAnimation};

/// Per-session outbound queue. Sends never block.
pub type Outbox = mpsc::UnboundedSender<Outbound>;

#[derive(Debug, Clone)]
pub struct ZoneRules {
    /// Drops are never expired here.
    pub everlast: bool,
    pub potion_allowed: bool,
    pub consume_cooldown: Duration,
}

impl Default for ZoneRules {
    fn default() -> Self {
        Self {
            everlast: false,
            potion_allowed: true,
            consume_cooldown: Duration::ZERO,
        }
    }
}

#[derive(Debug)]
pub struct Zone {
    pub id: ZoneId,
    pub name: String,
    pub rules: ZoneRules,
    pub objects: ObjectRegistry,
    members: DashMap<ActorId, Outbox>,
}

impl Zone {
    pub fn new(id: ZoneId, name: &str, rules: ZoneRules) -> Self {
        Self {
            id,
            name: name.to_string(),
            rules,
            objects: ObjectRegistry::new(),
            members: DashMap::new(),
        }
    }

    pub fn from_config(cfg: &ZoneConfig) -> Self {
        Self::new(
            cfg.id,
            &cfg.name,
            ZoneRules {
                everlast: cfg.everlast,
                potion_allowed: cfg.potion_allowed,
                consume_cooldown: Duration::from_secs(cfg.consume_cooldown_secs),
            },
        )
    }

    pub(crate) fn admit(&self, actor: ActorId, outbox: Outbox) {
        self.members.insert(actor, outbox);
    }

    /// Remove a member, handing back its outbox.
    pub(crate) fn depart(&self, actor: ActorId) -> Option<Outbox> {
        self.members.remove(&actor).map(|(_, outbox)| outbox)
    }

    pub fn contains(&self, actor: ActorId) -> bool {
        self.members.contains_key(&actor)
    }

    pub fn member_ids(&self) -> Vec<ActorId> {
        let mut ids: Vec<ActorId> = self.members.iter().map(|e| *e.key()).collect();
        ids.sort_unstable();
        ids
    }

    pub fn population(&self) -> usize {
        self.members.len()
    }

    /// Whisper to one member. Returns false if the actor is not here or its
    /// session has gone away.
    pub fn send_to(&self, actor: ActorId, message: Outbound) -> bool {
        match self.members.get(&actor) {
            Some(outbox) => outbox.send(message).is_ok(),
            None => false,
        }
    }

    /// Fire-and-forget to every member except `except`. Returns the number of
    /// queues the message reached.
    pub fn broadcast(&self, message: &Outbound, except: Option<ActorId>) -> usize {
        let mut delivered = 0;
        for entry in self.members.iter() {
            if Some(*entry.key()) == except {
                continue;
            }
            if entry.value().send(message.clone()).is_ok() {
                delivered += 1;
            }
        }
        trace!(
            target: "fieldhost::net",
            "zone {} broadcast opcode {:#06x} to {} member(s)",
            self.id,
            message.opcode(),
            delivered
        );
        delivered
    }

    /// Retire a drop through the expiry path and announce it.
    pub fn expire_object(&self, object_id: u32) -> bool {
        if self.rules.everlast || !self.objects.expire(object_id) {
            return false;
        }
        self.broadcast(
            &Outbound::DropRemoved {
                object_id,
                animation: RemovalAnimation::Expire,
                actor: 0,
                companion_slot: None,
            },
            None,
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::objects::DropSpec;

    #[test]
    fn broadcast_skips_excluded_member() {
        let zone = Zone::new(1, "Test", ZoneRules::default());
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        zone.admit(1, tx_a);
        zone.admit(2, tx_b);
        assert_eq!(zone.member_ids(), vec![1, 2]);
        assert_eq!(zone.population(), 2);

        assert_eq!(zone.broadcast(&Outbound::EnableActions, Some(1)), 1);
        assert!(rx_a.try_recv().is_err());
        assert_eq!(rx_b.try_recv().ok(), Some(Outbound::EnableActions));

        assert!(zone.send_to(1, Outbound::InventoryFull));
        assert_eq!(rx_a.try_recv().ok(), Some(Outbound::InventoryFull));
        assert!(!zone.send_to(3, Outbound::InventoryFull));
    }

    #[test]
    fn depart_returns_outbox() {
        let zone = Zone::new(1, "Test", ZoneRules::default());
        let (tx, _rx) = mpsc::unbounded_channel();
        zone.admit(5, tx);
        assert!(zone.contains(5));
        assert!(zone.depart(5).is_some());
        assert!(!zone.contains(5));
        assert!(zone.depart(5).is_none());
    }

    #[test]
    fn everlast_zone_keeps_drops() {
        let zone = Zone::new(
            1,
            "Vault",
            ZoneRules {
                everlast: true,
                ..ZoneRules::default()
            },
        );
        let obj = zone.objects.spawn(DropSpec::meso(5, 1));
        assert!(!zone.expire_object(obj.id));
        assert!(zone.objects.find(obj.id).is_some());
    }
}

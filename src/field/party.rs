//! Party membership. A party is independent of zones: members may be spread
//! across the world, and only those standing in the claim's zone share loot.

use std::sync::atomic::{AtomicU32, Ordering};

use dashmap::DashMap;

use super::{ActorId, PartyId};

#[derive(Debug)]
pub struct PartyRegistry {
    next_id: AtomicU32,
    parties: DashMap<PartyId, Vec<ActorId>>,
}

impl Default for PartyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PartyRegistry {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU32::new(1),
            parties: DashMap::new(),
        }
    }

    pub fn create(&self, leader: ActorId) -> PartyId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.parties.insert(id, vec![leader]);
        id
    }

    /// Returns false if the party does not exist.
    pub fn join(&self, party: PartyId, actor: ActorId) -> bool {
        match self.parties.get_mut(&party) {
            Some(mut members) => {
                if !members.contains(&actor) {
                    members.push(actor);
                }
                true
            }
            None => false,
        }
    }

    /// Remove a member; the party is disbanded when it empties.
    pub fn leave(&self, party: PartyId, actor: ActorId) {
        let now_empty = match self.parties.get_mut(&party) {
            Some(mut members) => {
                members.retain(|m| *m != actor);
                members.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.parties.remove(&party);
        }
    }

    pub fn members(&self, party: PartyId) -> Vec<ActorId> {
        self.parties
            .get(&party)
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    pub fn is_member(&self, party: PartyId, actor: ActorId) -> bool {
        self.parties
            .get(&party)
            .map(|m| m.contains(&actor))
            .unwrap_or(false)
    }
}

//! Live player state.
//!
//! An [`Actor`] is shared between its session task and whoever else needs to
//! touch it (party splits, broadcasts). Mutable state sits behind one mutex;
//! the lock is held only for short, non-blocking updates.

use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use super::companion::Companion;
use super::services::ActorProfile;
use super::{ActorId, PartyId, ZoneId};
use crate::protocol::Position;

#[derive(Debug, Clone)]
pub struct ActorState {
    pub zone: Option<ZoneId>,
    pub party: Option<PartyId>,
    pub meso: u64,
    pub party_bonus: bool,
    pub alive: bool,
    pub potion_sealed: bool,
    pub position: Position,
    /// Active companions; the index is the companion slot.
    pub companions: Vec<Companion>,
    /// Companions owned but not currently summoned, keyed by cash slot.
    pub stabled: Vec<Companion>,
    pub last_client_tick: u32,
    /// Earliest instant the next auto-potion may fire.
    pub next_consume: Option<Instant>,
}

#[derive(Debug)]
pub struct Actor {
    pub id: ActorId,
    pub name: String,
    state: Mutex<ActorState>,
}

impl Actor {
    pub fn new(id: ActorId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            state: Mutex::new(ActorState {
                zone: None,
                party: None,
                meso: 0,
                party_bonus: false,
                alive: true,
                potion_sealed: false,
                position: Position::default(),
                companions: Vec::new(),
                stabled: Vec::new(),
                last_client_tick: 0,
                next_consume: None,
            }),
        }
    }

    pub fn from_profile(profile: &ActorProfile) -> Self {
        let actor = Self::new(profile.id, &profile.name);
        {
            let mut state = actor.state();
            state.meso = profile.meso;
            state.party_bonus = profile.party_bonus;
        }
        actor
    }

    /// Lock the mutable state. Never hold this while acquiring an object's
    /// claim guard.
    pub fn state(&self) -> MutexGuard<'_, ActorState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> ActorState {
        self.state().clone()
    }

    pub fn zone(&self) -> Option<ZoneId> {
        self.state().zone
    }

    pub fn party(&self) -> Option<PartyId> {
        self.state().party
    }

    pub fn meso(&self) -> u64 {
        self.state().meso
    }

    pub fn has_party_bonus(&self) -> bool {
        self.state().party_bonus
    }

    /// Credit currency, saturating. Returns the new balance.
    pub fn gain_meso(&self, amount: u64) -> u64 {
        let mut state = self.state();
        state.meso = state.meso.saturating_add(amount);
        state.meso
    }

    pub fn record_tick(&self, tick: u32) {
        self.state().last_client_tick = tick;
    }

    /// Run `f` against the active companion in `slot`, if there is one.
    pub fn with_companion<R>(&self, slot: u32, f: impl FnOnce(&mut Companion) -> R) -> Option<R> {
        let mut state = self.state();
        let index = usize::try_from(slot).ok()?;
        state.companions.get_mut(index).map(f)
    }

    pub fn companion(&self, slot: u32) -> Option<Companion> {
        self.with_companion(slot, |c| c.clone())
    }

    /// Slot of the active companion backed by `item_id`.
    pub fn companion_slot_for_item(&self, item_id: u32) -> Option<u8> {
        self.state()
            .companions
            .iter()
            .position(|c| c.item_id == item_id)
            .and_then(|i| u8::try_from(i).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_profile_copies_balance() {
        let actor = Actor::from_profile(&ActorProfile {
            id: 7,
            name: "Ada".into(),
            zone: 100,
            meso: 500,
            party_bonus: true,
        });
        assert_eq!(actor.meso(), 500);
        assert!(actor.has_party_bonus());
        assert_eq!(actor.zone(), None);
    }

    #[test]
    fn gain_meso_saturates() {
        let actor = Actor::new(1, "Ada");
        actor.state().meso = u64::MAX - 1;
        assert_eq!(actor.gain_meso(10), u64::MAX);
    }

    #[test]
    fn companion_lookup_by_slot() {
        let actor = Actor::new(1, "Ada");
        actor
            .state()
            .companions
            .push(Companion::new(5000000, 3, "Mochi"));
        assert_eq!(actor.with_companion(0, |c| c.cash_slot), Some(3));
        assert!(actor.companion(1).is_none());
        assert_eq!(actor.companion_slot_for_item(5000000), Some(0));
    }
}

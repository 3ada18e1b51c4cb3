//! # Field Runtime
//!
//! Shared world state: zones, the actors standing in them, the drops lying in
//! them, and the parties that split loot.
//!
//! ## Locking
//!
//! - Every [`WorldObject`] has its own claim guard; arbitration holds exactly
//!   one at a time.
//! - Every [`Actor`] has a state mutex; it may be taken while a claim guard is
//!   held, never the other way round, and only one actor at a time.
//! - Outbound messages go through unbounded channels, so nothing blocks on the
//!   network while a lock is held.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use fieldhost::config::Config;
//! use fieldhost::field::{memory, services, DropSpec, Services, World};
//!
//! let config = Config::default();
//! let services = Services {
//!     inventory: Arc::new(memory::MemoryInventory::default()),
//!     catalog: Arc::new(memory::StaticCatalog::default()),
//!     effects: Arc::new(memory::StaticCatalog::default()),
//!     random: Arc::new(services::ThreadRandom),
//!     characters: Arc::new(memory::MemoryDirectory::auto_create(config.default_zone)),
//! };
//! let world = World::new(config, services);
//! let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
//! let actor = world.enter(1, 1, tx).unwrap();
//! world.spawn_drop(100, DropSpec::meso(50, actor.id)).unwrap();
//! ```

pub mod actor;
pub mod arbitration;
pub mod companion;
pub mod errors;
pub mod memory;
pub mod objects;
pub mod party;
pub mod rewards;
pub mod services;
pub mod zone;

use std::sync::Arc;

use dashmap::DashMap;
use log::{debug, info};

pub use actor::{Actor, ActorState};
pub use arbitration::{claim, ClaimOutcome, ClaimReport, ClaimVia, Delivery};
pub use companion::{Companion, CompanionCommand};
pub use errors::FieldError;
pub use objects::{DropOrigin, DropPayload, DropSpec, ObjectRegistry, PickupPolicy, WorldObject};
pub use party::PartyRegistry;
pub use rewards::{split_currency, SplitPlan};
pub use services::{ItemStack, Services};
pub use zone::{Outbox, Zone, ZoneRules};

use crate::config::Config;

pub type ActorId = u32;
pub type ObjectId = u32;
pub type ZoneId = u32;
pub type PartyId = u32;
pub type SessionId = u32;

/// Everything one field server hosts.
pub struct World {
    config: Arc<Config>,
    services: Services,
    zones: DashMap<ZoneId, Arc<Zone>>,
    actors: DashMap<ActorId, Arc<Actor>>,
    /// Session currently driving each online actor.
    owners: DashMap<ActorId, SessionId>,
    parties: PartyRegistry,
}

impl World {
    pub fn new(config: Config, services: Services) -> Self {
        let zones = DashMap::new();
        for zone_cfg in &config.zones {
            zones.insert(zone_cfg.id, Arc::new(Zone::from_config(zone_cfg)));
        }
        Self {
            config: Arc::new(config),
            services,
            zones,
            actors: DashMap::new(),
            owners: DashMap::new(),
            parties: PartyRegistry::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn parties(&self) -> &PartyRegistry {
        &self.parties
    }

    pub fn zone(&self, id: ZoneId) -> Option<Arc<Zone>> {
        self.zones.get(&id).map(|z| Arc::clone(z.value()))
    }

    pub fn zone_ids(&self) -> Vec<ZoneId> {
        let mut ids: Vec<ZoneId> = self.zones.iter().map(|z| *z.key()).collect();
        ids.sort_unstable();
        ids
    }

    pub fn actor(&self, id: ActorId) -> Option<Arc<Actor>> {
        self.actors.get(&id).map(|a| Arc::clone(a.value()))
    }

    pub fn online(&self) -> usize {
        self.actors.len()
    }

    /// Bring an actor online under `session` and place it in its zone,
    /// delivering zone traffic to `outbox`. An actor already online is taken
    /// over: `session` becomes its owner and the new outbox replaces the old.
    pub fn enter(
        &self,
        actor_id: ActorId,
        session: SessionId,
        outbox: Outbox,
    ) -> Result<Arc<Actor>, FieldError> {
        let (actor, target) = match self.actor(actor_id) {
            Some(actor) => {
                let zone = actor.zone().unwrap_or(self.config.default_zone);
                (actor, zone)
            }
            None => {
                let profile = self
                    .services
                    .characters
                    .load(actor_id)
                    .ok_or(FieldError::ActorNotFound(actor_id))?;
                let zone = if self.zones.contains_key(&profile.zone) {
                    profile.zone
                } else {
                    self.config.default_zone
                };
                let actor = Arc::new(Actor::from_profile(&profile));
                self.actors.insert(actor_id, Arc::clone(&actor));
                (actor, zone)
            }
        };
        self.place(&actor, target, outbox)?;
        if let Some(previous) = self.owners.insert(actor_id, session) {
            if previous != session {
                info!("actor {} taken over by session {} from {}", actor_id, session, previous);
            }
        }
        info!("actor {} ({}) entered zone {}", actor.id, actor.name, target);
        Ok(actor)
    }

    /// Move an online actor to another zone, keeping its outbox.
    pub fn transfer(&self, actor_id: ActorId, to: ZoneId) -> Result<(), FieldError> {
        let actor = self
            .actor(actor_id)
            .ok_or(FieldError::ActorNotFound(actor_id))?;
        let from = actor.zone().ok_or(FieldError::ActorNotFound(actor_id))?;
        let outbox = self
            .zone(from)
            .and_then(|z| z.depart(actor_id))
            .ok_or(FieldError::ActorNotFound(actor_id))?;
        self.place(&actor, to, outbox)?;
        debug!("actor {} moved from zone {} to {}", actor_id, from, to);
        Ok(())
    }

    /// Old zone releases the actor before the new zone admits it.
    fn place(&self, actor: &Actor, to: ZoneId, outbox: Outbox) -> Result<(), FieldError> {
        let target = self.zone(to).ok_or(FieldError::ZoneNotFound(to))?;
        let mut state = actor.state();
        if let Some(previous) = state.zone.take() {
            if let Some(zone) = self.zone(previous) {
                zone.depart(actor.id);
            }
        }
        target.admit(actor.id, outbox);
        state.zone = Some(to);
        Ok(())
    }

    pub fn owner(&self, actor_id: ActorId) -> Option<SessionId> {
        self.owners.get(&actor_id).map(|s| *s.value())
    }

    pub fn owns(&self, actor_id: ActorId, session: SessionId) -> bool {
        self.owner(actor_id) == Some(session)
    }

    /// Take the actor offline if `session` still owns it. A session that has
    /// been superseded releases nothing. Returns true when the actor left.
    pub fn release(&self, actor_id: ActorId, session: SessionId) -> bool {
        if self
            .owners
            .remove_if(&actor_id, |_, owner| *owner == session)
            .is_none()
        {
            debug!("session {} no longer owns actor {}", session, actor_id);
            return false;
        }
        self.leave(actor_id);
        true
    }

    /// Take an actor offline regardless of owner. Party membership survives.
    pub fn leave(&self, actor_id: ActorId) {
        self.owners.remove(&actor_id);
        let Some((_, actor)) = self.actors.remove(&actor_id) else {
            return;
        };
        let zone = actor.state().zone.take();
        if let Some(zone) = zone.and_then(|z| self.zone(z)) {
            zone.depart(actor_id);
        }
        info!("actor {} left the field", actor_id);
    }

    pub fn form_party(&self, leader: ActorId) -> Result<PartyId, FieldError> {
        let actor = self.actor(leader).ok_or(FieldError::ActorNotFound(leader))?;
        let party = self.parties.create(leader);
        actor.state().party = Some(party);
        Ok(party)
    }

    pub fn join_party(&self, party: PartyId, actor_id: ActorId) -> Result<(), FieldError> {
        let actor = self
            .actor(actor_id)
            .ok_or(FieldError::ActorNotFound(actor_id))?;
        if !self.parties.join(party, actor_id) {
            return Err(FieldError::Internal(format!("party {} does not exist", party)));
        }
        actor.state().party = Some(party);
        Ok(())
    }

    pub fn leave_party(&self, actor_id: ActorId) {
        let Some(actor) = self.actor(actor_id) else {
            return;
        };
        let party = actor.state().party.take();
        if let Some(party) = party {
            self.parties.leave(party, actor_id);
        }
    }

    pub fn spawn_drop(&self, zone: ZoneId, spec: DropSpec) -> Result<Arc<WorldObject>, FieldError> {
        let zone = self.zone(zone).ok_or(FieldError::ZoneNotFound(zone))?;
        Ok(zone.objects.spawn(spec))
    }
}

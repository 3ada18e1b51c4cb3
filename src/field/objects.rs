//! Drops lying in a zone and the per-zone registry that owns them.
//!
//! Every [`WorldObject`] carries its own claim guard. The descriptive fields
//! never change after spawn, so lookups need no lock. The only mutable bit is
//! the picked-up flag, and it is read and written exclusively through a
//! [`ClaimGuard`].

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use dashmap::DashMap;

use super::services::ItemStack;
use super::{ActorId, ObjectId};
use crate::protocol::Position;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropPayload {
    Meso(u64),
    Item(ItemStack),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOrigin {
    Monster,
    Player,
    Environment,
}

/// Who may claim a monster or environment drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PickupPolicy {
    OwnerOnly = 0,
    Party = 1,
    FreeForAll = 2,
    Explosive = 3,
}

/// Everything needed to spawn a drop; the registry assigns the id.
#[derive(Debug, Clone)]
pub struct DropSpec {
    pub payload: DropPayload,
    pub origin: DropOrigin,
    pub policy: PickupPolicy,
    pub owner: ActorId,
    pub position: Position,
}

impl DropSpec {
    pub fn meso(amount: u64, owner: ActorId) -> Self {
        Self {
            payload: DropPayload::Meso(amount),
            origin: DropOrigin::Monster,
            policy: PickupPolicy::OwnerOnly,
            owner,
            position: Position::default(),
        }
    }

    pub fn item(stack: ItemStack, owner: ActorId) -> Self {
        Self {
            payload: DropPayload::Item(stack),
            origin: DropOrigin::Monster,
            policy: PickupPolicy::OwnerOnly,
            owner,
            position: Position::default(),
        }
    }

    pub fn origin(mut self, origin: DropOrigin) -> Self {
        self.origin = origin;
        self
    }

    pub fn policy(mut self, policy: PickupPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn at(mut self, position: Position) -> Self {
        self.position = position;
        self
    }
}

#[derive(Debug, Default)]
struct ClaimState {
    picked_up: bool,
}

#[derive(Debug)]
pub struct WorldObject {
    pub id: ObjectId,
    pub payload: DropPayload,
    pub origin: DropOrigin,
    pub policy: PickupPolicy,
    pub owner: ActorId,
    pub position: Position,
    pub spawned_at: Instant,
    claim: Mutex<ClaimState>,
}

/// Held for the whole decide-and-mutate step of a claim.
pub struct ClaimGuard<'a> {
    state: MutexGuard<'a, ClaimState>,
}

impl ClaimGuard<'_> {
    pub fn is_picked_up(&self) -> bool {
        self.state.picked_up
    }

    pub fn mark_picked_up(&mut self) {
        self.state.picked_up = true;
    }
}

impl WorldObject {
    fn new(id: ObjectId, spec: DropSpec) -> Self {
        Self {
            id,
            payload: spec.payload,
            origin: spec.origin,
            policy: spec.policy,
            owner: spec.owner,
            position: spec.position,
            spawned_at: Instant::now(),
            claim: Mutex::new(ClaimState::default()),
        }
    }

    /// Acquire this object's claim guard.
    pub fn lock(&self) -> ClaimGuard<'_> {
        ClaimGuard {
            state: self
                .claim
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        }
    }

    /// Unguarded peek; only a hint, re-check under [`WorldObject::lock`].
    pub fn is_picked_up(&self) -> bool {
        self.lock().is_picked_up()
    }

    pub fn is_player_drop(&self) -> bool {
        self.origin == DropOrigin::Player
    }

    pub fn item_id(&self) -> Option<u32> {
        match &self.payload {
            DropPayload::Item(stack) => Some(stack.item_id),
            DropPayload::Meso(_) => None,
        }
    }

    /// Policy in force at `now`. With a non-zero `window`, owner-only and
    /// party drops open to everyone once the window has elapsed.
    pub fn effective_policy(&self, now: Instant, window: Duration) -> PickupPolicy {
        let lapsed = !window.is_zero() && now.saturating_duration_since(self.spawned_at) >= window;
        match self.policy {
            PickupPolicy::OwnerOnly | PickupPolicy::Party if lapsed => PickupPolicy::FreeForAll,
            other => other,
        }
    }
}

/// Live drops of one zone.
#[derive(Debug)]
pub struct ObjectRegistry {
    next_id: AtomicU32,
    objects: DashMap<ObjectId, Arc<WorldObject>>,
}

impl Default for ObjectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU32::new(1),
            objects: DashMap::new(),
        }
    }

    /// Insert a drop under a fresh id. Ids are never reused within the
    /// registry's lifetime.
    pub fn spawn(&self, spec: DropSpec) -> Arc<WorldObject> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let object = Arc::new(WorldObject::new(id, spec));
        self.objects.insert(id, Arc::clone(&object));
        object
    }

    pub fn find(&self, id: ObjectId) -> Option<Arc<WorldObject>> {
        self.objects.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    /// Drop the entry. Callers must hold the object's guard with the
    /// picked-up flag already set.
    pub(crate) fn remove(&self, id: ObjectId) -> Option<Arc<WorldObject>> {
        self.objects.remove(&id).map(|(_, object)| object)
    }

    /// Expiry hook: retire the object unless a claim got there first.
    /// Returns true when this call removed it.
    pub fn expire(&self, id: ObjectId) -> bool {
        let Some(object) = self.find(id) else {
            return false;
        };
        let mut guard = object.lock();
        if guard.is_picked_up() {
            return false;
        }
        guard.mark_picked_up();
        self.remove(id);
        true
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn ids(&self) -> Vec<ObjectId> {
        let mut ids: Vec<ObjectId> = self.objects.iter().map(|e| *e.key()).collect();
        ids.sort_unstable();
        ids
    }
}

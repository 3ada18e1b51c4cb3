//! Narrow interfaces to the collaborators the field runtime does not own:
//! inventory storage, item metadata, item effects, randomness and the
//! character directory.
//!
//! In-memory implementations live in [`super::memory`]; production deployments
//! plug in their own.

use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::companion::CompanionCommand;
use super::errors::FieldError;
use super::{ActorId, ZoneId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InventoryKind {
    Equip,
    Use,
    Setup,
    Etc,
    Cash,
}

impl InventoryKind {
    /// Tab an item id belongs to (leading digit of a 7-digit id).
    pub fn for_item(item_id: u32) -> Self {
        match item_id / 1_000_000 {
            1 => InventoryKind::Equip,
            2 => InventoryKind::Use,
            3 => InventoryKind::Setup,
            5 => InventoryKind::Cash,
            _ => InventoryKind::Etc,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub item_id: u32,
    pub quantity: u16,
    /// Name tag restricting who may hold the item, if any.
    #[serde(default)]
    pub owner_tag: Option<String>,
}

impl ItemStack {
    pub fn new(item_id: u32, quantity: u16) -> Self {
        Self {
            item_id,
            quantity,
            owner_tag: None,
        }
    }
}

/// Character inventory storage. Capacity-bounded and fallible.
pub trait Inventory: Send + Sync {
    fn item_at(&self, actor: ActorId, kind: InventoryKind, slot: u16) -> Option<ItemStack>;

    /// Remove `quantity` of `item_id` from the given tab.
    fn remove_item(
        &self,
        actor: ActorId,
        kind: InventoryKind,
        item_id: u32,
        quantity: u16,
    ) -> Result<(), FieldError>;

    fn remove_from_slot(
        &self,
        actor: ActorId,
        kind: InventoryKind,
        slot: u16,
        quantity: u16,
    ) -> Result<(), FieldError>;

    fn check_capacity(&self, actor: ActorId, stack: &ItemStack) -> bool;

    /// Insert a stack claimed from the field.
    fn insert_from_claim(
        &self,
        actor: ActorId,
        stack: &ItemStack,
        from_monster: bool,
    ) -> Result<(), FieldError>;
}

/// Read-only item metadata.
pub trait ItemCatalog: Send + Sync {
    fn is_pickup_blocked(&self, item_id: u32) -> bool;

    /// Category band, `item_id / 10000` unless the catalog says otherwise.
    fn category(&self, item_id: u32) -> u32 {
        item_id / 10_000
    }

    /// Fullness restored when a companion eats this item.
    fn food_fullness(&self, item_id: u32) -> Option<u8>;

    fn companion_command(&self, companion_item: u32, command: u8) -> Option<CompanionCommand>;

    fn companion_name(&self, companion_item: u32) -> Option<String>;
}

/// Item effects applied to an actor.
pub trait ItemEffects: Send + Sync {
    /// Consume the item the moment it is picked up (buff orbs, cards).
    /// Returns true when consumed and nothing should enter the inventory.
    fn use_on_pickup(&self, actor: ActorId, item_id: u32) -> bool;

    /// Apply a consumable from the inventory. Returns true if it took effect.
    fn apply(&self, actor: ActorId, item_id: u32) -> bool;
}

/// Uniform integer source.
pub trait RandomSource: Send + Sync {
    /// Draw uniformly from `[0, bound)`. `bound` of 0 yields 0.
    fn next_below(&self, bound: u32) -> u32;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_below(&self, bound: u32) -> u32 {
        if bound == 0 {
            return 0;
        }
        rand::thread_rng().gen_range(0..bound)
    }
}

/// Always returns the same value, clamped below the bound.
#[derive(Debug, Clone, Copy)]
pub struct FixedRandom(pub u32);

impl RandomSource for FixedRandom {
    fn next_below(&self, bound: u32) -> u32 {
        if bound == 0 {
            return 0;
        }
        self.0.min(bound - 1)
    }
}

/// What the character directory knows about an actor before it enters a zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorProfile {
    pub id: ActorId,
    pub name: String,
    pub zone: ZoneId,
    pub meso: u64,
    #[serde(default)]
    pub party_bonus: bool,
}

pub trait CharacterDirectory: Send + Sync {
    fn load(&self, actor: ActorId) -> Option<ActorProfile>;
}

/// Bundle of collaborators handed to the world.
#[derive(Clone)]
pub struct Services {
    pub inventory: Arc<dyn Inventory>,
    pub catalog: Arc<dyn ItemCatalog>,
    pub effects: Arc<dyn ItemEffects>,
    pub random: Arc<dyn RandomSource>,
    pub characters: Arc<dyn CharacterDirectory>,
}

impl Services {
    /// Draw in `[0, 99]`.
    pub fn roll_percent(&self) -> u32 {
        self.random.next_below(100)
    }
}

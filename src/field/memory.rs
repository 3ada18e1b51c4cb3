//! In-memory collaborators used by the bundled server and by tests.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use super::companion::CompanionCommand;
use super::errors::FieldError;
use super::services::{
    ActorProfile, CharacterDirectory, Inventory, InventoryKind, ItemCatalog, ItemEffects,
    ItemStack,
};
use super::{ActorId, ZoneId};

const DEFAULT_SLOTS_PER_TAB: u16 = 24;
const DEFAULT_STACK_LIMIT: u16 = 100;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Slot-based inventory. Slots are 1-based like the client's.
pub struct MemoryInventory {
    slots_per_tab: u16,
    stack_limit: u16,
    tabs: Mutex<HashMap<(ActorId, InventoryKind), Vec<Option<ItemStack>>>>,
}

impl Default for MemoryInventory {
    fn default() -> Self {
        Self::new(DEFAULT_SLOTS_PER_TAB)
    }
}

impl MemoryInventory {
    pub fn new(slots_per_tab: u16) -> Self {
        Self {
            slots_per_tab,
            stack_limit: DEFAULT_STACK_LIMIT,
            tabs: Mutex::new(HashMap::new()),
        }
    }

    fn limit_for(&self, item_id: u32) -> u16 {
        match InventoryKind::for_item(item_id) {
            InventoryKind::Equip | InventoryKind::Cash => 1,
            _ => self.stack_limit,
        }
    }

    /// Place a stack at a specific slot, replacing whatever was there.
    pub fn put(
        &self,
        actor: ActorId,
        kind: InventoryKind,
        slot: u16,
        stack: ItemStack,
    ) -> Result<(), FieldError> {
        if slot == 0 || slot > self.slots_per_tab {
            return Err(FieldError::InvalidSlot(slot));
        }
        let mut tabs = lock(&self.tabs);
        let tab = tabs
            .entry((actor, kind))
            .or_insert_with(|| vec![None; self.slots_per_tab as usize]);
        tab[slot as usize - 1] = Some(stack);
        Ok(())
    }

    /// Total quantity of `item_id` the actor holds across all tabs.
    pub fn count(&self, actor: ActorId, item_id: u32) -> u32 {
        lock(&self.tabs)
            .iter()
            .filter(|((owner, _), _)| *owner == actor)
            .flat_map(|(_, tab)| tab.iter().flatten())
            .filter(|s| s.item_id == item_id)
            .map(|s| u32::from(s.quantity))
            .sum()
    }

    fn room_for(&self, tab: Option<&Vec<Option<ItemStack>>>, item_id: u32) -> u32 {
        let limit = self.limit_for(item_id);
        match tab {
            None => u32::from(self.slots_per_tab) * u32::from(limit),
            Some(tab) => tab
                .iter()
                .map(|slot| match slot {
                    None => u32::from(limit),
                    Some(s) if s.item_id == item_id => u32::from(limit.saturating_sub(s.quantity)),
                    Some(_) => 0,
                })
                .sum(),
        }
    }
}

impl Inventory for MemoryInventory {
    fn item_at(&self, actor: ActorId, kind: InventoryKind, slot: u16) -> Option<ItemStack> {
        if slot == 0 {
            return None;
        }
        lock(&self.tabs)
            .get(&(actor, kind))
            .and_then(|tab| tab.get(slot as usize - 1).cloned().flatten())
    }

    fn remove_item(
        &self,
        actor: ActorId,
        kind: InventoryKind,
        item_id: u32,
        quantity: u16,
    ) -> Result<(), FieldError> {
        let mut tabs = lock(&self.tabs);
        let tab = tabs
            .get_mut(&(actor, kind))
            .ok_or(FieldError::ItemNotFound(item_id))?;
        let held: u32 = tab
            .iter()
            .flatten()
            .filter(|s| s.item_id == item_id)
            .map(|s| u32::from(s.quantity))
            .sum();
        if held < u32::from(quantity) {
            return Err(FieldError::ItemNotFound(item_id));
        }
        let mut left = quantity;
        for slot in tab.iter_mut() {
            if left == 0 {
                break;
            }
            let Some(stack) = slot.as_mut() else {
                continue;
            };
            if stack.item_id != item_id {
                continue;
            }
            let take = left.min(stack.quantity);
            stack.quantity -= take;
            left -= take;
            if stack.quantity == 0 {
                *slot = None;
            }
        }
        Ok(())
    }

    fn remove_from_slot(
        &self,
        actor: ActorId,
        kind: InventoryKind,
        slot: u16,
        quantity: u16,
    ) -> Result<(), FieldError> {
        if slot == 0 || slot > self.slots_per_tab {
            return Err(FieldError::InvalidSlot(slot));
        }
        let mut tabs = lock(&self.tabs);
        let cell = tabs
            .get_mut(&(actor, kind))
            .and_then(|tab| tab.get_mut(slot as usize - 1))
            .ok_or(FieldError::InvalidSlot(slot))?;
        let stack = cell.as_mut().ok_or(FieldError::InvalidSlot(slot))?;
        if stack.quantity < quantity {
            return Err(FieldError::ItemNotFound(stack.item_id));
        }
        stack.quantity -= quantity;
        if stack.quantity == 0 {
            *cell = None;
        }
        Ok(())
    }

    fn check_capacity(&self, actor: ActorId, stack: &ItemStack) -> bool {
        let kind = InventoryKind::for_item(stack.item_id);
        let tabs = lock(&self.tabs);
        self.room_for(tabs.get(&(actor, kind)), stack.item_id) >= u32::from(stack.quantity)
    }

    fn insert_from_claim(
        &self,
        actor: ActorId,
        stack: &ItemStack,
        _from_monster: bool,
    ) -> Result<(), FieldError> {
        let kind = InventoryKind::for_item(stack.item_id);
        let limit = self.limit_for(stack.item_id);
        let mut tabs = lock(&self.tabs);
        if self.room_for(tabs.get(&(actor, kind)), stack.item_id) < u32::from(stack.quantity) {
            return Err(FieldError::CapacityExhausted);
        }
        let tab = tabs
            .entry((actor, kind))
            .or_insert_with(|| vec![None; self.slots_per_tab as usize]);
        let mut left = stack.quantity;
        for slot in tab.iter_mut().flatten() {
            if left == 0 {
                break;
            }
            if slot.item_id == stack.item_id && slot.quantity < limit {
                let add = left.min(limit - slot.quantity);
                slot.quantity += add;
                left -= add;
            }
        }
        for slot in tab.iter_mut() {
            if left == 0 {
                break;
            }
            if slot.is_none() {
                let add = left.min(limit);
                *slot = Some(ItemStack {
                    item_id: stack.item_id,
                    quantity: add,
                    owner_tag: stack.owner_tag.clone(),
                });
                left -= add;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub pickup_blocked: bool,
    /// Fullness restored when fed to a companion.
    #[serde(default)]
    pub fullness: Option<u8>,
    #[serde(default)]
    pub consume_on_pickup: bool,
    #[serde(default)]
    pub usable: bool,
}

/// Item catalog loaded from JSON:
///
/// ```json
/// {
///   "items": { "2120000": { "name": "Pet Food", "fullness": 30 } },
///   "commands": { "5000000": { "1": { "probability": 70, "increase": 1 } } }
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticCatalog {
    #[serde(default)]
    pub items: HashMap<u32, ItemInfo>,
    #[serde(default)]
    pub commands: HashMap<u32, HashMap<u8, CompanionCommand>>,
}

impl StaticCatalog {
    pub async fn load(path: &str) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read catalog {}: {}", path, e))?;
        Self::from_json(&content).map_err(|e| anyhow!("Failed to parse catalog {}: {}", path, e))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn with_item(mut self, item_id: u32, info: ItemInfo) -> Self {
        self.items.insert(item_id, info);
        self
    }

    pub fn with_command(mut self, companion_item: u32, command: u8, entry: CompanionCommand) -> Self {
        self.commands
            .entry(companion_item)
            .or_default()
            .insert(command, entry);
        self
    }
}

impl ItemCatalog for StaticCatalog {
    fn is_pickup_blocked(&self, item_id: u32) -> bool {
        self.items
            .get(&item_id)
            .map(|i| i.pickup_blocked)
            .unwrap_or(false)
    }

    fn food_fullness(&self, item_id: u32) -> Option<u8> {
        self.items.get(&item_id).and_then(|i| i.fullness)
    }

    fn companion_command(&self, companion_item: u32, command: u8) -> Option<CompanionCommand> {
        self.commands
            .get(&companion_item)
            .and_then(|table| table.get(&command))
            .copied()
    }

    fn companion_name(&self, companion_item: u32) -> Option<String> {
        self.items
            .get(&companion_item)
            .map(|i| i.name.clone())
            .filter(|n| !n.is_empty())
    }
}

impl ItemEffects for StaticCatalog {
    fn use_on_pickup(&self, _actor: ActorId, item_id: u32) -> bool {
        self.items
            .get(&item_id)
            .map(|i| i.consume_on_pickup)
            .unwrap_or(false)
    }

    fn apply(&self, _actor: ActorId, item_id: u32) -> bool {
        self.items.get(&item_id).map(|i| i.usable).unwrap_or(false)
    }
}

/// Character directory backed by a map. With `auto_zone` set, unknown ids get
/// a fresh profile in that zone instead of failing.
#[derive(Default)]
pub struct MemoryDirectory {
    profiles: Mutex<HashMap<ActorId, ActorProfile>>,
    auto_zone: Option<ZoneId>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn auto_create(zone: ZoneId) -> Self {
        Self {
            profiles: Mutex::new(HashMap::new()),
            auto_zone: Some(zone),
        }
    }

    pub fn insert(&self, profile: ActorProfile) {
        lock(&self.profiles).insert(profile.id, profile);
    }
}

impl CharacterDirectory for MemoryDirectory {
    fn load(&self, actor: ActorId) -> Option<ActorProfile> {
        let mut profiles = lock(&self.profiles);
        if let Some(p) = profiles.get(&actor) {
            return Some(p.clone());
        }
        let zone = self.auto_zone?;
        let profile = ActorProfile {
            id: actor,
            name: format!("Wanderer{}", actor),
            zone,
            meso: 0,
            party_bonus: false,
        };
        profiles.insert(actor, profile.clone());
        Some(profile)
    }
}

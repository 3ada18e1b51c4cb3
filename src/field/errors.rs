use thiserror::Error;

use super::{ActorId, ZoneId};

/// Errors raised by the world model and its collaborators.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FieldError {
    /// No actor with that id is loaded or known to the character directory.
    #[error("actor not found: {0}")]
    ActorNotFound(ActorId),

    /// The zone is not hosted by this process.
    #[error("zone not found: {0}")]
    ZoneNotFound(ZoneId),

    /// Inventory has no room for the stack.
    #[error("inventory capacity exhausted")]
    CapacityExhausted,

    /// The item is not at the slot (or not in the quantity) the caller expected.
    #[error("item not found: {0}")]
    ItemNotFound(u32),

    /// Slot index outside the inventory or companion slots.
    #[error("invalid slot: {0}")]
    InvalidSlot(u16),

    /// Internal error (unexpected conditions)
    #[error("internal error: {0}")]
    Internal(String),
}

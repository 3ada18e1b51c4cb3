//! Server-to-client messages.
//!
//! Handlers decide *which* of these to send and to whom; [`Outbound::encode`]
//! is the byte layout used by the bundled TCP front end.

use super::codec::PacketWriter;
use super::movement::Position;

/// How the client animates an object leaving the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RemovalAnimation {
    Expire = 0,
    UserPickUp = 2,
    CompanionPickUp = 5,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Unlock client input without granting anything.
    EnableActions,
    /// "Slot is full / nothing there" feedback.
    InventoryFull,
    Notice {
        text: String,
    },
    MesoGained {
        amount: u64,
    },
    ItemGained {
        item_id: u32,
        quantity: u16,
    },
    DropRemoved {
        object_id: u32,
        animation: RemovalAnimation,
        actor: u32,
        companion_slot: Option<u8>,
    },
    CompanionSpawned {
        actor: u32,
        slot: u8,
        item_id: u32,
        name: String,
        position: Position,
    },
    CompanionRemoved {
        actor: u32,
        slot: u8,
    },
    CompanionUpdated {
        slot: u8,
        level: u8,
        affinity: u16,
        fullness: u8,
    },
    CompanionLevelUp {
        actor: u32,
        slot: u8,
        /// Local effect on the owner's client rather than the remote one.
        own: bool,
    },
    CompanionMoved {
        actor: u32,
        slot: u8,
        path: Vec<u8>,
    },
    CompanionChat {
        actor: u32,
        slot: u8,
        kind: u8,
        action: u8,
        text: String,
    },
    CompanionCommandResult {
        actor: u32,
        slot: u8,
        command: u8,
        success: bool,
    },
}

impl Outbound {
    pub fn opcode(&self) -> u16 {
        match self {
            Outbound::EnableActions => 0x001F,
            Outbound::InventoryFull => 0x0020,
            Outbound::Notice { .. } => 0x0044,
            Outbound::MesoGained { .. } => 0x0027,
            Outbound::ItemGained { .. } => 0x0028,
            Outbound::DropRemoved { .. } => 0x010D,
            Outbound::CompanionSpawned { .. } => 0x00A0,
            Outbound::CompanionRemoved { .. } => 0x00A1,
            Outbound::CompanionUpdated { .. } => 0x00A2,
            Outbound::CompanionLevelUp { .. } => 0x00A3,
            Outbound::CompanionMoved { .. } => 0x00A4,
            Outbound::CompanionChat { .. } => 0x00A5,
            Outbound::CompanionCommandResult { .. } => 0x00A6,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut w = PacketWriter::with_opcode(self.opcode());
        match self {
            Outbound::EnableActions | Outbound::InventoryFull => {}
            Outbound::Notice { text } => w.encode_str(text),
            Outbound::MesoGained { amount } => w.encode8(*amount),
            Outbound::ItemGained { item_id, quantity } => {
                w.encode4(*item_id);
                w.encode2(*quantity);
            }
            Outbound::DropRemoved {
                object_id,
                animation,
                actor,
                companion_slot,
            } => {
                w.encode1(*animation as u8);
                w.encode4(*object_id);
                w.encode4(*actor);
                if let Some(slot) = companion_slot {
                    w.encode1(*slot);
                }
            }
            Outbound::CompanionSpawned {
                actor,
                slot,
                item_id,
                name,
                position,
            } => {
                w.encode4(*actor);
                w.encode1(*slot);
                w.encode4(*item_id);
                w.encode_str(name);
                w.encode_i16(position.x);
                w.encode_i16(position.y);
            }
            Outbound::CompanionRemoved { actor, slot } => {
                w.encode4(*actor);
                w.encode1(*slot);
            }
            Outbound::CompanionUpdated {
                slot,
                level,
                affinity,
                fullness,
            } => {
                w.encode1(*slot);
                w.encode1(*level);
                w.encode2(*affinity);
                w.encode1(*fullness);
            }
            Outbound::CompanionLevelUp { actor, slot, own } => {
                w.encode4(*actor);
                w.encode1(*slot);
                w.encode_bool(*own);
            }
            Outbound::CompanionMoved { actor, slot, path } => {
                w.encode4(*actor);
                w.encode1(*slot);
                w.encode_bytes(path);
            }
            Outbound::CompanionChat {
                actor,
                slot,
                kind,
                action,
                text,
            } => {
                w.encode4(*actor);
                w.encode1(*slot);
                w.encode1(*kind);
                w.encode1(*action);
                w.encode_str(text);
            }
            Outbound::CompanionCommandResult {
                actor,
                slot,
                command,
                success,
            } => {
                w.encode4(*actor);
                w.encode1(*slot);
                w.encode1(*command);
                w.encode_bool(*success);
            }
        }
        w.into_vec()
    }
}

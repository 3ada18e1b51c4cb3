//! Inbound message identifiers.

use std::fmt;

/// Client-to-server message kinds understood by the field runtime.
///
/// The set is closed: an opcode outside it decodes to `None` and the session
/// reports the message as unrecognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u16)]
pub enum Header {
    MigrateIn = 0x0014,
    UserDropPickUpRequest = 0x00CA,
    UserPetFoodItemUseRequest = 0x0054,
    UserDestroyPetItemRequest = 0x0075,
    UserActivatePetRequest = 0x0063,
    PetMove = 0x008C,
    PetAction = 0x008D,
    PetInteractionRequest = 0x008E,
    PetDropPickUpRequest = 0x008F,
    PetStatChangeItemUseRequest = 0x0090,
    PetUpdateExceptionListRequest = 0x0091,
}

impl Header {
    pub const ALL: [Header; 11] = [
        Header::MigrateIn,
        Header::UserDropPickUpRequest,
        Header::UserPetFoodItemUseRequest,
        Header::UserDestroyPetItemRequest,
        Header::UserActivatePetRequest,
        Header::PetMove,
        Header::PetAction,
        Header::PetInteractionRequest,
        Header::PetDropPickUpRequest,
        Header::PetStatChangeItemUseRequest,
        Header::PetUpdateExceptionListRequest,
    ];

    pub fn opcode(self) -> u16 {
        self as u16
    }

    pub fn from_opcode(opcode: u16) -> Option<Header> {
        Self::ALL.into_iter().find(|h| h.opcode() == opcode)
    }

    /// Whether a handler needs a bound actor standing in a zone.
    pub fn requires_actor(self) -> bool {
        !matches!(self, Header::MigrateIn)
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}(0x{:04X})", self, self.opcode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn opcodes_are_unique_and_resolve() {
        let mut seen = HashSet::new();
        for h in Header::ALL {
            assert!(seen.insert(h.opcode()), "duplicate opcode for {h}");
            assert_eq!(Header::from_opcode(h.opcode()), Some(h));
        }
    }

    #[test]
    fn unknown_opcode_is_none() {
        assert_eq!(Header::from_opcode(0xFFFF), None);
    }
}

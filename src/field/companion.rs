//! Companion progression: fullness, affinity and levels.
//!
//! Affinity is clamped to [`CompanionConfig::max_affinity`]. Levels only move
//! up, one step per threshold crossed, and never past the end of the table.

use serde::{Deserialize, Serialize};

use crate::config::CompanionConfig;
use crate::protocol::{Outbound, Position};

/// One entry in a companion's command table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanionCommand {
    /// A draw in `[0, 99]` at or below this value succeeds.
    pub probability: u8,
    /// Affinity granted on success.
    pub increase: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Companion {
    /// Item that backs this companion; keys the command table.
    pub item_id: u32,
    /// Cash-inventory slot the companion item sits in.
    pub cash_slot: u16,
    pub name: String,
    pub level: u8,
    pub affinity: u32,
    pub fullness: u8,
    pub position: Position,
    pub stance: u8,
    /// Item ids this companion must not pick up.
    pub pickup_exceptions: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeedOutcome {
    pub fullness_gained: u8,
    pub affinity_gained: u32,
    pub levels_gained: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommandOutcome {
    pub success: bool,
    /// Succeeded while the companion was still below max affinity.
    pub progressed: bool,
    pub affinity_gained: u32,
    pub levels_gained: u8,
}

impl Companion {
    pub fn new(item_id: u32, cash_slot: u16, name: &str) -> Self {
        Self {
            item_id,
            cash_slot,
            name: name.to_string(),
            level: 1,
            affinity: 0,
            fullness: 100,
            position: Position::default(),
            stance: 0,
            pickup_exceptions: Vec::new(),
        }
    }

    pub fn with_progress(mut self, level: u8, affinity: u32, fullness: u8) -> Self {
        self.level = level.max(1);
        self.affinity = affinity;
        self.fullness = fullness;
        self
    }

    /// Add affinity (clamped) and apply any level-ups it unlocks.
    /// Returns the number of levels gained.
    pub fn gain_affinity(&mut self, amount: u32, cfg: &CompanionConfig) -> (u32, u8) {
        let before = self.affinity;
        self.affinity = self.affinity.saturating_add(amount).min(cfg.max_affinity);
        let gained = self.affinity - before.min(self.affinity);
        (gained, self.evaluate_level(cfg))
    }

    /// Raise the level for every threshold the current affinity has crossed.
    pub fn evaluate_level(&mut self, cfg: &CompanionConfig) -> u8 {
        let mut gained = 0u8;
        while self.level < cfg.max_level() {
            match cfg.threshold_for(self.level + 1) {
                Some(needed) if self.affinity >= needed => {
                    self.level += 1;
                    gained += 1;
                }
                _ => break,
            }
        }
        gained
    }

    /// Eat food worth `fullness_gain`. `roll` is a draw in `[0, 99]`; below
    /// `affinity_chance` the companion also gains one affinity point.
    pub fn feed(
        &mut self,
        fullness_gain: u8,
        affinity_chance: u8,
        roll: u32,
        cfg: &CompanionConfig,
    ) -> FeedOutcome {
        let before = self.fullness;
        self.fullness = self
            .fullness
            .saturating_add(fullness_gain)
            .min(cfg.max_fullness);
        let mut outcome = FeedOutcome {
            fullness_gained: self.fullness - before.min(self.fullness),
            ..FeedOutcome::default()
        };
        if roll < u32::from(affinity_chance) {
            let (gained, levels) = self.gain_affinity(1, cfg);
            outcome.affinity_gained = gained;
            outcome.levels_gained = levels;
        }
        outcome
    }

    /// Resolve one trick attempt against a pre-drawn `roll` in `[0, 99]`.
    pub fn apply_command(
        &mut self,
        command: &CompanionCommand,
        roll: u32,
        cfg: &CompanionConfig,
    ) -> CommandOutcome {
        let success = roll <= u32::from(command.probability);
        if !success || self.affinity >= cfg.max_affinity {
            return CommandOutcome {
                success,
                ..CommandOutcome::default()
            };
        }
        let (gained, levels) = self.gain_affinity(command.increase, cfg);
        CommandOutcome {
            success,
            progressed: true,
            affinity_gained: gained,
            levels_gained: levels,
        }
    }

    pub fn excludes(&self, item_id: u32) -> bool {
        self.pickup_exceptions.contains(&item_id)
    }

    pub fn update_message(&self, slot: u8) -> Outbound {
        Outbound::CompanionUpdated {
            slot,
            level: self.level,
            affinity: self.affinity.min(u16::MAX as u32) as u16,
            fullness: self.fullness,
        }
    }
}

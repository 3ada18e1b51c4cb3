//! Currency split arithmetic for party pickups.

use super::ActorId;
use crate::config::EconomyConfig;

/// Who gets what out of one currency pile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitPlan {
    pub claimant_share: u64,
    /// Amount credited to each other recipient, bonus included.
    pub shares: Vec<(ActorId, u64)>,
}

impl SplitPlan {
    pub fn solo(total: u64) -> Self {
        Self {
            claimant_share: total,
            shares: Vec::new(),
        }
    }

    /// Currency created on top of the pile by party bonuses.
    pub fn minted(&self, total: u64) -> u64 {
        let paid = self
            .shares
            .iter()
            .fold(self.claimant_share, |acc, (_, a)| acc.saturating_add(*a));
        paid.saturating_sub(total)
    }
}

/// Split `total` between the claimant and `recipients` (other party members
/// present in the zone, each with its bonus flag).
///
/// The shared pool is `total * party_share_percent / 100`, divided evenly;
/// the remainder of that division stays with the claimant. Bonus-eligible
/// recipients also get `total * party_bonus_percent / 100` each. With no
/// recipients the claimant keeps everything.
pub fn split_currency(total: u64, recipients: &[(ActorId, bool)], economy: &EconomyConfig) -> SplitPlan {
    if recipients.is_empty() {
        return SplitPlan::solo(total);
    }
    let pool = percent_of(total, economy.party_share_percent);
    let bonus = percent_of(total, economy.party_bonus_percent);
    let count = recipients.len() as u64;
    let each = pool / count;
    let leftover = pool % count;

    let shares = recipients
        .iter()
        .map(|&(id, eligible)| (id, if eligible { each.saturating_add(bonus) } else { each }))
        .collect();

    SplitPlan {
        claimant_share: total - pool + leftover,
        shares,
    }
}

fn percent_of(total: u64, percent: u8) -> u64 {
    (u128::from(total) * u128::from(percent) / 100) as u64
}

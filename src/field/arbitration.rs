//! Claim arbitration for drops.
//!
//! [`claim`] is the single decide-and-mutate step for picking something up.
//! It takes the object's claim guard, walks the policy cascade, applies the
//! reward and removes the object, all before the guard is released. Nothing
//! is sent from inside: the resulting messages come back as [`Delivery`]
//! entries and [`ClaimReport::deliver`] pushes them out afterwards.
//!
//! Cascade, in order:
//!
//! 1. already picked up: "nothing there" feedback
//! 2. player drop, claimant not the owner: silent rejection
//! 3. owner-only (or party-only with the claimant outside the owner's party)
//!    monster drop: enable-actions feedback
//! 4. currency: split with present party members when claiming someone
//!    else's pile
//! 5. item: blocked items stay put; use-on-pickup items are consumed;
//!    everything else needs inventory room

use std::time::{Duration, Instant};

use log::debug;

use super::actor::Actor;
use super::objects::{ClaimGuard, DropPayload, PickupPolicy, WorldObject};
use super::rewards::{split_currency, SplitPlan};
use super::services::ItemStack;
use super::zone::{Outbox, Zone};
use super::{ActorId, World};
use crate::metrics;
use crate::protocol::{Outbound, RemovalAnimation};

/// Who physically picks the object up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimVia {
    User,
    /// Companion in the given active slot, on behalf of its owner.
    Companion(u8),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    Claimed,
    AlreadyClaimed,
    /// Someone else's player drop.
    NotOwner,
    /// Ownership or party restriction.
    Restricted,
    PickupBlocked,
    CapacityExhausted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Claimant(Outbound),
    Actor(ActorId, Outbound),
    Zone(Outbound),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimReport {
    pub outcome: ClaimOutcome,
    pub deliveries: Vec<Delivery>,
}

impl ClaimReport {
    fn new(outcome: ClaimOutcome) -> Self {
        Self {
            outcome,
            deliveries: Vec::new(),
        }
    }

    fn feedback(outcome: ClaimOutcome, message: Outbound) -> Self {
        Self {
            outcome,
            deliveries: vec![Delivery::Claimant(message)],
        }
    }

    pub fn is_claimed(&self) -> bool {
        self.outcome == ClaimOutcome::Claimed
    }

    /// Messages addressed to the claimant.
    pub fn claimant_messages(&self) -> impl Iterator<Item = &Outbound> {
        self.deliveries.iter().filter_map(|d| match d {
            Delivery::Claimant(m) => Some(m),
            _ => None,
        })
    }

    /// Push every delivery out. Call only after the claim guard is gone.
    pub fn deliver(self, zone: &Zone, reply: &Outbox) {
        for delivery in self.deliveries {
            match delivery {
                Delivery::Claimant(message) => {
                    let _ = reply.send(message);
                }
                Delivery::Actor(actor, message) => {
                    zone.send_to(actor, message);
                }
                Delivery::Zone(message) => {
                    zone.broadcast(&message, None);
                }
            }
        }
    }
}

/// Resolve one pickup attempt. `claimant`'s state lock must not be held by
/// the caller.
pub fn claim(
    world: &World,
    zone: &Zone,
    claimant: &Actor,
    object: &WorldObject,
    via: ClaimVia,
    now: Instant,
) -> ClaimReport {
    let mut guard = object.lock();
    let report = arbitrate(world, zone, claimant, object, &mut guard, via, now);
    drop(guard);

    match report.outcome {
        ClaimOutcome::Claimed => metrics::inc_claim_won(),
        ClaimOutcome::AlreadyClaimed => metrics::inc_claim_lost_race(),
        _ => metrics::inc_claim_rejected(),
    }
    debug!(
        target: "fieldhost::claim",
        "actor {} claim object {} in zone {} via {:?}: {:?}",
        claimant.id,
        object.id,
        zone.id,
        via,
        report.outcome
    );
    report
}

fn arbitrate(
    world: &World,
    zone: &Zone,
    claimant: &Actor,
    object: &WorldObject,
    guard: &mut ClaimGuard<'_>,
    via: ClaimVia,
    now: Instant,
) -> ClaimReport {
    if guard.is_picked_up() {
        return ClaimReport::feedback(ClaimOutcome::AlreadyClaimed, Outbound::InventoryFull);
    }

    let is_owner = object.owner == claimant.id;
    if object.is_player_drop() {
        if !is_owner {
            return ClaimReport::new(ClaimOutcome::NotOwner);
        }
    } else if !is_owner {
        let window = Duration::from_secs(world.config().pickup.ownership_window_secs);
        let admitted = match object.effective_policy(now, window) {
            PickupPolicy::OwnerOnly => false,
            PickupPolicy::Party => shares_party_with_owner(world, claimant, object.owner),
            PickupPolicy::FreeForAll | PickupPolicy::Explosive => true,
        };
        if !admitted {
            return ClaimReport::feedback(ClaimOutcome::Restricted, Outbound::EnableActions);
        }
    }

    let mut report = match &object.payload {
        DropPayload::Meso(total) => claim_meso(world, zone, claimant, *total, is_owner),
        DropPayload::Item(stack) => match claim_item(world, claimant, object, stack) {
            Ok(report) => report,
            Err(report) => return report,
        },
    };

    guard.mark_picked_up();
    zone.objects.remove(object.id);
    let (animation, companion_slot) = match via {
        ClaimVia::User => (RemovalAnimation::UserPickUp, None),
        ClaimVia::Companion(slot) => (RemovalAnimation::CompanionPickUp, Some(slot)),
    };
    report.deliveries.push(Delivery::Zone(Outbound::DropRemoved {
        object_id: object.id,
        animation,
        actor: claimant.id,
        companion_slot,
    }));
    report
}

fn shares_party_with_owner(world: &World, claimant: &Actor, owner: ActorId) -> bool {
    match claimant.party() {
        Some(party) => world.parties().is_member(party, owner),
        None => false,
    }
}

fn claim_meso(world: &World, zone: &Zone, claimant: &Actor, total: u64, is_owner: bool) -> ClaimReport {
    let plan = match claimant.party() {
        Some(party) if !is_owner => {
            let recipients: Vec<(ActorId, bool)> = world
                .parties()
                .members(party)
                .into_iter()
                .filter(|id| *id != claimant.id && zone.contains(*id))
                .filter_map(|id| world.actor(id).map(|a| (id, a.has_party_bonus())))
                .collect();
            split_currency(total, &recipients, &world.config().economy)
        }
        _ => SplitPlan::solo(total),
    };

    let mut report = ClaimReport::new(ClaimOutcome::Claimed);
    claimant.gain_meso(plan.claimant_share);
    report.deliveries.push(Delivery::Claimant(Outbound::MesoGained {
        amount: plan.claimant_share,
    }));
    for (id, amount) in plan.shares {
        if let Some(member) = world.actor(id) {
            member.gain_meso(amount);
            report
                .deliveries
                .push(Delivery::Actor(id, Outbound::MesoGained { amount }));
        }
    }
    report
}

/// `Err` carries a rejection; the object stays where it is.
fn claim_item(
    world: &World,
    claimant: &Actor,
    object: &WorldObject,
    stack: &ItemStack,
) -> Result<ClaimReport, ClaimReport> {
    let services = world.services();
    let blocked_category = world.config().pickup.blocked_category;
    if services.catalog.is_pickup_blocked(stack.item_id)
        || services.catalog.category(stack.item_id) == blocked_category
    {
        return Err(ClaimReport::feedback(
            ClaimOutcome::PickupBlocked,
            Outbound::EnableActions,
        ));
    }

    if services.effects.use_on_pickup(claimant.id, stack.item_id) {
        return Ok(ClaimReport::new(ClaimOutcome::Claimed));
    }

    let from_monster = !object.is_player_drop();
    if services.inventory.check_capacity(claimant.id, stack)
        && services
            .inventory
            .insert_from_claim(claimant.id, stack, from_monster)
            .is_ok()
    {
        return Ok(ClaimReport::feedback(
            ClaimOutcome::Claimed,
            Outbound::ItemGained {
                item_id: stack.item_id,
                quantity: stack.quantity,
            },
        ));
    }

    Err(ClaimReport::feedback(
        ClaimOutcome::CapacityExhausted,
        Outbound::EnableActions,
    ))
}

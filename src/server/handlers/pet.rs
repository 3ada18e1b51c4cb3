//! Companion messages.
//!
//! Companions are addressed by active slot (`u32` on the wire). A slot with
//! no companion in it makes the message a no-op, not an error.

use std::sync::Arc;

use log::{debug, trace};

use crate::field::services::InventoryKind;
use crate::field::{Actor, ClaimVia, Companion, Zone};
use crate::logutil::escape_log;
use crate::metrics;
use crate::protocol::{CodecError, MovePath, Outbound, PacketReader};
use crate::server::session::HandlerContext;

const COMPANION_NAME_FALLBACK: &str = "Companion";

/// Owner sees its own effect; everyone else sees the remote one.
fn announce_level_up(ctx: &HandlerContext<'_>, zone: &Zone, actor: &Actor, slot: u8, levels: u8) {
    if levels == 0 {
        return;
    }
    metrics::add_level_ups(levels);
    debug!(
        target: "fieldhost::companion",
        "actor {} companion {} gained {} level(s)",
        actor.id,
        slot,
        levels
    );
    ctx.reply(Outbound::CompanionLevelUp {
        actor: actor.id,
        slot,
        own: true,
    });
    zone.broadcast(
        &Outbound::CompanionLevelUp {
            actor: actor.id,
            slot,
            own: false,
        },
        Some(actor.id),
    );
}

fn slot_u8(index: u32) -> Option<u8> {
    u8::try_from(index).ok()
}

/// `UserPetFoodItemUseRequest`: `u32 tick, u16 slot, u32 item id`. Feeds the
/// lead companion.
pub fn food_item_use(r: &mut PacketReader<'_>, ctx: &mut HandlerContext<'_>) -> Result<(), CodecError> {
    let tick = r.decode4()?;
    let slot = r.decode2()?;
    let item_id = r.decode4()?;

    let Some((actor, zone)) = ctx.bound() else {
        return Ok(());
    };
    feed(ctx, &actor, &zone, slot, item_id);
    actor.record_tick(tick);
    Ok(())
}

fn feed(ctx: &HandlerContext<'_>, actor: &Arc<Actor>, zone: &Zone, slot: u16, item_id: u32) {
    let services = ctx.world.services();
    let config = &ctx.world.config().companion;
    if actor.companion(0).is_none() {
        return;
    }

    let kind = InventoryKind::for_item(item_id);
    let present = services
        .inventory
        .item_at(actor.id, kind, slot)
        .map(|s| s.item_id == item_id && s.quantity >= 1)
        .unwrap_or(false);
    let fullness = services.catalog.food_fullness(item_id);
    let (Some(fullness), true) = (fullness, present) else {
        ctx.reply(Outbound::EnableActions);
        return;
    };

    let chance = if kind == InventoryKind::Cash {
        config.cash_food_affinity_chance
    } else {
        config.food_affinity_chance
    };
    let roll = services.roll_percent();
    let Some((outcome, update)) = actor.with_companion(0, |c| {
        let outcome = c.feed(fullness, chance, roll, config);
        (outcome, c.update_message(0))
    }) else {
        return;
    };
    if services.inventory.remove_item(actor.id, kind, item_id, 1).is_err() {
        debug!(target: "fieldhost::companion", "actor {}: food {} vanished mid-feed", actor.id, item_id);
    }
    ctx.reply(Outbound::EnableActions);
    ctx.reply(update);
    announce_level_up(ctx, zone, actor, 0, outcome.levels_gained);
}

/// `UserDestroyPetItemRequest`: the client acknowledged an expired companion
/// item; just unlock its input.
pub fn destroy_item(_r: &mut PacketReader<'_>, ctx: &mut HandlerContext<'_>) -> Result<(), CodecError> {
    ctx.reply(Outbound::EnableActions);
    Ok(())
}

/// `UserActivatePetRequest`: `u32 tick, u16 cash slot, u8 lead`. Summons the
/// companion stored at the cash slot, or dismisses it if already out.
pub fn activate(r: &mut PacketReader<'_>, ctx: &mut HandlerContext<'_>) -> Result<(), CodecError> {
    let tick = r.decode4()?;
    let cash_slot = r.decode2()?;
    let lead = r.decode1()? > 0;

    let Some((actor, zone)) = ctx.bound() else {
        return Ok(());
    };
    toggle_companion(ctx, &actor, &zone, cash_slot, lead);
    actor.record_tick(tick);
    Ok(())
}

fn toggle_companion(ctx: &HandlerContext<'_>, actor: &Actor, zone: &Zone, cash_slot: u16, lead: bool) {
    let services = ctx.world.services();
    let max_slots = usize::from(ctx.world.config().companion.max_slots);

    let message = {
        let mut state = actor.state();
        if let Some(index) = state.companions.iter().position(|c| c.cash_slot == cash_slot) {
            let companion = state.companions.remove(index);
            state.stabled.push(companion);
            Some(Outbound::CompanionRemoved {
                actor: actor.id,
                slot: index as u8,
            })
        } else if state.companions.len() >= max_slots {
            None
        } else {
            let stabled = state
                .stabled
                .iter()
                .position(|c| c.cash_slot == cash_slot)
                .map(|i| state.stabled.remove(i));
            let companion = stabled.or_else(|| {
                let stack = services
                    .inventory
                    .item_at(actor.id, InventoryKind::Cash, cash_slot)?;
                let name = services
                    .catalog
                    .companion_name(stack.item_id)
                    .unwrap_or_else(|| COMPANION_NAME_FALLBACK.to_string());
                Some(Companion::new(stack.item_id, cash_slot, &name))
            });
            companion.map(|mut c| {
                c.position = state.position;
                let index = if lead { 0 } else { state.companions.len() };
                let message = Outbound::CompanionSpawned {
                    actor: actor.id,
                    slot: index as u8,
                    item_id: c.item_id,
                    name: c.name.clone(),
                    position: c.position,
                };
                state.companions.insert(index, c);
                message
            })
        }
    };

    match message {
        Some(message) => {
            debug!(target: "fieldhost::companion", "actor {}: {:?}", actor.id, message);
            zone.broadcast(&message, None);
        }
        None => ctx.reply(Outbound::EnableActions),
    }
}

/// `PetMove`: `u32 slot` followed by a movement path. Relayed to everyone
/// else in the zone.
pub fn movement(r: &mut PacketReader<'_>, ctx: &mut HandlerContext<'_>) -> Result<(), CodecError> {
    let index = r.decode4()?;
    let path = MovePath::decode(r)?;

    let Some((actor, zone)) = ctx.bound() else {
        return Ok(());
    };
    let Some(slot) = slot_u8(index) else {
        return Ok(());
    };
    let moved = actor.with_companion(index, |c| {
        c.position = path.end();
        if let Some(stance) = path.stance() {
            c.stance = stance;
        }
    });
    if moved.is_some() {
        zone.broadcast(
            &Outbound::CompanionMoved {
                actor: actor.id,
                slot,
                path: path.raw,
            },
            Some(actor.id),
        );
    }
    Ok(())
}

/// `PetAction`: `u32 slot, u8 kind, u8 action, str text`. Broadcast only.
pub fn action(r: &mut PacketReader<'_>, ctx: &mut HandlerContext<'_>) -> Result<(), CodecError> {
    let index = r.decode4()?;
    let kind = r.decode1()?;
    let action = r.decode1()?;
    let text = r.decode_str()?;

    let Some((actor, zone)) = ctx.bound() else {
        return Ok(());
    };
    let Some(slot) = slot_u8(index) else {
        return Ok(());
    };
    if actor.companion(index).is_none() {
        return Ok(());
    }
    trace!(
        target: "fieldhost::companion",
        "actor {} companion {} says \"{}\"",
        actor.id,
        slot,
        escape_log(&text)
    );
    zone.broadcast(
        &Outbound::CompanionChat {
            actor: actor.id,
            slot,
            kind,
            action,
            text,
        },
        Some(actor.id),
    );
    Ok(())
}

/// `PetInteractionRequest`: `u32 slot, 5 bytes skipped, u8 command`.
pub fn interaction(r: &mut PacketReader<'_>, ctx: &mut HandlerContext<'_>) -> Result<(), CodecError> {
    let index = r.decode4()?;
    r.skip(5)?;
    let command = r.decode1()?;

    let Some((actor, zone)) = ctx.bound() else {
        return Ok(());
    };
    let Some(slot) = slot_u8(index) else {
        return Ok(());
    };
    let Some(companion) = actor.companion(index) else {
        return Ok(());
    };
    let services = ctx.world.services();
    let Some(entry) = services.catalog.companion_command(companion.item_id, command) else {
        debug!(
            target: "fieldhost::companion",
            "actor {}: companion item {} has no command {}",
            actor.id,
            companion.item_id,
            command
        );
        zone.broadcast(
            &Outbound::CompanionCommandResult {
                actor: actor.id,
                slot,
                command,
                success: false,
            },
            None,
        );
        return Ok(());
    };

    let config = &ctx.world.config().companion;
    let roll = services.roll_percent();
    let Some((outcome, update)) = actor.with_companion(index, |c| {
        let outcome = c.apply_command(&entry, roll, config);
        (outcome, c.update_message(slot))
    }) else {
        return Ok(());
    };

    if outcome.progressed {
        announce_level_up(ctx, &zone, &actor, slot, outcome.levels_gained);
        ctx.reply(update);
    }
    zone.broadcast(
        &Outbound::CompanionCommandResult {
            actor: actor.id,
            slot,
            command,
            success: outcome.success,
        },
        None,
    );
    Ok(())
}

/// `PetDropPickUpRequest`: `u32 slot, u8, u32 tick, i16 x, i16 y,
/// u32 object id, u32 crc, u16`, plus `i16, i16, u32, u32` when the object
/// id is a multiple of 13.
pub fn drop_pick_up(r: &mut PacketReader<'_>, ctx: &mut HandlerContext<'_>) -> Result<(), CodecError> {
    let index = r.decode4()?;
    let _unknown = r.decode1()?;
    let tick = r.decode4()?;
    let _drop_x = r.decode_i16()?;
    let _drop_y = r.decode_i16()?;
    let object_id = r.decode4()?;
    let _crc = r.decode4()?;
    let _unknown = r.decode2()?;
    if object_id % 13 == 0 {
        let _companion_x = r.decode_i16()?;
        let _companion_y = r.decode_i16()?;
        let _companion_crc = r.decode4()?;
        let _drop_crc = r.decode4()?;
    }

    let Some((actor, zone)) = ctx.bound() else {
        return Ok(());
    };
    let (Some(slot), Some(companion)) = (slot_u8(index), actor.companion(index)) else {
        return Ok(());
    };
    let Some(object) = zone.objects.find(object_id) else {
        return Ok(());
    };
    if object.item_id().map(|id| companion.excludes(id)).unwrap_or(false) {
        trace!(
            target: "fieldhost::companion",
            "actor {} companion {} skips excluded object {}",
            actor.id,
            slot,
            object_id
        );
        return Ok(());
    }

    super::pick_up(ctx, &actor, &zone, object_id, ClaimVia::Companion(slot), ctx.now);
    actor.record_tick(tick);
    Ok(())
}

/// `PetStatChangeItemUseRequest`: 13 bytes skipped, `u8 use slot`. The
/// companion drinks a potion for its owner.
pub fn stat_change_item_use(r: &mut PacketReader<'_>, ctx: &mut HandlerContext<'_>) -> Result<(), CodecError> {
    r.skip(13)?;
    let slot = u16::from(r.decode1()?);

    let Some((actor, zone)) = ctx.bound() else {
        return Ok(());
    };
    let services = ctx.world.services();
    let now = ctx.now;

    let (alive, sealed, next_consume) = {
        let state = actor.state();
        (state.alive, state.potion_sealed, state.next_consume)
    };
    if !alive || sealed || !zone.rules.potion_allowed {
        ctx.reply(Outbound::EnableActions);
        return Ok(());
    }
    let Some(stack) = services
        .inventory
        .item_at(actor.id, InventoryKind::Use, slot)
        .filter(|s| s.quantity >= 1)
    else {
        ctx.reply(Outbound::EnableActions);
        return Ok(());
    };
    if next_consume.map(|t| t > now).unwrap_or(false) {
        ctx.reply(Outbound::Notice {
            text: "You may not use this item yet.".to_string(),
        });
        ctx.reply(Outbound::EnableActions);
        return Ok(());
    }

    if !services.effects.apply(actor.id, stack.item_id) {
        ctx.reply(Outbound::EnableActions);
        return Ok(());
    }
    if let Err(e) = services
        .inventory
        .remove_from_slot(actor.id, InventoryKind::Use, slot, 1)
    {
        debug!("actor {}: auto-potion slot {}: {}", actor.id, slot, e);
    }
    if !zone.rules.consume_cooldown.is_zero() {
        actor.state().next_consume = Some(now + zone.rules.consume_cooldown);
    }
    Ok(())
}

/// `PetUpdateExceptionListRequest`: `u32 slot, u8 count, count × u32 item id`.
pub fn update_exception_list(r: &mut PacketReader<'_>, ctx: &mut HandlerContext<'_>) -> Result<(), CodecError> {
    let index = r.decode4()?;
    let count = r.decode1()?;
    let mut items = Vec::with_capacity(usize::from(count));
    for _ in 0..count {
        items.push(r.decode4()?);
    }

    let Some((actor, _zone)) = ctx.bound() else {
        return Ok(());
    };
    let stored = actor.with_companion(index, |c| {
        c.pickup_exceptions = items;
        c.pickup_exceptions.len()
    });
    if let Some(n) = stored {
        debug!(
            target: "fieldhost::companion",
            "actor {} companion {} excludes {} item(s)",
            actor.id,
            index,
            n
        );
    }
    Ok(())
}

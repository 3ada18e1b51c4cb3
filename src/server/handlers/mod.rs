//! Bundled message handlers.
//!
//! Each handler decodes its payload completely before touching any state, so
//! a truncated message never leaves a half-applied change behind.

pub mod pet;
pub mod user;

use std::sync::Arc;
use std::time::Instant;

use super::dispatch::{DispatchError, DispatchTable};
use super::session::HandlerContext;
use crate::field::{claim, Actor, ClaimVia, ObjectId, Zone};
use crate::protocol::Header;

pub fn register_all(table: &mut DispatchTable) -> Result<(), DispatchError> {
    table.register(Header::MigrateIn, user::migrate_in)?;
    table.register(Header::UserDropPickUpRequest, user::drop_pick_up)?;
    table.register(Header::UserPetFoodItemUseRequest, pet::food_item_use)?;
    table.register(Header::UserDestroyPetItemRequest, pet::destroy_item)?;
    table.register(Header::UserActivatePetRequest, pet::activate)?;
    table.register(Header::PetMove, pet::movement)?;
    table.register(Header::PetAction, pet::action)?;
    table.register(Header::PetInteractionRequest, pet::interaction)?;
    table.register(Header::PetDropPickUpRequest, pet::drop_pick_up)?;
    table.register(Header::PetStatChangeItemUseRequest, pet::stat_change_item_use)?;
    table.register(Header::PetUpdateExceptionListRequest, pet::update_exception_list)?;
    Ok(())
}

/// Shared tail of both pickup paths: find the object, arbitrate, deliver.
/// A vanished object is not an error.
fn pick_up(ctx: &HandlerContext<'_>, actor: &Arc<Actor>, zone: &Zone, object_id: ObjectId, via: ClaimVia, now: Instant) {
    let Some(object) = zone.objects.find(object_id) else {
        return;
    };
    let report = claim(ctx.world, zone, actor, &object, via, now);
    report.deliver(zone, ctx.outbox());
}

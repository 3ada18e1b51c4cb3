//! Character-level messages: entering the field and picking things up by hand.

use log::warn;

use crate::field::{ClaimVia, FieldError};
use crate::protocol::{CodecError, Outbound, PacketReader};
use crate::server::session::HandlerContext;

/// `MigrateIn`: `u32 actor id`. Binds the session and admits the actor to
/// its zone.
pub fn migrate_in(r: &mut PacketReader<'_>, ctx: &mut HandlerContext<'_>) -> Result<(), CodecError> {
    let actor_id = r.decode4()?;
    match ctx.world.enter(actor_id, ctx.session, ctx.outbox().clone()) {
        Ok(actor) => {
            let spawns: Vec<Outbound> = {
                let state = actor.state();
                state
                    .companions
                    .iter()
                    .enumerate()
                    .map(|(slot, c)| Outbound::CompanionSpawned {
                        actor: actor.id,
                        slot: slot as u8,
                        item_id: c.item_id,
                        name: c.name.clone(),
                        position: c.position,
                    })
                    .collect()
            };
            ctx.bind(actor);
            for message in spawns {
                ctx.reply(message);
            }
        }
        Err(FieldError::ActorNotFound(id)) => {
            warn!("session {}: unknown actor {}", ctx.session, id);
            ctx.reply(Outbound::Notice {
                text: "Character not found.".to_string(),
            });
        }
        Err(e) => {
            warn!("session {}: cannot admit actor {}: {}", ctx.session, actor_id, e);
            ctx.reply(Outbound::EnableActions);
        }
    }
    Ok(())
}

/// `UserDropPickUpRequest`: `u8 field key, u32 tick, i16 x, i16 y,
/// u32 object id, u32 crc`.
pub fn drop_pick_up(r: &mut PacketReader<'_>, ctx: &mut HandlerContext<'_>) -> Result<(), CodecError> {
    let _field_key = r.decode1()?;
    let tick = r.decode4()?;
    let _x = r.decode_i16()?;
    let _y = r.decode_i16()?;
    let object_id = r.decode4()?;
    let _crc = r.decode4()?;

    let Some((actor, zone)) = ctx.bound() else {
        return Ok(());
    };
    super::pick_up(ctx, &actor, &zone, object_id, ClaimVia::User, ctx.now);
    actor.record_tick(tick);
    Ok(())
}

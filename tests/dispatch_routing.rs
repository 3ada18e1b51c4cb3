/// Routing behaviour of the session entry point: recognized, unrecognized and
/// malformed messages.
mod common;

use common::{packets, Fixture};
use fieldhost::field::DropSpec;
use fieldhost::protocol::{CodecError, Header, Outbound, PacketReader, PacketWriter};
use fieldhost::server::{dispatch, DispatchError, DispatchTable, HandleOutcome, HandlerContext};

#[test]
fn unknown_header_is_not_handled_and_changes_nothing() {
    let mut fx = Fixture::new();
    let mut player = fx.login(1);
    let obj = fx.world.spawn_drop(common::ZONE, DropSpec::meso(50, 1)).unwrap();

    let mut w = PacketWriter::with_opcode(0x7FFF);
    w.encode4(obj.id);
    assert_eq!(player.send(w.into_vec()), HandleOutcome::Unrecognized);

    assert!(fx.zone().objects.find(obj.id).is_some());
    assert_eq!(player.actor().meso(), 0);
    assert!(player.drain().is_empty());
}

#[test]
fn actor_messages_before_login_are_unrecognized() {
    let mut fx = Fixture::new();
    let (mut session, mut rx) = fx.connect();
    assert_eq!(
        session.handle(&packets::destroy_item()),
        HandleOutcome::Unrecognized
    );
    assert_eq!(
        session.handle(&packets::user_pickup(1)),
        HandleOutcome::Unrecognized
    );
    assert!(rx.try_recv().is_err());

    assert_eq!(session.handle(&packets::migrate_in(9)), HandleOutcome::Handled);
    assert_eq!(session.handle(&packets::destroy_item()), HandleOutcome::Handled);
    assert_eq!(rx.try_recv().ok(), Some(Outbound::EnableActions));
}

#[test]
fn truncated_payload_is_malformed_and_session_survives() {
    let mut fx = Fixture::new();
    let mut player = fx.login(1);

    let mut packet = packets::user_pickup(3);
    packet.truncate(packet.len() - 2);
    assert_eq!(player.send(packet), HandleOutcome::Malformed);
    assert_eq!(player.send(vec![0x14]), HandleOutcome::Malformed);
    assert_eq!(player.send(Vec::new()), HandleOutcome::Malformed);

    assert_eq!(player.send(packets::destroy_item()), HandleOutcome::Handled);
    assert_eq!(player.drain(), vec![Outbound::EnableActions]);
}

#[test]
fn trailing_bytes_are_ignored() {
    let mut fx = Fixture::new();
    let mut player = fx.login(1);
    let obj = fx.world.spawn_drop(common::ZONE, DropSpec::meso(5, 1)).unwrap();

    let mut packet = packets::user_pickup(obj.id);
    packet.extend_from_slice(&[0xAA; 16]);
    assert_eq!(player.send(packet), HandleOutcome::Handled);
    assert_eq!(player.actor().meso(), 5);
}

#[test]
fn pickup_of_missing_object_is_still_handled() {
    let mut fx = Fixture::new();
    let mut player = fx.login(1);
    assert_eq!(player.send(packets::user_pickup(4242)), HandleOutcome::Handled);
    assert!(player.drain().is_empty());
}

#[test]
fn client_tick_is_recorded() {
    let mut fx = Fixture::new();
    let mut player = fx.login(1);
    player.send(packets::user_pickup(4242));
    assert_eq!(player.actor().state().last_client_tick, 1234);
}

#[test]
fn reconnect_takes_the_actor_over_from_the_old_session() {
    let mut fx = Fixture::new();
    let mut old = fx.login(7);
    let mut new = fx.login(7);

    assert_eq!(old.send(packets::destroy_item()), HandleOutcome::Unrecognized);
    assert!(old.session.actor().is_none());

    old.session.disconnect();
    assert_eq!(fx.world.online(), 1);
    assert!(fx.zone().contains(7));

    assert_eq!(new.send(packets::destroy_item()), HandleOutcome::Handled);
    assert_eq!(new.drain(), vec![Outbound::EnableActions]);

    new.session.disconnect();
    assert_eq!(fx.world.online(), 0);
    assert!(!fx.zone().contains(7));
}

fn noop(_: &mut PacketReader<'_>, _: &mut HandlerContext<'_>) -> Result<(), CodecError> {
    Ok(())
}

#[test]
fn duplicate_registration_is_rejected() {
    let mut table = DispatchTable::new();
    fieldhost::server::handlers::register_all(&mut table).unwrap();
    assert_eq!(
        table.register(Header::PetAction, noop),
        Err(DispatchError::DuplicateHandler(Header::PetAction))
    );
}

#[test]
fn installed_table_is_shared_and_complete() {
    let a = dispatch::install().unwrap();
    let b = dispatch::install().unwrap();
    assert!(std::ptr::eq(a, b));
    for header in Header::ALL {
        assert!(a.lookup(header).is_some(), "missing handler for {header}");
    }
}

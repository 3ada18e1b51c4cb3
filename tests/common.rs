//! Test utilities & fixtures.
//! Builds a world with in-memory collaborators and logs players in through
//! real sessions, plus packet builders for every inbound header.
#![allow(dead_code)] // each test file uses a different subset

use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver};

use fieldhost::config::Config;
use fieldhost::field::memory::{MemoryDirectory, MemoryInventory, StaticCatalog};
use fieldhost::field::services::{ActorProfile, FixedRandom, RandomSource, Services};
use fieldhost::field::{Actor, ActorId, World, Zone};
use fieldhost::protocol::{Header, Outbound, PacketWriter};
use fieldhost::server::{dispatch, HandleOutcome, Session};

pub const ZONE: u32 = 100;

pub struct Fixture {
    pub world: Arc<World>,
    pub inventory: Arc<MemoryInventory>,
    pub directory: Arc<MemoryDirectory>,
    next_session: u32,
}

pub struct FixtureBuilder {
    config: Config,
    catalog: StaticCatalog,
    random: Arc<dyn RandomSource>,
    slots: u16,
}

impl FixtureBuilder {
    pub fn config(mut self, f: impl FnOnce(&mut Config)) -> Self {
        f(&mut self.config);
        self
    }

    pub fn catalog(mut self, catalog: StaticCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn random(mut self, value: u32) -> Self {
        self.random = Arc::new(FixedRandom(value));
        self
    }

    pub fn slots(mut self, slots: u16) -> Self {
        self.slots = slots;
        self
    }

    pub fn build(self) -> Fixture {
        let inventory = Arc::new(MemoryInventory::new(self.slots));
        let directory = Arc::new(MemoryDirectory::auto_create(ZONE));
        let catalog = Arc::new(self.catalog);
        let services = Services {
            inventory: inventory.clone(),
            catalog: catalog.clone(),
            effects: catalog,
            random: self.random,
            characters: directory.clone(),
        };
        Fixture {
            world: Arc::new(World::new(self.config, services)),
            inventory,
            directory,
            next_session: 1,
        }
    }
}

pub struct Player {
    pub id: ActorId,
    pub session: Session,
    pub rx: UnboundedReceiver<Outbound>,
}

impl Player {
    pub fn send(&mut self, packet: Vec<u8>) -> HandleOutcome {
        self.session.handle(&packet)
    }

    pub fn drain(&mut self) -> Vec<Outbound> {
        let mut out = Vec::new();
        while let Ok(message) = self.rx.try_recv() {
            out.push(message);
        }
        out
    }

    pub fn actor(&self) -> Arc<Actor> {
        Arc::clone(self.session.actor().expect("player is bound"))
    }
}

impl Fixture {
    pub fn builder() -> FixtureBuilder {
        FixtureBuilder {
            config: Config::default(),
            catalog: StaticCatalog::default(),
            random: Arc::new(FixedRandom(0)),
            slots: 24,
        }
    }

    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn zone(&self) -> Arc<Zone> {
        self.world.zone(ZONE).expect("default zone")
    }

    /// Open a session with nothing bound yet.
    pub fn connect(&mut self) -> (Session, UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let table = dispatch::install().expect("dispatch table");
        let session = Session::new(self.next_session, Arc::clone(&self.world), table, tx);
        self.next_session += 1;
        (session, rx)
    }

    pub fn login(&mut self, id: ActorId) -> Player {
        let (mut session, rx) = self.connect();
        assert_eq!(session.handle(&packets::migrate_in(id)), HandleOutcome::Handled);
        let mut player = Player { id, session, rx };
        player.drain();
        player
    }

    pub fn login_with_meso(&mut self, id: ActorId, meso: u64, party_bonus: bool) -> Player {
        self.directory.insert(ActorProfile {
            id,
            name: format!("P{}", id),
            zone: ZONE,
            meso,
            party_bonus,
        });
        self.login(id)
    }
}

pub mod packets {
    use super::*;

    fn start(header: Header) -> PacketWriter {
        PacketWriter::with_opcode(header.opcode())
    }

    pub fn migrate_in(actor: ActorId) -> Vec<u8> {
        let mut w = start(Header::MigrateIn);
        w.encode4(actor);
        w.into_vec()
    }

    pub fn user_pickup(object_id: u32) -> Vec<u8> {
        let mut w = start(Header::UserDropPickUpRequest);
        w.encode1(0);
        w.encode4(1234);
        w.encode_i16(10);
        w.encode_i16(20);
        w.encode4(object_id);
        w.encode4(0xDEAD_BEEF);
        w.into_vec()
    }

    /// Companion pickup; appends the extra trailer when the id needs it.
    pub fn pet_pickup(slot: u32, object_id: u32, tick: u32) -> Vec<u8> {
        let mut w = start(Header::PetDropPickUpRequest);
        w.encode4(slot);
        w.encode1(0);
        w.encode4(tick);
        w.encode_i16(10);
        w.encode_i16(20);
        w.encode4(object_id);
        w.encode4(0xDEAD_BEEF);
        w.encode2(0);
        if object_id % 13 == 0 {
            w.encode_i16(11);
            w.encode_i16(21);
            w.encode4(1);
            w.encode4(2);
        }
        w.into_vec()
    }

    pub fn food(slot: u16, item_id: u32) -> Vec<u8> {
        let mut w = start(Header::UserPetFoodItemUseRequest);
        w.encode4(777);
        w.encode2(slot);
        w.encode4(item_id);
        w.into_vec()
    }

    pub fn activate(cash_slot: u16, lead: bool) -> Vec<u8> {
        let mut w = start(Header::UserActivatePetRequest);
        w.encode4(555);
        w.encode2(cash_slot);
        w.encode_bool(lead);
        w.into_vec()
    }

    pub fn destroy_item() -> Vec<u8> {
        start(Header::UserDestroyPetItemRequest).into_vec()
    }

    pub fn interaction(slot: u32, command: u8) -> Vec<u8> {
        let mut w = start(Header::PetInteractionRequest);
        w.encode4(slot);
        w.encode_bytes(&[0; 5]);
        w.encode1(command);
        w.into_vec()
    }

    pub fn action(slot: u32, text: &str) -> Vec<u8> {
        let mut w = start(Header::PetAction);
        w.encode4(slot);
        w.encode1(1);
        w.encode1(4);
        w.encode_str(text);
        w.into_vec()
    }

    /// Movement with a single segment ending at `(x, y)`.
    pub fn movement(slot: u32, x: i16, y: i16) -> Vec<u8> {
        let mut w = start(Header::PetMove);
        w.encode4(slot);
        w.encode_i16(0);
        w.encode_i16(0);
        w.encode1(1);
        w.encode1(0);
        w.encode_i16(x);
        w.encode_i16(y);
        w.encode1(6);
        w.into_vec()
    }

    pub fn auto_potion(slot: u8) -> Vec<u8> {
        let mut w = start(Header::PetStatChangeItemUseRequest);
        w.encode_bytes(&[0; 13]);
        w.encode1(slot);
        w.into_vec()
    }

    pub fn exception_list(slot: u32, items: &[u32]) -> Vec<u8> {
        let mut w = start(Header::PetUpdateExceptionListRequest);
        w.encode4(slot);
        w.encode1(items.len() as u8);
        for item in items {
            w.encode4(*item);
        }
        w.into_vec()
    }
}

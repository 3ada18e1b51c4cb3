//! Per-connection message handling.
//!
//! A [`Session`] owns at most one bound actor and processes its messages one
//! at a time. It knows nothing about sockets: the TCP front end feeds it
//! de-framed payloads and drains its outbox.

use std::sync::Arc;
use std::time::Instant;

use log::{debug, trace};

use super::dispatch::{DispatchTable, HandleOutcome};
use crate::field::{Actor, Outbox, World, Zone};
pub use crate::field::SessionId;
use crate::logutil::hex_preview;
use crate::metrics;
use crate::protocol::{Header, Outbound, PacketReader};

/// What a handler gets to work with for one message.
pub struct HandlerContext<'a> {
    pub world: &'a World,
    pub session: SessionId,
    /// Receive time of the message being handled.
    pub now: Instant,
    actor: &'a mut Option<Arc<Actor>>,
    outbox: &'a Outbox,
}

impl HandlerContext<'_> {
    /// Queue a message for this session only.
    pub fn reply(&self, message: Outbound) {
        let _ = self.outbox.send(message);
    }

    pub fn outbox(&self) -> &Outbox {
        self.outbox
    }

    pub fn actor(&self) -> Option<&Arc<Actor>> {
        self.actor.as_ref()
    }

    /// The bound actor together with the zone it stands in.
    pub fn bound(&self) -> Option<(Arc<Actor>, Arc<Zone>)> {
        let actor = self.actor.as_ref()?;
        let zone = self.world.zone(actor.zone()?)?;
        Some((Arc::clone(actor), zone))
    }

    /// Attach an actor to this session, releasing any previous one this
    /// session still owns.
    pub fn bind(&mut self, actor: Arc<Actor>) {
        if let Some(previous) = self.actor.replace(actor) {
            if self.actor.as_ref().map(|a| a.id) != Some(previous.id) {
                self.world.release(previous.id, self.session);
            }
        }
    }
}

pub struct Session {
    id: SessionId,
    world: Arc<World>,
    table: &'static DispatchTable,
    outbox: Outbox,
    actor: Option<Arc<Actor>>,
}

impl Session {
    pub fn new(id: SessionId, world: Arc<World>, table: &'static DispatchTable, outbox: Outbox) -> Self {
        Self {
            id,
            world,
            table,
            outbox,
            actor: None,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn actor(&self) -> Option<&Arc<Actor>> {
        self.actor.as_ref()
    }

    /// Forget an actor another session has taken over.
    fn drop_superseded(&mut self) {
        let Some(actor) = self.actor.as_ref() else {
            return;
        };
        if !self.world.owns(actor.id, self.id) {
            debug!(
                target: "fieldhost::dispatch",
                "session {}: actor {} is now driven elsewhere",
                self.id,
                actor.id
            );
            self.actor = None;
        }
    }

    fn in_zone(&self) -> bool {
        self.actor
            .as_ref()
            .and_then(|a| a.zone())
            .and_then(|z| self.world.zone(z))
            .is_some()
    }

    /// Route one raw message: a little-endian `u16` opcode followed by the
    /// payload. Bytes a handler leaves unread are ignored.
    pub fn handle(&mut self, raw: &[u8]) -> HandleOutcome {
        trace!(
            target: "fieldhost::dispatch",
            "session {} <- {}",
            self.id,
            hex_preview(raw, 32)
        );
        self.drop_superseded();
        let mut reader = PacketReader::new(raw);
        let opcode = match reader.decode2() {
            Ok(op) => op,
            Err(e) => {
                debug!(target: "fieldhost::dispatch", "session {}: no opcode: {}", self.id, e);
                metrics::inc_malformed();
                return HandleOutcome::Malformed;
            }
        };

        let Some(header) = Header::from_opcode(opcode) else {
            debug!(
                target: "fieldhost::dispatch",
                "session {}: unrecognized opcode 0x{:04X}",
                self.id,
                opcode
            );
            metrics::inc_unrecognized();
            return HandleOutcome::Unrecognized;
        };
        let Some(handler) = self.table.lookup(header) else {
            debug!(target: "fieldhost::dispatch", "session {}: no handler for {}", self.id, header);
            metrics::inc_unrecognized();
            return HandleOutcome::Unrecognized;
        };
        if header.requires_actor() && !self.in_zone() {
            debug!(
                target: "fieldhost::dispatch",
                "session {}: {} before an actor is in the field",
                self.id,
                header
            );
            metrics::inc_unrecognized();
            return HandleOutcome::Unrecognized;
        }

        let mut ctx = HandlerContext {
            world: &self.world,
            session: self.id,
            now: Instant::now(),
            actor: &mut self.actor,
            outbox: &self.outbox,
        };
        match handler(&mut reader, &mut ctx) {
            Ok(()) => {
                metrics::inc_handled();
                metrics::record_header(header);
                HandleOutcome::Handled
            }
            Err(e) => {
                debug!(target: "fieldhost::dispatch", "session {}: malformed {}: {}", self.id, header, e);
                metrics::inc_malformed();
                HandleOutcome::Malformed
            }
        }
    }

    /// Connection closed: take the actor out of the field unless another
    /// session has taken it over.
    pub fn disconnect(&mut self) {
        if let Some(actor) = self.actor.take() {
            self.world.release(actor.id, self.id);
        }
    }
}

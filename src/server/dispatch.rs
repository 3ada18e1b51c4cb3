//! Header → handler routing.
//!
//! The table is assembled once at startup by [`install`] and never changes
//! afterwards; sessions only ever read it.

use std::collections::HashMap;
use std::sync::OnceLock;

use thiserror::Error;

use super::handlers;
use super::session::HandlerContext;
use crate::protocol::{CodecError, Header, PacketReader};

/// A message handler. The reader is positioned just past the opcode.
/// Returning a [`CodecError`] marks the message malformed.
pub type Handler = fn(&mut PacketReader<'_>, &mut HandlerContext<'_>) -> Result<(), CodecError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("handler for {0} registered twice")]
    DuplicateHandler(Header),
}

/// What happened to one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleOutcome {
    Handled,
    /// Unknown header, no handler, or no actor bound where one is needed.
    Unrecognized,
    /// The payload ended early.
    Malformed,
}

#[derive(Default)]
pub struct DispatchTable {
    handlers: HashMap<Header, Handler>,
}

impl DispatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, header: Header, handler: Handler) -> Result<(), DispatchError> {
        if self.handlers.contains_key(&header) {
            return Err(DispatchError::DuplicateHandler(header));
        }
        self.handlers.insert(header, handler);
        Ok(())
    }

    pub fn lookup(&self, header: Header) -> Option<Handler> {
        self.handlers.get(&header).copied()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Registered headers in opcode order.
    pub fn headers(&self) -> Vec<Header> {
        let mut headers: Vec<Header> = self.handlers.keys().copied().collect();
        headers.sort_by_key(|h| h.opcode());
        headers
    }
}

/// Build a table with every bundled handler.
pub fn build() -> Result<DispatchTable, DispatchError> {
    let mut table = DispatchTable::new();
    handlers::register_all(&mut table)?;
    Ok(table)
}

static TABLE: OnceLock<DispatchTable> = OnceLock::new();

/// Build the process-wide table on first call; later calls return it.
pub fn install() -> Result<&'static DispatchTable, DispatchError> {
    if let Some(table) = TABLE.get() {
        return Ok(table);
    }
    let table = build()?;
    Ok(TABLE.get_or_init(|| table))
}

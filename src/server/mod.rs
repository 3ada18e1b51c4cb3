//! # Field Server
//!
//! TCP front end and message routing.
//!
//! - [`dispatch`] - header → handler table, built once at startup
//! - [`session`] - per-connection state and the `handle` entry point
//! - [`handlers`] - the bundled message handlers
//!
//! Each accepted connection gets a reader task that de-frames inbound bytes
//! and feeds them to its [`Session`] one message at a time, plus a writer
//! task that drains the session's outbox. Frames are a varint length prefix
//! followed by the payload; inbound payloads start with a `u16` opcode.

pub mod dispatch;
pub mod handlers;
pub mod session;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use log::{debug, info, warn};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use crate::config::Config;
use crate::field::memory::{MemoryDirectory, MemoryInventory, StaticCatalog};
use crate::field::services::{Services, ThreadRandom};
use crate::field::World;
use crate::metrics;
use crate::protocol::{encode_frame, Framer, Outbound};

pub use dispatch::{DispatchError, DispatchTable, HandleOutcome};
pub use session::{HandlerContext, Session, SessionId};

const READ_CHUNK: usize = 4096;
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

pub struct FieldServer {
    config: Config,
    world: Arc<World>,
    table: &'static DispatchTable,
    next_session: AtomicU32,
    active: Arc<AtomicUsize>,
}

impl FieldServer {
    /// Build a server with the bundled in-memory collaborators.
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let catalog = match &config.catalog.file {
            Some(path) => StaticCatalog::load(path).await?,
            None => StaticCatalog::default(),
        };
        let catalog = Arc::new(catalog);
        let services = Services {
            inventory: Arc::new(MemoryInventory::default()),
            catalog: catalog.clone(),
            effects: catalog,
            random: Arc::new(ThreadRandom),
            characters: Arc::new(MemoryDirectory::auto_create(config.default_zone)),
        };
        Self::with_services(config, services)
    }

    pub fn with_services(config: Config, services: Services) -> Result<Self> {
        let table = dispatch::install().map_err(|e| anyhow!("Failed to build dispatch table: {}", e))?;
        let world = Arc::new(World::new(config.clone(), services));
        Ok(Self {
            config,
            world,
            table,
            next_session: AtomicU32::new(1),
            active: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn world(&self) -> &Arc<World> {
        &self.world
    }

    pub fn table(&self) -> &'static DispatchTable {
        self.table
    }

    pub fn active_sessions(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    /// Bind the configured address and serve until Ctrl-C.
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(&self.config.server.bind)
            .await
            .map_err(|e| anyhow!("Failed to bind {}: {}", self.config.server.bind, e))?;
        info!(
            "Field server listening on {} ({} zone(s), {} handler(s))",
            self.config.server.bind,
            self.world.zone_ids().len(),
            self.table.len()
        );
        self.serve(listener, async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
    }

    /// Accept connections on `listener` until `shutdown` resolves.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(pair) => pair,
                        Err(e) => {
                            warn!(target: "fieldhost::net", "accept failed: {}", e);
                            continue;
                        }
                    };
                    self.admit(stream, peer);
                }
                _ = &mut shutdown => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }
        Ok(())
    }

    fn admit(&self, stream: TcpStream, peer: SocketAddr) {
        let max = self.config.server.max_sessions;
        if self.active.load(Ordering::Relaxed) >= max {
            warn!(target: "fieldhost::net", "refusing {}: {} session(s) already open", peer, max);
            drop(stream);
            return;
        }
        self.active.fetch_add(1, Ordering::Relaxed);
        let id = self.next_session.fetch_add(1, Ordering::Relaxed);
        let conn = Connection {
            id,
            peer,
            world: Arc::clone(&self.world),
            table: self.table,
            max_frame: self.config.server.max_frame_size,
            active: Arc::clone(&self.active),
        };
        tokio::spawn(conn.run(stream));
    }
}

struct Connection {
    id: SessionId,
    peer: SocketAddr,
    world: Arc<World>,
    table: &'static DispatchTable,
    max_frame: usize,
    active: Arc<AtomicUsize>,
}

impl Connection {
    async fn run(self, stream: TcpStream) {
        metrics::inc_sessions_opened();
        info!(target: "fieldhost::net", "session {} opened from {}", self.id, self.peer);
        let _ = stream.set_nodelay(true);
        let (mut reader, mut writer) = stream.into_split();
        let (tx, mut rx) = mpsc::unbounded_channel::<Outbound>();

        let id = self.id;
        let writer_task = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                let frame = encode_frame(&message.encode());
                if let Err(e) = writer.write_all(&frame).await {
                    debug!(target: "fieldhost::net", "session {} write failed: {}", id, e);
                    break;
                }
            }
        });

        let mut session = Session::new(self.id, Arc::clone(&self.world), self.table, tx);
        let mut framer = Framer::new(self.max_frame);
        let mut buf = vec![0u8; READ_CHUNK];
        loop {
            match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    framer.push(&buf[..n]);
                    while let Some(frame) = framer.next_frame() {
                        session.handle(&frame);
                    }
                }
                Err(e) => {
                    debug!(target: "fieldhost::net", "session {} read failed: {}", self.id, e);
                    break;
                }
            }
        }

        session.disconnect();
        drop(session);
        if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, writer_task).await.is_err() {
            debug!(target: "fieldhost::net", "session {} writer did not drain in time", self.id);
        }
        self.active.fetch_sub(1, Ordering::Relaxed);
        metrics::inc_sessions_closed();
        info!(target: "fieldhost::net", "session {} closed", self.id);
    }
}

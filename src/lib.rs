//! # Fieldhost - Field Server Runtime for a Multiplayer World
//!
//! Fieldhost is the server side of a real-time shared world: it receives binary
//! client messages over persistent sessions, routes them through a fixed
//! dispatch table, mutates shared field state under fine-grained locking, and
//! rebroadcasts the results to everyone standing in the same zone.
//!
//! ## Features
//!
//! - **Dispatch Table**: Closed header catalogue routed through a table built once at startup.
//! - **Drop Arbitration**: At-most-once claims on dropped items and currency, with owner, party and free-for-all policies.
//! - **Party Splits**: Configurable currency share and bonus for party members standing nearby.
//! - **Companions**: Feeding, commands, affinity and level progression, movement and chat relay.
//! - **Async Design**: Built with Tokio; one task per session, lock-free broadcasts.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fieldhost::config::Config;
//! use fieldhost::server::FieldServer;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("fieldhost.toml").await?;
//!     let server = FieldServer::new(config).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`protocol`] - Field codec, header catalogue, framing and outbound messages
//! - [`field`] - Zones, actors, drops, parties, arbitration and collaborator traits
//! - [`server`] - Dispatch table, sessions, handlers and the TCP front end
//! - [`config`] - Configuration management and validation
//! - [`metrics`] - Process-wide counters
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  Field Server   │ ← TCP sessions, framing
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │ Dispatch Table  │ ← header → handler
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │  Field / World  │ ← zones, drops, arbitration
//! └─────────────────┘
//! ```

pub mod config;
pub mod field;
pub mod logutil;
pub mod metrics;
pub mod protocol;
pub mod server;

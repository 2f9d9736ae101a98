//! Multiplayer synchronization.
//!
//! A relay holds, per room, a password, the last pushed state snapshot and
//! the connected clients. Clients push whole snapshots; the relay stores
//! and rebroadcasts them verbatim. There is no merging: the last update
//! processed wins.
//!
//! - [`protocol`]: the JSON messages
//! - [`room`]: socket-free room bookkeeping
//! - [`relay`]: the tokio/WebSocket server
//! - [`client`]: a reconnecting client

pub mod protocol;
pub mod room;
pub mod relay;
pub mod client;
pub mod error;

pub use protocol::{ClientMessage, ServerMessage};
pub use room::{ConnectionId, Delivery, RoomRegistry};
pub use relay::{run, serve, RelayConfig, DEFAULT_PORT, STATUS_BANNER};
pub use client::{ClientEvent, ReconnectPolicy, RelayClient};
pub use error::SyncError;

//! # flowboard
//!
//! Rules engine and multiplayer relay for a dice-driven Kanban flow game.
//!
//! Players roll a die each round and spend its face value as work capacity
//! on tickets that travel `todo → phase1 → check → phase2 → done`. Over ten
//! rounds the scheduler drops blockers on work in progress and injects
//! urgent and fixed-date tickets. The game is played twice: session 1 with
//! individual ownership, session 2 with collaboration (a helper contributes
//! half capacity) and without the `check` column. Flow metrics of both
//! sessions are then compared.
//!
//! ## Design Principles
//!
//! 1. **Single owner**: a [`GameEngine`] owns one game's state. There are no
//!    globals, so any number of games can run side by side.
//!
//! 2. **Forgiving rules**: a rejected action returns an [`EngineError`]
//!    and leaves the state untouched. Front ends may ignore the error.
//!
//! 3. **Injectable randomness**: die rolls and blocker placement draw from
//!    a seeded [`GameRng`], so every scenario replays exactly.
//!
//! 4. **Whole-state sync**: clients exchange full snapshots through a room
//!    relay. The last update processed wins.
//!
//! ## Modules
//!
//! - `core`: players, tickets, state, actions, RNG, rules configuration
//! - `rules`: workflow, point allocation, round scheduling, the engine
//! - `history`: per-player undo
//! - `metrics`: throughput, lead time, cumulative flow
//! - `sync`: wire protocol, room relay, reconnecting client

pub mod core;
pub mod rules;
pub mod history;
pub mod metrics;
pub mod sync;

// Re-export commonly used types
pub use crate::core::{
    Action, EngineError, GameRng, GameRngState, GameRules, GameState, Player, PlayerId, Session,
    SnapshotError, Ticket, TicketId, TicketStatus, TicketType, PHASE_CAPACITY,
};

pub use crate::rules::{Allocation, AllocationTarget, GameEngine, Outcome, RoundReport};

pub use crate::history::History;

pub use crate::metrics::{FlowMetrics, SessionComparison};

pub use crate::sync::{ClientMessage, RelayClient, RelayConfig, RoomRegistry, ServerMessage, SyncError};

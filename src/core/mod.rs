//! Core game types: players, tickets, state, actions, RNG, rules.
//!
//! This module holds the data the rules operate on. It has no opinion on
//! sequencing; that lives in [`crate::rules`].

pub mod player;
pub mod ticket;
pub mod rng;
pub mod config;
pub mod action;
pub mod error;
pub mod state;

pub use player::{Player, PlayerId};
pub use ticket::{Phase, PhasePoints, Ticket, TicketId, TicketStatus, TicketType, PHASE_CAPACITY};
pub use rng::{GameRng, GameRngState, DIE_FACES};
pub use config::{BlockerWave, GameRules, TicketWave};
pub use action::Action;
pub use error::{EngineError, SnapshotError};
pub use state::{DicePool, GameState, Session};

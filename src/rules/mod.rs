//! Game rules: workflow, point allocation, round scheduling, and the
//! engine that sequences them.
//!
//! The free functions operate on a [`GameState`](crate::core::GameState)
//! directly and never touch undo history. [`GameEngine`] is the entry
//! point front ends use.

pub mod workflow;
pub mod allocation;
pub mod scheduler;
pub mod engine;

pub use workflow::{advance_ticket, assign, assign_helper, click_target, move_ticket, resolve_target};
pub use allocation::{allocate, Allocation, AllocationTarget};
pub use scheduler::{next_round, RoundReport};
pub use engine::{GameEngine, Outcome};

//! # Queuecut Gameplay
//!
//! Simulation core for the queue-cutting game.
//!
//! This crate holds everything that decides whether a sneak succeeds:
//! - Queue geometry and the open gap
//! - NPC state machines (personal cycles, global windows, forced distraction)
//! - Detection and the catch signal
//! - Entering, leaving and moving within the line, with slot reindexing
//! - Post-catch cooldown
//! - Distraction abilities
//! - Event bus for gameplay notifications
//!
//! Rendering, animation, audio and input live outside and talk to the core
//! through [`presentation::PresentationSink`] and [`simulation::Simulation`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod abilities;
pub mod behavior;
pub mod commands;
pub mod config;
pub mod context;
pub mod cooldown;
pub mod detection;
pub mod events;
pub mod insertion;
pub mod movement;
pub mod npc;
pub mod player;
pub mod presentation;
pub mod queue;
pub mod simulation;

#[cfg(test)]
mod testing;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::abilities::*;
    pub use crate::behavior::*;
    pub use crate::commands::*;
    pub use crate::config::*;
    pub use crate::context::*;
    pub use crate::cooldown::*;
    pub use crate::detection::*;
    pub use crate::events::*;
    pub use crate::insertion::*;
    pub use crate::movement::*;
    pub use crate::npc::*;
    pub use crate::player::*;
    pub use crate::presentation::*;
    pub use crate::queue::*;
    pub use crate::simulation::*;
}

pub use prelude::*;

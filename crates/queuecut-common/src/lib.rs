//! # Queuecut Common
//!
//! Common types and utilities shared by the Queuecut crates.
//!
//! - ID types (`EntityId`, `SlotIndex`)
//! - World-space geometry helpers over `glam::Vec3`
//! - Common error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod geometry;
pub mod ids;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::*;
    pub use crate::geometry::*;
    pub use crate::ids::*;
}

pub use glam::Vec3;
pub use prelude::*;

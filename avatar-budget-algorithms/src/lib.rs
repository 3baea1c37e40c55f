//! # avatar-budget algorithms
//!
//! Read-only analysis of a scene inventory and the texture pass.
//!
//! This crate computes resource metrics and rates them against platform
//! limits, classifies armature bones as kept or prunable, and rescales
//! texture images to a maximum dimension.

pub mod metrics;
pub mod bones;
pub mod textures;

// Re-export commonly used items
pub use metrics::*;
pub use bones::*;
pub use textures::*;

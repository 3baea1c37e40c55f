//! Core data structures and traits for avatar-budget
//!
//! This crate provides the scene inventory the budget engine works on:
//! polygon meshes with skin references, armatures, materials and images,
//! held in an arena and addressed by stable ids.

pub mod point;
pub mod mesh;
pub mod armature;
pub mod scene;
pub mod naming;
pub mod traits;
pub mod error;

pub use point::*;
pub use mesh::*;
pub use armature::*;
pub use scene::*;
pub use naming::*;
pub use traits::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::Point3;

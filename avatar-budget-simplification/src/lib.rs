//! Mesh decimation for avatar-budget
//!
//! This crate reduces polygon meshes toward a triangle budget:
//! - Quadric error edge collapse over a half-edge mesh
//! - Scene-wide keep ratio planning
//! - Per-mesh application with optional full triangulation

pub mod edge_collapse;
pub mod decimation;

pub use edge_collapse::*;
pub use decimation::*;

use avatar_budget_core::{Result, TriangleMesh};

/// Simplify a mesh by reducing the number of faces/vertices
pub trait MeshSimplifier {
    /// Simplify mesh keeping roughly `keep_ratio` of its faces (1.0 = unchanged)
    fn simplify(&self, mesh: &TriangleMesh, keep_ratio: f32) -> Result<TriangleMesh>;
}

//! # avatar-budget
//!
//! Bring a 3D character asset under a platform's resource budget.
//!
//! This is the umbrella crate that provides convenient access to all
//! avatar-budget functionality. Use the individual crates for more granular
//! control over dependencies.
//!
//! ## Features
//!
//! - **Core**: Scene inventory (meshes, armatures, materials, images)
//! - **Algorithms**: Resource metrics, budget rating, bone usage analysis, texture rescaling
//! - **Simplification**: Edge collapse decimation toward a triangle target
//! - **I/O**: The selection bridge exchange document
//! - **Engine**: Host operations, the full optimization pass and the bridge watch loop
//!
//! ## Quick Start
//!
//! ```rust
//! use avatar_budget::prelude::*;
//!
//! let mut scene = Scene::new();
//! let rig = Armature::new()
//!     .with_bone("Hips", None)
//!     .and_then(|a| a.with_bone("Tail", Some("Hips")))
//!     .unwrap();
//! scene.add_armature("Armature", rig);
//!
//! let body = MeshData::new(
//!     vec![
//!         Point3f::new(0.0, 0.0, 0.0),
//!         Point3f::new(1.0, 0.0, 0.0),
//!         Point3f::new(1.0, 1.0, 0.0),
//!         Point3f::new(0.0, 1.0, 0.0),
//!     ],
//!     vec![Polygon::quad(0, 1, 2, 3)],
//! )
//! .unwrap()
//! .with_vertex_groups(["Hips"]);
//! scene.add_mesh("Body", body);
//!
//! let mut engine = Engine::new(scene);
//! assert_eq!(engine.analyze().triangles, 2);
//! assert_eq!(engine.remove_unused_bones().unwrap(), 1);
//! ```
//!
//! ## Feature Flags
//!
//! - `default`: Enables every component
//! - `algorithms`: Metrics, bone analysis and texture rescaling
//! - `simplification`: Mesh decimation
//! - `io`: Bridge document I/O
//! - `engine`: The host operation surface (implies the three above)
//! - `all`: Enables all features

// Re-export core functionality
pub use avatar_budget_core::*;

// Re-export sub-crates
#[cfg(feature = "algorithms")]
pub use avatar_budget_algorithms as algorithms;

#[cfg(feature = "io")]
pub use avatar_budget_io as io;

#[cfg(feature = "simplification")]
pub use avatar_budget_simplification as simplification;

#[cfg(feature = "engine")]
pub use avatar_budget_engine as engine;

/// Convenient imports for common use cases
pub mod prelude {
    pub use avatar_budget_core::*;

    #[cfg(feature = "algorithms")]
    pub use avatar_budget_algorithms::*;

    #[cfg(feature = "io")]
    pub use avatar_budget_io::*;

    #[cfg(feature = "simplification")]
    pub use avatar_budget_simplification::*;

    #[cfg(feature = "engine")]
    pub use avatar_budget_engine::*;
}

//! # avatar-budget engine
//!
//! Host-facing operations of the resource budget reduction engine.
//!
//! The [`Engine`] owns a scene and a bridge cache. It analyzes resource
//! usage, removes unused bones, decimates meshes toward a triangle target,
//! rescales textures and applies keep/remove selections handed over through
//! the bridge file. [`BridgeWatcher`] polls that file on a fixed interval.

pub mod config;
pub mod engine;
pub mod selection;
pub mod watch;

// Re-export commonly used items
pub use config::*;
pub use engine::*;
pub use selection::*;
pub use watch::*;

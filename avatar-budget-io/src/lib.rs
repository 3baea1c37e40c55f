//! I/O for the selection bridge
//!
//! This crate reads and writes the JSON exchange document through which an
//! external authoring tool hands over a keep/remove object selection, and
//! caches it by file modification time.

pub mod bridge;
pub mod error;

pub use bridge::*;
pub use error::*;

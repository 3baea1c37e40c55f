//! Error types for avatar-budget

use thiserror::Error;

/// Main error type for avatar-budget operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No armature found")]
    NoArmature,

    #[error("No bridge data loaded")]
    NoBridgeData,

    #[error("Unknown object: {0}")]
    UnknownObject(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for avatar-budget operations
pub type Result<T> = std::result::Result<T, Error>;

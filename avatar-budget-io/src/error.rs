//! Error types for bridge I/O

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading or writing an exchange document
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl From<BridgeError> for avatar_budget_core::Error {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::Io { source, .. } => avatar_budget_core::Error::Io(source),
            parse @ BridgeError::Parse { .. } => {
                avatar_budget_core::Error::InvalidData(parse.to_string())
            }
        }
    }
}

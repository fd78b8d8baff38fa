// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Unsupported identifier kind: {0} (expected cell or wifi)")]
    UnsupportedKind(String),

    #[error("Invalid location: {0}")]
    InvalidLocation(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;

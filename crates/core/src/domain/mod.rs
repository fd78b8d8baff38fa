// Domain Layer - Identifiers, locations and resolution outcomes

pub mod error;
pub mod identifier;
pub mod location;

// Re-exports
pub use error::DomainError;
pub use identifier::{CellIdentifier, Identifier, IdentifierKind, Locatable, WifiIdentifier};
pub use location::{Location, ResolutionResult};

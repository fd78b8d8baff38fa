// Netloc Core - Identifier Model, Ports & Retrieval Engine
// NO infrastructure dependencies: caches and providers are plugged in via ports

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use application::{LocationRetriever, RetrieverConfig};
pub use error::{AppError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

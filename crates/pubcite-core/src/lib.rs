pub mod config;
pub mod error;
pub mod input;
pub mod models;

pub use config::PubciteConfig;
pub use error::{ExitCode, PubciteError, Result};
pub use input::IdentifierBatch;
pub use models::*;

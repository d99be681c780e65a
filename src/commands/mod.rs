//! CLI command implementations.

mod config;
mod serve;
mod tag;

pub use config::ConfigCmd;
pub use serve::ServeCmd;
pub use tag::TagCmd;

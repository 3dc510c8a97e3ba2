//! CLI command implementations

pub mod bootstrap;
pub mod config;
pub mod upload;

pub use bootstrap::execute as bootstrap;
pub use config::execute as config;
pub use upload::execute as upload;

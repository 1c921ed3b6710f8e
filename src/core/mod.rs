/*!
 * Core Module
 * Fundamental pipeline types, configuration and error handling
 */

pub mod config;
pub mod errors;
pub mod limits;
pub mod types;

// Re-export for convenience
pub use config::DumpConfig;
pub use errors::*;
pub use types::*;

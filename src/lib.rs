pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod remote;
pub mod storage;
pub mod sync;
pub mod table;
pub mod test_utils;

pub use error::{Result, SyncError};

/// Package version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

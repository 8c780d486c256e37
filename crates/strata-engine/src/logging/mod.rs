//! Logging utilities.
//!
//! Centralizes logger initialization. Engine code only uses the `log` facade.

mod init;

pub use init::{init_logging, LoggingConfig};

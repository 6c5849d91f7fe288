//! Logging facilities.
//!
//! Thin wrapper over `env_logger` with an engine-appropriate default filter.

mod init;

pub use init::{LoggingConfig, init_logging};

// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Command-line interface.
//!
//! Argument parsing, the `run` and `frame` commands, and the logging macros
//! used by the CLI and the batch runner.

/// CLI arguments.
pub mod args;

/// Console logging.
pub mod logging;

/// Command implementations.
pub mod run;

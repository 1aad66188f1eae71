//! `cfgctl` library
//!
//! Command definitions and a JSON-file [`FileGateway`] that drive a
//! [`ConfigurationConsole`](cfg_console::ConfigurationConsole) from the
//! command line.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod commands;
mod store;

pub use commands::{build_cli, load_config, parse_value, run, DEFAULT_STORE};
pub use store::FileGateway;

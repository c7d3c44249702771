//! Pagewright CLI library
//!
//! Drives an e2e run: serve the app under test, start the automation
//! server and wait for it, run the suite with the session settings exported,
//! then tear everything down and report the suite's exit code.

#![warn(missing_docs)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod config;
mod error;
mod harness;
mod output;
mod process;
mod server;

pub use commands::{Cli, ColorArg, Commands, ConfigArgs, E2eArgs, ServeArgs};
pub use config::{
    AutomationSection, ColorChoice, CommandSpec, HarnessConfig, RunnerSection, ServerSection,
    Verbosity, DEFAULT_CONFIG_FILE,
};
pub use error::{CliError, CliResult};
pub use harness::Harness;
pub use output::Reporter;
pub use process::{exit_code, run_runner, AutomationServer, FALLBACK_EXIT_CODE};
pub use server::{ServerHandle, StaticServer};

//! CLI command definitions using clap

use crate::config::{ColorChoice, CommandSpec, HarnessConfig};
use crate::error::CliResult;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Pagewright: serve the app, start the automation server, run the e2e suite
#[derive(Parser, Debug)]
#[command(name = "pagewright")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Harness config file (defaults to ./pagewright.yaml when present)
    #[arg(short, long, global = true, env = "PAGEWRIGHT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the app, wait for the automation server, run the suite
    E2e(E2eArgs),

    /// Serve the app directory only
    Serve(ServeArgs),

    /// Show the effective configuration
    Config(ConfigArgs),
}

/// Arguments for the e2e command
#[derive(Args, Debug, Default)]
pub struct E2eArgs {
    /// Directory holding the app under test
    #[arg(short, long)]
    pub dir: Option<PathBuf>,

    /// Port for the static server
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Command starting the automation server, split on whitespace
    #[arg(long)]
    pub automation: Option<String>,

    /// Regex marking the automation server as ready
    #[arg(long)]
    pub ready_pattern: Option<String>,

    /// Seconds to wait for the automation server
    #[arg(long)]
    pub ready_timeout: Option<u64>,

    /// Command running the suite, split on whitespace
    #[arg(long)]
    pub runner: Option<String>,
}

impl E2eArgs {
    /// Apply flags on top of the loaded config
    pub fn apply(&self, mut config: HarnessConfig) -> CliResult<HarnessConfig> {
        if let Some(ref dir) = self.dir {
            config = config.with_directory(dir.clone());
        }
        if let Some(port) = self.port {
            config = config.with_port(port);
        }
        if let Some(ref line) = self.automation {
            config = config.with_automation_command(CommandSpec::parse(line)?);
        }
        if let Some(ref pattern) = self.ready_pattern {
            config = config.with_ready_pattern(pattern.clone());
        }
        if let Some(secs) = self.ready_timeout {
            config = config.with_ready_timeout(secs);
        }
        if let Some(ref line) = self.runner {
            config = config.with_runner_command(CommandSpec::parse(line)?);
        }
        Ok(config)
    }
}

/// Arguments for the serve command
#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Directory to serve
    #[arg(short, long)]
    pub dir: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,
}

impl ServeArgs {
    /// Apply flags on top of the loaded config
    #[must_use]
    pub fn apply(&self, mut config: HarnessConfig) -> HarnessConfig {
        if let Some(ref dir) = self.dir {
            config = config.with_directory(dir.clone());
        }
        if let Some(port) = self.port {
            config = config.with_port(port);
        }
        config
    }
}

/// Arguments for the config command
#[derive(Args, Debug, Default)]
pub struct ConfigArgs {
    /// Print the environment exported to the runner instead of YAML
    #[arg(long)]
    pub env: bool,
}

/// Color argument for CLI
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

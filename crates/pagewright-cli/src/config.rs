//! Harness configuration.
//!
//! Loaded from `pagewright.yaml` (or `--config`), then overridden by command
//! line flags. Every section has defaults, so an empty file is valid:
//!
//! ```yaml
//! server:
//!   directory: src
//!   port: 8085
//! automation:
//!   command: npm run test:e2e:webdriver
//!   ready_pattern: Selenium Server is up and running
//!   ready_timeout_secs: 60
//! runner:
//!   command: npm run test:e2e:protractor
//! session:
//!   wait_timeout_ms: 5000
//! ```
//!
//! A command written as one line is split on whitespace, with no quoting.
//! Arguments that contain spaces need the list form:
//!
//! ```yaml
//! runner:
//!   command: [sh, -c, "npm run build && npm run test:e2e:protractor"]
//! ```

use crate::error::{CliError, CliResult};
use crate::server::app_url;
use pagewright::SessionConfig;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Config file picked up from the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "pagewright.yaml";

/// CLI verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Verbosity {
    /// Quiet - errors only
    Quiet,
    /// Normal - default output
    #[default]
    Normal,
    /// Verbose - harness steps are logged
    Verbose,
    /// Debug - child process output is logged too
    Debug,
}

impl Verbosity {
    /// Verbosity for `-q` and a `-v` count
    #[must_use]
    pub const fn from_flags(quiet: bool, verbose: u8) -> Self {
        if quiet {
            return Self::Quiet;
        }
        match verbose {
            0 => Self::Normal,
            1 => Self::Verbose,
            _ => Self::Debug,
        }
    }

    /// Check if quiet mode
    #[must_use]
    pub const fn is_quiet(self) -> bool {
        matches!(self, Self::Quiet)
    }

    /// Default tracing filter when `RUST_LOG` is unset
    #[must_use]
    pub const fn log_filter(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "warn",
            Self::Verbose => "info",
            Self::Debug => "debug",
        }
    }
}

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorChoice {
    /// Always use colors
    Always,
    /// Use colors when stderr is a terminal
    #[default]
    Auto,
    /// Never use colors
    Never,
}

impl ColorChoice {
    /// Should use colors based on output detection
    #[must_use]
    pub fn should_color(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => std::io::IsTerminal::is_terminal(&std::io::stderr()),
        }
    }
}

/// A program and its arguments.
///
/// In YAML either a whitespace-separated line or a list of words.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CommandLine", into = "CommandLine")]
pub struct CommandSpec {
    /// Program to execute
    pub program: String,
    /// Arguments
    pub args: Vec<String>,
}

impl CommandSpec {
    /// Split a command line on whitespace. Quotes are not interpreted.
    pub fn parse(line: &str) -> CliResult<Self> {
        Self::from_words(line.split_whitespace().map(str::to_string))
    }

    /// Program followed by its arguments, taken verbatim
    pub fn from_words(words: impl IntoIterator<Item = String>) -> CliResult<Self> {
        let mut words = words.into_iter();
        let program = words
            .next()
            .filter(|program| !program.trim().is_empty())
            .ok_or_else(|| CliError::config("command must not be empty"))?;
        Ok(Self {
            program,
            args: words.collect(),
        })
    }

    /// Whether the line form would split or drop some word
    fn needs_list(&self) -> bool {
        std::iter::once(&self.program)
            .chain(&self.args)
            .any(|word| word.is_empty() || word.contains(char::is_whitespace))
    }
}

/// Serialized form of a [`CommandSpec`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum CommandLine {
    Line(String),
    Words(Vec<String>),
}

impl TryFrom<CommandLine> for CommandSpec {
    type Error = CliError;

    fn try_from(line: CommandLine) -> CliResult<Self> {
        match line {
            CommandLine::Line(line) => Self::parse(&line),
            CommandLine::Words(words) => Self::from_words(words),
        }
    }
}

impl From<CommandSpec> for CommandLine {
    fn from(spec: CommandSpec) -> Self {
        if spec.needs_list() {
            Self::Words(std::iter::once(spec.program).chain(spec.args).collect())
        } else {
            Self::Line(spec.to_string())
        }
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Static file server settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Directory holding the app under test
    pub directory: PathBuf,
    /// HTTP port
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("src"),
            port: 8085,
        }
    }
}

impl ServerSection {
    /// URL the app is reachable at
    #[must_use]
    pub fn url(&self) -> String {
        app_url(self.port)
    }
}

/// Automation server settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationSection {
    /// Command starting the automation server
    pub command: CommandSpec,
    /// Regex matched against each stdout/stderr line to detect readiness
    pub ready_pattern: String,
    /// Seconds to wait for readiness
    pub ready_timeout_secs: u64,
}

impl Default for AutomationSection {
    fn default() -> Self {
        Self {
            command: CommandSpec {
                program: "npm".to_string(),
                args: vec!["run".to_string(), "test:e2e:webdriver".to_string()],
            },
            ready_pattern: "Selenium Server is up and running".to_string(),
            ready_timeout_secs: 60,
        }
    }
}

impl AutomationSection {
    /// Compiled readiness pattern
    pub fn ready_regex(&self) -> CliResult<Regex> {
        Regex::new(&self.ready_pattern)
            .map_err(|e| CliError::config(format!("invalid ready_pattern: {e}")))
    }
}

/// Test runner settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerSection {
    /// Command running the test suite
    pub command: CommandSpec,
}

impl Default for RunnerSection {
    fn default() -> Self {
        Self {
            command: CommandSpec {
                program: "npm".to_string(),
                args: vec!["run".to_string(), "test:e2e:protractor".to_string()],
            },
        }
    }
}

/// Complete harness configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Static file server
    pub server: ServerSection,
    /// Automation server process
    pub automation: AutomationSection,
    /// Test runner process
    pub runner: RunnerSection,
    /// Session settings exported to the runner; the base URL always follows
    /// the server port
    pub session: SessionConfig,
}

impl HarnessConfig {
    /// Create new default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse YAML
    pub fn from_yaml(yaml: &str) -> CliResult<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> CliResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Load from a file
    pub fn load(path: &Path) -> CliResult<Self> {
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            CliError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_yaml(&yaml)
    }

    /// Load `explicit` if given, else `pagewright.yaml` if present, else defaults
    pub fn discover(explicit: Option<&Path>) -> CliResult<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    Self::load(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Set the served directory
    #[must_use]
    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.server.directory = directory.into();
        self
    }

    /// Set the server port
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.server.port = port;
        self
    }

    /// Set the automation server command
    #[must_use]
    pub fn with_automation_command(mut self, command: CommandSpec) -> Self {
        self.automation.command = command;
        self
    }

    /// Set the readiness pattern
    #[must_use]
    pub fn with_ready_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.automation.ready_pattern = pattern.into();
        self
    }

    /// Set the readiness timeout
    #[must_use]
    pub const fn with_ready_timeout(mut self, secs: u64) -> Self {
        self.automation.ready_timeout_secs = secs;
        self
    }

    /// Set the runner command
    #[must_use]
    pub fn with_runner_command(mut self, command: CommandSpec) -> Self {
        self.runner.command = command;
        self
    }

    /// Check values that would only fail later
    pub fn validate(&self) -> CliResult<()> {
        let _ = self.automation.ready_regex()?;
        if self.automation.ready_timeout_secs == 0 {
            return Err(CliError::config("ready_timeout_secs must be positive"));
        }
        Ok(())
    }

    /// Session config handed to the runner
    #[must_use]
    pub fn runner_session(&self) -> SessionConfig {
        self.session.clone().with_base_url(self.server.url())
    }
}

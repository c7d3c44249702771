//! Orchestration of one e2e run
//!
//! ```text
//! serve app ──► start automation ──► wait ready ──► run suite ──► teardown
//!                                                                  ▲
//! Ctrl-C at any point ─────────────────────────────────────────────┘
//! ```
//!
//! Teardown always stops the automation server first, then the static server.

use crate::config::HarnessConfig;
use crate::error::CliResult;
use crate::output::Reporter;
use crate::process::{run_runner, AutomationServer, FALLBACK_EXIT_CODE};
use crate::server::{ServerHandle, StaticServer};
use std::time::{Duration, Instant};

/// Runs the e2e suite against the served app
#[derive(Debug)]
pub struct Harness {
    config: HarnessConfig,
    reporter: Reporter,
}

impl Harness {
    /// Create a harness
    #[must_use]
    pub fn new(config: HarnessConfig, reporter: Reporter) -> Self {
        Self { config, reporter }
    }

    /// Effective configuration
    #[must_use]
    pub const fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Run everything and return the runner's exit code
    pub async fn run(&mut self) -> CliResult<i32> {
        self.config.validate()?;
        let started = Instant::now();
        self.reporter.header("pagewright e2e");

        let server = StaticServer::new(&self.config.server.directory, self.config.server.port)
            .spawn()
            .await?;
        self.reporter.info(&format!(
            "serving {} at {}",
            self.config.server.directory.display(),
            server.url()
        ));

        let mut automation = None;
        let outcome = tokio::select! {
            result = drive(&self.config, &mut self.reporter, &server, &mut automation) => Some(result),
            () = interrupted() => None,
        };
        self.reporter.stop_spinner();

        let outcome = outcome.unwrap_or_else(|| {
            self.reporter.warning("interrupted, shutting down");
            Ok(FALLBACK_EXIT_CODE)
        });

        if let Some(mut automation) = automation.take() {
            if let Err(e) = automation.stop().await {
                self.reporter
                    .warning(&format!("could not stop `{}`: {e}", automation.command()));
            }
        }
        if let Err(e) = server.stop().await {
            self.reporter.warning(&format!("could not stop static server: {e}"));
        }

        let code = outcome?;
        self.reporter.outcome(code, started.elapsed());
        Ok(code)
    }

    /// Serve the app until Ctrl-C
    pub async fn serve(&mut self) -> CliResult<()> {
        let mut server = StaticServer::new(&self.config.server.directory, self.config.server.port)
            .spawn()
            .await?;
        self.reporter.success(&format!(
            "serving {} at {} (Ctrl-C to stop)",
            self.config.server.directory.display(),
            server.url()
        ));

        let stopped = tokio::select! {
            result = server.wait() => Some(result),
            () = interrupted() => None,
        };
        match stopped {
            Some(result) => result,
            None => server.stop().await,
        }
    }
}

async fn drive(
    config: &HarnessConfig,
    reporter: &mut Reporter,
    server: &ServerHandle,
    automation: &mut Option<AutomationServer>,
) -> CliResult<i32> {
    let pattern = config.automation.ready_regex()?;
    let command = &config.automation.command;

    reporter.start_spinner(&format!("waiting for `{command}`"));
    let process = automation.insert(AutomationServer::spawn(command, pattern)?);
    let ready = process
        .wait_ready(Duration::from_secs(config.automation.ready_timeout_secs))
        .await;
    reporter.stop_spinner();
    ready?;
    reporter.success(&format!("`{command}` is ready"));

    let session = config.session.clone().with_base_url(server.url());
    reporter.info(&format!("running `{}`", config.runner.command));
    run_runner(&config.runner.command, &session.env_vars()).await
}

/// Resolves on Ctrl-C; never resolves when the handler cannot be installed
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

#[cfg(all(test, unix))]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::CommandSpec;
    use crate::error::CliError;

    fn sh(script: &str) -> CommandSpec {
        CommandSpec {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
        }
    }

    fn harness(dir: &std::path::Path, automation: &str, runner: &str) -> Harness {
        let config = HarnessConfig::new()
            .with_directory(dir)
            .with_port(0)
            .with_automation_command(sh(automation))
            .with_ready_pattern("up and running")
            .with_ready_timeout(10)
            .with_runner_command(sh(runner));
        Harness::new(config, Reporter::new(false, true))
    }

    #[tokio::test]
    async fn test_runner_exit_code_is_returned() {
        let dir = tempfile::tempdir().unwrap();
        let mut harness = harness(
            dir.path(),
            "echo 'Selenium Server is up and running'; sleep 30",
            "exit 4",
        );
        assert_eq!(harness.run().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_runner_sees_served_app() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "catalog").unwrap();
        let mut harness = harness(
            dir.path(),
            "echo 'up and running' >&2; sleep 30",
            "case \"$PAGEWRIGHT_BASE_URL\" in http://127.0.0.1:*) exit 0;; *) exit 9;; esac",
        );
        assert_eq!(harness.run().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_automation_never_ready() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran");
        let runner = format!("touch {}", marker.display());
        let mut harness = harness(dir.path(), "exit 2", &runner);

        let err = harness.run().await.unwrap_err();
        assert!(matches!(err, CliError::Process { .. }));
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn test_invalid_pattern_fails_before_serving() {
        let dir = tempfile::tempdir().unwrap();
        let mut harness = harness(dir.path(), "true", "true");
        harness.config.automation.ready_pattern = "(".to_string();
        assert!(matches!(
            harness.run().await.unwrap_err(),
            CliError::Config { .. }
        ));
    }

    #[tokio::test]
    async fn test_missing_directory() {
        let mut harness = harness(std::path::Path::new("/nonexistent/app"), "true", "true");
        assert!(matches!(
            harness.run().await.unwrap_err(),
            CliError::Server { .. }
        ));
    }
}

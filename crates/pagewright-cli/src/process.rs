//! Child process supervision: the automation server and the suite runner

use crate::config::CommandSpec;
use crate::error::{CliError, CliResult};
use regex::Regex;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Time a stopped process group gets before it is killed
const STOP_GRACE: Duration = Duration::from_secs(2);

/// Exit code reported when the runner ends without one (killed by a signal)
pub const FALLBACK_EXIT_CODE: i32 = 1;

/// Exit code of a finished process, [`FALLBACK_EXIT_CODE`] when there is none
#[must_use]
pub fn exit_code(code: Option<i32>) -> i32 {
    code.unwrap_or(FALLBACK_EXIT_CODE)
}

/// A long-running automation server (e.g. a Selenium standalone)
///
/// Started in its own process group so that stopping it also stops the
/// processes it launched.
#[derive(Debug)]
pub struct AutomationServer {
    command: String,
    pattern: Regex,
    child: Child,
    pid: Option<u32>,
    ready: mpsc::Receiver<()>,
    readers: Vec<JoinHandle<()>>,
}

impl AutomationServer {
    /// Start `spec` and watch its output for `pattern`
    pub fn spawn(spec: &CommandSpec, pattern: Regex) -> CliResult<Self> {
        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command
            .spawn()
            .map_err(|e| CliError::process(spec, e.to_string()))?;
        let pid = child.id();
        tracing::info!(command = %spec, ?pid, "automation server started");

        let (tx, ready) = mpsc::channel(1);
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(tokio::spawn(watch_output(
                stdout,
                "stdout",
                pattern.clone(),
                tx.clone(),
            )));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(tokio::spawn(watch_output(
                stderr,
                "stderr",
                pattern.clone(),
                tx,
            )));
        }

        Ok(Self {
            command: spec.to_string(),
            pattern,
            child,
            pid,
            ready,
            readers,
        })
    }

    /// Command line this server was started with
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Wait until a line of output matches the readiness pattern.
    ///
    /// `timeout` bounds the whole wait, including a process that closes its
    /// output streams without exiting.
    pub async fn wait_ready(&mut self, timeout: Duration) -> CliResult<()> {
        let deadline = Instant::now() + timeout;
        let not_ready = || CliError::Readiness {
            pattern: self.pattern.to_string(),
            timeout_secs: timeout.as_secs(),
        };

        match tokio::time::timeout_at(deadline, self.ready.recv()).await {
            Ok(Some(())) => {
                tracing::info!(command = %self.command, "automation server ready");
                return Ok(());
            }
            Ok(None) => {}
            Err(_) => return Err(not_ready()),
        }

        tracing::debug!(command = %self.command, "automation server closed its output");
        match tokio::time::timeout_at(deadline, self.child.wait()).await {
            Ok(status) => Err(CliError::process(
                &self.command,
                format!("exited before reporting readiness ({})", status?),
            )),
            Err(_) => Err(not_ready()),
        }
    }

    /// Whether the process is still running
    pub fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Terminate the process group, then kill whatever is left
    pub async fn stop(&mut self) -> CliResult<()> {
        if self.is_running() {
            #[cfg(unix)]
            self.signal_group(nix::sys::signal::Signal::SIGTERM);

            if tokio::time::timeout(STOP_GRACE, self.child.wait())
                .await
                .is_err()
            {
                tracing::warn!(command = %self.command, "automation server ignored SIGTERM");
                #[cfg(unix)]
                self.signal_group(nix::sys::signal::Signal::SIGKILL);
                self.child.kill().await?;
            }
        }
        #[cfg(unix)]
        self.signal_group(nix::sys::signal::Signal::SIGKILL);

        for reader in self.readers.drain(..) {
            reader.abort();
        }
        tracing::info!(command = %self.command, "automation server stopped");
        Ok(())
    }

    #[cfg(unix)]
    fn signal_group(&self, signal: nix::sys::signal::Signal) {
        use nix::sys::signal::killpg;
        use nix::unistd::Pid;

        // the group outlives the leader, so use the pid recorded at spawn
        let Some(pid) = self.pid.and_then(|id| i32::try_from(id).ok()) else {
            return;
        };
        if let Err(errno) = killpg(Pid::from_raw(pid), signal) {
            tracing::debug!(pid, %signal, %errno, "killpg failed");
        }
    }
}

impl Drop for AutomationServer {
    fn drop(&mut self) {
        #[cfg(unix)]
        {
            if self.is_running() {
                self.signal_group(nix::sys::signal::Signal::SIGKILL);
            }
        }
        for reader in &self.readers {
            reader.abort();
        }
    }
}

async fn watch_output<R>(stream: R, name: &'static str, pattern: Regex, tx: mpsc::Sender<()>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut lines = BufReader::new(stream).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        tracing::debug!(target: "pagewright::automation", stream = name, "{line}");
        if pattern.is_match(&line) {
            let _ = tx.try_send(());
        }
    }
}

/// Run the suite with inherited stdio and return its exit code
pub async fn run_runner(spec: &CommandSpec, envs: &[(&str, String)]) -> CliResult<i32> {
    let mut command = Command::new(&spec.program);
    command
        .args(&spec.args)
        .envs(envs.iter().map(|(key, value)| (*key, value.as_str())))
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .kill_on_drop(true);

    tracing::info!(command = %spec, "runner started");
    let status = command
        .status()
        .await
        .map_err(|e| CliError::process(spec, e.to_string()))?;
    let code = exit_code(status.code());
    tracing::info!(command = %spec, code, "runner finished");
    Ok(code)
}

#[cfg(all(test, unix))]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn sh(script: &str) -> CommandSpec {
        CommandSpec {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
        }
    }

    fn selenium_ready() -> Regex {
        Regex::new("Selenium Server is up and running").unwrap()
    }

    mod exit_code_tests {
        use super::*;

        #[test]
        fn test_exit_code() {
            assert_eq!(exit_code(Some(0)), 0);
            assert_eq!(exit_code(Some(3)), 3);
            assert_eq!(exit_code(None), FALLBACK_EXIT_CODE);
        }
    }

    mod automation_tests {
        use super::*;

        #[tokio::test]
        async fn test_ready_on_stderr() {
            let spec = sh("echo booting; echo 'Selenium Server is up and running' >&2; sleep 30");
            let mut server = AutomationServer::spawn(&spec, selenium_ready()).unwrap();
            server.wait_ready(Duration::from_secs(10)).await.unwrap();
            assert!(server.is_running());

            server.stop().await.unwrap();
            assert!(!server.is_running());
        }

        #[tokio::test]
        async fn test_ready_on_stdout() {
            let spec = sh("echo 'INFO - Selenium Server is up and running on port 4444'; sleep 30");
            let mut server = AutomationServer::spawn(&spec, selenium_ready()).unwrap();
            server.wait_ready(Duration::from_secs(10)).await.unwrap();
            server.stop().await.unwrap();
        }

        #[tokio::test]
        async fn test_readiness_timeout() {
            let mut server = AutomationServer::spawn(&sh("sleep 30"), selenium_ready()).unwrap();
            let err = server
                .wait_ready(Duration::from_millis(200))
                .await
                .unwrap_err();
            assert!(matches!(err, CliError::Readiness { .. }));
            server.stop().await.unwrap();
        }

        #[tokio::test]
        async fn test_readiness_timeout_after_output_closed() {
            let spec = sh("exec >/dev/null 2>&1; sleep 30");
            let mut server = AutomationServer::spawn(&spec, selenium_ready()).unwrap();
            let started = Instant::now();
            let err = server
                .wait_ready(Duration::from_millis(500))
                .await
                .unwrap_err();
            assert!(matches!(err, CliError::Readiness { .. }));
            assert!(started.elapsed() < Duration::from_secs(5));
            assert!(server.is_running());
            server.stop().await.unwrap();
        }

        #[tokio::test]
        async fn test_exit_before_ready() {
            let mut server = AutomationServer::spawn(&sh("exit 3"), selenium_ready()).unwrap();
            let err = server
                .wait_ready(Duration::from_secs(10))
                .await
                .unwrap_err();
            assert!(matches!(err, CliError::Process { .. }));
            server.stop().await.unwrap();
        }

        #[tokio::test]
        async fn test_missing_program() {
            let spec = CommandSpec::parse("pagewright-no-such-program --flag").unwrap();
            let err = AutomationServer::spawn(&spec, selenium_ready()).unwrap_err();
            assert!(err.to_string().contains("pagewright-no-such-program"));
        }
    }

    mod runner_tests {
        use super::*;

        #[tokio::test]
        async fn test_exit_code_propagates() {
            assert_eq!(run_runner(&sh("exit 0"), &[]).await.unwrap(), 0);
            assert_eq!(run_runner(&sh("exit 7"), &[]).await.unwrap(), 7);
        }

        #[tokio::test]
        async fn test_killed_runner_maps_to_fallback() {
            let code = run_runner(&sh("kill -9 $$"), &[]).await.unwrap();
            assert_eq!(code, FALLBACK_EXIT_CODE);
        }

        #[tokio::test]
        async fn test_env_is_exported() {
            let envs = [("PAGEWRIGHT_BASE_URL", "http://localhost:9123".to_string())];
            let spec = sh("test \"$PAGEWRIGHT_BASE_URL\" = http://localhost:9123");
            assert_eq!(run_runner(&spec, &envs).await.unwrap(), 0);
        }
    }
}

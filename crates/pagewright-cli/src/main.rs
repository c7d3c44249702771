//! Pagewright CLI
//!
//! ## Usage
//!
//! ```bash
//! pagewright e2e                          # serve ./src on :8085, start webdriver, run protractor
//! pagewright e2e --runner "cargo test"    # any suite runner
//! pagewright serve --port 9000            # serve the app only
//! pagewright config --env                 # variables exported to the runner
//! ```

use clap::Parser;
use pagewright_cli::{
    Cli, CliError, CliResult, ColorChoice, Commands, ConfigArgs, Harness, HarnessConfig, Reporter,
    Verbosity,
};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let verbosity = Verbosity::from_flags(cli.quiet, cli.verbose);
    let color: ColorChoice = cli.color.clone().into();
    init_tracing(verbosity, color);

    match run(cli, verbosity, color) {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbosity: Verbosity, color: ColorChoice) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.log_filter()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(color.should_color())
        .with_target(false)
        .try_init();
}

fn run(cli: Cli, verbosity: Verbosity, color: ColorChoice) -> CliResult<i32> {
    let config = HarnessConfig::discover(cli.config.as_deref())?;
    let reporter = Reporter::new(color.should_color(), verbosity.is_quiet());

    match cli.command {
        Commands::E2e(args) => {
            let config = args.apply(config)?;
            block_on(async move { Harness::new(config, reporter).run().await })
        }
        Commands::Serve(args) => {
            let config = args.apply(config);
            block_on(async move { Harness::new(config, reporter).serve().await })?;
            Ok(0)
        }
        Commands::Config(args) => {
            run_config(&config, &args)?;
            Ok(0)
        }
    }
}

fn block_on<T>(future: impl std::future::Future<Output = CliResult<T>>) -> CliResult<T> {
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::config(format!("Failed to create runtime: {e}")))?;
    rt.block_on(future)
}

fn run_config(config: &HarnessConfig, args: &ConfigArgs) -> CliResult<()> {
    if args.env {
        for (key, value) in config.runner_session().env_vars() {
            println!("{key}={value}");
        }
    } else {
        print!("{}", config.to_yaml()?);
    }
    Ok(())
}

mod app;
mod cli;
mod error;
mod model;
mod plugin;
mod toolchain;
mod ui;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use app::App;
use cli::Cli;
use model::config::AppConfig;
use toolchain::Toolchain;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let _guard = match init_logging(cli.verbose) {
        Ok(guard) => guard,
        Err(err) => {
            ui::error(&format!("cozi: logging disabled: {err:#}"));
            None
        }
    };

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("command failed: {err:#}");
            ui::error(&format!("Error: {err:#}"));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = AppConfig::load().context("loading configuration")?;
    if let Some(root) = cli.root.as_deref() {
        config = config.with_root(root);
    }
    tracing::info!(command = ?cli.command, root = %config.root_dir().display(), "cozi starting");

    let toolchain = Toolchain::system(&config, cli.verbose);
    let app = App::new(&config, toolchain);
    app.run(&cli.command)?;
    Ok(())
}

/// Logs to a daily file under the data dir; `verbose` mirrors them to stderr.
fn init_logging(verbose: bool) -> Result<Option<WorkerGuard>> {
    let default_filter = if verbose { "cozi=debug" } else { "cozi=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let log_dir =
        directories::ProjectDirs::from("", "", "cozi").map(|d| d.data_dir().to_path_buf());
    let (file_layer, guard) = match log_dir {
        Some(log_dir) => {
            std::fs::create_dir_all(&log_dir)
                .with_context(|| format!("creating {}", log_dir.display()))?;
            let file_appender = tracing_appender::rolling::daily(&log_dir, "cozi.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let stderr_layer = verbose.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();

    Ok(guard)
}

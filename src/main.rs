use anyhow::{Context, Result};
use auto_build::spec::AUTO_BUILD_DIR;
use auto_build::ui::ConsoleUI;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

mod cmd;

#[derive(Parser)]
#[command(name = "auto-build")]
#[command(
    version,
    about = "Autonomous multi-session coding orchestrator",
    after_help = "Environment:\n  CLAUDE_CODE_OAUTH_TOKEN  OAuth token for the Claude CLI (required; run 'claude setup-token')\n  AUTO_BUILD_MODEL         Override the default model\n  CLAUDE_CMD               Claude CLI binary to run"
)]
pub struct Cli {
    /// List all specs and their status
    #[arg(long)]
    pub list: bool,

    /// Spec to run (e.g. '001' or '001-feature-name')
    #[arg(long)]
    pub spec: Option<String>,

    /// Project directory (default: current working directory)
    #[arg(long)]
    pub project_dir: Option<PathBuf>,

    /// Maximum number of build sessions (default: unlimited, runs until all tests pass)
    #[arg(long)]
    pub max_iterations: Option<u32>,

    /// Claude model to use
    #[arg(long)]
    pub model: Option<String>,

    #[arg(short, long)]
    pub verbose: bool,
}

/// Load `.env` files; variables already set in the environment win.
fn load_env(project_dir: &Path) {
    for path in [
        project_dir.join(AUTO_BUILD_DIR).join(".env"),
        project_dir.join(".env"),
    ] {
        if path.is_file()
            && let Err(e) = dotenvy::from_path(&path)
        {
            eprintln!("Warning: failed to load {}: {}", path.display(), e);
        }
    }
}

/// File logging under `auto-build/logs/`, plus stderr when verbose.
///
/// The returned guard flushes the log file on drop.
fn init_logging(project_dir: &Path, verbose: bool) -> Option<WorkerGuard> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("auto_build={}", level)));

    let log_dir = project_dir.join(AUTO_BUILD_DIR).join("logs");
    let (file_layer, guard) = if log_dir.parent().is_some_and(Path::is_dir)
        && std::fs::create_dir_all(&log_dir).is_ok()
    {
        let appender = tracing_appender::rolling::never(&log_dir, "auto-build.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        (
            Some(fmt::layer().with_writer(writer).with_ansi(false)),
            Some(guard),
        )
    } else {
        (None, None)
    };

    let stderr_layer = verbose.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
    });

    // Ignore the error if a subscriber is already installed.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init();
    guard
}

async fn run(cli: &Cli, project_dir: &Path) -> Result<ExitCode> {
    let ui = ConsoleUI::stdout(cli.verbose);
    if cli.list {
        ui.banner();
        cmd::cmd_list(project_dir)?;
        return Ok(ExitCode::SUCCESS);
    }
    cmd::cmd_run(cli, project_dir, &ui).await
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let project_dir = match cli.project_dir.clone() {
        Some(dir) => Ok(dir),
        None => std::env::current_dir().context("Failed to get current directory"),
    };
    let project_dir = match project_dir {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("\nFatal error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    load_env(&project_dir);
    let _guard = init_logging(&project_dir, cli.verbose);
    tracing::debug!(project_dir = %project_dir.display(), "auto-build starting");

    match run(&cli, &project_dir).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "fatal error");
            eprintln!("\nFatal error: {:#}", e);
            if cli.verbose {
                eprintln!("\n{:?}", e);
            }
            ExitCode::FAILURE
        }
    }
}

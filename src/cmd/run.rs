//! Spec execution: `auto-build --spec <id>`, including the Ctrl-C steering flow.

use anyhow::{Context, Result};
use auto_build::agent::ClaudeCli;
use auto_build::config::{Config, RunOptions, validate_environment};
use auto_build::errors::OrchestratorError;
use auto_build::orchestrator::{FailureReason, Orchestrator, RunOutcome, RunSummary};
use auto_build::spec::find_spec;
use auto_build::steering::{self, SteeringChoice, SteeringOutcome};
use auto_build::tracker::GitTracker;
use auto_build::ui::ConsoleUI;
use auto_build::ui::icons::STEER;
use console::style;
use dialoguer::Input;
use std::io::Cursor;
use std::path::Path;
use std::process::ExitCode;

use super::super::Cli;
use super::list::print_specs_list;

fn rule(c: char) -> String {
    c.to_string().repeat(70)
}

fn print_box(c: char, title: &str) {
    println!("\n{}", rule(c));
    println!("  {}", title);
    println!("{}", rule(c));
}

fn print_usage() {
    println!("\nUsage:");
    println!("  auto-build --list           # See all specs");
    println!("  auto-build --spec 001       # Run a spec");
}

fn report_precondition(err: &OrchestratorError) {
    println!("\n{} {}", style("Error:").red().bold(), err);
    if let OrchestratorError::MissingCredential { var } = err {
        println!("\nGet your OAuth token by running:");
        println!("  claude setup-token");
        println!("\nThen set it:");
        println!("  export {}='your-token-here'", var);
    }
}

/// Resolves once on the first Ctrl-C; never resolves if no handler can be installed.
async fn first_ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "could not listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

pub async fn cmd_run(cli: &Cli, project_dir: &Path, ui: &ConsoleUI) -> Result<ExitCode> {
    let Some(identifier) = cli.spec.as_deref() else {
        ui.banner();
        println!("\n{} --spec is required", style("Error:").red().bold());
        print_usage();
        return Ok(ExitCode::FAILURE);
    };

    let spec_dir = match find_spec(project_dir, identifier) {
        Ok(dir) => dir,
        Err(e @ OrchestratorError::SpecNotFound { .. }) => {
            ui.banner();
            println!("\n{} {}", style("Error:").red().bold(), e);
            println!("\nAvailable specs:");
            print_specs_list(project_dir);
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e.into()),
    };

    let config = Config::new(
        project_dir,
        &spec_dir,
        RunOptions {
            model: cli.model.clone(),
            max_iterations: cli.max_iterations,
            verbose: cli.verbose,
        },
    )?;

    ui.banner();
    ui.run_header(
        &config.project_dir,
        &config.spec_name(),
        &config.model,
        config.max_iterations,
    );
    ui.blank();

    if let Err(e) = validate_environment(&config.spec_dir) {
        tracing::error!(error = %e, "precondition failed");
        report_precondition(&e);
        return Ok(ExitCode::FAILURE);
    }

    let agent = ClaudeCli::new(&config);
    tracing::info!(command = %agent.command_line(), "agent command");

    let orchestrator = Orchestrator::new(&agent, &config, ui);
    let summary = orchestrator.run_until(first_ctrl_c()).await?;

    match summary.outcome {
        RunOutcome::Interrupted => {
            handle_interrupt(&config, &summary).await?;
        }
        _ => print_summary(&config, &summary, ui),
    }
    Ok(ExitCode::SUCCESS)
}

fn print_summary(config: &Config, summary: &RunSummary, ui: &ConsoleUI) {
    let sessions = format!(
        "{} build session(s), {} QA session(s) this run",
        summary.build_sessions, summary.qa_sessions
    );
    match &summary.outcome {
        RunOutcome::Done => {
            print_box('=', "BUILD COMPLETE");
            ui.success(&format!(
                "All {} tests passing and QA approved",
                summary.progress.total
            ));
            println!("{}", sessions);
        }
        RunOutcome::Failed(reason) => {
            print_box('=', "BUILD STOPPED");
            ui.error(&reason.to_string());
            ui.progress_summary(summary.progress);
            println!("{}", sessions);
            match reason {
                FailureReason::BudgetExhausted { .. } => {
                    println!("\nTo continue building, run again:");
                    println!("  auto-build --spec {}", config.spec_name());
                }
                FailureReason::QaError(_) => {
                    println!(
                        "\nCheck {} and rerun to retry QA.",
                        config.spec_dir.join("implementation_plan.json").display()
                    );
                }
                FailureReason::QaBudgetExhausted { .. } => {
                    println!("\nReview the QA findings in implementation_plan.json, then rerun.");
                }
            }
        }
        RunOutcome::Interrupted => {}
    }
    println!();
}

async fn handle_interrupt(config: &Config, summary: &RunSummary) -> Result<()> {
    print_box('-', "PAUSED BY USER (Ctrl+C)");
    println!("\nProgress has been saved via Git commits.");
    if let Some(head) = GitTracker::open(&config.project_dir).and_then(|g| g.head_summary()) {
        println!("Last commit: {}", style(head).dim());
    }
    println!(
        "Progress: {} tests passing",
        style(summary.progress).cyan()
    );

    // A second Ctrl-C while collecting input exits immediately.
    tokio::spawn(async {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\n\nExiting...");
            std::process::exit(0);
        }
    });

    let spec_dir = config.spec_dir.clone();
    let outcome = tokio::task::spawn_blocking(move || prompt_for_steering(&spec_dir))
        .await
        .context("Steering prompt task failed")??;

    match outcome {
        SteeringOutcome::Quit => {
            println!("\nExiting...");
            return Ok(());
        }
        SteeringOutcome::Saved(path) => {
            print_box('=', "INSTRUCTIONS SAVED");
            println!("\nYour instructions have been saved to:");
            println!("  {}", path.display());
            println!("\nThe agent will read and follow these instructions when you resume.");
        }
        SteeringOutcome::NoInput => println!("\nNo instructions provided."),
    }

    print_box('-', "TO RESUME");
    println!("\nRun the same command:");
    println!("  auto-build --spec {}", config.spec_name());
    println!();
    Ok(())
}

fn read_choice() -> SteeringChoice {
    match Input::<String>::new()
        .with_prompt("Your choice [1/2/3/n/q]")
        .allow_empty(true)
        .interact_text()
    {
        Ok(answer) => SteeringChoice::parse(&answer),
        Err(e) => {
            tracing::debug!(error = %e, "no steering choice read");
            SteeringChoice::Skip
        }
    }
}

fn prompt_for_steering(spec_dir: &Path) -> Result<SteeringOutcome> {
    print_box('=', &format!("{}ADD INSTRUCTIONS FOR THE AGENT", STEER));
    println!("\nOptions:");
    println!("  [1] Type instructions directly (press Enter on an empty line when done)");
    println!("  [2] Paste instructions (same as 1)");
    println!("  [3] Read from file");
    println!("  [n] Skip - don't add instructions");
    println!("  [q] Quit without resuming");
    println!();

    let choice = read_choice();
    match choice {
        SteeringChoice::Type => {
            println!("\n{}", rule('-'));
            println!("Enter/paste your instructions below.");
            println!("Press Enter on an empty line when done:");
            println!("{}", rule('-'));
            let stdin = std::io::stdin();
            steering::collect_steering(choice, &mut stdin.lock(), spec_dir)
        }
        SteeringChoice::File => {
            let path = Input::<String>::new()
                .with_prompt("Path to your instructions file")
                .allow_empty(true)
                .interact_text()
                .unwrap_or_default();
            let mut answer = Cursor::new(format!("{}\n", path));
            steering::collect_steering(choice, &mut answer, spec_dir)
        }
        SteeringChoice::Skip | SteeringChoice::Quit => {
            steering::collect_steering(choice, &mut std::io::empty(), spec_dir)
        }
    }
}

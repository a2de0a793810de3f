use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;

use audio_workflow_core::{
    Environment, RunPlan, RunRequest, RunSummary, WorkflowOrchestrator, config, format_config,
    format_databases, format_steps, format_workflows,
};

#[derive(Parser)]
#[command(name = "audio-workflow", version)]
#[command(about = "Transcribe audio, generate deepcast notes, and upload them to Notion")]
struct Cli {
    /// Configuration file (skips discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a workflow on an audio file
    Run {
        /// Audio file to process
        audio_file: PathBuf,

        /// Page title (defaults to the audio file name)
        #[arg(short, long)]
        title: Option<String>,

        /// Database name from the configuration
        #[arg(short, long)]
        database: Option<String>,

        /// Workflow name from the configuration
        #[arg(short, long)]
        workflow: Option<String>,

        /// Keep transcript and deepcast files after a successful run
        #[arg(short, long, overrides_with = "no_keep_files")]
        keep_files: bool,

        /// Delete intermediate files even when the configuration keeps them
        #[arg(long, overrides_with = "keep_files")]
        no_keep_files: bool,

        /// Resolve and print the plan without running any step
        #[arg(long)]
        dry_run: bool,

        /// Print the dry-run plan as JSON
        #[arg(long, requires = "dry_run")]
        json: bool,
    },

    /// List configured workflows
    ListWorkflows,

    /// List configured databases
    ListDatabases,

    /// Show the loaded configuration
    ShowConfig {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

/// `None` leaves the choice to the configuration.
fn keep_files_override(keep_files: bool, no_keep_files: bool) -> Option<bool> {
    match (keep_files, no_keep_files) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match verbose {
        0 => "audio_workflow=info,audio_workflow_core=info",
        1 => "audio_workflow=debug,audio_workflow_core=debug",
        _ => "audio_workflow=trace,audio_workflow_core=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn print_plan(plan: &RunPlan) {
    println!(
        "\n{}  {}\n",
        style("audio-workflow").cyan().bold(),
        style("Starting").dim()
    );
    println!("   {} {}", style("File:").dim(), plan.audio_file.display());
    println!("   {} {}", style("Title:").dim(), plan.title);
    println!(
        "   {} {} {}",
        style("Database:").dim(),
        plan.database,
        style(format!("({})", plan.database_id)).dim()
    );
    println!("   {} {}", style("Workflow:").dim(), plan.workflow);
    println!("   {} {}", style("Steps:").dim(), format_steps(plan));
    println!("{}", style("─".repeat(60)).dim());
}

fn print_summary(summary: &RunSummary) {
    println!("{}", style("─".repeat(60)).dim());
    for step in &summary.completed {
        println!("{} {}", style("✓").green().bold(), step);
    }
    for step in &summary.skipped {
        println!("{} {} {}", style("-").dim(), step, style("(skipped)").dim());
    }
    for path in &summary.removed {
        println!("{} {}", style("Cleaned up:").dim(), path.display());
    }
    for path in &summary.kept {
        println!("{} {}", style("Kept:").dim(), path.display());
    }
    for failure in &summary.cleanup_failures {
        println!("{} {}", style("!").yellow().bold(), failure);
    }
    println!(
        "\n{}",
        style("✓ Workflow completed successfully!").green().bold()
    );
    println!(
        "{} {}\n",
        style("Output directory:").dim(),
        style(summary.output_dir.display()).cyan()
    );
}

fn fail(err: impl std::fmt::Display) -> ! {
    eprintln!("{} {}", style("Error:").red().bold(), err);
    std::process::exit(1);
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // A missing .env is fine; the environment may already carry credentials.
    if let Err(e) = dotenvy::dotenv()
        && !e.not_found()
    {
        tracing::warn!("could not load .env: {e}");
    }

    let env = Environment::capture().context("Failed to read the process environment")?;
    let loaded = config::resolve(cli.config.as_deref(), &env);
    let orchestrator = WorkflowOrchestrator::new(loaded, env);

    match cli.command {
        Command::Run {
            audio_file,
            title,
            database,
            workflow,
            keep_files,
            no_keep_files,
            dry_run,
            json,
        } => {
            let request = RunRequest {
                audio_file,
                title,
                database,
                workflow,
                keep_files: keep_files_override(keep_files, no_keep_files),
            };

            let plan = orchestrator.plan(&request).unwrap_or_else(|e| fail(e));
            if json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
                return Ok(());
            }
            print_plan(&plan);

            if dry_run {
                println!("{} no steps executed\n", style("Dry run:").yellow().bold());
                return Ok(());
            }

            let summary = orchestrator.execute(&plan).await.unwrap_or_else(|e| fail(e));
            print_summary(&summary);
        }
        Command::ListWorkflows => print!("{}", format_workflows(orchestrator.config())),
        Command::ListDatabases => print!("{}", format_databases(orchestrator.config())),
        Command::ShowConfig { json } => {
            let config = orchestrator.config();
            let env = orchestrator.environment();
            if json {
                let paths = config.resolve_paths(env);
                let dump = serde_json::json!({
                    "source": orchestrator.source().to_string(),
                    "config": config,
                    "output_dir": paths.output_dir,
                    "temp_dir": paths.temp_dir,
                });
                println!("{}", serde_json::to_string_pretty(&dump)?);
            } else {
                print!("{}", format_config(config, orchestrator.source(), env));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_flags(args: &[&str]) -> Option<bool> {
        let argv = ["audio-workflow", "run", "meeting.mp3"].iter().chain(args).copied();
        let cli = Cli::try_parse_from(argv).unwrap();
        match cli.command {
            Command::Run {
                keep_files,
                no_keep_files,
                ..
            } => keep_files_override(keep_files, no_keep_files),
            _ => panic!("expected the run command"),
        }
    }

    #[test]
    fn keep_files_flags() {
        assert_eq!(run_flags(&[]), None);
        assert_eq!(run_flags(&["--keep-files"]), Some(true));
        assert_eq!(run_flags(&["--no-keep-files"]), Some(false));
        assert_eq!(run_flags(&["--keep-files", "--no-keep-files"]), Some(false));
        assert_eq!(run_flags(&["--no-keep-files", "-k"]), Some(true));
    }

    #[test]
    fn json_needs_dry_run() {
        assert!(Cli::try_parse_from(["audio-workflow", "run", "a.mp3", "--json"]).is_err());
        assert!(
            Cli::try_parse_from(["audio-workflow", "run", "a.mp3", "--dry-run", "--json"]).is_ok()
        );
    }
}

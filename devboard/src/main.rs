//! `devboard` command-line front end.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Days, Local, NaiveDate};
use clap::{Parser, Subcommand};

use devboard::ask::Assistant;
use devboard::core::codec::serialize_task;
use devboard::core::types::TaskStatus;
use devboard::exit_codes;
use devboard::io::config::{API_KEY_ENV, load_config};
use devboard::io::task_store::load_tasks;
use devboard::io::transport::AnthropicTransport;
use devboard::io::workspace::{InitOptions, Workspace, init_project};
use devboard::logging;

#[derive(Parser)]
#[command(
    name = "devboard",
    version,
    about = "Plain-text project board with a tool-using assistant"
)]
struct Cli {
    /// Workspace root holding `config.toml` and `projects/`.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the workspace config (if missing) and an empty project.
    Init {
        project: String,
        /// Overwrite existing documents.
        #[arg(short, long)]
        force: bool,
    },
    /// Print the project's tasks.
    List {
        project: String,
        /// Only tasks with this status (open, in_progress, done).
        #[arg(long)]
        status: Option<TaskStatus>,
    },
    /// Ask the assistant about a project.
    Ask {
        project: String,
        message: String,
        /// Allow the assistant to create and move tasks.
        #[arg(long)]
        write: bool,
    },
    /// Summarize logged work for a date range (default: the last 7 days).
    Summary {
        project: String,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    /// Break a goal down into tasks on the board.
    Decompose { project: String, goal: String },
    /// Board health check with suggested next steps.
    Insights { project: String },
}

fn main() {
    logging::init();
    let code = match run() {
        Ok(()) => exit_codes::OK,
        Err(err) => {
            eprintln!("{err:#}");
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let workspace = Workspace::new(&cli.root);
    match cli.command {
        Command::Init { project, force } => cmd_init(&workspace, &project, force),
        Command::List { project, status } => cmd_list(&workspace, &project, status),
        Command::Ask {
            project,
            message,
            write,
        } => {
            let assistant = assistant(workspace)?;
            println!("{}", assistant.ask(&project, &message, write));
            Ok(())
        }
        Command::Summary { project, from, to } => {
            let to = to.unwrap_or_else(|| Local::now().date_naive());
            let from = match from {
                Some(from) => from,
                None => to
                    .checked_sub_days(Days::new(7))
                    .context("date range out of bounds")?,
            };
            let assistant = assistant(workspace)?;
            println!("{}", assistant.weekly_summary(&project, from, to));
            Ok(())
        }
        Command::Decompose { project, goal } => {
            let assistant = assistant(workspace)?;
            println!("{}", assistant.decompose_goal(&project, &goal));
            Ok(())
        }
        Command::Insights { project } => {
            let assistant = assistant(workspace)?;
            println!("{}", assistant.insights(&project));
            Ok(())
        }
    }
}

fn cmd_init(workspace: &Workspace, project: &str, force: bool) -> Result<()> {
    let paths = init_project(&workspace.root, project, &InitOptions { force })?;
    println!("initialized {}", paths.dir.display());
    Ok(())
}

fn cmd_list(workspace: &Workspace, project: &str, status: Option<TaskStatus>) -> Result<()> {
    let paths = workspace.existing_project(project)?;
    let tasks = load_tasks(&paths.tasks_path)?;
    let blocks = tasks
        .iter()
        .filter(|task| status.is_none_or(|status| task.status == status))
        .map(serialize_task)
        .collect::<Vec<_>>();
    if blocks.is_empty() {
        println!("no tasks");
    } else {
        println!("{}", blocks.join("\n\n"));
    }
    Ok(())
}

/// Assistant over the HTTP transport. The env key wins over the config file;
/// without any key the assistant answers with setup guidance.
fn assistant(workspace: Workspace) -> Result<Assistant<AnthropicTransport>> {
    let config = load_config(&workspace.config_path)?
        .with_env_api_key(std::env::var(API_KEY_ENV).ok());
    let api_key = config.agent.api_key.clone().unwrap_or_default();
    let transport =
        AnthropicTransport::new(&config.agent, api_key).context("build model transport")?;
    Ok(Assistant::new(workspace, config, transport))
}

//! CLI entry point for taskboard.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

mod commands;

/// Role-aware task board backed by a local demo service.
#[derive(Parser, Debug)]
#[command(
    name = "taskboard",
    version,
    about = "taskboard: role-aware task tracking against a local demo backend"
)]
struct Cli {
    /// Directory holding the session, demo data and config.toml.
    #[arg(long, env = "TASKBOARD_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

/// Output format for listings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LsFormat {
    #[default]
    Table,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in with a demo account.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    /// Log out and forget the stored session.
    Logout,

    /// Show the logged-in user.
    Whoami,

    /// List tasks.
    Ls {
        #[arg(short = 's', long = "status")]
        statuses: Vec<String>,
        #[arg(short = 'p', long = "priority")]
        priorities: Vec<String>,
        #[arg(short = 't', long = "tag")]
        tags: Vec<String>,
        /// User id, `unassigned` or `me`.
        #[arg(short = 'a', long)]
        assignee: Option<String>,
        #[arg(long)]
        author: Option<String>,
        #[arg(long)]
        visibility: Option<String>,
        #[arg(long)]
        text: Option<String>,
        /// `field[:asc|desc]`, e.g. `dueDate:asc`.
        #[arg(long)]
        sort: Option<String>,
        #[arg(long)]
        page: Option<usize>,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long, value_enum, default_value_t)]
        format: LsFormat,
    },

    /// Show a single task as JSON.
    Show {
        #[arg(long)]
        task: String,
    },

    /// Show counts by status and priority.
    Stats,

    /// Create a task.
    New {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        priority: Option<String>,
        #[arg(short = 't', long = "tag")]
        tags: Vec<String>,
        /// `YYYY-MM-DD` or RFC 3339.
        #[arg(long)]
        due: Option<String>,
        #[arg(short = 'a', long)]
        assignee: Option<String>,
        #[arg(long)]
        visibility: Option<String>,
    },

    /// Edit task attributes.
    Edit {
        #[arg(long)]
        task: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        priority: Option<String>,
        /// Replace the tag list.
        #[arg(short = 't', long = "tag")]
        tags: Vec<String>,
        #[arg(long, conflicts_with = "tags")]
        clear_tags: bool,
        #[arg(long)]
        due: Option<String>,
        #[arg(long, conflicts_with = "due")]
        clear_due: bool,
        #[arg(short = 'a', long)]
        assignee: Option<String>,
        #[arg(long, conflicts_with = "assignee")]
        unassign: bool,
        #[arg(long)]
        visibility: Option<String>,
    },

    /// Move a task to another status.
    Status {
        #[arg(long)]
        task: String,
        #[arg(long)]
        status: String,
    },

    /// Delete a task.
    Rm {
        #[arg(long)]
        task: String,
    },

    /// Show the audit log.
    Audit {
        #[arg(long, value_enum, default_value_t)]
        format: LsFormat,
    },

    /// Restore the sample tasks and clear the audit log.
    Reset,
}

fn main() -> Result<()> {
    let Cli { data_dir, cmd } = Cli::parse();
    install_tracing();

    let data_dir = match data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(commands::run(cmd, &data_dir))
}

fn default_data_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|dir| dir.join("taskboard"))
        .context("could not determine a data directory; pass --data-dir")
}

fn install_tracing() {
    // RUST_LOG overrides the INFO default.
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_span_events(FmtSpan::NONE)
        .compact()
        .try_init();
}

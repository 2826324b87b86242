// ABOUTME: Command line argument definitions using clap
// ABOUTME: Task lifecycle commands plus the long-running serve mode

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(clap::Args, Debug)]
pub struct AddArgs {
    /// Display name for the task
    #[arg(long)]
    pub name: Option<String>,

    /// Target page the task operates on
    #[arg(long)]
    pub url: String,

    /// Dedicated login entry point, when separate from the target
    #[arg(long)]
    pub login_url: Option<String>,

    #[arg(long)]
    pub username: String,

    #[arg(long)]
    pub password: String,

    /// Action to perform: renewal or keepalive
    #[arg(long, default_value = "renewal")]
    pub action_type: String,

    /// Upstream proxy for the browser session
    #[arg(long)]
    pub proxy: Option<String>,

    /// Overall run budget in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Post-navigation settle time in seconds
    #[arg(long)]
    pub wait_time: Option<u64>,

    /// Recurrence period in hours
    #[arg(long)]
    pub interval: Option<u64>,

    /// Success keyword, repeatable; overrides the built-in set
    #[arg(long = "success-keyword")]
    pub success_keywords: Vec<String>,

    /// Explicit locator for the renew control
    #[arg(long)]
    pub renew_selector: Option<String>,

    /// Create the task disabled
    #[arg(long)]
    pub disabled: bool,
}

#[derive(Parser, Debug)]
#[command(
    name = "renewd",
    version,
    about = "Scheduled browser automation for account renewal and keepalive tasks"
)]
pub struct Args {
    /// Path to the configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the data directory
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Override the log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the scheduler until interrupted
    Serve,

    /// Create a new task
    Add(AddArgs),

    /// List all tasks with their last results
    List,

    /// Show one task as JSON
    Show { id: String },

    /// Run a task immediately, bypassing its schedule
    Run { id: String },

    /// Enable a task (schedules its recurring job)
    Enable { id: String },

    /// Disable a task (cancels its recurring job)
    Disable { id: String },

    /// Delete a task and cancel its recurring job
    Delete { id: String },

    /// Print a task's durable log
    Logs { id: String },
}

impl Args {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

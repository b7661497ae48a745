//! CLI argument definitions

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "threadroute")]
#[command(
    author,
    version,
    about = "Route conversation turns: explore new topics, answer follow-ups in context"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "cli")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Keep threads in memory only; nothing is written to disk
    #[arg(long, global = true)]
    pub ephemeral: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Route a query and print the response
    Ask(AskArgs),

    /// Show the messages of a thread
    History(HistoryArgs),

    /// Summarise a thread
    Thread(ThreadArgs),

    /// List threads, most recently updated first
    Threads(ThreadsArgs),

    /// Show store statistics
    Status,

    /// Delete threads past the retention age
    Cleanup(CleanupArgs),
}

#[derive(Args)]
pub struct AskArgs {
    /// Query text
    #[arg(required = true)]
    pub query: Vec<String>,

    /// Continue an existing thread
    #[arg(short, long)]
    pub thread: Option<String>,

    /// User the thread belongs to
    #[arg(short, long, env = "USER", default_value = "local")]
    pub user: String,

    /// LLM provider (ollama, openai)
    #[arg(short, long, default_value = "ollama")]
    pub provider: String,

    /// Model override
    #[arg(short, long)]
    pub model: Option<String>,

    /// Sampling temperature (0-2)
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Token limit per generation
    #[arg(long)]
    pub max_tokens: Option<u32>,
}

#[derive(Args)]
pub struct HistoryArgs {
    pub thread: String,

    /// Number of most recent messages
    #[arg(short = 'n', long, default_value = "10")]
    pub limit: usize,
}

#[derive(Args)]
pub struct ThreadArgs {
    pub thread: String,
}

#[derive(Args)]
pub struct ThreadsArgs {
    /// Only threads owned by this user
    #[arg(long)]
    pub user: Option<String>,

    #[arg(short = 'n', long, default_value = "20")]
    pub limit: usize,
}

#[derive(Args)]
pub struct CleanupArgs {
    /// Age in days; the configured retention when omitted
    #[arg(long)]
    pub max_age_days: Option<i64>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Cli,
    Json,
}

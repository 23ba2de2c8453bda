//! # trialog-cli
//!
//! Binary entry point for Trialog.
//!
//! This crate provides:
//! - CLI argument parsing using `clap`
//! - Configuration loading with environment and flag overrides
//! - Store reset, manual append and summary writes
//! - Conversation listing and transcript dumps
//! - The live viewer via `trialog watch`

mod simulate;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use simulate::{SimulationPlan, run_simulation};
use std::io::{IsTerminal, stdout};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use trialog_core::{
    ConversationIndex, Correlator, DisplayItem, MemoryStore, RedisStore, SummaryReader,
    SummaryWriter, TranscriptReader, TranscriptWindow, TranscriptWriter, TrialogConfig,
    WindowEntry, reset_store,
};
use trialog_proto::{ConversationId, KeySchema, Role, RunSessionId, Store, TaskId, Turn};
use trialog_tui::Viewer;

/// Color output mode for terminal display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorMode {
    /// Automatically detect if stdout is a TTY
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl ColorMode {
    fn should_use_colors(self) -> bool {
        match self {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => stdout().is_terminal(),
        }
    }
}

/// Output format for `list` and `show`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable format
    #[default]
    Table,
    /// JSON format for programmatic access
    Json,
}

/// ANSI color codes for terminal output.
mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const RED: &str = "\x1b[31m";
    pub const CYAN: &str = "\x1b[36m";
    pub const MAGENTA: &str = "\x1b[35m";
}

/// Trialog - transcript store and live viewer for concurrent benchmark trials
#[derive(Parser, Debug)]
#[command(name = "trialog", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "trialog.yml", global = true)]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Store URL, overriding the config file and REDIS_* variables
    #[arg(long, global = true)]
    redis_url: Option<String>,

    /// Use a throwaway in-process store instead of Redis
    #[arg(long, global = true)]
    memory: bool,

    /// Color output mode (auto, always, never)
    #[arg(long, value_enum, default_value_t = ColorMode::Auto, global = true)]
    color: ColorMode,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Clear the store before a new benchmark session
    Reset,

    /// Append turn records to a conversation
    Append(AppendArgs),

    /// Record a trial's final reward
    Summary(SummaryArgs),

    /// List conversations and their rewards
    List(ListArgs),

    /// Print one conversation's transcript
    Show(ShowArgs),

    /// Open the live viewer
    Watch,

    /// Run scripted trials concurrently against the store
    Simulate(SimulateArgs),
}

#[derive(Parser, Debug)]
struct AppendArgs {
    /// Run session id
    #[arg(long)]
    session: RunSessionId,

    /// Task id
    #[arg(long)]
    task: TaskId,

    /// Turn records as JSON objects, appended in order
    #[arg(required = true)]
    turns: Vec<String>,
}

#[derive(Parser, Debug)]
struct SummaryArgs {
    /// Run session id
    #[arg(long)]
    session: RunSessionId,

    /// Final reward
    #[arg(long, allow_hyphen_values = true)]
    reward: f64,
}

#[derive(Parser, Debug)]
struct ListArgs {
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

#[derive(Parser, Debug)]
struct ShowArgs {
    /// Run session id
    #[arg(long)]
    session: RunSessionId,

    /// Task id
    #[arg(long)]
    task: TaskId,

    /// Show at most the last N records (default: viewer.max_records)
    #[arg(long)]
    max: Option<usize>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

#[derive(Parser, Debug)]
struct SimulateArgs {
    /// Task ids to run
    #[arg(long, num_args = 1.., default_values_t = [0u64, 1, 2])]
    task_ids: Vec<u64>,

    /// Trials per task
    #[arg(long, default_value_t = 1)]
    num_trials: u32,

    /// Trials running at once
    #[arg(long, default_value_t = 4)]
    max_concurrency: usize,

    /// Milliseconds between steps of a trial
    #[arg(long, default_value_t = 500)]
    step_delay_ms: u64,

    /// Keep data from earlier sessions instead of resetting first
    #[arg(long)]
    no_reset: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let watching = matches!(cli.command, Commands::Watch);
    init_logging(cli.verbose, watching)?;

    let config = load_config(&cli.config, cli.redis_url.clone())?;
    let keys = config
        .store
        .key_schema()
        .context("Invalid store namespace")?;
    let use_colors = cli.color.should_use_colors();

    match cli.command {
        Commands::Reset => reset_command(&config, cli.memory, use_colors).await,
        Commands::Append(args) => append_command(&config, keys, cli.memory, args).await,
        Commands::Summary(args) => summary_command(&config, keys, cli.memory, args).await,
        Commands::List(args) => list_command(&config, keys, cli.memory, use_colors, args).await,
        Commands::Show(args) => show_command(&config, keys, cli.memory, use_colors, args).await,
        Commands::Watch => watch_command(&config, keys, cli.memory).await,
        Commands::Simulate(args) => {
            simulate_command(&config, keys, cli.memory, use_colors, args).await
        }
    }
}

/// Logs to stderr, or to a file while the viewer owns the terminal.
fn init_logging(verbose: bool, watching: bool) -> Result<()> {
    let default = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));

    if watching {
        let path = std::env::temp_dir().join("trialog-viewer.log");
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}

fn load_config(path: &Path, redis_url: Option<String>) -> Result<TrialogConfig> {
    let mut config = if path.exists() {
        TrialogConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?
    } else {
        debug!(path = %path.display(), "Config file not found, using defaults");
        TrialogConfig::default()
    };

    config
        .apply_env()
        .context("Invalid REDIS_* environment override")?;
    if let Some(url) = redis_url {
        config.store.url = Some(url);
    }

    let warnings = config.validate().context("Configuration validation failed")?;
    for warning in &warnings {
        eprintln!("{warning}");
    }
    Ok(config)
}

async fn open_store(config: &TrialogConfig, memory: bool) -> Result<Arc<dyn Store>> {
    if memory {
        debug!("Using in-process store");
        return Ok(Arc::new(MemoryStore::new()));
    }
    let store = RedisStore::connect(&config.store)
        .await
        .with_context(|| format!("Cannot reach store at {}", config.store.redis_url()))?;
    info!(url = %store.url(), "Connected to store");
    Ok(Arc::new(store))
}

/// Like [`open_store`], but an unreachable store is reported and `None` is
/// returned so write commands can degrade instead of failing.
async fn open_store_for_writes(config: &TrialogConfig, memory: bool) -> Option<Arc<dyn Store>> {
    match open_store(config, memory).await {
        Ok(store) => Some(store),
        Err(e) => {
            warn!(error = %format!("{e:#}"), "Store unavailable; write dropped");
            eprintln!("warning: {e:#}; nothing was written");
            None
        }
    }
}

async fn reset_command(config: &TrialogConfig, memory: bool, use_colors: bool) -> Result<()> {
    let Some(store) = open_store_for_writes(config, memory).await else {
        eprintln!("warning: transcripts from a previous session may still be shown");
        return Ok(());
    };

    let outcome = reset_store(store.as_ref()).await;
    if outcome.is_cleared() {
        if use_colors {
            println!("{}✓{} Store cleared", colors::GREEN, colors::RESET);
        } else {
            println!("Store cleared");
        }
    } else {
        eprintln!("warning: {outcome}");
    }
    Ok(())
}

async fn append_command(
    config: &TrialogConfig,
    keys: KeySchema,
    memory: bool,
    args: AppendArgs,
) -> Result<()> {
    let turns = args
        .turns
        .iter()
        .enumerate()
        .map(|(i, raw)| {
            Turn::from_record(raw).with_context(|| format!("Turn {} is not a valid record", i + 1))
        })
        .collect::<Result<Vec<_>>>()?;

    let Some(store) = open_store_for_writes(config, memory).await else {
        return Ok(());
    };
    let conv = ConversationId::new(args.session, args.task);
    let outcome = TranscriptWriter::new(store, keys)
        .append_turns(&conv, &turns)
        .await;
    if outcome.is_degraded() {
        eprintln!("warning: {outcome}");
    } else {
        debug!(conversation = %conv, count = turns.len(), "Turns appended");
    }
    Ok(())
}

async fn summary_command(
    config: &TrialogConfig,
    keys: KeySchema,
    memory: bool,
    args: SummaryArgs,
) -> Result<()> {
    let Some(store) = open_store_for_writes(config, memory).await else {
        return Ok(());
    };
    let outcome = SummaryWriter::new(store, keys)
        .set_summary(&args.session, args.reward)
        .await;
    if outcome.is_degraded() {
        eprintln!("warning: {outcome}");
    }
    Ok(())
}

async fn list_command(
    config: &TrialogConfig,
    keys: KeySchema,
    memory: bool,
    use_colors: bool,
    args: ListArgs,
) -> Result<()> {
    let store = open_store(config, memory).await?;
    let entries = ConversationIndex::new(store, keys)
        .list_conversations()
        .await
        .context("Failed to list conversations")?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Table => {
            if entries.is_empty() {
                if use_colors {
                    println!("{}No active conversations found.{}", colors::DIM, colors::RESET);
                } else {
                    println!("No active conversations found.");
                }
                return Ok(());
            }
            for entry in &entries {
                let reward = entry
                    .summary
                    .map_or_else(|| "-".to_string(), |s| s.reward.to_string());
                if use_colors {
                    let color = if entry.is_complete() { colors::GREEN } else { colors::YELLOW };
                    println!(
                        "{:>6}  {}  {color}{reward}{}",
                        entry.conversation.task,
                        entry.conversation.session,
                        colors::RESET
                    );
                } else {
                    println!(
                        "{:>6}  {}  {reward}",
                        entry.conversation.task, entry.conversation.session
                    );
                }
            }
        }
    }
    Ok(())
}

async fn show_command(
    config: &TrialogConfig,
    keys: KeySchema,
    memory: bool,
    use_colors: bool,
    args: ShowArgs,
) -> Result<()> {
    let store = open_store(config, memory).await?;
    let conv = ConversationId::new(args.session, args.task);
    let max = args.max.unwrap_or(config.viewer.max_records);

    let window = TranscriptReader::new(Arc::clone(&store), keys.clone())
        .read_transcript(&conv, max)
        .await
        .context("Failed to read transcript")?;
    let summary = SummaryReader::new(store, keys)
        .read_summary(&conv.session)
        .await
        .context("Failed to read summary")?;

    // Place unreadable records where they occurred.
    let mut items = Vec::new();
    let mut correlator = Correlator::new();
    for entry in window.entries() {
        match entry {
            WindowEntry::Turn(turn) => correlator.push_turn(turn, &mut items),
            WindowEntry::Malformed(record) => items.push(DisplayItem::Unreadable {
                index: record.index,
                error: record.error.clone(),
            }),
        }
    }

    match args.format {
        OutputFormat::Json => {
            let doc = serde_json::json!({
                "conversation": conv.to_string(),
                "start": window.start,
                "total": window.total,
                "reward": summary.map(|s| s.reward),
                "items": items,
                "malformed": window.malformed,
            });
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
        OutputFormat::Table => {
            print_transcript(&conv, summary.map(|s| s.reward), &window, &items, use_colors);
        }
    }
    Ok(())
}

fn print_transcript(
    conv: &ConversationId,
    reward: Option<f64>,
    window: &TranscriptWindow,
    items: &[DisplayItem],
    use_colors: bool,
) {
    use colors::{BOLD, CYAN, DIM, MAGENTA, RED, RESET, YELLOW};

    let title = match reward {
        Some(r) => format!("Task {}, Reward: {r}", conv.session),
        None => format!("Task {}", conv.session),
    };
    if use_colors {
        println!("{BOLD}{title}{RESET} {DIM}(task {}){RESET}", conv.task);
    } else {
        println!("{title} (task {})", conv.task);
    }
    if window.start > 0 {
        println!("… {} earlier records not shown", window.start);
    }
    if items.is_empty() {
        println!("No messages yet.");
        return;
    }

    let mut current_role = None;
    for item in items {
        let role = item.role();
        if current_role != Some(role) {
            println!();
            if use_colors {
                let color = match role {
                    Role::User => CYAN,
                    Role::Assistant => MAGENTA,
                    Role::Tool => YELLOW,
                };
                println!("{color}{BOLD}{}:{RESET}", role.as_str());
            } else {
                println!("{}:", role.as_str());
            }
            current_role = Some(role);
        }

        match item {
            DisplayItem::Message { text, .. } => println!("{text}"),
            DisplayItem::Unreadable { index, error } => {
                if use_colors {
                    println!("{RED}unreadable record #{index}: {error}{RESET}");
                } else {
                    println!("unreadable record #{index}: {error}");
                }
            }
            _ => {
                if let Some(value) = item.structured() {
                    let pretty =
                        serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
                    println!("{pretty}");
                }
            }
        }
    }
}

async fn watch_command(config: &TrialogConfig, keys: KeySchema, memory: bool) -> Result<()> {
    let store = open_store(config, memory)
        .await
        .inspect_err(|_| eprintln!("Cannot proceed without a store connection."))?;
    Viewer::new(store, keys, config.viewer.clone()).run().await
}

async fn simulate_command(
    config: &TrialogConfig,
    keys: KeySchema,
    memory: bool,
    use_colors: bool,
    args: SimulateArgs,
) -> Result<()> {
    let store = open_store(config, memory).await?;
    if !args.no_reset {
        let outcome = reset_store(store.as_ref()).await;
        if !outcome.is_cleared() {
            eprintln!("warning: {outcome}");
        }
    }

    let plan = SimulationPlan {
        task_ids: args.task_ids,
        num_trials: args.num_trials,
        max_concurrency: args.max_concurrency,
        step_delay: Duration::from_millis(args.step_delay_ms),
    };
    info!(
        tasks = ?plan.task_ids,
        num_trials = plan.num_trials,
        max_concurrency = plan.max_concurrency,
        "Starting simulated session"
    );
    let report = run_simulation(store, keys, &plan).await;

    let summary = format!(
        "{} trials completed, total reward {}",
        report.completed, report.total_reward
    );
    if use_colors {
        println!("{}✓{} {summary}", colors::GREEN, colors::RESET);
    } else {
        println!("{summary}");
    }
    if report.dropped_writes > 0 {
        eprintln!(
            "warning: {} writes were dropped; some transcripts are incomplete",
            report.dropped_writes
        );
    }
    Ok(())
}

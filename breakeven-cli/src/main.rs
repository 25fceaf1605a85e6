//! Single Breakeven CLI: config checks, one-off evaluations and tick replays.
//!
//! Commands:
//! - `check` validates a TOML config and prints the effective settings
//! - `evaluate` runs one tick against a snapshot file on the paper broker
//! - `replay` drives a snapshot through a CSV of ticks and reports the outcome

mod snapshot;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use breakeven_core::config::BreakevenConfig;
use breakeven_core::engine::{BreakevenEngine, DispatchStatus, EvaluationOutcome, EvaluationReport};
use breakeven_core::notify::{LogSink, Notifier};
use breakeven_core::paper::PaperBroker;
use breakeven_core::planner::AdjustmentAction;

use snapshot::{read_ticks, Journal, SnapshotFile};

#[derive(Parser)]
#[command(
    name = "single-be",
    about = "Single Breakeven: move a whole basket of positions to one breakeven level"
)]
struct Cli {
    /// Log at debug level (RUST_LOG takes precedence).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a config file and print the effective settings.
    Check {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,
    },
    /// Evaluate one tick against a snapshot file.
    Evaluate {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Path to a TOML snapshot (quote + positions).
        #[arg(long)]
        snapshot: PathBuf,

        /// Evaluation time (RFC 3339). Defaults to now.
        #[arg(long)]
        now: Option<DateTime<Utc>>,

        /// Evaluate even if the config starts disabled.
        #[arg(long, default_value_t = false)]
        enable: bool,

        /// Print the full report as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Write every dispatch to this CSV file.
        #[arg(long)]
        journal: Option<PathBuf>,
    },
    /// Replay a CSV of ticks (timestamp,bid,ask) against a snapshot.
    Replay {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Path to a TOML snapshot with the starting positions.
        #[arg(long)]
        snapshot: PathBuf,

        /// CSV tick file.
        #[arg(long)]
        ticks: PathBuf,

        /// Evaluate even if the config starts disabled.
        #[arg(long, default_value_t = false)]
        enable: bool,

        /// Write every dispatch to this CSV file.
        #[arg(long)]
        journal: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Check { config } => run_check(&config),
        Commands::Evaluate {
            config,
            snapshot,
            now,
            enable,
            json,
            journal,
        } => run_evaluate(&config, &snapshot, now, enable, json, journal.as_deref()),
        Commands::Replay {
            config,
            snapshot,
            ticks,
            enable,
            journal,
        } => run_replay(&config, &snapshot, &ticks, enable, journal.as_deref()),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: &Path) -> Result<BreakevenConfig> {
    BreakevenConfig::from_file(path).with_context(|| format!("loading config {}", path.display()))
}

fn load_snapshot(path: &Path, config: &BreakevenConfig) -> Result<SnapshotFile> {
    let snap = SnapshotFile::from_file(path)
        .with_context(|| format!("loading snapshot {}", path.display()))?;
    if snap.symbol != config.symbol {
        bail!(
            "snapshot is for '{}' but the config manages '{}'",
            snap.symbol,
            config.symbol
        );
    }
    Ok(snap)
}

fn run_check(path: &Path) -> Result<()> {
    let config = load_config(path)?;

    println!("Config OK: {}", path.display());
    println!("Symbol:              {}", config.symbol);
    println!("Enabled on start:    {}", config.enabled);
    println!("Profit to trigger:   {:.2}", config.profit_to_trigger);
    println!("Additional profit:   {:.2}", config.additional_profit);
    println!("Adjust to price:     {:?}", config.adjust_to_price);
    println!("Delay:               {}s", config.delay_between_adjustments_secs);
    println!("Swaps/commission:    {}", config.adjust_for_swaps_commission);
    println!("Side filter:         {:?}", config.filter.side);
    println!(
        "Label filter:        {}",
        config.filter.label.as_deref().unwrap_or("(any)")
    );
    println!(
        "Comment filter:      {}",
        config.filter.comment.as_deref().unwrap_or("(any)")
    );
    println!(
        "Notifications:       {}",
        if config.notify.is_active() { "on" } else { "off" }
    );
    Ok(())
}

fn run_evaluate(
    config_path: &Path,
    snapshot_path: &Path,
    now: Option<DateTime<Utc>>,
    enable: bool,
    json: bool,
    journal_path: Option<&Path>,
) -> Result<()> {
    let config = load_config(config_path)?;
    let snap = load_snapshot(snapshot_path, &config)?;
    let now = now.unwrap_or_else(Utc::now);
    let digits = snap.quote.digits as usize;

    let mut notifier = Notifier::new(config.notify.clone(), snap.account.clone(), LogSink);
    let mut engine = BreakevenEngine::new(config, now);
    if enable {
        engine.set_enabled(true);
    }
    let mut broker = PaperBroker::new(snap.symbol, snap.quote, snap.positions);

    let report = engine.on_tick(now, &mut broker, &mut notifier);

    if let Some(path) = journal_path {
        let mut journal = Journal::create(path)
            .with_context(|| format!("creating journal {}", path.display()))?;
        journal.record(&report)?;
        journal.finish()?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, digits);
    }
    Ok(())
}

#[derive(Debug, Default)]
struct ReplayStats {
    ticks: usize,
    evaluations: usize,
    applied: usize,
    rejected: usize,
    closed: usize,
}

fn run_replay(
    config_path: &Path,
    snapshot_path: &Path,
    ticks_path: &Path,
    enable: bool,
    journal_path: Option<&Path>,
) -> Result<()> {
    let config = load_config(config_path)?;
    let snap = load_snapshot(snapshot_path, &config)?;
    let ticks = read_ticks(ticks_path)
        .with_context(|| format!("reading ticks {}", ticks_path.display()))?;
    let Some(first) = ticks.first() else {
        bail!("tick file {} is empty", ticks_path.display());
    };

    let mut notifier = Notifier::new(config.notify.clone(), snap.account.clone(), LogSink);
    let mut engine = BreakevenEngine::new(config, first.timestamp);
    if enable {
        engine.set_enabled(true);
    }
    let mut broker = PaperBroker::new(snap.symbol, snap.quote, snap.positions);
    let mut journal = journal_path
        .map(|path| {
            Journal::create(path).with_context(|| format!("creating journal {}", path.display()))
        })
        .transpose()?;

    let mut stats = ReplayStats::default();
    for tick in &ticks {
        stats.ticks += 1;
        stats.closed += broker.mark(tick.bid, tick.ask).len();
        if broker.positions().is_empty() {
            tracing::info!(at = %tick.timestamp, "All positions closed, stopping replay");
            break;
        }

        let report = engine.on_tick(tick.timestamp, &mut broker, &mut notifier);
        if report.outcome == EvaluationOutcome::Evaluated {
            stats.evaluations += 1;
        }
        stats.applied += report.applied_count();
        stats.rejected += report.rejected_count();
        if let Some(journal) = journal.as_mut() {
            journal.record(&report)?;
        }
    }
    if let Some(journal) = journal {
        journal.finish()?;
    }

    println!("Replay: {} ({} ticks)", broker.symbol(), stats.ticks);
    println!("Evaluations:      {}", stats.evaluations);
    println!("Levels applied:   {}", stats.applied);
    println!("Levels rejected:  {}", stats.rejected);
    println!("Positions closed: {}", stats.closed);
    println!("Still open:       {}", broker.positions().len());
    println!("Realized profit:  {:.2}", broker.realized_profit());
    println!("Floating profit:  {:.2}", broker.floating_profit());
    Ok(())
}

fn outcome_label(outcome: &EvaluationOutcome) -> String {
    match outcome {
        EvaluationOutcome::Disabled => "disabled".into(),
        EvaluationOutcome::Throttled { next_allowed } => format!("throttled until {next_allowed}"),
        EvaluationOutcome::SnapshotUnavailable { error } => {
            format!("snapshot unavailable: {error}")
        }
        EvaluationOutcome::NoBreakeven { reason } => {
            format!("no breakeven ({})", reason.describe())
        }
        EvaluationOutcome::BelowTrigger { total_profit } => {
            format!("below trigger (profit {total_profit:.2})")
        }
        EvaluationOutcome::Evaluated => "evaluated".into(),
    }
}

fn print_report(report: &EvaluationReport, digits: usize) {
    println!("Symbol:    {}", report.symbol);
    println!("At:        {}", report.at);
    println!("Outcome:   {}", outcome_label(&report.outcome));

    let Some(plan) = &report.plan else {
        return;
    };
    let s = &plan.summary;
    println!(
        "Basket:    {} long ({:.2}) / {} short ({:.2}), net {:.2}",
        s.long_count, s.long_volume, s.short_count, s.short_volume, s.net_volume
    );
    println!(
        "Profit:    {:.2} (long {:.2}, short {:.2})",
        s.total_profit, s.long_profit, s.short_profit
    );
    match plan.breakeven.price() {
        Some(price) => println!("Breakeven: {price:.digits$}"),
        None => println!("Breakeven: none"),
    }

    if plan.decisions.is_empty() {
        return;
    }
    println!();
    println!("{:<8} {:<5} {:<10} {:>12}  {}", "Position", "Side", "Action", "Price", "Result");
    println!("{}", "-".repeat(56));
    for decision in &plan.decisions {
        let (action, price) = match decision.action {
            AdjustmentAction::SetStop(p) => ("SetStop", format!("{p:.digits$}")),
            AdjustmentAction::SetTarget(p) => ("SetTarget", format!("{p:.digits$}")),
            AdjustmentAction::NoAction => ("NoAction", String::new()),
        };
        let result = report
            .dispatches
            .iter()
            .find(|d| d.position_id == decision.position_id)
            .map(|d| match &d.status {
                DispatchStatus::Applied => "applied".to_string(),
                DispatchStatus::Rejected { error } => format!("rejected: {error}"),
            })
            .unwrap_or_else(|| format!("{:?}", decision.reason));
        println!(
            "{:<8} {:<5} {:<10} {:>12}  {}",
            format!("#{}", decision.position_id),
            decision.side.label(),
            action,
            price,
            result
        );
    }
}

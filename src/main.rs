use anyhow::{Context, Result};
use chrono::Duration;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use auction_lifecycle::config::LifecycleConfig;
use auction_lifecycle::{
    available_transitions, init_telemetry, is_terminal, metadata, AuctionState, AuctionStore,
    HistoryReport, Scenario, WinnerNotifier,
};

#[derive(Parser)]
#[command(name = "auctionctl")]
#[command(about = "Inspect and exercise the auction lifecycle state machine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every auction state with its legal next states
    States {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check whether a single transition is allowed
    Check {
        /// Current state (e.g. draft)
        from: String,
        /// Requested state (e.g. scheduled)
        to: String,
    },
    /// Apply a TOML scenario of transitions and sweeps and print the resulting audit trail
    Replay {
        /// Path to the scenario file
        scenario: PathBuf,
        /// Print outcomes and reports as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    LifecycleConfig::load_env_file()?;
    let config = LifecycleConfig::load().context("Failed to load configuration")?;
    init_telemetry(&config.observability)?;

    let cli = Cli::parse();

    match cli.command {
        Commands::States { json } => states_command(json),
        Commands::Check { from, to } => {
            if !check_command(&from, &to)? {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Replay { scenario, json } => {
            replay_command(&scenario, json, config.lifecycle.ending_window())
        }
    }
}

fn states_command(json: bool) -> Result<()> {
    if json {
        let table: Vec<serde_json::Value> = AuctionState::ALL
            .iter()
            .map(|state| {
                serde_json::json!({
                    "state": state,
                    "metadata": metadata(*state),
                    "terminal": is_terminal(*state),
                    "next": available_transitions(*state),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&table)?);
        return Ok(());
    }

    for state in AuctionState::ALL {
        let meta = metadata(state);
        let next: Vec<&str> = available_transitions(state)
            .iter()
            .map(|s| s.as_str())
            .collect();
        let next = if next.is_empty() {
            "(terminal)".to_string()
        } else {
            next.join(", ")
        };
        println!(
            "{:<18} {:<16} {:<9} -> {}",
            state.as_str(),
            meta.label,
            meta.severity,
            next
        );
    }
    Ok(())
}

fn check_command(from: &str, to: &str) -> Result<bool> {
    let from: AuctionState = from.parse()?;
    let to: AuctionState = to.parse()?;

    if from.can_transition_to(to) {
        println!("{} -> {}: allowed", from, to);
        Ok(true)
    } else {
        let allowed: Vec<&str> = available_transitions(from)
            .iter()
            .map(|s| s.as_str())
            .collect();
        println!(
            "{} -> {}: not allowed (allowed from {}: {})",
            from,
            to,
            from,
            if allowed.is_empty() {
                "none, terminal state".to_string()
            } else {
                allowed.join(", ")
            }
        );
        Ok(false)
    }
}

fn replay_command(path: &Path, json: bool, ending_window: Duration) -> Result<()> {
    let scenario = Scenario::load(path)
        .with_context(|| format!("Failed to load scenario {}", path.display()))?;

    let mut store = AuctionStore::new().with_listener(WinnerNotifier);
    scenario.seed(&mut store)?;
    let outcomes = scenario.run(&mut store, ending_window);

    let mut reports = Vec::new();
    for auction in store.auctions() {
        reports.push(HistoryReport::new(auction, store.history(&auction.id)?));
    }

    if json {
        let output = serde_json::json!({
            "steps": outcomes,
            "reports": reports,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    for outcome in &outcomes {
        for record in &outcome.applied {
            println!(
                "#{:<3} {}: {} -> {} by {}",
                outcome.index, record.auction_id, record.from, record.to, record.triggered_by
            );
        }
        match (&outcome.error, &outcome.auction_id) {
            (Some(error), auction_id) => println!(
                "#{:<3} {}: rejected {} ({})",
                outcome.index,
                auction_id.as_deref().unwrap_or("-"),
                outcome.requested,
                error
            ),
            (None, None) if outcome.applied.is_empty() => {
                println!("#{:<3} {}: nothing due", outcome.index, outcome.requested)
            }
            _ => {}
        }
    }

    println!();
    for report in &reports {
        println!(
            "{} \"{}\": {} ({}), {} transitions{}",
            report.auction_id,
            report.title,
            report.current_state,
            metadata(report.current_state).label,
            report.transitions_count,
            if report.is_terminal { ", terminal" } else { "" }
        );
    }
    Ok(())
}

//! CLI for confidential second-price auctions.
//!
//! This binary provides commands for:
//! - Running a scripted auction against the mock collaborators
//! - Generating a viewing key

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::rngs::OsRng;
use std::path::{Path, PathBuf};
use tracing::info;

use vickrey_client::{run_scenario, Bidder, Scenario, ScenarioReport};

#[derive(Parser)]
#[command(name = "vickrey-cli")]
#[command(about = "CLI for confidential second-price auctions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario file from creation to settlement
    Run {
        /// Path to the scenario (JSON)
        #[arg(long)]
        scenario: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate a viewing key
    Keygen,
}

fn run_cmd(path: &Path, json: bool) -> Result<()> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading scenario {}", path.display()))?;
    let scenario: Scenario = serde_json::from_str(&raw).context("parsing scenario")?;

    info!(bidders = scenario.bidders.len(), "Loaded scenario");
    let report = run_scenario(&scenario)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &ScenarioReport) {
    println!("Auction {}:", report.auction_id);
    println!("  State: {:?}", report.state);
    match &report.winner {
        Some(winner) => println!("  Winner: {}", winner),
        None => println!("  Winner: none"),
    }
    println!("  Asset owner: {}", report.asset_owner);
    println!("  Beneficiary balance: {}", report.beneficiary_balance);
    println!("  Balances:");
    for (name, balance) in &report.balances {
        println!("    {}: {}", name, balance);
    }
    for (name, reason) in &report.rejected {
        println!("  Rejected bid from {}: {}", name, reason);
    }
    println!("  Events: {}", report.events);
}

fn keygen_cmd() {
    let bidder = Bidder::generate(&mut OsRng);
    println!("Secret:  {}", bidder.secret_hex());
    println!("Address: {}", hex::encode(bidder.address()));
}

fn main() -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new("vickrey_cli=info,vickrey_module=info")
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { scenario, json } => run_cmd(&scenario, json)?,
        Commands::Keygen => keygen_cmd(),
    }

    Ok(())
}

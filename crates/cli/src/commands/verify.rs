//! Verify chain command.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use powchain_chain::Blockchain;
use std::path::PathBuf;
use tracing::warn;

use super::{format_timestamp, open_storage};
use crate::settings::ChainSettings;

#[derive(Args)]
pub struct VerifyArgs {
    /// Directory to store blockchain data
    #[arg(short, long, env = "POWCHAIN_DATA_DIR", default_value = "./data")]
    data_dir: PathBuf,
}

pub fn run(args: VerifyArgs) -> Result<()> {
    let settings = ChainSettings::load(&args.data_dir)?;
    let storage = open_storage(&args.data_dir)?;

    // Loading walks every block back to genesis
    let blockchain = Blockchain::load(&storage, settings.blockchain_config())
        .context("Chain verification failed")?;
    let stats = blockchain.stats()?;

    println!();
    println!("{}  Chain is intact", "✓".green().bold());
    println!("  Height:     {}", stats.height.to_string().bright_cyan());
    println!("  Tip:        {}", stats.tip.to_hex().bright_yellow());
    println!(
        "  Difficulty: {}",
        stats.difficulty.to_string().bright_cyan()
    );
    println!(
        "  Latest:     {}",
        format_timestamp(stats.latest_timestamp).bright_black()
    );
    println!(
        "  Created:    {}",
        settings.created_at.to_rfc3339().bright_black()
    );

    let reachable = stats.height + 1;
    if stats.stored_blocks as u64 > reachable {
        let orphans = stats.stored_blocks as u64 - reachable;
        warn!(orphans, "stored blocks not reachable from the tip");
        println!(
            "  {} {} stored block(s) are not reachable from the tip",
            "!".yellow().bold(),
            orphans
        );
    }
    println!();

    Ok(())
}

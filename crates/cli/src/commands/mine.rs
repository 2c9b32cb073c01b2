//! Mine blocks command.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use powchain_chain::Blockchain;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use super::open_storage;
use crate::settings::ChainSettings;

#[derive(Args)]
pub struct MineArgs {
    /// Directory to store blockchain data
    #[arg(short, long, env = "POWCHAIN_DATA_DIR", default_value = "./data")]
    data_dir: PathBuf,

    /// Number of blocks to mine
    #[arg(short, long, default_value = "1")]
    count: usize,

    /// Highest nonce tried per block (overrides config.json)
    #[arg(long)]
    max_nonce: Option<u32>,

    /// Give up on a block after this many seconds (overrides config.json)
    #[arg(long)]
    timeout_secs: Option<u64>,
}

pub fn run(args: MineArgs) -> Result<()> {
    let settings = ChainSettings::load(&args.data_dir)?;
    let storage = open_storage(&args.data_dir)?;

    let mut config = settings.blockchain_config();
    if let Some(max_nonce) = args.max_nonce {
        config.miner.max_nonce = max_nonce;
    }
    if let Some(secs) = args.timeout_secs {
        config.miner.timeout = Some(Duration::from_secs(secs));
    }

    let blockchain = Blockchain::load(&storage, config).context("Failed to load chain")?;

    println!(
        "{} {} block(s) at difficulty {}",
        "Mining".bold().cyan(),
        args.count,
        blockchain.difficulty().to_string().bright_cyan()
    );
    println!();

    for _ in 0..args.count {
        let started = Instant::now();
        let block = blockchain.mine_new_block().context("Failed to mine block")?;

        println!(
            "{}  Block {} {} {}",
            "✓".green().bold(),
            format!("#{}", blockchain.height()).bright_black(),
            block.hash().to_hex().bright_yellow(),
            format!(
                "(nonce {}, {:.2?})",
                block.header.nonce,
                started.elapsed()
            )
            .bright_black()
        );
    }

    println!();
    Ok(())
}

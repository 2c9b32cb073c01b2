//! Block operations command.

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use powchain_chain::Blockchain;
use powchain_core::{Block, Hash};
use std::path::PathBuf;

use super::{format_timestamp, open_storage};
use crate::settings::ChainSettings;

#[derive(Args)]
pub struct BlockArgs {
    #[command(subcommand)]
    command: BlockCommand,
}

#[derive(Subcommand)]
enum BlockCommand {
    /// List recent blocks, newest first
    List {
        /// Directory to store blockchain data
        #[arg(short, long, env = "POWCHAIN_DATA_DIR", default_value = "./data")]
        data_dir: PathBuf,

        /// Number of blocks to show
        #[arg(short, long, default_value = "10")]
        count: usize,
    },
    /// Show detailed block information
    Info {
        /// Directory to store blockchain data
        #[arg(short, long, env = "POWCHAIN_DATA_DIR", default_value = "./data")]
        data_dir: PathBuf,

        /// Block number or hash (hex format)
        block_id: String,
    },
}

pub fn run(args: BlockArgs) -> Result<()> {
    match args.command {
        BlockCommand::List { data_dir, count } => list_blocks(data_dir, count),
        BlockCommand::Info { data_dir, block_id } => show_block_info(data_dir, block_id),
    }
}

fn list_blocks(data_dir: PathBuf, count: usize) -> Result<()> {
    let settings = ChainSettings::load(&data_dir)?;
    let storage = open_storage(&data_dir)?;
    let blockchain = Blockchain::load(&storage, settings.blockchain_config())?;

    let head_height = blockchain.height();
    let blocks = blockchain.recent_blocks(count)?;

    println!();
    println!("{}", "Recent Blocks:".bold().cyan());
    println!();

    for (offset, block) in blocks.iter().enumerate() {
        let height = head_height - offset as u64;
        println!(
            "  {} {} {}",
            format!("#{}", height).bright_black(),
            block.hash().to_hex()[..16].bright_yellow(),
            format_timestamp(block.header.timestamp).bright_black()
        );
    }

    println!();
    Ok(())
}

fn show_block_info(data_dir: PathBuf, block_id: String) -> Result<()> {
    let settings = ChainSettings::load(&data_dir)?;
    let storage = open_storage(&data_dir)?;
    let blockchain = Blockchain::load(&storage, settings.blockchain_config())?;

    // Try parsing as height first, then as hash
    let (block, height) = if let Ok(height) = block_id.parse::<u64>() {
        (find_by_height(&blockchain, height)?, Some(height))
    } else {
        let hash = Hash::from_hex(&block_id)
            .with_context(|| format!("Invalid block hash: {}", block_id))?;
        let block = blockchain.get_block(&hash)?.context("Block not found")?;
        (block, height_of(&blockchain, &hash)?)
    };

    println!();
    println!("{}", "Block Information:".bold().cyan());
    println!();
    match height {
        Some(height) => println!("  Height:      {}", height.to_string().bright_cyan()),
        None => println!("  Height:      {}", "not on the main chain".yellow()),
    }
    println!("  Hash:        {}", block.hash().to_hex().bright_yellow());
    println!(
        "  Parent Hash: {}",
        block.header.prev_hash.to_hex().bright_black()
    );
    println!(
        "  Timestamp:   {}",
        format_timestamp(block.header.timestamp).bright_black()
    );
    println!(
        "  Difficulty:  {}",
        block.header.difficulty.to_string().bright_cyan()
    );
    println!(
        "  Nonce:       {}",
        block.header.nonce.to_string().bright_cyan()
    );
    println!("  Version:     {}", block.header.version);
    println!(
        "  Valid:       {}",
        if block.is_valid() {
            "yes".green()
        } else {
            "no".red()
        }
    );
    println!();

    Ok(())
}

fn find_by_height(blockchain: &Blockchain, height: u64) -> Result<Block> {
    let head = blockchain.height();
    if height > head {
        bail!("Block #{} not found (chain height is {})", height, head);
    }
    let depth = (head - height) as usize;
    let mut blocks = blockchain.recent_blocks(depth + 1)?;
    blocks.pop().context("Block not found")
}

fn height_of(blockchain: &Blockchain, hash: &Hash) -> Result<Option<u64>> {
    let head = blockchain.height();
    let position = blockchain.blocks()?.iter().position(|b| b.hash() == *hash);
    Ok(position.map(|depth| head - depth as u64))
}

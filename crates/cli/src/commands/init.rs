//! Initialize chain command.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use powchain_chain::{Blockchain, DEFAULT_DIFFICULTY};
use powchain_core::{validate_difficulty, Hash};
use powchain_storage::Storage;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::settings::{db_path, ChainSettings};

#[derive(Args)]
pub struct InitArgs {
    /// Directory to store blockchain data
    #[arg(short, long, env = "POWCHAIN_DATA_DIR", default_value = "./data")]
    data_dir: PathBuf,

    /// Leading zero bits required of every block hash (0-255)
    #[arg(long, env = "POWCHAIN_DIFFICULTY", default_value_t = DEFAULT_DIFFICULTY)]
    difficulty: u32,

    /// Highest nonce tried per block
    #[arg(long)]
    max_nonce: Option<u32>,

    /// Give up on a block after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
}

pub fn run(args: InitArgs) -> Result<()> {
    println!("{}", "Initializing powchain...".bold().cyan());
    println!();

    let mut settings = ChainSettings::new(args.difficulty);
    if let Some(max_nonce) = args.max_nonce {
        settings.max_nonce = max_nonce;
    }
    settings.mining_timeout_secs = args.timeout_secs;

    let created = create_chain(&args.data_dir, &settings)?;

    println!("{}  Opened data directory", "✓".green().bold());
    println!(
        "{}  Saved config to: {}",
        "✓".green().bold(),
        created.config_file.display().to_string().bright_black()
    );
    println!();
    println!("{}  Created genesis block", "✓".green().bold());
    println!("    Hash:       {}", created.genesis.to_hex().bright_yellow());
    println!(
        "    Difficulty: {}",
        settings.difficulty.to_string().bright_cyan()
    );

    println!();
    println!("{}", "Chain initialized successfully!".green().bold());
    println!();
    println!("Next steps:");
    println!("  • Use {} to mine blocks", "powchain mine".bright_cyan());
    println!(
        "  • Use {} to explore blocks",
        "powchain block list".bright_cyan()
    );

    Ok(())
}

/// What `create_chain` produced.
struct Created {
    genesis: Hash,
    config_file: PathBuf,
}

/// Write settings, then reset the store and commit a genesis block.
///
/// Settings land first so that a chain on disk always has a readable
/// `config.json`; a failure afterwards leaves "no chain", which the other
/// commands report as such.
fn create_chain(data_dir: &Path, settings: &ChainSettings) -> Result<Created> {
    validate_difficulty(settings.difficulty)?;

    fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create data directory: {:?}", data_dir))?;
    let config_file = settings.save(data_dir)?;

    let storage = Storage::open(db_path(data_dir)).context("Failed to open storage")?;
    let blockchain = Blockchain::initialize(&storage, settings.blockchain_config())
        .context("Failed to initialize chain")?;
    info!(data_dir = %data_dir.display(), "chain created");

    Ok(Created {
        genesis: blockchain.tip(),
        config_file,
    })
}

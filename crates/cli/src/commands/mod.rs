//! CLI commands module.

use anyhow::{Context, Result};
use clap::Subcommand;
use powchain_storage::Storage;
use std::path::Path;

use crate::settings::db_path;

mod block;
mod init;
mod mine;
mod verify;

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new chain (discards any existing one)
    Init(init::InitArgs),
    /// Mine blocks on top of the current tip
    Mine(mine::MineArgs),
    /// Block operations
    Block(block::BlockArgs),
    /// Verify the stored chain from tip to genesis
    Verify(verify::VerifyArgs),
}

pub fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Init(args) => init::run(args),
        Commands::Mine(args) => mine::run(args),
        Commands::Block(args) => block::run(args),
        Commands::Verify(args) => verify::run(args),
    }
}

/// Open the database of an initialized data directory.
fn open_storage(data_dir: &Path) -> Result<Storage> {
    let path = db_path(data_dir);
    if !path.exists() {
        anyhow::bail!(
            "No chain at {}. Did you run 'powchain init'?",
            data_dir.display()
        );
    }
    Storage::open(&path).with_context(|| format!("Failed to open storage at {}", path.display()))
}

/// Format a header timestamp for display.
fn format_timestamp(timestamp: u32) -> String {
    chrono::DateTime::from_timestamp(i64::from(timestamp), 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

//! powchain CLI entry point.

use clap::Parser;
use colored::Colorize;

mod commands;
mod logging;
mod settings;

use logging::LogFormat;

#[derive(Parser)]
#[command(name = "powchain", version)]
#[command(about = "A minimal proof-of-work blockchain", long_about = None)]
struct Cli {
    /// Default log level (RUST_LOG takes precedence)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Option<commands::Commands>,
}

fn main() {
    let cli = Cli::parse();
    logging::init_logging(&cli.log_level, cli.log_format);

    match cli.command {
        Some(cmd) => {
            if let Err(e) = commands::run(cmd) {
                tracing::error!(error = %e, "command failed");
                eprintln!("{} {:#}", "Error:".red().bold(), e);
                std::process::exit(1);
            }
        }
        None => {
            println!("powchain - A minimal proof-of-work blockchain");
            println!("Run 'powchain --help' for usage information.");
        }
    }
}

//! Cachet CLI - operator tooling for the credential engine
//!
//! # Usage
//!
//! ```bash
//! # Compute the canonical digest of a credential file
//! cachet hash cert.pdf --title "Welding Level 2"
//!
//! # Check chain connectivity and registry health
//! cachet doctor
//!
//! # Generate a qr token for seeding or testing
//! cachet token
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;

mod commands;

use commands::{doctor, hash, token};

/// Cachet - credential verification and blockchain anchoring
#[derive(Parser)]
#[command(
    name = "cachet",
    version,
    about = "Cachet CLI - credential hashing and chain diagnostics",
    long_about = "Cachet fingerprints credential files with a canonical SHA-256\n\
                  digest and anchors them to an on-chain registry.\n\n\
                  This CLI computes digests offline and diagnoses the chain\n\
                  configuration a server deployment would use."
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the canonical content digest of a credential file
    #[command(name = "hash")]
    Hash(hash::HashArgs),

    /// Diagnose chain connectivity and registry configuration
    #[command(name = "doctor")]
    Doctor(doctor::DoctorArgs),

    /// Generate a fresh qr token
    #[command(name = "token")]
    Token(token::TokenArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    match cli.command {
        Commands::Hash(args) => hash::run(args),
        Commands::Doctor(args) => doctor::run(args).await,
        Commands::Token(args) => token::run(args),
    }
}

/// Setup logging based on verbosity level
fn setup_logging(verbosity: u8) {
    use tracing_subscriber::EnvFilter;

    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();
}

/// Print a success message with a checkmark
pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green().bold(), msg);
}

/// Print an error message with an X
pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red().bold(), msg);
}

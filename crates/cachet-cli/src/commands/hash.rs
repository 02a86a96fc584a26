//! Hash command - compute the canonical digest of a credential file
//!
//! Usage:
//! ```bash
//! cachet hash cert.pdf --title "Welding Level 2"
//! cachet hash cert.pdf --title "Welding Level 2" \
//!     --issuer-id 7f8ba6f0-0e4f-4c77-8f0e-0d6c1a1f2b3c --issued-date 2024-01-15
//! ```

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use uuid::Uuid;

use cachet_core::{content_digest, CanonicalClaim};

/// Arguments for the hash command
#[derive(Args)]
pub struct HashArgs {
    /// Path to the credential file
    file: PathBuf,

    /// Claim title, exactly as it will be stored
    #[arg(long)]
    title: String,

    /// Issuer id included in the claim, if any
    #[arg(long, value_name = "UUID")]
    issuer_id: Option<Uuid>,

    /// Issue date included in the claim (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    issued_date: Option<String>,

    /// Print only the hex digest, no decoration
    #[arg(long)]
    quiet: bool,
}

/// Run the hash command
pub fn run(args: HashArgs) -> Result<()> {
    let bytes = std::fs::read(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;

    let issued_date = args
        .issued_date
        .as_deref()
        .map(|raw| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .with_context(|| format!("--issued-date must be YYYY-MM-DD, got {raw}"))
        })
        .transpose()?;

    let claim = CanonicalClaim {
        title: &args.title,
        issuer_id: args.issuer_id,
        issued_date,
    };

    let digest = content_digest(&bytes, &claim);

    if args.quiet {
        println!("{}", digest.to_hex());
        return Ok(());
    }

    println!("{}", "Canonical Content Digest".bold().cyan());
    println!("{}", "═".repeat(40).cyan());
    println!();
    println!("  {} {}", "File:".dimmed(), args.file.display());
    println!("  {} {} bytes", "Size:".dimmed(), bytes.len());
    println!("  {} {}", "Title:".dimmed(), args.title);
    if let Some(issuer) = args.issuer_id {
        println!("  {} {}", "Issuer:".dimmed(), issuer);
    }
    if let Some(date) = issued_date {
        println!("  {} {}", "Issued:".dimmed(), date);
    }
    println!();
    println!("  {} {}", "sha256:".dimmed(), digest.to_hex().green());
    println!(
        "  {} 0x{}",
        "bytes32:".dimmed(),
        hex::encode(digest.to_word()).green()
    );

    Ok(())
}

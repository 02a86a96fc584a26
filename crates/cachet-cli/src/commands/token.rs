//! Token command - generate a qr token
//!
//! Usage:
//! ```bash
//! cachet token
//! cachet token --count 5
//! ```

use anyhow::Result;
use clap::Args;

use cachet_core::QrToken;

/// Arguments for the token command
#[derive(Args)]
pub struct TokenArgs {
    /// How many tokens to generate
    #[arg(long, short = 'n', default_value = "1")]
    count: u32,
}

/// Run the token command
pub fn run(args: TokenArgs) -> Result<()> {
    for _ in 0..args.count {
        println!("{}", QrToken::generate());
    }
    Ok(())
}

//! # NPSN Subcommand
//!
//! Queries the school registry with the same client the API uses at
//! registration, and prints the lookup as JSON.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use edufund_core::Npsn;
use edufund_npsn::{NpsnClient, NpsnConfig};

/// Arguments for the `edufund npsn` subcommand.
#[derive(Args, Debug)]
pub struct NpsnArgs {
    #[command(subcommand)]
    pub command: NpsnCommand,
}

#[derive(Subcommand, Debug)]
pub enum NpsnCommand {
    /// Look up one NPSN in the registry.
    Lookup {
        /// 8-digit school registry number.
        #[arg(value_name = "NPSN")]
        npsn: String,
        /// Override NPSN_API_URL.
        #[arg(long)]
        base_url: Option<String>,
    },
}

/// Execute the npsn subcommand. Exits 2 when the school is not verified.
pub fn run_npsn(args: &NpsnArgs) -> Result<u8> {
    match &args.command {
        NpsnCommand::Lookup { npsn, base_url } => {
            let npsn = Npsn::new(npsn).with_context(|| format!("invalid NPSN '{npsn}'"))?;
            let config = match base_url {
                Some(url) => NpsnConfig::with_base_url(url),
                None => NpsnConfig::from_env(),
            }
            .context("invalid NPSN registry configuration")?;
            let client = NpsnClient::new(config).context("failed to build NPSN client")?;

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("failed to start async runtime")?;
            let lookup = runtime
                .block_on(client.lookup(&npsn))
                .with_context(|| format!("registry lookup for {npsn} failed"))?;

            println!("{}", serde_json::to_string_pretty(&lookup)?);
            Ok(if lookup.verified { 0 } else { 2 })
        }
    }
}

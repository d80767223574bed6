//! # Admin Subcommand
//!
//! Produces the argon2id hash the API server reads from
//! `ADMIN_PASSWORD_HASH`. The plaintext never touches the environment.

use std::io::BufRead;

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};

/// Shortest admin password accepted.
const MIN_PASSWORD_LEN: usize = 12;

/// Arguments for the `edufund admin` subcommand.
#[derive(Args, Debug)]
pub struct AdminArgs {
    #[command(subcommand)]
    pub command: AdminCommand,
}

#[derive(Subcommand, Debug)]
pub enum AdminCommand {
    /// Hash an admin password for ADMIN_PASSWORD_HASH.
    HashPassword {
        /// Password to hash. Prefer --stdin so it stays out of shell history.
        #[arg(long, conflicts_with = "stdin")]
        password: Option<String>,
        /// Read the password from the first line of standard input.
        #[arg(long)]
        stdin: bool,
    },
}

/// Execute the admin subcommand.
pub fn run_admin(args: &AdminArgs) -> Result<u8> {
    match &args.command {
        AdminCommand::HashPassword { password, stdin } => {
            let password = match (password, stdin) {
                (Some(p), _) => p.clone(),
                (None, true) => read_first_line(std::io::stdin().lock())?,
                (None, false) => bail!("provide the password with --password or --stdin"),
            };
            println!("{}", hash(&password)?);
            Ok(0)
        }
    }
}

/// Hash a password after checking its length.
pub fn hash(password: &str) -> Result<String> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        bail!("admin password must be at least {MIN_PASSWORD_LEN} characters");
    }
    edufund_api::auth::hash_password(password).context("failed to hash password")
}

fn read_first_line(mut reader: impl BufRead) -> Result<String> {
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .context("failed to read password from stdin")?;
    let line = line.trim_end_matches(['\r', '\n']).to_string();
    if line.is_empty() {
        bail!("no password on stdin");
    }
    Ok(line)
}

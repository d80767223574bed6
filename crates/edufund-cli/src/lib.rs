//! # edufund-cli: Operator Tooling for EduFund
//!
//! Provides the `edufund` command-line interface used when deploying the
//! API server.
//!
//! ## Subcommands
//!
//! - `edufund admin hash-password`: print an argon2id PHC string for
//!   `ADMIN_PASSWORD_HASH`.
//! - `edufund npsn lookup <NPSN>`: query the school registry.
//! - `edufund openapi`: write the OpenAPI document.
//!
//! ```bash
//! edufund admin hash-password --stdin < admin-password.txt
//! edufund npsn lookup 20100001
//! edufund openapi --output openapi.json
//! ```

pub mod admin;
pub mod npsn;
pub mod openapi;

use std::path::Path;

use anyhow::{Context, Result};

/// Write `contents` to `output`, or to stdout when no path is given.
pub fn write_output(output: Option<&Path>, contents: &str) -> Result<()> {
    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            std::fs::write(path, contents)
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), "wrote output");
        }
        None => println!("{contents}"),
    }
    Ok(())
}

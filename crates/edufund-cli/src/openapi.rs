//! # OpenAPI Subcommand
//!
//! Writes the document served at `/openapi.json` without starting a server.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use edufund_api::openapi::ApiDoc;
use utoipa::OpenApi;

#[derive(Args, Debug)]
pub struct OpenApiArgs {
    /// Output file. Prints to stdout when omitted.
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

/// Execute the openapi subcommand.
pub fn run_openapi(args: &OpenApiArgs) -> Result<u8> {
    let json = render()?;
    crate::write_output(args.output.as_deref(), &json)?;
    Ok(0)
}

/// The OpenAPI document as pretty-printed JSON.
pub fn render() -> Result<String> {
    Ok(ApiDoc::openapi().to_pretty_json()?)
}

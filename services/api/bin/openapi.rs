//! Dumps the API's OpenAPI document.
//!
//! `openapi [PATH]` writes pretty JSON to `PATH` (default `openapi.json`).
//! A path of `-` writes to stdout instead.

use anyhow::Context;
use negotiator_api::router::ApiDoc;
use std::io::Write;
use utoipa::OpenApi;

const DEFAULT_OUTPUT: &str = "openapi.json";

fn main() -> anyhow::Result<()> {
    let target = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_OUTPUT.to_string());

    let doc = ApiDoc::openapi();
    let json = doc
        .to_pretty_json()
        .context("Failed to serialize the OpenAPI document")?;

    if target == "-" {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{json}")?;
    } else {
        std::fs::write(&target, json).with_context(|| format!("Failed to write {target}"))?;
    }
    eprintln!(
        "{} {}: {} paths",
        doc.info.title,
        doc.info.version,
        doc.paths.paths.len()
    );
    Ok(())
}

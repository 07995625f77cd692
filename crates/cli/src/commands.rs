//! Command implementations for the confstack CLI.
//!
//! Responsibilities:
//! - Render pages, resolutions, and patterns as a table or JSON.
//! - Encrypt and decrypt page files with the container format.
//!
//! Does NOT handle:
//! - Argument parsing (see `args.rs`).
//! - Registry construction (see `main.rs`).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use confstack_pages::{PageCipher, PageRegistry, PatternFamily, Resolved};

use crate::error::ExitCode;

/// Output rendering selected with `--output`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

impl OutputFormat {
    /// Parse the `--output` argument; `None` for unrecognized formats.
    pub fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "table" => Some(Self::Table),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

#[derive(Serialize)]
struct PageRow {
    name: String,
    origin: confstack_pages::PageOrigin,
    priority: i32,
    declarations: usize,
}

/// `confstack pages` - list pages in resolution order.
pub fn run_pages(registry: &PageRegistry, format: OutputFormat) -> Result<ExitCode> {
    let rows: Vec<PageRow> = registry
        .pages_in_resolution_order()
        .iter()
        .map(|p| PageRow {
            name: p.name().to_string(),
            origin: p.origin(),
            priority: p.priority(),
            declarations: p.num_declarations(),
        })
        .collect();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        OutputFormat::Table => {
            println!("{:<10} {:>8} {:>6}  {}", "ORIGIN", "PRIORITY", "DECLS", "PAGE");
            for row in &rows {
                println!(
                    "{:<10} {:>8} {:>6}  {}",
                    format!("{:?}", row.origin).to_lowercase(),
                    row.priority,
                    row.declarations,
                    row.name
                );
            }
        }
    }
    Ok(ExitCode::Success)
}

/// `confstack get <key>` - resolve the effective value of a key.
pub fn run_get(
    registry: &PageRegistry,
    key: &str,
    all: bool,
    format: OutputFormat,
) -> Result<ExitCode> {
    if all {
        let matches: Vec<Resolved> = registry.resolve_all(key);
        if matches.is_empty() {
            eprintln!("key '{key}' is not declared by any page");
            return Ok(ExitCode::KeyNotFound);
        }
        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&matches)?),
            OutputFormat::Table => {
                println!("{:<10} {:>8}  {:<24} {}", "ORIGIN", "PRIORITY", "VALUE", "PAGE");
                for m in &matches {
                    println!(
                        "{:<10} {:>8}  {:<24} {}",
                        format!("{:?}", m.origin).to_lowercase(),
                        m.priority,
                        m.value,
                        m.page
                    );
                }
            }
        }
        return Ok(ExitCode::Success);
    }

    match registry.resolve(key) {
        Some(value) => {
            match format {
                OutputFormat::Json => {
                    #[derive(Serialize)]
                    struct GetOutput<'a> {
                        key: &'a str,
                        value: &'a str,
                    }
                    println!("{}", serde_json::to_string(&GetOutput { key, value: &value })?)
                }
                OutputFormat::Table => println!("{value}"),
            }
            Ok(ExitCode::Success)
        }
        None => {
            eprintln!("key '{key}' is not declared by any page");
            Ok(ExitCode::KeyNotFound)
        }
    }
}

#[derive(Serialize)]
struct PatternRow {
    family: PatternFamily,
    patterns: Vec<String>,
}

/// `confstack patterns` - list the pattern families.
pub fn run_patterns(registry: &PageRegistry, format: OutputFormat) -> Result<ExitCode> {
    let rows: Vec<PatternRow> = PatternFamily::ALL
        .into_iter()
        .map(|family| PatternRow {
            family,
            patterns: registry.patterns(family),
        })
        .collect();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        OutputFormat::Table => {
            for row in &rows {
                let joined = if row.patterns.is_empty() {
                    "(none)".to_string()
                } else {
                    row.patterns.join(" ")
                };
                println!("{:<12} {}", format!("{:?}", row.family).to_lowercase(), joined);
            }
        }
    }
    Ok(ExitCode::Success)
}

/// `confstack encrypt <input>` - wrap a page file in the encrypted
/// container.
pub fn run_encrypt(cipher: &PageCipher, input: &Path, output: Option<PathBuf>) -> Result<ExitCode> {
    let plaintext = std::fs::read(input)
        .with_context(|| format!("failed to read page file {}", input.display()))?;
    let container = cipher
        .encrypt_page(&plaintext)
        .context("failed to encrypt page")?;
    let output = output.unwrap_or_else(|| input.with_extension("pre"));
    std::fs::write(&output, container)
        .with_context(|| format!("failed to write {}", output.display()))?;
    println!("{}", output.display());
    Ok(ExitCode::Success)
}

/// `confstack decrypt <input>` - unwrap an encrypted page file.
pub fn run_decrypt(cipher: &PageCipher, input: &Path, output: Option<PathBuf>) -> Result<ExitCode> {
    let container = std::fs::read(input)
        .with_context(|| format!("failed to read page file {}", input.display()))?;
    let plaintext = cipher
        .decrypt_page(&container)
        .context("failed to decrypt page")?;
    let output = output.unwrap_or_else(|| input.with_extension("prc"));
    std::fs::write(&output, plaintext)
        .with_context(|| format!("failed to write {}", output.display()))?;
    println!("{}", output.display());
    Ok(ExitCode::Success)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parsing() {
        assert_eq!(OutputFormat::from_arg("table"), Some(OutputFormat::Table));
        assert_eq!(OutputFormat::from_arg("json"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::from_arg("yaml"), None);
    }
}

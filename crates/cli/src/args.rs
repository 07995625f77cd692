//! CLI argument definitions and parsing.
//!
//! Responsibilities:
//! - Define the CLI structure using clap derive macros.
//! - Parse command-line arguments and environment variables.
//!
//! Non-responsibilities:
//! - Does not execute commands (see `commands` module).
//! - Does not build the registry (see `main`).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use confstack_pages::constants::{ENV_PAGE_DIR, ENV_PAGE_PATH};

#[derive(Parser)]
#[command(name = "confstack")]
#[command(about = "Inspect and resolve layered configuration pages", long_about = None)]
#[command(version)]
#[command(
    after_help = "Examples:\n  confstack pages\n  confstack --dir ./config get window-title\n  confstack get audio-volume --all --output json\n  confstack encrypt defaults.prc --password s3cret\n"
)]
pub struct Cli {
    /// Additional search directory, consulted before the search path
    #[arg(long, global = true, env = ENV_PAGE_DIR, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Search-path string in the platform's path-list syntax
    #[arg(long, global = true, env = ENV_PAGE_PATH, value_name = "PATH")]
    pub path: Option<String>,

    /// Password for encrypted pages (otherwise the OS keyring or
    /// CONFSTACK_CONFIG_KEY provides the key)
    #[arg(long, global = true)]
    pub password: Option<String>,

    /// Output format (table, json)
    #[arg(short, long, global = true, default_value = "table")]
    pub output: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List pages in resolution order
    Pages,

    /// Resolve the effective value of a key
    Get {
        /// The configuration key to resolve
        key: String,

        /// Show every match with provenance, not just the winner
        #[arg(long)]
        all: bool,
    },

    /// List the filename pattern families used to classify page files
    Patterns,

    /// Encrypt a page file into the encrypted container format
    Encrypt {
        /// Plain page file to encrypt
        input: PathBuf,

        /// Destination file (defaults to the input with a .pre extension)
        #[arg(id = "encrypt_output", short = 'f', long = "file", value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Decrypt an encrypted page file
    Decrypt {
        /// Encrypted page file to decrypt
        input: PathBuf,

        /// Destination file (defaults to the input with a .prc extension)
        #[arg(id = "decrypt_output", short = 'f', long = "file", value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

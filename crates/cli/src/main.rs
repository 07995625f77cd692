//! confstack - inspect and resolve layered configuration pages.
//!
//! Responsibilities:
//! - Parse command-line arguments and environment variables.
//! - Build the page registry from the requested search path and key
//!   source, load implicit pages, and dispatch subcommands.
//!
//! Does NOT handle:
//! - Page discovery, sorting, or resolution logic (see `confstack-pages`).
//!
//! Invariants:
//! - `load_dotenv()` is called BEFORE CLI parsing so `.env` values can
//!   provide clap env defaults.
//! - `--dir`/`--path` replace the ambient search path entirely; without
//!   them the environment-assembled path is used.

mod args;
mod commands;
mod error;

use clap::Parser;
use secrecy::SecretString;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use args::{Cli, Commands};
use commands::OutputFormat;
use confstack_pages::constants::ENV_MASTER_KEY;
use confstack_pages::{
    MasterKeySource, PageCipher, PageRegistry, RegistryOptions, SearchPath, env_var_or_none,
};
use error::ExitCode;

fn main() {
    // Load .env BEFORE CLI parsing so clap env defaults can read .env values
    if let Err(e) = confstack_pages::load_dotenv() {
        eprintln!("Failed to load environment: {}", e);
        std::process::exit(ExitCode::GeneralError.as_i32());
    }

    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::GeneralError
        }
    };
    std::process::exit(code.as_i32());
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let Some(format) = OutputFormat::from_arg(&cli.output) else {
        eprintln!("unknown output format '{}' (expected table or json)", cli.output);
        return Ok(ExitCode::ValidationError);
    };

    let key_source = key_source(&cli);

    match &cli.command {
        Commands::Encrypt { input, output } => {
            let cipher = PageCipher::new(key_source);
            commands::run_encrypt(&cipher, input, output.clone())
        }
        Commands::Decrypt { input, output } => {
            let cipher = PageCipher::new(key_source);
            commands::run_decrypt(&cipher, input, output.clone())
        }
        Commands::Pages => {
            let registry = load_registry(&cli, key_source)?;
            commands::run_pages(registry, format)
        }
        Commands::Get { key, all } => {
            let registry = load_registry(&cli, key_source)?;
            commands::run_get(registry, key, *all, format)
        }
        Commands::Patterns => {
            let registry = load_registry(&cli, key_source)?;
            commands::run_patterns(registry, format)
        }
    }
}

/// Pick the master key source: an explicit password outranks
/// `CONFSTACK_CONFIG_KEY`, which outranks the OS keyring.
fn key_source(cli: &Cli) -> MasterKeySource {
    if let Some(password) = &cli.password {
        MasterKeySource::Password(SecretString::new(password.clone().into()))
    } else if env_var_or_none(ENV_MASTER_KEY).is_some() {
        MasterKeySource::Env(ENV_MASTER_KEY.to_string())
    } else {
        MasterKeySource::Keyring
    }
}

/// Build the process-wide registry and load implicit pages.
fn load_registry(
    cli: &Cli,
    key_source: MasterKeySource,
) -> anyhow::Result<&'static PageRegistry> {
    let options = RegistryOptions::new().with_key_source(key_source);
    let options = if cli.dir.is_some() || cli.path.is_some() {
        let mut search_path = SearchPath::new();
        if let Some(dir) = &cli.dir {
            search_path.append_directory(dir);
        }
        if let Some(list) = &cli.path {
            for dir in std::env::split_paths(list) {
                if !dir.as_os_str().is_empty() {
                    search_path.append_directory(dir);
                }
            }
        }
        options.with_search_path(search_path)
    } else {
        options
    };

    let registry = PageRegistry::init_global(options)?;
    registry.ensure_implicit_pages_loaded();
    tracing::debug!(
        implicit = registry.num_implicit_pages(),
        explicit = registry.num_explicit_pages(),
        "registry ready"
    );
    Ok(registry)
}

//! CLI parsing and orchestration. Resolves configuration, runs the export pipeline, writes the
//! EPUB, and maps errors to exit codes.

use crate::config::{self, ConfigError, Overrides, Settings};
use crate::epub::{write_epub, EpubError};
use crate::export::collect_document;
use crate::miniflux::{ApiError, MinifluxClient};
use crate::model::Entry;
use clap::Parser;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// CLI error carrying exit code and message.
#[derive(Debug, Error)]
pub enum CliRunError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Api(#[from] ApiError),

    #[error("{0}")]
    Epub(#[from] EpubError),
}

impl CliRunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliRunError::InvalidInput(_) | CliRunError::Config(_) | CliRunError::Api(_) => 1,
            CliRunError::Epub(_) => 3,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "miniflux-epub", version)]
#[command(about = "Turns your unread miniflux entries into an epub for offline reading")]
#[command(
    after_help = "Config keys (MinifluxUrl, Username, Password, Category, outputfile, TimeoutSecs) are read from ~/.miniflux-epub.{toml,json,yaml,yml} and from upper-cased environment variables (e.g. MINIFLUXURL). Flags override environment, environment overrides the config file."
)]
pub struct Args {
    /// Output file (default is miniflux.epub).
    #[arg(long = "outputfile", value_name = "PATH")]
    pub output_file: Option<PathBuf>,

    /// Miniflux username (loaded from config if not set).
    #[arg(long = "Username", value_name = "USERNAME")]
    pub username: Option<String>,

    /// Miniflux password (loaded from config if not set).
    #[arg(long = "Password", value_name = "PASSWORD")]
    pub password: Option<String>,

    /// Config file path (.toml, .json, .yaml or .yml). Default: ~/.miniflux-epub.<ext>.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress progress output (errors only).
    #[arg(short, long)]
    pub quiet: bool,

    /// Print verbose error chain.
    #[arg(long)]
    pub verbose: bool,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            username: self.username.clone(),
            password: self.password.clone(),
            output_file: self.output_file.clone(),
        }
    }
}

/// Ensure the output path's parent directory exists.
fn validate_output_path(path: &Path) -> Result<(), CliRunError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            return Err(CliRunError::InvalidInput(format!(
                "Cannot write output: {}: parent directory does not exist.",
                path.display()
            )));
        }
    }
    Ok(())
}

/// Resolve [Settings] from the config file, process environment, and flags.
pub fn resolve_settings(args: &Args) -> Result<Settings, CliRunError> {
    resolve_settings_with(args, config::process_env)
}

fn resolve_settings_with(
    args: &Args,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Settings, CliRunError> {
    let loaded = config::load_config(args.config.as_deref())?;
    if let Some(ref l) = loaded {
        if !args.quiet {
            eprintln!("Using config file: {}", l.path.display());
        }
    }
    let settings = config::resolve(
        &args.overrides(),
        env,
        loaded.as_ref().map(|l| &l.config),
    )?;
    tracing::debug!(?settings, "resolved settings");
    Ok(settings)
}

/// Entry point for the CLI. Returns Ok(()) on success; Err with exit code and message on failure.
pub fn run(args: &Args) -> Result<(), CliRunError> {
    let settings = resolve_settings(args)?;
    validate_output_path(&settings.output_file)?;

    let client = MinifluxClient::builder(&settings.miniflux_url)
        .credentials(&settings.username, &settings.password)
        .timeout_secs(settings.timeout_secs)
        .build()?;
    tracing::debug!(api = client.base(), "client ready");
    if !args.quiet {
        eprintln!(
            "Connecting to {} as {}",
            settings.miniflux_url, settings.username
        );
    }

    let progress_cb = |n: usize, entry: &Entry| eprintln!("{}: {}", n, entry.title);
    let progress: Option<&dyn Fn(usize, &Entry)> = if args.quiet {
        None
    } else {
        Some(&progress_cb)
    };
    let document = collect_document(&client, &settings.category, progress)?;

    write_epub(&document, &settings.output_file)?;

    if !args.quiet {
        eprintln!(
            "Wrote {} ({} entries from '{}')",
            settings.output_file.display(),
            document.sections.len(),
            settings.category
        );
    }
    Ok(())
}

//! Configuration resolution. Values come from, in priority order: CLI flags, environment
//! variables, a config file, and the built-in defaults below.
//!
//! Config file search order when no explicit path is given: `~/.miniflux-epub.toml`,
//! `~/.miniflux-epub.json`, `~/.miniflux-epub.yaml`, then `~/.miniflux-epub.yml`. Keys are matched case-insensitively. Environment variables are the
//! upper-cased key names (`MINIFLUXURL`, `USERNAME`, `PASSWORD`, `CATEGORY`, `OUTPUTFILE`,
//! `TIMEOUTSECS`).

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_MINIFLUX_URL: &str = "https://reader.miniflux.app/";
pub const DEFAULT_USERNAME: &str = "";
pub const DEFAULT_PASSWORD: &str = "";
pub const DEFAULT_CATEGORY: &str = "All";
pub const DEFAULT_OUTPUT_FILE: &str = "miniflux.epub";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Config file name without extension, looked up in the home directory.
pub const CONFIG_FILE_STEM: &str = ".miniflux-epub";
/// Extensions tried during discovery, in order.
pub const CONFIG_FILE_EXTENSIONS: [&str; 4] = ["toml", "json", "yaml", "yml"];

/// Entry status requested from the API.
pub const ENTRY_STATUS: &str = "unread";
/// Maximum entries requested in the single page we fetch. No pagination beyond this.
pub const ENTRY_PAGE_LIMIT: usize = 100;
/// Sort direction for entries (oldest first).
pub const ENTRY_DIRECTION: &str = "asc";

pub const DOCUMENT_TITLE: &str = "Miniflux Entries";
pub const DOCUMENT_AUTHOR: &str = "miniflux-epub by @lucaswilric";
pub const DOCUMENT_IDENTIFIER: &str = "urn:miniflux-epub:unread-entries";
/// `dcterms:modified` stamp for the package. Fixed so identical input gives identical bytes.
pub const DOCUMENT_MODIFIED: &str = "2000-01-01T00:00:00Z";

pub const KEY_MINIFLUX_URL: &str = "MinifluxUrl";
pub const KEY_USERNAME: &str = "Username";
pub const KEY_PASSWORD: &str = "Password";
pub const KEY_CATEGORY: &str = "Category";
pub const KEY_OUTPUT_FILE: &str = "outputfile";
pub const KEY_TIMEOUT_SECS: &str = "TimeoutSecs";

/// Errors while locating, reading, or interpreting configuration. Maps to CLI exit code 1.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot determine home directory to look for .miniflux-epub config.")]
    NoHomeDir,

    #[error("Cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("Unsupported config format: {path}. Use a .toml, .json, .yaml, or .yml file.")]
    UnsupportedFormat { path: PathBuf },

    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Toml,
    Json,
    Yaml,
}

impl ConfigFormat {
    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("toml") => Ok(ConfigFormat::Toml),
            Some("json") => Ok(ConfigFormat::Json),
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            _ => Err(ConfigError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }
}

/// Config file contents. All fields optional; only present keys override defaults.
///
/// Field names are the lower-cased keys; [parse_config] lower-cases the file's keys first.
#[derive(Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    #[serde(rename = "minifluxurl")]
    pub miniflux_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub category: Option<String>,
    #[serde(rename = "outputfile")]
    pub output_file: Option<PathBuf>,
    #[serde(rename = "timeoutsecs")]
    pub timeout_secs: Option<u64>,
}

/// A config file that was found and parsed.
#[derive(Debug)]
pub struct LoadedConfig {
    pub path: PathBuf,
    pub config: FileConfig,
}

/// Load the config file at `explicit`, or discover one in the home directory.
///
/// A missing explicit file is an error; finding nothing during discovery is not.
/// Failing to resolve the home directory is fatal when discovery is needed.
pub fn load_config(explicit: Option<&Path>) -> Result<Option<LoadedConfig>, ConfigError> {
    match explicit {
        Some(path) => read_config(path).map(Some),
        None => {
            let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
            discover_config(&home)
        }
    }
}

/// Look for `.miniflux-epub.{toml,json,yaml,yml}` in `dir` and parse the first one present.
pub fn discover_config(dir: &Path) -> Result<Option<LoadedConfig>, ConfigError> {
    for ext in CONFIG_FILE_EXTENSIONS {
        let path = dir.join(format!("{}.{}", CONFIG_FILE_STEM, ext));
        if path.is_file() {
            return read_config(&path).map(Some);
        }
    }
    Ok(None)
}

fn read_config(path: &Path) -> Result<LoadedConfig, ConfigError> {
    let format = ConfigFormat::from_path(path)?;
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    let config = parse_config(format, &contents).map_err(|reason| ConfigError::Parse {
        path: path.to_path_buf(),
        reason,
    })?;
    tracing::debug!(path = %path.display(), "loaded config file");
    Ok(LoadedConfig {
        path: path.to_path_buf(),
        config,
    })
}

/// Parse TOML, JSON, or YAML into [FileConfig], matching top-level keys case-insensitively.
fn parse_config(format: ConfigFormat, contents: &str) -> Result<FileConfig, String> {
    let value: serde_json::Value = match format {
        ConfigFormat::Toml => {
            let table: toml::Table = toml::from_str(contents).map_err(|e| e.to_string())?;
            serde_json::to_value(table).map_err(|e| e.to_string())?
        }
        ConfigFormat::Json => serde_json::from_str(contents).map_err(|e| e.to_string())?,
        // An empty YAML document is null; treat it like an empty table.
        ConfigFormat::Yaml => match serde_yaml::from_str::<Option<serde_json::Value>>(contents)
            .map_err(|e| e.to_string())?
        {
            Some(v) => v,
            None => serde_json::Value::Object(serde_json::Map::new()),
        },
    };
    let value = match value {
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.into_iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), v))
                .collect(),
        ),
        other => other,
    };
    serde_json::from_value(value).map_err(|e| e.to_string())
}

/// Values given on the command line. `None` means the flag was not passed.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub username: Option<String>,
    pub password: Option<String>,
    pub output_file: Option<PathBuf>,
}

/// Fully resolved configuration. Built once at startup and passed by reference.
#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    pub miniflux_url: String,
    pub username: String,
    pub password: String,
    pub category: String,
    pub output_file: PathBuf,
    pub timeout_secs: u64,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("miniflux_url", &self.miniflux_url)
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .field("category", &self.category)
            .field("output_file", &self.output_file)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Process environment lookup passed to [resolve]. `name` is already upper-cased.
pub fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Merge flags, environment, file, and defaults into [Settings].
///
/// `env` receives the upper-cased key name. Empty environment values are treated as unset.
pub fn resolve(
    flags: &Overrides,
    env: impl Fn(&str) -> Option<String>,
    file: Option<&FileConfig>,
) -> Result<Settings, ConfigError> {
    let lookup = |key: &str| env(&key.to_ascii_uppercase()).filter(|v| !v.is_empty());
    let empty = FileConfig::default();
    let file = file.unwrap_or(&empty);

    let miniflux_url = lookup(KEY_MINIFLUX_URL)
        .or_else(|| file.miniflux_url.clone())
        .unwrap_or_else(|| DEFAULT_MINIFLUX_URL.to_string());
    let username = flags
        .username
        .clone()
        .or_else(|| lookup(KEY_USERNAME))
        .or_else(|| file.username.clone())
        .unwrap_or_else(|| DEFAULT_USERNAME.to_string());
    let password = flags
        .password
        .clone()
        .or_else(|| lookup(KEY_PASSWORD))
        .or_else(|| file.password.clone())
        .unwrap_or_else(|| DEFAULT_PASSWORD.to_string());
    let category = lookup(KEY_CATEGORY)
        .or_else(|| file.category.clone())
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
    let output_file = flags
        .output_file
        .clone()
        .or_else(|| lookup(KEY_OUTPUT_FILE).map(PathBuf::from))
        .or_else(|| file.output_file.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_FILE));
    let timeout_secs = match lookup(KEY_TIMEOUT_SECS) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidValue {
                key: KEY_TIMEOUT_SECS,
                value: raw,
            })?,
        None => file.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
    };

    Ok(Settings {
        miniflux_url,
        username,
        password,
        category,
        output_file,
        timeout_secs,
    })
}

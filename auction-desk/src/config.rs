// Configuration loading and parsing (chain.toml, storage.toml, session.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub rpc: RpcConfig,
    pub deploy: DeployConfig,
    pub ipfs: IpfsConfig,
    pub timers: TimerConfig,
    pub session: SessionConfig,
    pub log: LogConfig,
}

// ---------------------------------------------------------------------------
// chain.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for chain.toml.
#[derive(Debug, Clone, Deserialize)]
struct ChainFile {
    rpc: RpcConfig,
    deploy: DeployConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcConfig {
    /// JSON-RPC endpoint used for accounts, calls and transactions.
    pub http_url: String,
    /// WebSocket endpoint used for `eth_subscribe` log streams.
    pub ws_url: String,
    #[serde(default = "default_accounts_method")]
    pub accounts_method: String,
    #[serde(default = "default_receipt_poll_ms")]
    pub receipt_poll_ms: u64,
}

impl RpcConfig {
    pub fn receipt_poll(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeployConfig {
    /// Truffle build artifact holding the contract bytecode.
    pub artifact_path: PathBuf,
    pub gas_price: u64,
}

// ---------------------------------------------------------------------------
// storage.toml structs
// ---------------------------------------------------------------------------

/// Wrapper for the top-level `[ipfs]` table in storage.toml.
#[derive(Debug, Clone, Deserialize)]
struct StorageFile {
    ipfs: IpfsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IpfsConfig {
    pub api_url: String,
    pub gateway_url: String,
    #[serde(default = "default_true")]
    pub wrap_with_directory: bool,
    #[serde(default = "default_cid_version")]
    pub cid_version: u32,
    #[serde(default = "default_hash_alg")]
    pub hash_alg: String,
}

// ---------------------------------------------------------------------------
// session.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for session.toml. Every section is optional.
#[derive(Debug, Clone, Deserialize, Default)]
struct SessionFile {
    #[serde(default)]
    timers: TimerConfig,
    #[serde(default)]
    session: SessionConfig,
    #[serde(default)]
    log: LogConfig,
}

/// Cadence of the three periodic session tasks.
#[derive(Debug, Clone, Deserialize)]
pub struct TimerConfig {
    pub account_poll_ms: u64,
    pub log_drain_ms: u64,
    pub log_tail_ms: u64,
}

impl Default for TimerConfig {
    fn default() -> Self {
        TimerConfig {
            account_poll_ms: 1000,
            log_drain_ms: 10,
            log_tail_ms: 1000,
        }
    }
}

impl TimerConfig {
    pub fn account_poll(&self) -> Duration {
        Duration::from_millis(self.account_poll_ms)
    }

    pub fn log_drain(&self) -> Duration {
        Duration::from_millis(self.log_drain_ms)
    }

    pub fn log_tail(&self) -> Duration {
        Duration::from_millis(self.log_tail_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SessionConfig {
    #[serde(default)]
    pub auto_deploy: bool,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LogConfig {
    /// Bound on the displayed event log in characters. `None` is unbounded.
    #[serde(default)]
    pub max_display_chars: Option<usize>,
}

fn default_accounts_method() -> String {
    "eth_requestAccounts".to_string()
}

fn default_receipt_poll_ms() -> u64 {
    500
}

fn default_true() -> bool {
    true
}

fn default_cid_version() -> u32 {
    1
}

fn default_hash_alg() -> String {
    "sha2-256".to_string()
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/chain.toml`,
/// `config/storage.toml`, and (optionally) `config/session.toml`,
/// all relative to the given `base_dir`.
///
/// This is the lower-level loading primitive that does not auto-copy defaults.
/// Prefer `load_config()` which handles default initialization automatically.
pub(crate) fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- chain.toml (required) ---
    let chain_path = config_dir.join("chain.toml");
    let chain_text = read_file(&chain_path)?;
    let chain_file: ChainFile =
        toml::from_str(&chain_text).map_err(|e| ConfigError::ParseError {
            path: chain_path.clone(),
            source: e,
        })?;

    // --- storage.toml (required) ---
    let storage_path = config_dir.join("storage.toml");
    let storage_text = read_file(&storage_path)?;
    let storage_file: StorageFile =
        toml::from_str(&storage_text).map_err(|e| ConfigError::ParseError {
            path: storage_path.clone(),
            source: e,
        })?;

    // --- session.toml (optional) ---
    let session_path = config_dir.join("session.toml");
    let session_file = if session_path.exists() {
        let session_text = read_file(&session_path)?;
        toml::from_str(&session_text).map_err(|e| ConfigError::ParseError {
            path: session_path.clone(),
            source: e,
        })?
    } else {
        SessionFile::default()
    };

    let config = Config {
        rpc: chain_file.rpc,
        deploy: chain_file.deploy,
        ipfs: storage_file.ipfs,
        timers: session_file.timers,
        session: session_file.session,
        log: session_file.log,
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the crate root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let mut copied = Vec::new();

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };

        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                // Keep the user's edited copy
            }
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Convenience wrapper: loads config relative to the current working directory.
/// Ensures default config files are copied before loading.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let urls: &[(&str, &str, &[&str])] = &[
        ("rpc.http_url", &config.rpc.http_url, &["http://", "https://"]),
        ("rpc.ws_url", &config.rpc.ws_url, &["ws://", "wss://"]),
        ("ipfs.api_url", &config.ipfs.api_url, &["http://", "https://"]),
        ("ipfs.gateway_url", &config.ipfs.gateway_url, &["http://", "https://"]),
    ];
    for (name, url, schemes) in urls {
        if !schemes.iter().any(|s| url.starts_with(s)) {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: format!("must start with one of {schemes:?}, got {url:?}"),
            });
        }
    }

    if config.rpc.accounts_method.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "rpc.accounts_method".into(),
            message: "must not be empty".into(),
        });
    }

    if config.deploy.gas_price == 0 {
        return Err(ConfigError::ValidationError {
            field: "deploy.gas_price".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.ipfs.cid_version > 1 {
        return Err(ConfigError::ValidationError {
            field: "ipfs.cid_version".into(),
            message: format!("must be 0 or 1, got {}", config.ipfs.cid_version),
        });
    }

    if config.ipfs.hash_alg.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "ipfs.hash_alg".into(),
            message: "must not be empty".into(),
        });
    }

    // Intervals must be positive; tokio::time::interval panics on zero.
    let intervals: &[(&str, u64)] = &[
        ("rpc.receipt_poll_ms", config.rpc.receipt_poll_ms),
        ("timers.account_poll_ms", config.timers.account_poll_ms),
        ("timers.log_drain_ms", config.timers.log_drain_ms),
        ("timers.log_tail_ms", config.timers.log_tail_ms),
    ];
    for (name, val) in intervals {
        if *val == 0 {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: "must be greater than 0".into(),
            });
        }
    }

    if config.log.max_display_chars == Some(0) {
        return Err(ConfigError::ValidationError {
            field: "log.max_display_chars".into(),
            message: "must be greater than 0 when set".into(),
        });
    }

    Ok(())
}

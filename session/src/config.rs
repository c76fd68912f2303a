//! Service configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use votum_types::VoteParams;

use crate::SessionError;

/// Which identity verifier backend to use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifierMode {
    /// Deterministic local matcher, for demos and development.
    Simulated,
    /// External biometric matching service over HTTP.
    Http,
}

/// Configuration for the votum service.
///
/// Can be loaded from a TOML file via [`ServiceConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Address the HTTP API binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Port the HTTP API listens on.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Data directory for the idempotency ledger.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Which verifier backend to use.
    #[serde(default = "default_verifier_mode")]
    pub verifier_mode: VerifierMode,

    /// Base URL of the biometric matching service (HTTP mode).
    #[serde(default = "default_verifier_url")]
    pub verifier_url: String,

    /// Base URL of the wallet bridge.
    #[serde(default = "default_wallet_url")]
    pub wallet_url: String,

    /// URL of the ledger gateway.
    #[serde(default = "default_ledger_url")]
    pub ledger_url: String,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Interval between expiry sweeps over in-flight sessions (seconds).
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Vote pipeline parameters.
    #[serde(default)]
    pub params: VoteParams,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_listen_addr() -> String {
    "127.0.0.1".to_string()
}

fn default_listen_port() -> u16 {
    7190
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./votum_data")
}

fn default_verifier_mode() -> VerifierMode {
    VerifierMode::Simulated
}

fn default_verifier_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_wallet_url() -> String {
    "http://127.0.0.1:8090".to_string()
}

fn default_ledger_url() -> String {
    "http://127.0.0.1:7545".to_string()
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_sweep_interval_secs() -> u64 {
    30
}

// ── Impl ───────────────────────────────────────────────────────────────

impl ServiceConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, SessionError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| SessionError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, SessionError> {
        toml::from_str(s).map_err(|e| SessionError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).expect("ServiceConfig is always serializable to TOML")
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            listen_port: default_listen_port(),
            data_dir: default_data_dir(),
            verifier_mode: default_verifier_mode(),
            verifier_url: default_verifier_url(),
            wallet_url: default_wallet_url(),
            ledger_url: default_ledger_url(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            sweep_interval_secs: default_sweep_interval_secs(),
            params: VoteParams::default(),
        }
    }
}

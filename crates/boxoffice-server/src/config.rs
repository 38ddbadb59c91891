//! Runtime configuration.
//!
//! Layered with the `config` crate: an optional TOML file, then environment
//! variables prefixed `BOXOFFICE` with `__` as the section separator
//! (`BOXOFFICE_PAYMENTS__WEBHOOK_SECRET`).

use std::{path::{Path, PathBuf}, time::Duration};

use boxoffice_payments::GatewayConfig;
use serde::Deserialize;

pub const ENV_PREFIX: &str = "BOXOFFICE";

/// Runtime server configuration, deserialised from `config.toml` and the
/// environment.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:             String,
  #[serde(default = "default_port")]
  pub port:             u16,
  /// Public URL, used in validation links and confirmation messages.
  #[serde(default = "default_base_url")]
  pub base_url:         String,
  #[serde(default = "default_store_path")]
  pub store_path:       PathBuf,
  #[serde(default = "default_store_timeout_ms")]
  pub store_timeout_ms: u64,
  #[serde(default = "default_tickets_dir")]
  pub tickets_dir:      PathBuf,
  #[serde(default)]
  pub booking:          BookingConfig,
  pub payments:         PaymentsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookingConfig {
  /// How long an unpaid reservation holds its seats.
  #[serde(default = "default_expiration_minutes")]
  pub expiration_minutes:  i64,
  #[serde(default = "default_sweep_interval_secs")]
  pub sweep_interval_secs: u64,
}

#[derive(Clone, Deserialize)]
pub struct PaymentsConfig {
  /// Provider API key.
  pub secret_key:               String,
  /// Provider webhook signing secret.
  pub webhook_secret:           String,
  #[serde(default = "default_api_base")]
  pub api_base:                 String,
  #[serde(default = "default_currency")]
  pub currency:                 String,
  #[serde(default = "default_signature_tolerance_secs")]
  pub signature_tolerance_secs: u64,
}

impl std::fmt::Debug for PaymentsConfig {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("PaymentsConfig")
      .field("api_base", &self.api_base)
      .field("currency", &self.currency)
      .field("signature_tolerance_secs", &self.signature_tolerance_secs)
      .finish_non_exhaustive()
  }
}

fn default_host() -> String { "127.0.0.1".into() }
fn default_port() -> u16 { 8080 }
fn default_base_url() -> String { "http://localhost:8080".into() }
fn default_store_path() -> PathBuf { PathBuf::from("boxoffice.db") }
fn default_store_timeout_ms() -> u64 { 5_000 }
fn default_tickets_dir() -> PathBuf { PathBuf::from("tickets") }
fn default_expiration_minutes() -> i64 { 10 }
fn default_sweep_interval_secs() -> u64 { 60 }
fn default_api_base() -> String {
  boxoffice_payments::stripe::DEFAULT_API_BASE.into()
}
fn default_currency() -> String { "usd".into() }
fn default_signature_tolerance_secs() -> u64 { 300 }

impl Default for BookingConfig {
  fn default() -> Self {
    Self {
      expiration_minutes:  default_expiration_minutes(),
      sweep_interval_secs: default_sweep_interval_secs(),
    }
  }
}

impl ServerConfig {
  /// Read `path` (if it exists) and overlay the environment.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn store_timeout(&self) -> Duration {
    Duration::from_millis(self.store_timeout_ms)
  }
}

impl BookingConfig {
  pub fn expiration_window(&self) -> chrono::Duration {
    chrono::Duration::minutes(self.expiration_minutes)
  }

  pub fn sweep_interval(&self) -> Duration {
    Duration::from_secs(self.sweep_interval_secs.max(1))
  }
}

impl From<&PaymentsConfig> for GatewayConfig {
  fn from(p: &PaymentsConfig) -> Self {
    GatewayConfig {
      webhook_secret:      p.webhook_secret.clone(),
      currency:            p.currency.clone(),
      signature_tolerance: Duration::from_secs(p.signature_tolerance_secs),
    }
  }
}

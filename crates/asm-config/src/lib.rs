//! Shared configuration for the asm planner.
//!
//! TOML file + `ASM_` environment overrides, switch credential resolution
//! (env + keyring + plaintext), and translation to
//! `asm_core::PlannerConfig`. The core never reads files or the
//! environment itself.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use asm_core::{FsDeploymentStore, Ordering, PlannerConfig, SwitchCredential};

const KEYRING_SERVICE: &str = "asm";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for switch '{switch}'")]
    NoCredentials { switch: String },

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub deployment: DeploymentSettings,

    #[serde(default)]
    pub cluster: ClusterSettings,

    /// Per-switch credentials, keyed by switch name.
    #[serde(default)]
    pub switches: BTreeMap<String, SwitchProfile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            deployment: DeploymentSettings::default(),
            cluster: ClusterSettings::default(),
            switches: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    /// Accepts `9000` as well as `"9000"`; env overrides arrive as numbers.
    #[serde(default = "default_mtu", deserialize_with = "string_or_number")]
    pub mtu: String,

    #[serde(default)]
    pub quad_port_mode: bool,

    /// `chain` or `graph`.
    #[serde(default = "default_ordering")]
    pub ordering: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            mtu: default_mtu(),
            quad_port_mode: false,
            ordering: default_ordering(),
        }
    }
}

fn default_output() -> String {
    "json".into()
}
fn default_mtu() -> String {
    asm_core::model::DEFAULT_MTU.into()
}
fn default_ordering() -> String {
    "chain".into()
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(text) => text,
        Raw::Number(n) => n.to_string(),
    })
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeploymentSettings {
    #[serde(default = "default_deployment_dir")]
    pub dir: PathBuf,

    /// Generated files are referenced as `tftp://<server>/...` when set.
    pub tftp_server: Option<String>,
}

impl Default for DeploymentSettings {
    fn default() -> Self {
        Self {
            dir: default_deployment_dir(),
            tftp_server: None,
        }
    }
}

fn default_deployment_dir() -> PathBuf {
    PathBuf::from("/var/lib/asm/deployments")
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClusterSettings {
    #[serde(default = "default_vsan_retry_delay")]
    pub vsan_retry_delay_secs: u64,
}

impl Default for ClusterSettings {
    fn default() -> Self {
        Self {
            vsan_retry_delay_secs: default_vsan_retry_delay(),
        }
    }
}

fn default_vsan_retry_delay() -> u64 {
    60
}

/// Local account written into a switch's startup configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SwitchProfile {
    pub username: Option<String>,

    /// Plaintext password (prefer keyring or env var).
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    pub privilege: Option<u8>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("org", "asm", "asm").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("asm");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file (missing files fall back to defaults) + environment.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        // Keys contain single underscores, so nesting uses `__`:
        // `ASM_DEFAULTS__QUAD_PORT_MODE=true`.
        .merge(Env::prefixed("ASM_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

fn keyring_entry(switch: &str) -> Result<keyring::Entry, ConfigError> {
    Ok(keyring::Entry::new(KEYRING_SERVICE, &format!("{switch}/password"))?)
}

/// Resolve the account for `switch`: password from env var, then the
/// system keyring, then plaintext in the config.
pub fn resolve_switch_credential(
    profile: &SwitchProfile,
    switch: &str,
) -> Result<SwitchCredential, ConfigError> {
    let username = profile
        .username
        .clone()
        .ok_or_else(|| ConfigError::NoCredentials {
            switch: switch.into(),
        })?;
    let credential = |password: String| SwitchCredential {
        username: username.clone(),
        password: SecretString::from(password),
        privilege: profile.privilege,
    };

    // 1. Profile's password_env → env var lookup
    if let Some(ref env_name) = profile.password_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(credential(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring_entry(switch) {
        if let Ok(secret) = entry.get_password() {
            return Ok(credential(secret));
        }
    }

    // 3. Plaintext in config
    if let Some(ref pw) = profile.password {
        return Ok(credential(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        switch: switch.into(),
    })
}

/// Store a switch password in the system keyring.
pub fn store_switch_password(switch: &str, password: &str) -> Result<(), ConfigError> {
    keyring_entry(switch)?.set_password(password)?;
    Ok(())
}

// ── Translation to core types ───────────────────────────────────────

pub fn planner_config(cfg: &Config) -> Result<PlannerConfig, ConfigError> {
    let ordering: Ordering = cfg
        .defaults
        .ordering
        .parse()
        .map_err(|_| ConfigError::Validation {
            field: "defaults.ordering".into(),
            reason: format!("expected 'chain' or 'graph', got '{}'", cfg.defaults.ordering),
        })?;
    if cfg.defaults.mtu.trim().parse::<u32>().is_err() {
        return Err(ConfigError::Validation {
            field: "defaults.mtu".into(),
            reason: format!("not a number: '{}'", cfg.defaults.mtu),
        });
    }

    Ok(PlannerConfig {
        ordering,
        default_mtu: cfg.defaults.mtu.trim().to_owned(),
        quad_port_mode: cfg.defaults.quad_port_mode,
        vsan_retry_delay: Duration::from_secs(cfg.cluster.vsan_retry_delay_secs),
        ..PlannerConfig::default()
    })
}

/// The store generated files for `deployment_id` are written to.
pub fn deployment_store(cfg: &Config, deployment_id: &str) -> FsDeploymentStore {
    FsDeploymentStore::new(&cfg.deployment.dir, deployment_id)
        .with_tftp_server(cfg.deployment.tftp_server.clone())
}

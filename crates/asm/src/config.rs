//! CLI configuration -- thin wrapper around `asm_config` shared types.
//!
//! Adds the resolution that respects `GlobalOpts` (`--config`, `--output`).

use std::path::PathBuf;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use asm_config::{Config, planner_config, resolve_switch_credential, save_config_to, store_switch_password};

// ── CLI-specific helpers ────────────────────────────────────────────

/// The config file in effect: `--config` / `ASM_CONFIG`, else the platform path.
pub fn active_config_path(global: &GlobalOpts) -> PathBuf {
    global.config.clone().unwrap_or_else(asm_config::config_path)
}

/// Load the active config file. A missing file yields defaults.
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(asm_config::load_config_from(&active_config_path(global))?)
}

/// Output format: flag > `defaults.output` > JSON.
pub fn output_format(global: &GlobalOpts, cfg: &Config) -> OutputFormat {
    global.output.unwrap_or(match cfg.defaults.output.as_str() {
        "json-compact" => OutputFormat::JsonCompact,
        "yaml" => OutputFormat::Yaml,
        "table" => OutputFormat::Table,
        _ => OutputFormat::Json,
    })
}

//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use asm_config::ConfigError;
use asm_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CONFIG: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Input ────────────────────────────────────────────────────────

    #[error("{what} not found: {path}")]
    #[diagnostic(code(asm::not_found), help("Check the path and try again."))]
    NotFound { what: String, path: String },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(asm::validation))]
    Validation { field: String, reason: String },

    #[error("Unknown switch model '{model}'")]
    #[diagnostic(
        code(asm::unknown_model),
        help("Supported families: MXL, IOA/Aggregator/PE-FN, Force10 S/Z series, Nexus, PowerConnect.\nTry: asm classify <MODEL>")
    )]
    UnknownModel { model: String },

    #[error("Missing data: {what}")]
    #[diagnostic(
        code(asm::missing_data),
        help("Check the facts file and request file for the missing values.")
    )]
    MissingData { what: String },

    // ── Planning ─────────────────────────────────────────────────────

    #[error("{reference} is declared twice")]
    #[diagnostic(
        code(asm::conflict),
        help("Two requests or uplinks manage the same {resource_type} '{id}'.")
    )]
    Conflict {
        reference: String,
        resource_type: String,
        id: String,
    },

    #[error("{message}")]
    #[diagnostic(code(asm::invalid_request))]
    InvalidRequest { message: String },

    #[error("{operation} is not supported on {family} switches")]
    #[diagnostic(code(asm::unsupported))]
    Unsupported { operation: String, family: String },

    #[error("{message}")]
    #[diagnostic(code(asm::core))]
    Core { message: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("No credentials configured for switch '{switch}'")]
    #[diagnostic(
        code(asm::no_credentials),
        help(
            "Add a [switches.{switch}] section with a username, then run:\n\
             asm config set-password {switch}"
        )
    )]
    NoCredentials { switch: String },

    #[error("Configuration file already exists at {path}")]
    #[diagnostic(code(asm::config_exists), help("Use --force to overwrite it."))]
    ConfigExists { path: String },

    #[error(transparent)]
    #[diagnostic(code(asm::config))]
    Config(Box<ConfigError>),

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(code(asm::json), help("Check the JSON file contents and try again."))]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization failed: {0}")]
    #[diagnostic(code(asm::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Validation { .. } | Self::UnknownModel { .. } => exit_code::USAGE,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } | Self::ConfigExists { .. } => exit_code::CONFLICT,
            Self::Config(_) | Self::NoCredentials { .. } => exit_code::CONFIG,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::AlreadyManaged {
                resource_type,
                id,
                reference,
            } => CliError::Conflict {
                reference,
                resource_type,
                id,
            },

            CoreError::UnknownSwitchModel { model } => CliError::UnknownModel { model },

            CoreError::MissingData { what } => CliError::MissingData { what },

            CoreError::Unsupported { operation, family } => {
                CliError::Unsupported { operation, family }
            }

            CoreError::InvalidConfigFile { reason } => CliError::Validation {
                field: "config file".into(),
                reason,
            },

            CoreError::Json(e) => CliError::Json(e),

            CoreError::Io(e) => CliError::Io(e),

            other if other.is_invariant_violation() => CliError::InvalidRequest {
                message: other.to_string(),
            },

            other => CliError::Core {
                message: other.to_string(),
            },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { switch } => CliError::NoCredentials { switch },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other => CliError::Config(Box::new(other)),
        }
    }
}

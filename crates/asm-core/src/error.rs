// ── Core error types ──
//
// Errors raised while building resource sets. Invariant violations are
// hard failures that abort the current preparation pass; nothing in the
// builders swallows them. Callers decide whether to log and continue.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Invariant violations ─────────────────────────────────────────
    #[error("{reference} is already being managed")]
    AlreadyManaged {
        resource_type: String,
        id: String,
        reference: String,
    },

    #[error("Only one untagged network is allowed on {interface}, found: {}", vlans.join(", "))]
    MultipleUntaggedVlans { interface: String, vlans: Vec<String> },

    #[error("Interface name is required to configure a VLAN")]
    EmptyInterface,

    #[error("IOM mode has already been configured for this switch")]
    IomModeAlreadyConfigured,

    #[error("Cannot configure VLT: no adjacent IOM with a management IP for slot {slot}")]
    NoVltPeer { slot: u32 },

    #[error("Cannot configure VLT while the switch is in standalone teaming mode")]
    VltInStandaloneMode,

    #[error("Dependency cycle detected at {resource}")]
    DependencyCycle { resource: String },

    // ── Missing data ─────────────────────────────────────────────────
    #[error("Required data missing: {what}")]
    MissingData { what: String },

    // ── Unsupported operations ───────────────────────────────────────
    #[error("Operation not supported: {operation} on {family} switches")]
    Unsupported { operation: String, family: String },

    #[error("Unknown switch model: {model}")]
    UnknownSwitchModel { model: String },

    // ── Configuration files ──────────────────────────────────────────
    #[error("Invalid switch configuration file: {reason}")]
    InvalidConfigFile { reason: String },

    // ── External collaborators ───────────────────────────────────────
    #[error("Apply failed for {target}: {message}")]
    Apply { target: String, message: String },

    #[error("Failed to persist deployment file: {message}")]
    Persistence { message: String },

    #[error("Inventory lookup failed: {message}")]
    Inventory { message: String },

    // ── Serialization / IO ───────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    pub(crate) fn missing(what: impl Into<String>) -> Self {
        Self::MissingData { what: what.into() }
    }

    pub(crate) fn unsupported(operation: impl Into<String>, family: impl ToString) -> Self {
        Self::Unsupported {
            operation: operation.into(),
            family: family.to_string(),
        }
    }

    /// Whether this error signals an invariant violation in the input data.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Self::AlreadyManaged { .. }
                | Self::MultipleUntaggedVlans { .. }
                | Self::EmptyInterface
                | Self::IomModeAlreadyConfigured
                | Self::NoVltPeer { .. }
                | Self::VltInStandaloneMode
                | Self::DependencyCycle { .. }
        )
    }
}

// ── Switch families ──
//
// A family decides which resource vocabulary a Creator emits. The model
// string reported by the switch facts is the only classification input.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

static MXL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"MXL").expect("MXL model regex is valid"));
static IOA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Aggregator|IOA|PE-FN").expect("IOA model regex is valid"));
static AGGREGATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Aggregator|IOA").expect("aggregator regex is valid"));
static PE_FN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"PE-FN").expect("PE-FN regex is valid"));
static NEXUS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)nexus|^N\d+K|N[35679]K").expect("Nexus model regex is valid")
});
static POWERCONNECT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)powerconnect|^PC\d").expect("PowerConnect model regex is valid")
});
static FORCE10_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^S\d{4}|force10|dell networking s|^Z9\d{3}")
        .expect("Force10 model regex is valid")
});

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SwitchFamily {
    Force10Rack,
    Force10BladeIoa,
    Force10BladeMxl,
    NexusRack,
    PowerConnectRack,
}

/// Resource type names a family declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vocabulary {
    pub interface: &'static str,
    pub portchannel: &'static str,
    pub vlan: Option<&'static str>,
    pub quadmode: Option<&'static str>,
    pub settings: Option<&'static str>,
    pub mode: Option<&'static str>,
    pub config: Option<&'static str>,
}

const FORCE10_RACK: Vocabulary = Vocabulary {
    interface: "force10_interface",
    portchannel: "force10_portchannel",
    vlan: Some("force10_vlan"),
    quadmode: Some("force10_quadmode"),
    settings: Some("force10_settings"),
    mode: None,
    config: None,
};

const IOA: Vocabulary = Vocabulary {
    interface: "ioa_interface",
    portchannel: "ioa_portchannel",
    vlan: None,
    quadmode: Some("ioa_quadmode"),
    settings: None,
    mode: Some("ioa_mode"),
    config: None,
};

const MXL: Vocabulary = Vocabulary {
    interface: "mxl_interface",
    portchannel: "mxl_portchannel",
    vlan: Some("mxl_vlan"),
    quadmode: Some("mxl_quadmode"),
    settings: Some("mxl_settings"),
    mode: None,
    config: Some("mxl_config"),
};

const NEXUS: Vocabulary = Vocabulary {
    interface: "cisconexus5k_interface",
    portchannel: "cisconexus5k_portchannel",
    vlan: Some("cisconexus5k_vlan"),
    quadmode: None,
    settings: None,
    mode: None,
    config: None,
};

const POWERCONNECT: Vocabulary = Vocabulary {
    interface: "powerconnect_interface",
    portchannel: "powerconnect_portchannel",
    vlan: Some("powerconnect_vlan"),
    quadmode: None,
    settings: None,
    mode: None,
    config: None,
};

impl SwitchFamily {
    /// Classify a model string. MXL is checked before the aggregator
    /// patterns so blade switches never fall through to the rack families.
    pub fn classify(model: &str) -> Result<Self, CoreError> {
        let family = if MXL_RE.is_match(model) {
            Self::Force10BladeMxl
        } else if IOA_RE.is_match(model) {
            Self::Force10BladeIoa
        } else if NEXUS_RE.is_match(model) {
            Self::NexusRack
        } else if POWERCONNECT_RE.is_match(model) {
            Self::PowerConnectRack
        } else if FORCE10_RE.is_match(model) {
            Self::Force10Rack
        } else {
            return Err(CoreError::UnknownSwitchModel {
                model: model.to_owned(),
            });
        };
        Ok(family)
    }

    pub fn vocabulary(self) -> &'static Vocabulary {
        match self {
            Self::Force10Rack => &FORCE10_RACK,
            Self::Force10BladeIoa => &IOA,
            Self::Force10BladeMxl => &MXL,
            Self::NexusRack => &NEXUS,
            Self::PowerConnectRack => &POWERCONNECT,
        }
    }

    pub fn is_blade(self) -> bool {
        matches!(self, Self::Force10BladeIoa | Self::Force10BladeMxl)
    }
}

/// PE-FN models run full-switch mode and carry VLANs on port-channels.
pub fn is_pe_fn(model: &str) -> bool {
    PE_FN_RE.is_match(model)
}

/// Aggregator models get their ports reset before first use.
pub fn is_aggregator(model: &str) -> bool {
    AGGREGATOR_RE.is_match(model)
}

// ── Interface VLAN requests ──
//
// One request = one VLAN membership intent for one physical interface.
// Requests are only recorded here; validation and materialization are
// deferred to `prepare`.

use serde::{Deserialize, Serialize};

/// Interface MTU applied when a request does not name one.
pub const DEFAULT_MTU: &str = "12000";

/// The permanent default/native VLAN. Never removed.
pub const DEFAULT_VLAN: &str = "1";

/// Which preparation pass a request belongs to.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Action {
    #[default]
    Add,
    Remove,
}

fn default_mtu() -> String {
    DEFAULT_MTU.into()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceRequest {
    pub interface: String,
    pub vlan: String,
    #[serde(default)]
    pub tagged: bool,
    /// Port-channel number; empty when the port is not aggregated.
    #[serde(default)]
    pub portchannel: String,
    #[serde(default = "default_mtu")]
    pub mtu: String,
    #[serde(default)]
    pub action: Action,
}

impl InterfaceRequest {
    pub fn portchannel(&self) -> Option<&str> {
        let pc = self.portchannel.trim();
        (!pc.is_empty()).then_some(pc)
    }

    /// Untagged membership in VLAN 1 is never part of a removal pass.
    pub fn is_default_vlan_removal(&self) -> bool {
        self.action == Action::Remove && !self.tagged && self.vlan == DEFAULT_VLAN
    }
}

/// One network a server port should carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortNetwork {
    pub vlan: String,
    #[serde(default)]
    pub tagged: bool,
}

impl PortNetwork {
    pub fn tagged(vlan: impl Into<String>) -> Self {
        Self {
            vlan: vlan.into(),
            tagged: true,
        }
    }

    pub fn untagged(vlan: impl Into<String>) -> Self {
        Self {
            vlan: vlan.into(),
            tagged: false,
        }
    }
}

// ── Uplinks and networks ──

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Network classification as reported by the deployment template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NetworkType {
    PublicLan,
    PrivateLan,
    HypervisorManagement,
    HypervisorMigration,
    HypervisorClusterPrivate,
    StorageIscsiSan,
    StorageFcoeSan,
    Pxe,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInfo {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub vlan_id: String,
    #[serde(rename = "type")]
    pub network_type: NetworkType,
}

/// Network definitions keyed by network id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetworkCatalog(IndexMap<String, NetworkInfo>);

impl NetworkCatalog {
    pub fn new(networks: impl IntoIterator<Item = NetworkInfo>) -> Self {
        Self(networks.into_iter().map(|n| (n.id.clone(), n)).collect())
    }

    pub fn get(&self, id: &str) -> Option<&NetworkInfo> {
        self.0.get(id)
    }

    pub fn vlan_of(&self, id: &str) -> Option<&str> {
        self.get(id).map(|n| n.vlan_id.as_str())
    }

    pub fn is_fcoe(&self, id: &str) -> bool {
        self.get(id)
            .is_some_and(|n| n.network_type == NetworkType::StorageFcoeSan)
    }
}

/// One uplink port-channel as configured in the deployment template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Uplink {
    pub portchannel: String,
    #[serde(default)]
    pub port_members: Vec<String>,
    /// Network ids carried by this uplink.
    #[serde(default)]
    pub networks: Vec<String>,
    #[serde(default)]
    pub mtu: Option<String>,
}

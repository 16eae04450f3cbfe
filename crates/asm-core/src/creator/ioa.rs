// ── Blade I/O Aggregator creator ──
//
// IOAs have no VLAN resource type: the interface resource carries the
// VLAN lists directly. The switch personality (pmux, vlt, fullswitch)
// is a single global setting declared at most once per creator.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::materialize::materialize_requests;
use super::quadmode::declare_quadmode;
use super::{CreatorCore, ResourceCreator};
use crate::error::CoreError;
use crate::facts::SwitchFacts;
use crate::model::{
    Action, DEFAULT_MTU, DEFAULT_VLAN, InterfaceName, InterfaceRequest, SwitchFamily,
    is_aggregator, normalize_interface,
};
use crate::provider::vlt::VltBackupLink;
use crate::resource::{AttrsBuilder, Ordering, ResourceRef};

const MODE_ID: &str = "iom_mode";

/// VLT peering parameters for the `vlt` personality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VltPeering {
    pub portchannel: String,
    /// Interconnect ports between the two peers.
    #[serde(default)]
    pub interfaces: Vec<String>,
    pub backup: VltBackupLink,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IomMode {
    Pmux,
    Vlt(VltPeering),
    FullSwitch,
}

impl IomMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pmux => "pmux",
            Self::Vlt(_) => "vlt",
            Self::FullSwitch => "fullswitch",
        }
    }
}

#[derive(Debug, Clone)]
pub struct IoaCreator {
    core: CreatorCore,
    mode_configured: bool,
}

impl IoaCreator {
    pub fn new(ordering: Ordering) -> Self {
        Self {
            core: CreatorCore::new(SwitchFamily::Force10BladeIoa, ordering),
            mode_configured: false,
        }
    }

    pub fn mode_configured(&self) -> bool {
        self.mode_configured
    }

    /// Declare the switch personality. Fails on a second call, even after
    /// a reset: the mode is one global hardware setting.
    pub fn iom_mode_resource(&mut self, mode: &IomMode) -> Result<ResourceRef, CoreError> {
        if self.mode_configured {
            return Err(CoreError::IomModeAlreadyConfigured);
        }
        let Some(resource_type) = self.core.vocabulary().mode else {
            return Err(CoreError::unsupported("IOM mode", self.core.family()));
        };

        let mut attrs = AttrsBuilder::new()
            .with("ensure", "present")
            .with("iom_mode", mode.as_str());
        if let IomMode::Vlt(peering) = mode {
            attrs = attrs
                .with("port_channel", peering.portchannel.as_str())
                .with("destination_ip", peering.backup.destination_ip.as_str())
                .with("unit_id", peering.backup.unit_id.as_str())
                .with_list(
                    "interface",
                    peering.interfaces.iter().map(|i| normalize_interface(i)).collect(),
                );
        }
        let reference = self
            .core
            .resources
            .declare(resource_type, MODE_ID, attrs.build())?;
        self.mode_configured = true;
        info!(mode = mode.as_str(), "declared IOM mode");
        Ok(reference)
    }

    /// Reset every physical port to untagged VLAN 1 with no tagged VLANs.
    ///
    /// Only Aggregator models are reset. Synthesizes removal requests from
    /// the VLAN table in `facts` and prepares a removal pass; returns
    /// whether there is anything to apply.
    pub fn initialize_ports(&mut self, facts: &SwitchFacts) -> Result<bool, CoreError> {
        let model = facts.model().unwrap_or_default();
        if !is_aggregator(model) {
            debug!(model, "not an aggregator, skipping port initialization");
            return Ok(false);
        }

        let known: HashSet<String> = facts
            .interfaces()
            .iter()
            .map(|i| normalize_interface(i))
            .collect();
        let is_physical = |name: &str| {
            InterfaceName::parse(name).is_some() && (known.is_empty() || known.contains(name))
        };

        for (vlan, membership) in facts.vlan_information() {
            let tagged = membership.tagged.iter().map(|i| (i, true));
            let untagged = membership
                .untagged
                .iter()
                .filter(|_| vlan != DEFAULT_VLAN)
                .map(|i| (i, false));
            for (interface, is_tagged) in tagged.chain(untagged) {
                let interface = normalize_interface(interface);
                if !is_physical(&interface) {
                    continue;
                }
                self.record(InterfaceRequest {
                    interface,
                    vlan: vlan.clone(),
                    tagged: is_tagged,
                    portchannel: String::new(),
                    mtu: DEFAULT_MTU.into(),
                    action: Action::Remove,
                })?;
            }
        }
        self.prepare(Action::Remove)
    }
}

impl ResourceCreator for IoaCreator {
    fn core(&self) -> &CreatorCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut CreatorCore {
        &mut self.core
    }

    fn materialize(&mut self, action: Action) -> Result<(), CoreError> {
        materialize_requests(&mut self.core, action, false)
    }

    fn configure_quadmode(&mut self, interfaces: &[String], enable: bool) -> Result<usize, CoreError> {
        let resource_type = self
            .core
            .vocabulary()
            .quadmode
            .ok_or_else(|| CoreError::unsupported("quad-port mode", self.core.family()))?;
        declare_quadmode(&mut self.core, resource_type, interfaces, enable)
    }
}

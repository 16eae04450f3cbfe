//! Switch resource creators.
//!
//! A creator records [`InterfaceRequest`]s and direct declarations for one
//! switch, then materializes them into a [`ResourceSet`] one pass at a
//! time. The shared capability lives on [`ResourceCreator`]; the concrete
//! variants only add what their hardware family needs:
//!
//! - [`RackCreator`]: top-of-rack Force10, Nexus and PowerConnect switches
//! - [`IoaCreator`]: blade I/O Aggregators, including the PE-FN variant
//! - [`MxlCreator`]: MXL blade switches, including config-file pushes
//!
//! [`SwitchCreator`] is the closed dispatch over the three, chosen from
//! [`SwitchFamily`].

mod ioa;
mod materialize;
mod mxl;
mod quadmode;
mod rack;

use indexmap::IndexMap;
use tracing::debug;

use crate::error::CoreError;
use crate::model::{Action, DEFAULT_MTU, InterfaceRequest, SwitchFamily, Vocabulary, normalize_interface};
use crate::resource::{AttrsBuilder, Manifest, Ordering, ResourceRef, ResourceSet};

pub use ioa::{IoaCreator, IomMode, VltPeering};
pub use mxl::{MxlCreator, MxlSettings};
pub use rack::RackCreator;

// ── Shared state ────────────────────────────────────────────────────

/// State every creator owns: its family, resource set and request log.
#[derive(Debug, Clone)]
pub struct CreatorCore {
    family: SwitchFamily,
    resources: ResourceSet,
    requests: Vec<InterfaceRequest>,
}

impl CreatorCore {
    pub fn new(family: SwitchFamily, ordering: Ordering) -> Self {
        Self {
            family,
            resources: ResourceSet::new(ordering),
            requests: Vec::new(),
        }
    }

    pub fn family(&self) -> SwitchFamily {
        self.family
    }

    pub fn vocabulary(&self) -> &'static Vocabulary {
        self.family.vocabulary()
    }

    pub fn resources(&self) -> &ResourceSet {
        &self.resources
    }

    pub fn resources_mut(&mut self) -> &mut ResourceSet {
        &mut self.resources
    }

    pub fn requests(&self) -> &[InterfaceRequest] {
        &self.requests
    }

    pub(crate) fn declare_portchannel(
        &mut self,
        spec: &PortChannelSpec,
    ) -> Result<ResourceRef, CoreError> {
        let attrs = AttrsBuilder::new()
            .with("ensure", if spec.remove { "absent" } else { "present" })
            .with("switchport", true)
            .with("shutdown", false)
            .with("mtu", spec.mtu.as_deref().unwrap_or(DEFAULT_MTU))
            .with("fip_snooping_fcf", spec.fcoe)
            .with("vltpeer", spec.vlt_peer)
            .with("ungroup", spec.ungroup)
            .build();
        let resource_type = self.vocabulary().portchannel;
        self.resources.declare(resource_type, &spec.number, attrs)
    }
}

/// Parameters of one port-channel declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortChannelSpec {
    pub number: String,
    pub fcoe: bool,
    pub remove: bool,
    pub vlt_peer: bool,
    pub ungroup: bool,
    pub mtu: Option<String>,
}

impl PortChannelSpec {
    pub fn new(number: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            ..Self::default()
        }
    }

    pub fn fcoe(mut self, fcoe: bool) -> Self {
        self.fcoe = fcoe;
        self
    }

    pub fn remove(mut self) -> Self {
        self.remove = true;
        self
    }

    pub fn vlt_peer(mut self) -> Self {
        self.vlt_peer = true;
        self
    }

    pub fn ungroup(mut self, ungroup: bool) -> Self {
        self.ungroup = ungroup;
        self
    }

    pub fn mtu(mut self, mtu: impl Into<String>) -> Self {
        self.mtu = Some(mtu.into());
        self
    }
}

// ── Capability interface ────────────────────────────────────────────

pub trait ResourceCreator {
    fn core(&self) -> &CreatorCore;

    fn core_mut(&mut self) -> &mut CreatorCore;

    /// Turn the recorded requests for `action` into resources.
    ///
    /// Called by [`prepare`](Self::prepare) on a freshly reset set.
    fn materialize(&mut self, action: Action) -> Result<(), CoreError>;

    fn family(&self) -> SwitchFamily {
        self.core().family
    }

    /// Clear resources and the request log; restart the chain.
    fn reset(&mut self, start_sequence: Option<ResourceRef>) {
        let core = self.core_mut();
        core.resources.reset(start_sequence);
        core.requests.clear();
    }

    /// Record one interface VLAN request. No validation happens here.
    fn configure_interface_vlan(
        &mut self,
        interface: &str,
        vlan: &str,
        tagged: bool,
        remove: bool,
        portchannel: Option<&str>,
        mtu: Option<&str>,
    ) -> Result<(), CoreError> {
        self.record(InterfaceRequest {
            interface: interface.to_owned(),
            vlan: vlan.to_owned(),
            tagged,
            portchannel: portchannel.unwrap_or_default().to_owned(),
            mtu: mtu.unwrap_or(DEFAULT_MTU).to_owned(),
            action: if remove { Action::Remove } else { Action::Add },
        })
    }

    /// Append a prepared request to the log.
    fn record(&mut self, request: InterfaceRequest) -> Result<(), CoreError> {
        if request.interface.trim().is_empty() {
            return Err(CoreError::EmptyInterface);
        }
        self.core_mut().requests.push(request);
        Ok(())
    }

    fn requests(&self) -> &[InterfaceRequest] {
        &self.core().requests
    }

    /// At most one untagged VLAN per interface, across both actions.
    fn validate_vlans(&self) -> Result<(), CoreError> {
        let mut untagged: IndexMap<String, Vec<String>> = IndexMap::new();
        for request in self.requests().iter().filter(|r| !r.tagged) {
            untagged
                .entry(normalize_interface(&request.interface))
                .or_default()
                .push(request.vlan.clone());
        }
        match untagged.into_iter().find(|(_, vlans)| vlans.len() > 1) {
            Some((interface, vlans)) => Err(CoreError::MultipleUntaggedVlans { interface, vlans }),
            None => Ok(()),
        }
    }

    /// Materialize one pass. Returns whether anything was produced.
    ///
    /// The request log survives so the add and remove passes of one
    /// cycle see the same requests.
    fn prepare(&mut self, action: Action) -> Result<bool, CoreError> {
        self.core_mut().resources.reset(None);
        self.validate_vlans()?;
        self.materialize(action)?;
        let produced = !self.core().resources.is_empty();
        debug!(
            family = %self.family(),
            %action,
            resources = self.core().resources.len(),
            "prepared resource set"
        );
        Ok(produced)
    }

    /// Declare one sequenced port-channel resource.
    fn portchannel_resource(&mut self, spec: &PortChannelSpec) -> Result<ResourceRef, CoreError> {
        self.core_mut().declare_portchannel(spec)
    }

    fn has_resource(&self, resource_type: &str, id: &str) -> bool {
        self.core().resources.contains(resource_type, id)
    }

    fn resources(&self) -> &ResourceSet {
        &self.core().resources
    }

    fn to_manifest(&self) -> Result<Manifest, CoreError> {
        self.core().resources.to_manifest()
    }

    /// Enable or disable quad-port mode on 40G interfaces.
    fn configure_quadmode(&mut self, _interfaces: &[String], _enable: bool) -> Result<usize, CoreError> {
        Err(CoreError::unsupported("quad-port mode", self.family()))
    }

    /// Pass settings through as one settings resource.
    fn configure_settings(&mut self, _settings: &IndexMap<String, String>) -> Result<ResourceRef, CoreError> {
        Err(CoreError::unsupported("settings", self.family()))
    }
}

// ── Closed dispatch ─────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum SwitchCreator {
    Rack(RackCreator),
    BladeIoa(IoaCreator),
    BladeMxl(MxlCreator),
}

impl SwitchCreator {
    pub fn for_family(family: SwitchFamily, ordering: Ordering) -> Self {
        match family {
            SwitchFamily::Force10BladeIoa => Self::BladeIoa(IoaCreator::new(ordering)),
            SwitchFamily::Force10BladeMxl => Self::BladeMxl(MxlCreator::new(ordering)),
            SwitchFamily::Force10Rack | SwitchFamily::NexusRack | SwitchFamily::PowerConnectRack => {
                Self::Rack(RackCreator::new(family, ordering))
            }
        }
    }

    pub fn as_ioa_mut(&mut self) -> Option<&mut IoaCreator> {
        match self {
            Self::BladeIoa(creator) => Some(creator),
            _ => None,
        }
    }

    pub fn as_mxl_mut(&mut self) -> Option<&mut MxlCreator> {
        match self {
            Self::BladeMxl(creator) => Some(creator),
            _ => None,
        }
    }

    fn inner(&self) -> &dyn ResourceCreator {
        match self {
            Self::Rack(c) => c,
            Self::BladeIoa(c) => c,
            Self::BladeMxl(c) => c,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn ResourceCreator {
        match self {
            Self::Rack(c) => c,
            Self::BladeIoa(c) => c,
            Self::BladeMxl(c) => c,
        }
    }
}

impl ResourceCreator for SwitchCreator {
    fn core(&self) -> &CreatorCore {
        self.inner().core()
    }

    fn core_mut(&mut self) -> &mut CreatorCore {
        self.inner_mut().core_mut()
    }

    fn materialize(&mut self, action: Action) -> Result<(), CoreError> {
        self.inner_mut().materialize(action)
    }

    fn configure_quadmode(&mut self, interfaces: &[String], enable: bool) -> Result<usize, CoreError> {
        self.inner_mut().configure_quadmode(interfaces, enable)
    }

    fn configure_settings(&mut self, settings: &IndexMap<String, String>) -> Result<ResourceRef, CoreError> {
        self.inner_mut().configure_settings(settings)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn creator(family: SwitchFamily) -> SwitchCreator {
        SwitchCreator::for_family(family, Ordering::Chain)
    }

    #[test]
    fn empty_interface_is_rejected() {
        let mut c = creator(SwitchFamily::Force10Rack);
        let err = c
            .configure_interface_vlan("  ", "10", true, false, None, None)
            .unwrap_err();
        assert!(matches!(err, CoreError::EmptyInterface));
    }

    #[test]
    fn two_untagged_vlans_on_one_port_fail_validation() {
        let mut c = creator(SwitchFamily::Force10Rack);
        c.configure_interface_vlan("Te 0/1", "18", false, false, None, None).unwrap();
        c.configure_interface_vlan("TenGigabitEthernet 0/1", "20", false, true, None, None)
            .unwrap();
        match c.validate_vlans().unwrap_err() {
            CoreError::MultipleUntaggedVlans { interface, vlans } => {
                assert_eq!(interface, "Te 0/1");
                assert_eq!(vlans, ["18", "20"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn repeated_untagged_request_is_not_collapsed() {
        let mut c = creator(SwitchFamily::Force10Rack);
        c.configure_interface_vlan("Te 0/1", "18", false, false, None, None).unwrap();
        c.configure_interface_vlan("Te 0/1", "18", false, false, None, None).unwrap();
        assert!(matches!(
            c.validate_vlans().unwrap_err(),
            CoreError::MultipleUntaggedVlans { .. }
        ));
    }

    #[test]
    fn one_untagged_vlan_per_port_passes_validation() {
        let mut c = creator(SwitchFamily::Force10Rack);
        c.configure_interface_vlan("Te 0/1", "18", false, false, None, None).unwrap();
        c.configure_interface_vlan("Te 0/2", "18", false, false, None, None).unwrap();
        c.configure_interface_vlan("Te 0/1", "10", true, false, None, None).unwrap();
        c.configure_interface_vlan("Te 0/1", "11", true, false, None, None).unwrap();
        c.validate_vlans().unwrap();
    }

    #[test]
    fn prepare_keeps_the_request_log() {
        let mut c = creator(SwitchFamily::Force10Rack);
        c.configure_interface_vlan("Te 0/1", "10", true, false, None, None).unwrap();
        assert!(c.prepare(Action::Add).unwrap());
        assert!(!c.prepare(Action::Remove).unwrap());
        assert_eq!(c.requests().len(), 1);
        c.reset(None);
        assert!(c.requests().is_empty());
        assert!(c.resources().is_empty());
    }

    #[test]
    fn duplicate_portchannel_names_the_resource() {
        let mut c = creator(SwitchFamily::Force10Rack);
        c.portchannel_resource(&PortChannelSpec::new("128")).unwrap();
        let err = c.portchannel_resource(&PortChannelSpec::new("128")).unwrap_err();
        assert_eq!(err.to_string(), "Force10_portchannel[128] is already being managed");
        assert!(c.has_resource("force10_portchannel", "128"));
    }

    #[test]
    fn portchannel_attributes_render_as_strings() {
        let mut c = creator(SwitchFamily::Force10BladeMxl);
        c.portchannel_resource(&PortChannelSpec::new("1").fcoe(true).mtu("9000"))
            .unwrap();
        let manifest = c.to_manifest().unwrap();
        assert_eq!(manifest.attr_str("mxl_portchannel", "1", "ensure"), Some("present"));
        assert_eq!(manifest.attr_str("mxl_portchannel", "1", "fip_snooping_fcf"), Some("true"));
        assert_eq!(manifest.attr_str("mxl_portchannel", "1", "mtu"), Some("9000"));
        assert_eq!(manifest.attr_str("mxl_portchannel", "1", "vltpeer"), Some("false"));
    }

    #[test]
    fn chain_links_each_declaration_to_the_previous() {
        let mut c = creator(SwitchFamily::Force10Rack);
        for n in ["1", "2", "3", "4"] {
            c.portchannel_resource(&PortChannelSpec::new(n)).unwrap();
        }
        let manifest = c.to_manifest().unwrap();
        assert!(manifest.attr("force10_portchannel", "1", "require").is_none());
        for (k, prev) in [("2", "1"), ("3", "2"), ("4", "3")] {
            assert_eq!(
                manifest.attr_str("force10_portchannel", k, "require"),
                Some(format!("Force10_portchannel[{prev}]").as_str())
            );
        }
    }

    #[test]
    fn quad_mode_is_unsupported_on_nexus() {
        let mut c = creator(SwitchFamily::NexusRack);
        let err = c.configure_quadmode(&["Fo 0/1".to_owned()], true).unwrap_err();
        assert!(matches!(err, CoreError::Unsupported { .. }));
    }
}

// ── Port-channel desired state ──
//
// Uplink definitions from the deployment template become a pure
// `PortChannelPlan`: desired channels with their expanded member ports
// and VLANs, plus the diff against the switch's current membership.
// The plan is then declared on a creator in one go.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, warn};

use crate::creator::{PortChannelSpec, ResourceCreator};
use crate::error::CoreError;
use crate::facts::CycleContext;
use crate::model::{
    DEFAULT_MTU, DEFAULT_VLAN, InterfaceKind, InterfaceName, NetworkCatalog, Uplink,
};
use crate::resource::{AttrsBuilder, ResourceRef};

/// One desired port-channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortChannelDescriptor {
    pub number: String,
    pub members: Vec<String>,
    pub vlans: Vec<String>,
    pub fcoe: bool,
    pub mtu: String,
}

/// A port to take out of a port-channel it currently belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberRemoval {
    pub portchannel: String,
    pub interface: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanOptions {
    pub quad_port_mode: bool,
    pub default_mtu: String,
    /// Whether VLAN resources can name the port-channels tagging them.
    pub vlan_on_portchannel: bool,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            quad_port_mode: false,
            default_mtu: DEFAULT_MTU.into(),
            vlan_on_portchannel: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PortChannelPlan {
    pub desired: Vec<PortChannelDescriptor>,
    pub member_removals: Vec<MemberRemoval>,
    pub removed_portchannels: Vec<String>,
    pub vlan_on_portchannel: bool,
}

fn push_unique(list: &mut Vec<String>, item: String) {
    if !list.contains(&item) {
        list.push(item);
    }
}

/// Apply FC relabelling and quad-group expansion to one member port.
fn expand_member(raw: &str, fcoe: bool, quad_port_mode: bool, ctx: &CycleContext<'_>) -> Vec<String> {
    let Some(name) = InterfaceName::parse(raw) else {
        return vec![raw.trim().to_owned()];
    };
    let name = if name.kind() == InterfaceKind::FibreChannel && !fcoe {
        name.with_kind(InterfaceKind::TenGigabitEthernet)
    } else {
        name
    };
    if quad_port_mode || ctx.is_quad_grouped(&name) {
        name.quad_group().iter().map(ToString::to_string).collect()
    } else {
        vec![name.to_string()]
    }
}

impl PortChannelPlan {
    pub fn compute(
        uplinks: &[Uplink],
        networks: &NetworkCatalog,
        ctx: &CycleContext<'_>,
        options: &PlanOptions,
    ) -> Self {
        let mut desired: Vec<PortChannelDescriptor> = Vec::new();
        for uplink in uplinks {
            let fcoe = uplink.networks.iter().any(|id| networks.is_fcoe(id));
            let mut members = Vec::new();
            for raw in &uplink.port_members {
                for member in expand_member(raw, fcoe, options.quad_port_mode, ctx) {
                    push_unique(&mut members, member);
                }
            }
            let mut vlans = Vec::new();
            for id in &uplink.networks {
                match networks.vlan_of(id) {
                    Some(vlan) => push_unique(&mut vlans, vlan.to_owned()),
                    None => warn!(network = %id, portchannel = %uplink.portchannel, "no VLAN known for network"),
                }
            }
            desired.push(PortChannelDescriptor {
                number: uplink.portchannel.trim().to_owned(),
                members,
                vlans,
                fcoe,
                mtu: uplink.mtu.clone().unwrap_or_else(|| options.default_mtu.clone()),
            });
        }

        let mut claimed: HashMap<&str, &str> = HashMap::new();
        for pc in &desired {
            for member in &pc.members {
                claimed.entry(member.as_str()).or_insert(pc.number.as_str());
            }
        }

        let current = ctx.portchannel_members();
        let mut member_removals: Vec<MemberRemoval> = Vec::new();
        for pc in &desired {
            let Some(current_members) = current.get(&pc.number) else {
                continue;
            };
            for interface in current_members {
                if pc.members.contains(interface) {
                    continue;
                }
                if let Some(owner) = claimed.get(interface.as_str()) {
                    debug!(%interface, from = %pc.number, to = %owner, "port moves to another port-channel");
                    continue;
                }
                if member_removals.iter().any(|r| &r.interface == interface) {
                    continue;
                }
                member_removals.push(MemberRemoval {
                    portchannel: pc.number.clone(),
                    interface: interface.clone(),
                });
            }
        }

        let removed_portchannels = current
            .keys()
            .filter(|number| !desired.iter().any(|pc| &pc.number == *number))
            .cloned()
            .collect();

        Self {
            desired,
            member_removals,
            removed_portchannels,
            vlan_on_portchannel: options.vlan_on_portchannel,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.desired.is_empty() && self.member_removals.is_empty() && self.removed_portchannels.is_empty()
    }

    /// Declare the plan on `creator`. Returns the number of resources declared.
    ///
    /// Ports are freed first (member removals, stale channels), then the
    /// desired channels and members, then VLAN membership.
    pub fn declare<C: ResourceCreator + ?Sized>(&self, creator: &mut C) -> Result<usize, CoreError> {
        let vocab = creator.core().vocabulary();
        let before = creator.resources().len();

        for removal in &self.member_removals {
            let attrs = AttrsBuilder::new()
                .with("ensure", "present")
                .with("remove_portchannel", removal.portchannel.as_str())
                .build();
            creator
                .core_mut()
                .resources_mut()
                .declare(vocab.interface, &removal.interface, attrs)?;
        }
        for number in &self.removed_portchannels {
            creator.portchannel_resource(&PortChannelSpec::new(number.as_str()).remove())?;
        }

        let mut pc_refs: Vec<(&PortChannelDescriptor, ResourceRef)> = Vec::new();
        for pc in &self.desired {
            let spec = PortChannelSpec::new(pc.number.as_str())
                .fcoe(pc.fcoe)
                .mtu(pc.mtu.as_str());
            let pc_ref = creator.portchannel_resource(&spec)?;
            for member in &pc.members {
                let attrs = AttrsBuilder::new()
                    .with("ensure", "present")
                    .with("portchannel", pc.number.as_str())
                    .with("shutdown", false)
                    .with("mtu", pc.mtu.as_str())
                    .build();
                let resources = creator.core_mut().resources_mut();
                let member_ref = resources.declare(vocab.interface, member, attrs)?;
                resources.depends(&member_ref, &pc_ref);
            }
            pc_refs.push((pc, pc_ref));
        }

        let mut vlan_refs: HashMap<String, ResourceRef> = HashMap::new();
        if let Some(vlan_type) = vocab.vlan {
            for (pc, pc_ref) in &pc_refs {
                for vlan in pc.vlans.iter().filter(|v| v.as_str() != DEFAULT_VLAN) {
                    let resources = creator.core_mut().resources_mut();
                    let vlan_ref = match vlan_refs.get(vlan) {
                        Some(existing) => existing.clone(),
                        None => {
                            let attrs = AttrsBuilder::new()
                                .with("ensure", "present")
                                .with("vlan_name", format!("VLAN{vlan}"))
                                .build();
                            let reference = resources.declare(vlan_type, vlan, attrs)?;
                            vlan_refs.insert(vlan.clone(), reference.clone());
                            reference
                        }
                    };
                    if self.vlan_on_portchannel {
                        if let Some(resource) = resources.get_mut(vlan_type, vlan) {
                            resource.extend_list("tagged_portchannel", [pc.number.clone()]);
                        }
                        resources.require(&vlan_ref, pc_ref);
                    }
                }
            }
        }

        if !self.vlan_on_portchannel || vocab.vlan.is_none() {
            for (pc, pc_ref) in &pc_refs {
                let vlans: Vec<String> = pc
                    .vlans
                    .iter()
                    .filter(|v| v.as_str() != DEFAULT_VLAN)
                    .cloned()
                    .collect();
                if vlans.is_empty() {
                    continue;
                }
                let attrs = AttrsBuilder::new()
                    .with("ensure", "present")
                    .with_list("tagged_vlan", vlans.clone())
                    .build();
                let resources = creator.core_mut().resources_mut();
                let membership =
                    resources.declare(vocab.interface, &format!("Port-channel {}", pc.number), attrs)?;
                resources.require(&membership, pc_ref);
                for vlan in &vlans {
                    if let Some(vlan_ref) = vlan_refs.get(vlan) {
                        resources.depends(&membership, vlan_ref);
                    }
                }
            }
        }

        Ok(creator.resources().len() - before)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::creator::SwitchCreator;
    use crate::facts::SwitchFacts;
    use crate::model::{NetworkInfo, NetworkType, SwitchFamily};
    use crate::resource::Ordering;
    use serde_json::json;

    fn catalog() -> NetworkCatalog {
        NetworkCatalog::new([
            NetworkInfo {
                id: "pub".into(),
                name: "public".into(),
                vlan_id: "20".into(),
                network_type: NetworkType::PublicLan,
            },
            NetworkInfo {
                id: "fcoe".into(),
                name: "fcoe".into(),
                vlan_id: "30".into(),
                network_type: NetworkType::StorageFcoeSan,
            },
            NetworkInfo {
                id: "native".into(),
                name: "native".into(),
                vlan_id: "1".into(),
                network_type: NetworkType::PrivateLan,
            },
        ])
    }

    fn uplink(pc: &str, members: &[&str], networks: &[&str]) -> Uplink {
        Uplink {
            portchannel: pc.into(),
            port_members: members.iter().map(|s| (*s).to_owned()).collect(),
            networks: networks.iter().map(|s| (*s).to_owned()).collect(),
            mtu: None,
        }
    }

    fn plan(facts: &serde_json::Value, uplinks: &[Uplink], options: &PlanOptions) -> PortChannelPlan {
        let facts = SwitchFacts::from_value(facts.clone()).unwrap();
        let ctx = CycleContext::new(&facts);
        PortChannelPlan::compute(uplinks, &catalog(), &ctx, options)
    }

    #[test]
    fn quad_mode_always_expands_members() {
        let options = PlanOptions {
            quad_port_mode: true,
            ..PlanOptions::default()
        };
        let p = plan(&json!({}), &[uplink("128", &["Fo 0/33"], &["pub"])], &options);
        assert_eq!(p.desired[0].members, ["Te 0/33", "Te 0/34", "Te 0/35", "Te 0/36"]);
    }

    #[test]
    fn without_quad_mode_only_grouped_ports_expand() {
        let facts = json!({"quad_port_interfaces": ["Te 0/37"]});
        let p = plan(
            &facts,
            &[uplink("128", &["Te 0/33", "Te 0/38"], &["pub"])],
            &PlanOptions::default(),
        );
        assert_eq!(p.desired[0].members, ["Te 0/33", "Te 0/37", "Te 0/38", "Te 0/39", "Te 0/40"]);
    }

    #[test]
    fn fc_ports_are_relabelled_unless_fcoe_is_carried() {
        let p = plan(
            &json!({}),
            &[
                uplink("1", &["Fc 0/41"], &["pub"]),
                uplink("2", &["Fc 0/42"], &["pub", "fcoe"]),
            ],
            &PlanOptions::default(),
        );
        assert_eq!(p.desired[0].members, ["Te 0/41"]);
        assert!(!p.desired[0].fcoe);
        assert_eq!(p.desired[1].members, ["Fc 0/42"]);
        assert!(p.desired[1].fcoe);
        assert_eq!(p.desired[1].vlans, ["20", "30"]);
    }

    #[test]
    fn shared_port_is_not_removed_from_its_old_channel() {
        let facts = json!({
            "port_channel_members": {
                "2": ["Te 1/1", "Te 1/2"],
                "3": ["Te 1/5"]
            }
        });
        let p = plan(
            &facts,
            &[
                uplink("1", &["Te 1/1"], &["pub"]),
                uplink("2", &["Te 1/3"], &["pub"]),
            ],
            &PlanOptions::default(),
        );
        assert_eq!(
            p.member_removals,
            [MemberRemoval {
                portchannel: "2".into(),
                interface: "Te 1/2".into(),
            }]
        );
        assert_eq!(p.removed_portchannels, ["3"]);
    }

    #[test]
    fn mxl_declares_vlans_on_portchannels() {
        let p = PortChannelPlan {
            desired: vec![PortChannelDescriptor {
                number: "128".into(),
                members: vec!["Te 0/33".into()],
                vlans: vec!["1".into(), "20".into()],
                fcoe: false,
                mtu: DEFAULT_MTU.into(),
            }],
            vlan_on_portchannel: true,
            ..PortChannelPlan::default()
        };
        let mut creator = SwitchCreator::for_family(SwitchFamily::Force10BladeMxl, Ordering::Chain);
        assert_eq!(p.declare(&mut creator).unwrap(), 3);
        let m = creator.to_manifest().unwrap();
        assert_eq!(m.attr_str("mxl_vlan", "20", "tagged_portchannel"), Some("128"));
        assert!(m.resources("mxl_vlan").unwrap().get("1").is_none());
        assert_eq!(m.attr_str("mxl_interface", "Te 0/33", "portchannel"), Some("128"));
    }

    #[test]
    fn rack_switches_tag_vlans_on_the_portchannel_interface() {
        let p = PortChannelPlan {
            desired: vec![PortChannelDescriptor {
                number: "10".into(),
                members: vec!["Te 0/1".into()],
                vlans: vec!["20".into(), "21".into()],
                fcoe: false,
                mtu: DEFAULT_MTU.into(),
            }],
            removed_portchannels: vec!["11".into()],
            ..PortChannelPlan::default()
        };
        let mut creator = SwitchCreator::for_family(SwitchFamily::Force10Rack, Ordering::Chain);
        p.declare(&mut creator).unwrap();
        let m = creator.to_manifest().unwrap();
        assert!(m.attr("force10_vlan", "20", "tagged_portchannel").is_none());
        assert_eq!(
            m.attr_str("force10_interface", "Port-channel 10", "tagged_vlan"),
            Some("20,21")
        );
        assert_eq!(m.attr_str("force10_portchannel", "11", "ensure"), Some("absent"));
        assert_eq!(
            m.attr("force10_interface", "Port-channel 10", "require").unwrap(),
            &json!(["Force10_vlan[21]", "Force10_portchannel[10]"])
        );
    }

    #[test]
    fn port_in_two_desired_channels_is_double_managed() {
        let p = plan(
            &json!({}),
            &[uplink("1", &["Te 1/1"], &["pub"]), uplink("2", &["Te 1/1"], &["pub"])],
            &PlanOptions::default(),
        );
        let mut creator = SwitchCreator::for_family(SwitchFamily::Force10Rack, Ordering::Chain);
        let err = p.declare(&mut creator).unwrap_err();
        assert!(matches!(err, CoreError::AlreadyManaged { .. }));
    }
}

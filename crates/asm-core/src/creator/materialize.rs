// ── Request materialization shared by all creators ──
//
// Port-channels first, then one interface resource per port, then one
// VLAN resource per VLAN (families that have a VLAN type). VLAN
// resources stay out of the sequence chain; they carry explicit
// `require` edges on port-channels and `before` edges on interfaces.

use indexmap::IndexMap;

use super::{CreatorCore, PortChannelSpec};
use crate::error::CoreError;
use crate::model::{Action, DEFAULT_VLAN, InterfaceRequest, normalize_interface};
use crate::resource::{AttrsBuilder, ResourceRef};

/// List attribute names for one pass.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ListNames {
    pub tagged_vlan: &'static str,
    pub untagged_vlan: &'static str,
    pub tagged_portchannel: &'static str,
    pub untagged_portchannel: &'static str,
}

impl ListNames {
    pub(crate) fn for_action(action: Action) -> Self {
        match action {
            Action::Add => Self {
                tagged_vlan: "tagged_vlan",
                untagged_vlan: "untagged_vlan",
                tagged_portchannel: "tagged_portchannel",
                untagged_portchannel: "untagged_portchannel",
            },
            Action::Remove => Self {
                tagged_vlan: "remove_tagged_vlan",
                untagged_vlan: "remove_untagged_vlan",
                tagged_portchannel: "remove_tagged_portchannel",
                untagged_portchannel: "remove_untagged_portchannel",
            },
        }
    }
}

/// Every request for one interface in one pass, merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct InterfacePlan {
    pub interface: String,
    pub tagged: Vec<String>,
    pub untagged: Vec<String>,
    pub portchannel: Option<String>,
    pub mtu: String,
}

pub(crate) fn push_unique<T: PartialEq + Clone>(list: &mut Vec<T>, item: &T) {
    if !list.contains(item) {
        list.push(item.clone());
    }
}

/// Group requests for `action` per interface, in first-appearance order.
///
/// Untagged VLAN 1 never takes part in a removal pass.
pub(crate) fn group_requests(
    requests: &[InterfaceRequest],
    action: Action,
) -> IndexMap<String, InterfacePlan> {
    let mut plans: IndexMap<String, InterfacePlan> = IndexMap::new();
    for request in requests
        .iter()
        .filter(|r| r.action == action && !r.is_default_vlan_removal())
    {
        let interface = normalize_interface(&request.interface);
        let plan = plans
            .entry(interface.clone())
            .or_insert_with(|| InterfacePlan {
                interface,
                tagged: Vec::new(),
                untagged: Vec::new(),
                portchannel: None,
                mtu: request.mtu.clone(),
            });
        let list = if request.tagged {
            &mut plan.tagged
        } else {
            &mut plan.untagged
        };
        push_unique(list, &request.vlan);
        if plan.portchannel.is_none() {
            plan.portchannel = request.portchannel().map(str::to_owned);
        }
    }
    plans
}

#[derive(Debug, Default)]
struct VlanUse {
    tagged_portchannels: Vec<String>,
    untagged_portchannels: Vec<String>,
    portchannels: Vec<ResourceRef>,
    interfaces: Vec<ResourceRef>,
}

pub(crate) fn materialize_requests(
    core: &mut CreatorCore,
    action: Action,
    with_vlans: bool,
) -> Result<(), CoreError> {
    let vocab = core.vocabulary();
    let names = ListNames::for_action(action);
    let plans = group_requests(&core.requests, action);

    let mut portchannels: IndexMap<String, ResourceRef> = IndexMap::new();
    for plan in plans.values() {
        let Some(number) = plan.portchannel.as_deref() else {
            continue;
        };
        if !portchannels.contains_key(number) {
            let spec = PortChannelSpec::new(number).mtu(plan.mtu.clone());
            let reference = core.declare_portchannel(&spec)?;
            portchannels.insert(number.to_owned(), reference);
        }
        if let Some(resource) = core.resources.get_mut(vocab.portchannel, number) {
            if !plan.tagged.is_empty() {
                resource.extend_list(names.tagged_vlan, plan.tagged.iter().cloned());
            }
            if !plan.untagged.is_empty() {
                resource.extend_list(names.untagged_vlan, plan.untagged.iter().cloned());
            }
        }
    }

    let mut interfaces: IndexMap<String, ResourceRef> = IndexMap::new();
    for plan in plans.values() {
        let attrs = AttrsBuilder::new()
            .with("ensure", "present")
            .with("switchport", true)
            .with("shutdown", false)
            .with("mtu", plan.mtu.as_str());
        let attrs = match &plan.portchannel {
            Some(number) => attrs.with("portchannel", number.as_str()),
            None => attrs
                .with_list(names.tagged_vlan, plan.tagged.clone())
                .with_list(names.untagged_vlan, plan.untagged.clone()),
        };
        let reference = core
            .resources
            .declare(vocab.interface, &plan.interface, attrs.build())?;
        if let Some(pc) = plan.portchannel.as_ref().and_then(|n| portchannels.get(n)) {
            core.resources.depends(&reference, pc);
        }
        interfaces.insert(plan.interface.clone(), reference);
    }

    let Some(vlan_type) = vocab.vlan.filter(|_| with_vlans) else {
        return Ok(());
    };

    let mut vlans: IndexMap<String, VlanUse> = IndexMap::new();
    for plan in plans.values() {
        let memberships = plan
            .tagged
            .iter()
            .map(|vlan| (vlan, true))
            .chain(plan.untagged.iter().map(|vlan| (vlan, false)));
        for (vlan, tagged) in memberships {
            if vlan == DEFAULT_VLAN {
                continue;
            }
            let usage = vlans.entry(vlan.clone()).or_default();
            let carrier = plan
                .portchannel
                .as_ref()
                .and_then(|n| portchannels.get_key_value(n));
            if let Some((number, reference)) = carrier {
                let list = if tagged {
                    &mut usage.tagged_portchannels
                } else {
                    &mut usage.untagged_portchannels
                };
                push_unique(list, number);
                push_unique(&mut usage.portchannels, reference);
            } else if let Some(reference) = interfaces.get(&plan.interface) {
                push_unique(&mut usage.interfaces, reference);
            }
        }
    }

    for (vlan, usage) in vlans {
        let attrs = AttrsBuilder::new()
            .with("ensure", "present")
            .with("vlan_name", format!("VLAN{vlan}"))
            .with_list(names.tagged_portchannel, usage.tagged_portchannels)
            .with_list(names.untagged_portchannel, usage.untagged_portchannels)
            .build();
        let reference = core.resources.declare_unsequenced(vlan_type, &vlan, attrs)?;
        for pc in &usage.portchannels {
            core.resources.require(&reference, pc);
        }
        for interface in &usage.interfaces {
            core.resources.before(&reference, interface);
        }
    }
    Ok(())
}

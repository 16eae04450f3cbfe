// ── VDS eviction ──
//
// Taking an ESX host out of its distributed switches: VMkernel adapters
// on a VDS go first, then the host enters maintenance mode and leaves
// every VDS that does not carry management. The management VDS is left
// last, after vmk0 has been migrated onto a standard vSwitch through a
// backup uplink so the host stays reachable.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{MANAGEMENT_VMKNIC, STANDARD_VSWITCH, TRANSPORT};
use crate::error::CoreError;
use crate::resource::{AttrsBuilder, Ordering, ResourceRef, ResourceSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vmknic {
    pub name: String,
    /// Distributed switch the adapter's port group lives on, if any.
    #[serde(default)]
    pub vds: Option<String>,
    #[serde(default)]
    pub portgroup: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VdsMembership {
    pub name: String,
    /// Physical NICs the host contributes, in uplink order.
    #[serde(default)]
    pub uplinks: Vec<String>,
    #[serde(default)]
    pub carries_management: bool,
}

fn default_management_portgroup() -> String {
    "Management Network".into()
}

/// What the cluster provider knows about one ESX host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EsxHostFacts {
    pub hostname: String,
    pub cluster: String,
    pub datacenter: String,
    #[serde(default)]
    pub management_vlan: Option<String>,
    #[serde(default = "default_management_portgroup")]
    pub management_portgroup: String,
    #[serde(default)]
    pub vmknics: Vec<Vmknic>,
    #[serde(default)]
    pub vds: Vec<VdsMembership>,
}

/// Live uplink state, when a device command can provide it.
pub trait HostInventory {
    fn vds_uplinks(&self, host: &str, vds: &str) -> Result<Vec<String>, CoreError>;
}

/// Inventory answers keyed by `"<host>:<vds>"`. Unknown keys are errors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticInventory(IndexMap<String, Vec<String>>);

impl StaticInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, host: &str, vds: &str, uplinks: Vec<String>) {
        self.0.insert(format!("{host}:{vds}"), uplinks);
    }
}

impl HostInventory for StaticInventory {
    fn vds_uplinks(&self, host: &str, vds: &str) -> Result<Vec<String>, CoreError> {
        self.0
            .get(&format!("{host}:{vds}"))
            .cloned()
            .ok_or_else(|| CoreError::Inventory {
                message: format!("no uplink information for {vds} on {host}"),
            })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VdsEvictionOptions {
    pub ordering: Ordering,
    /// NIC to migrate management onto when the VDS has no second uplink.
    pub template_backup_nic: Option<String>,
}

/// Uplinks for `vds`, preferring live inventory over the fact snapshot.
fn uplinks_for<I: HostInventory + ?Sized>(
    inventory: &I,
    host: &EsxHostFacts,
    membership: &VdsMembership,
) -> Vec<String> {
    match inventory.vds_uplinks(&host.hostname, &membership.name) {
        Ok(uplinks) if !uplinks.is_empty() => uplinks,
        Ok(_) => membership.uplinks.clone(),
        Err(e) => {
            debug!(host = %host.hostname, vds = %membership.name, error = %e, "uplink lookup failed");
            membership.uplinks.clone()
        }
    }
}

pub fn build_vds_eviction<I: HostInventory + ?Sized>(
    host: &EsxHostFacts,
    inventory: &I,
    options: &VdsEvictionOptions,
) -> Result<ResourceSet, CoreError> {
    let name = host.hostname.as_str();
    let mut set = ResourceSet::new(options.ordering);

    let mut vmk_refs = Vec::new();
    for vmk in host
        .vmknics
        .iter()
        .filter(|v| v.vds.is_some() && v.name != MANAGEMENT_VMKNIC)
    {
        let attrs = AttrsBuilder::new()
            .with("ensure", "absent")
            .with("transport", TRANSPORT)
            .build();
        vmk_refs.push(set.declare("esx_vmknic", &format!("{name}:{}", vmk.name), attrs)?);
    }

    let maint = set.declare(
        "esx_maintmode",
        name,
        AttrsBuilder::new()
            .with("ensure", "present")
            .with("evacuate_powered_off_vms", true)
            .with("transport", TRANSPORT)
            .build(),
    )?;
    for vmk in &vmk_refs {
        set.depends(&maint, vmk);
    }

    // Without vmk0 there is nothing to migrate and the management VDS is
    // left like any other.
    let has_vmk0 = host.vmknics.iter().any(|v| v.name == MANAGEMENT_VMKNIC);
    for vds in host
        .vds
        .iter()
        .filter(|v| !(has_vmk0 && v.carries_management))
    {
        let leave = set.declare("vc_vds_host", &format!("{name}:{}", vds.name), leave_attrs(host, vds))?;
        set.depends(&leave, &maint);
    }

    if let Some(management) = host.vds.iter().find(|v| has_vmk0 && v.carries_management) {
        migrate_management(&mut set, host, management, inventory, options, &maint)?;
    }

    info!(host = name, resources = set.len(), "built VDS eviction");
    Ok(set)
}

fn leave_attrs(host: &EsxHostFacts, vds: &VdsMembership) -> crate::resource::Attributes {
    AttrsBuilder::new()
        .with("ensure", "absent")
        .with("vds", vds.name.as_str())
        .with("datacenter", host.datacenter.as_str())
        .with("transport", TRANSPORT)
        .build()
}

/// Move vmk0 to a standard vSwitch over the backup NIC, then release the
/// primary NIC and leave the management VDS.
fn migrate_management<I: HostInventory + ?Sized>(
    set: &mut ResourceSet,
    host: &EsxHostFacts,
    management: &VdsMembership,
    inventory: &I,
    options: &VdsEvictionOptions,
    maint: &ResourceRef,
) -> Result<(), CoreError> {
    let name = host.hostname.as_str();
    let uplinks = uplinks_for(inventory, host, management);
    let primary = uplinks
        .first()
        .cloned()
        .ok_or_else(|| CoreError::missing(format!("uplinks of {} on {name}", management.name)))?;
    let backup = uplinks
        .get(1)
        .cloned()
        .or_else(|| options.template_backup_nic.clone())
        .ok_or_else(|| CoreError::missing(format!("backup NIC for management migration on {name}")))?;
    debug!(host = name, %primary, %backup, "migrating management off {}", management.name);

    let release_backup = set.declare(
        "esx_vds_uplink",
        &format!("{name}:{backup}"),
        AttrsBuilder::new()
            .with("ensure", "absent")
            .with("vds", management.name.as_str())
            .with("transport", TRANSPORT)
            .build(),
    )?;
    set.depends(&release_backup, maint);

    let vswitch = set.declare(
        "esx_vswitch",
        &format!("{name}:{STANDARD_VSWITCH}"),
        AttrsBuilder::new()
            .with("ensure", "present")
            .with_list("nics", vec![backup.clone()])
            .with_list("nicorderpolicy_active", vec![backup])
            .with("transport", TRANSPORT)
            .build(),
    )?;
    set.depends(&vswitch, &release_backup);

    let portgroup = set.declare(
        "esx_portgroup",
        &format!("{name}:{}", host.management_portgroup),
        AttrsBuilder::new()
            .with("ensure", "present")
            .with("vswitch", STANDARD_VSWITCH)
            .with_opt("vlan", host.management_vlan.as_deref())
            .with("transport", TRANSPORT)
            .build(),
    )?;
    set.depends(&portgroup, &vswitch);

    let vmk0 = set.declare(
        "esx_vmknic",
        &format!("{name}:{MANAGEMENT_VMKNIC}"),
        AttrsBuilder::new()
            .with("ensure", "present")
            .with("portgroup", host.management_portgroup.as_str())
            .with("vswitch", STANDARD_VSWITCH)
            .with("transport", TRANSPORT)
            .build(),
    )?;
    set.depends(&vmk0, &portgroup);

    let release_primary = set.declare(
        "esx_vds_uplink",
        &format!("{name}:{primary}"),
        AttrsBuilder::new()
            .with("ensure", "absent")
            .with("vds", management.name.as_str())
            .with("transport", TRANSPORT)
            .build(),
    )?;
    set.depends(&release_primary, &vmk0);

    let leave = set.declare(
        "vc_vds_host",
        &format!("{name}:{}", management.name),
        leave_attrs(host, management),
    )?;
    set.depends(&leave, &release_primary);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn host() -> EsxHostFacts {
        serde_json::from_value(json!({
            "hostname": "esx-1",
            "cluster": "prod",
            "datacenter": "dc1",
            "management_vlan": "28",
            "vmknics": [
                {"name": "vmk0", "vds": "mgmt-vds"},
                {"name": "vmk1", "vds": "storage-vds"},
                {"name": "vmk2"}
            ],
            "vds": [
                {"name": "storage-vds", "uplinks": ["vmnic4", "vmnic5"]},
                {"name": "mgmt-vds", "uplinks": ["vmnic0", "vmnic1"], "carries_management": true}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn eviction_runs_in_a_fixed_order() {
        let set = build_vds_eviction(&host(), &StaticInventory::new(), &VdsEvictionOptions::default())
            .unwrap();
        let ids: Vec<String> = set.iter().map(|r| r.reference().to_string()).collect();
        assert_eq!(
            ids,
            [
                "Esx_vmknic[esx-1:vmk1]",
                "Esx_vmknic[esx-1:vmk0]",
                "Esx_maintmode[esx-1]",
                "Vc_vds_host[esx-1:storage-vds]",
                "Vc_vds_host[esx-1:mgmt-vds]",
                "Esx_vds_uplink[esx-1:vmnic1]",
                "Esx_vds_uplink[esx-1:vmnic0]",
                "Esx_vswitch[esx-1:vSwitch0]",
                "Esx_portgroup[esx-1:Management Network]",
            ]
        );

        let m = set.to_manifest().unwrap();
        assert_eq!(m.attr_str("esx_maintmode", "esx-1", "require"), Some("Esx_vmknic[esx-1:vmk1]"));
        assert_eq!(
            m.attr_str("esx_vmknic", "esx-1:vmk0", "require"),
            Some("Esx_portgroup[esx-1:Management Network]")
        );
        assert_eq!(
            m.attr_str("vc_vds_host", "esx-1:mgmt-vds", "require"),
            Some("Esx_vds_uplink[esx-1:vmnic0]")
        );
        assert_eq!(m.attr_str("esx_portgroup", "esx-1:Management Network", "vlan"), Some("28"));
        assert_eq!(m.attr_str("esx_vswitch", "esx-1:vSwitch0", "nics"), Some("vmnic1"));
        assert_eq!(
            m.attr_str("esx_maintmode", "esx-1", "transport"),
            Some("Transport[vcenter]")
        );
    }

    #[test]
    fn host_without_vmk0_leaves_management_vds_directly() {
        let mut facts = host();
        facts.vmknics.retain(|v| v.name != MANAGEMENT_VMKNIC);

        let set = build_vds_eviction(&facts, &StaticInventory::new(), &VdsEvictionOptions::default())
            .unwrap();
        let ids: Vec<String> = set.iter().map(|r| r.reference().to_string()).collect();
        assert_eq!(
            ids,
            [
                "Esx_vmknic[esx-1:vmk1]",
                "Esx_maintmode[esx-1]",
                "Vc_vds_host[esx-1:storage-vds]",
                "Vc_vds_host[esx-1:mgmt-vds]",
            ]
        );

        let m = set.to_manifest().unwrap();
        assert!(m.attr("esx_vmknic", "esx-1:vmk0", "ensure").is_none());
        assert!(m.attr("esx_vswitch", "esx-1:vSwitch0", "ensure").is_none());
        assert_eq!(
            m.attr_str("vc_vds_host", "esx-1:mgmt-vds", "require"),
            Some("Vc_vds_host[esx-1:storage-vds]")
        );
    }

    #[test]
    fn live_inventory_wins_over_facts() {
        let mut inventory = StaticInventory::new();
        inventory.insert("esx-1", "mgmt-vds", vec!["vmnic2".into(), "vmnic3".into()]);
        let m = build_vds_eviction(&host(), &inventory, &VdsEvictionOptions::default())
            .unwrap()
            .to_manifest()
            .unwrap();
        assert_eq!(m.attr_str("esx_vswitch", "esx-1:vSwitch0", "nics"), Some("vmnic3"));
        assert!(m.attr("esx_vds_uplink", "esx-1:vmnic2", "ensure").is_some());
    }

    #[test]
    fn single_uplink_falls_back_to_template_nic() {
        let mut facts = host();
        facts.vds[1].uplinks = vec!["vmnic0".into()];
        let err = build_vds_eviction(&facts, &StaticInventory::new(), &VdsEvictionOptions::default())
            .unwrap_err();
        assert!(matches!(err, CoreError::MissingData { .. }));

        let options = VdsEvictionOptions {
            template_backup_nic: Some("vmnic7".into()),
            ..VdsEvictionOptions::default()
        };
        let m = build_vds_eviction(&facts, &StaticInventory::new(), &options)
            .unwrap()
            .to_manifest()
            .unwrap();
        assert_eq!(m.attr_str("esx_vswitch", "esx-1:vSwitch0", "nics"), Some("vmnic7"));
    }

    #[test]
    fn graph_ordering_keeps_the_management_chain() {
        let options = VdsEvictionOptions {
            ordering: Ordering::Graph,
            ..VdsEvictionOptions::default()
        };
        let m = build_vds_eviction(&host(), &StaticInventory::new(), &options)
            .unwrap()
            .to_manifest()
            .unwrap();
        assert!(m.attr("esx_vmknic", "esx-1:vmk1", "require").is_none());
        assert_eq!(
            m.attr_str("vc_vds_host", "esx-1:storage-vds", "require"),
            Some("Esx_maintmode[esx-1]")
        );
        assert_eq!(
            m.attr_str("esx_vswitch", "esx-1:vSwitch0", "require"),
            Some("Esx_vds_uplink[esx-1:vmnic1]")
        );
    }
}

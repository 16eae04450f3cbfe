// ── Switch fact snapshot ──
//
// Facts arrive from the inventory subsystem as a loose JSON object. Older
// collectors JSON-encode nested values into strings, so every typed
// accessor accepts both the nested form and its string-encoded form.
// The snapshot is immutable for the duration of one configuration cycle.

use std::cell::OnceCell;
use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::CoreError;
use crate::model::{InterfaceName, normalize_interface};
use crate::provider::vlt::{VltBackupLink, backup_link_ip_for_vlt};

/// One IOM in the same chassis, as reported by chassis inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChassisIom {
    pub slot: u32,
    pub model: String,
    #[serde(default)]
    pub management_ip: Option<String>,
}

impl ChassisIom {
    /// A management IP that is present and not blank.
    pub fn reachable_ip(&self) -> Option<&str> {
        self.management_ip
            .as_deref()
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VlanMembership {
    #[serde(default)]
    pub tagged: Vec<String>,
    #[serde(default)]
    pub untagged: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SwitchFacts(Map<String, Value>);

impl SwitchFacts {
    pub fn new(facts: Map<String, Value>) -> Self {
        Self(facts)
    }

    pub fn from_value(value: Value) -> Result<Self, CoreError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Raw `facts[key]`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn string(&self, key: &str) -> Option<&str> {
        self.get(key)?.as_str().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Decode a nested fact, tolerating the string-encoded form.
    ///
    /// Malformed values are logged and treated as absent.
    pub fn decode<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get(key)?;
        let decoded = match value {
            Value::String(encoded) => serde_json::from_str(encoded),
            other => serde_json::from_value(other.clone()),
        };
        match decoded {
            Ok(v) => Some(v),
            Err(e) => {
                debug!(fact = key, error = %e, "ignoring malformed fact");
                None
            }
        }
    }

    pub fn model(&self) -> Option<&str> {
        self.string("model")
    }

    pub fn hostname(&self) -> Option<&str> {
        self.string("hostname")
    }

    pub fn management_ip(&self) -> Option<&str> {
        self.string("management_ip")
    }

    pub fn iom_slot(&self) -> Option<u32> {
        match self.get("iom_slot")? {
            Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn iom_mode(&self) -> Option<&str> {
        self.string("iom_mode")
    }

    pub fn teaming_mode(&self) -> Option<&str> {
        self.string("teaming_mode")
    }

    pub fn is_standalone_teaming(&self) -> bool {
        self.teaming_mode()
            .is_some_and(|mode| mode.eq_ignore_ascii_case("standalone"))
    }

    pub fn interfaces(&self) -> Vec<String> {
        self.decode("interfaces").unwrap_or_default()
    }

    pub fn quad_port_interfaces(&self) -> Vec<String> {
        self.decode("quad_port_interfaces").unwrap_or_default()
    }

    /// Current port-channel membership, keyed by port-channel number.
    pub fn port_channel_members(&self) -> IndexMap<String, Vec<String>> {
        self.decode("port_channel_members").unwrap_or_default()
    }

    /// Current VLAN table, keyed by VLAN id.
    pub fn vlan_information(&self) -> IndexMap<String, VlanMembership> {
        self.decode("vlan_information").unwrap_or_default()
    }

    pub fn chassis_ioms(&self) -> Vec<ChassisIom> {
        self.decode("chassis_ioms").unwrap_or_default()
    }
}

// ── Per-cycle context ───────────────────────────────────────────────

/// Derived views over one fact snapshot, computed at most once per cycle.
#[derive(Debug)]
pub struct CycleContext<'a> {
    facts: &'a SwitchFacts,
    portchannels: OnceCell<IndexMap<String, Vec<String>>>,
    quad_grouped: OnceCell<HashSet<String>>,
    siblings: OnceCell<Vec<ChassisIom>>,
    vlt: OnceCell<VltBackupLink>,
}

impl<'a> CycleContext<'a> {
    pub fn new(facts: &'a SwitchFacts) -> Self {
        Self {
            facts,
            portchannels: OnceCell::new(),
            quad_grouped: OnceCell::new(),
            siblings: OnceCell::new(),
            vlt: OnceCell::new(),
        }
    }

    pub fn facts(&self) -> &'a SwitchFacts {
        self.facts
    }

    /// Current port-channel membership with normalised member names.
    pub fn portchannel_members(&self) -> &IndexMap<String, Vec<String>> {
        self.portchannels.get_or_init(|| {
            self.facts
                .port_channel_members()
                .into_iter()
                .map(|(pc, members)| {
                    let members = members.iter().map(|m| normalize_interface(m)).collect();
                    (pc.trim().to_owned(), members)
                })
                .collect()
        })
    }

    /// Whether `interface` is currently part of a quad-port group.
    ///
    /// A group is reported either by any of its member names or by its
    /// 40G name, so membership is tracked by group start.
    pub fn is_quad_grouped(&self, interface: &InterfaceName) -> bool {
        let grouped = self.quad_grouped.get_or_init(|| {
            self.facts
                .quad_port_interfaces()
                .iter()
                .filter_map(|name| InterfaceName::parse(name))
                .map(|name| quad_key(&name))
                .collect()
        });
        grouped.contains(&quad_key(interface))
    }

    /// Chassis IOMs with the same model as this switch, sorted by slot.
    pub fn same_model_siblings(&self) -> &[ChassisIom] {
        self.siblings.get_or_init(|| {
            let model = self.facts.model().unwrap_or_default();
            let mut siblings: Vec<ChassisIom> = self
                .facts
                .chassis_ioms()
                .into_iter()
                .filter(|iom| iom.model == model)
                .collect();
            siblings.sort_by_key(|iom| iom.slot);
            siblings
        })
    }

    /// VLT backup link for this IOM, from its same-model neighbours.
    pub fn vlt_backup_link(&self) -> Result<VltBackupLink, CoreError> {
        if let Some(link) = self.vlt.get() {
            return Ok(link.clone());
        }
        let slot = self
            .facts
            .iom_slot()
            .ok_or_else(|| CoreError::missing("iom_slot fact for VLT peer selection"))?;
        let link = backup_link_ip_for_vlt(slot, self.same_model_siblings())?;
        Ok(self.vlt.get_or_init(|| link).clone())
    }
}

fn quad_key(name: &InterfaceName) -> String {
    format!("{}/{}", name.unit(), name.quad_group_start())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn facts(value: Value) -> SwitchFacts {
        SwitchFacts::from_value(value).unwrap()
    }

    #[test]
    fn string_encoded_facts_are_decoded() {
        let f = facts(json!({
            "port_channel_members": "{\"128\": [\"Te 0/1\"]}",
            "interfaces": ["Te 0/1", "Te 0/2"]
        }));
        assert_eq!(f.port_channel_members()["128"], vec!["Te 0/1".to_owned()]);
        assert_eq!(f.interfaces().len(), 2);
    }

    #[test]
    fn malformed_facts_are_treated_as_absent() {
        let f = facts(json!({"vlan_information": "not json"}));
        assert!(f.vlan_information().is_empty());
    }

    #[test]
    fn iom_slot_accepts_numbers_and_strings() {
        assert_eq!(facts(json!({"iom_slot": 2})).iom_slot(), Some(2));
        assert_eq!(facts(json!({"iom_slot": "3"})).iom_slot(), Some(3));
        assert_eq!(facts(json!({})).iom_slot(), None);
    }

    #[test]
    fn context_normalises_portchannel_members() {
        let f = facts(json!({
            "port_channel_members": {"128": ["TenGigabitEthernet 0/1"]}
        }));
        let ctx = CycleContext::new(&f);
        assert_eq!(ctx.portchannel_members()["128"], vec!["Te 0/1".to_owned()]);
    }

    #[test]
    fn quad_grouping_matches_any_member_of_the_group() {
        let f = facts(json!({"quad_port_interfaces": ["Fo 0/33"]}));
        let ctx = CycleContext::new(&f);
        assert!(ctx.is_quad_grouped(&InterfaceName::parse("Te 0/35").unwrap()));
        assert!(!ctx.is_quad_grouped(&InterfaceName::parse("Te 0/37").unwrap()));
    }

    #[test]
    fn siblings_are_filtered_and_sorted() {
        let f = facts(json!({
            "model": "I/O-Aggregator",
            "chassis_ioms": [
                {"slot": 3, "model": "I/O-Aggregator"},
                {"slot": 1, "model": "I/O-Aggregator", "management_ip": "10.0.0.1"},
                {"slot": 2, "model": "MXL-10/40GbE"}
            ]
        }));
        let ctx = CycleContext::new(&f);
        let slots: Vec<u32> = ctx.same_model_siblings().iter().map(|i| i.slot).collect();
        assert_eq!(slots, [1, 3]);
    }
}

// ── Resource references ──
//
// A reference names one declared resource the way the apply engine
// expects it: `Force10_interface[Te 0/1]`. The type name is stored in
// its lowercase declaration form and capitalised only for display.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;

/// Identity of a single declared resource: `(type, id)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceRef {
    resource_type: String,
    id: String,
}

impl ResourceRef {
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Capitalise the first letter of every `::` segment of a type name.
fn capitalize_type(resource_type: &str) -> String {
    resource_type
        .split("::")
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("::")
}

fn decapitalize_type(resource_type: &str) -> String {
    resource_type
        .split("::")
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first.to_lowercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("::")
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", capitalize_type(&self.resource_type), self.id)
    }
}

impl FromStr for ResourceRef {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::missing(format!("resource reference in Type[id] form, got '{s}'"));
        let open = s.find('[').ok_or_else(invalid)?;
        let inner = s
            .get(open + 1..)
            .and_then(|rest| rest.strip_suffix(']'))
            .ok_or_else(invalid)?;
        let resource_type = s.get(..open).unwrap_or_default().trim();
        if resource_type.is_empty() {
            return Err(invalid());
        }
        Ok(Self::new(decapitalize_type(resource_type), inner))
    }
}

impl Serialize for ResourceRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ResourceRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn display_capitalizes_type() {
        let r = ResourceRef::new("force10_interface", "Te 0/1");
        assert_eq!(r.to_string(), "Force10_interface[Te 0/1]");
    }

    #[test]
    fn display_capitalizes_every_segment() {
        let r = ResourceRef::new("vcenter::vds", "dvs0");
        assert_eq!(r.to_string(), "Vcenter::Vds[dvs0]");
    }

    #[test]
    fn parse_restores_declaration_form() {
        let r: ResourceRef = "Mxl_vlan[18]".parse().unwrap();
        assert_eq!(r.resource_type(), "mxl_vlan");
        assert_eq!(r.id(), "18");
    }

    #[test]
    fn parse_rejects_bare_words() {
        assert!("Mxl_vlan".parse::<ResourceRef>().is_err());
        assert!("[18]".parse::<ResourceRef>().is_err());
    }
}

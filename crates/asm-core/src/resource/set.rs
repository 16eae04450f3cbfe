// ── ResourceSet: the accumulator every builder writes into ──
//
// Maps resource type -> resource id -> attributes, plus the dependency
// graph between declarations. In `Ordering::Chain` a rolling "last
// declared" pointer adds a `require` edge from each sequenced
// declaration to the previous one, which is exactly the single linear
// chain the apply engine has always been handed.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::graph::{EdgeKind, ResourceGraph};
use super::reference::ResourceRef;
use super::value::{Attributes, Resource};
use crate::error::CoreError;

/// How declarations are ordered relative to each other.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Ordering {
    /// Every sequenced declaration requires the previous one.
    #[default]
    Chain,
    /// Only explicit edges are recorded.
    Graph,
}

#[derive(Debug, Clone, Default)]
pub struct ResourceSet {
    resources: IndexMap<String, IndexMap<String, Resource>>,
    graph: ResourceGraph,
    ordering: Ordering,
    sequence: Option<ResourceRef>,
}

impl ResourceSet {
    pub fn new(ordering: Ordering) -> Self {
        Self {
            ordering,
            ..Self::default()
        }
    }

    pub fn ordering(&self) -> Ordering {
        self.ordering
    }

    /// Drop every declaration and restart the chain at `start_sequence`.
    pub fn reset(&mut self, start_sequence: Option<ResourceRef>) {
        self.resources.clear();
        self.graph.clear();
        self.sequence = start_sequence;
    }

    /// The last sequenced declaration (or the start sequence).
    pub fn sequence(&self) -> Option<&ResourceRef> {
        self.sequence.as_ref()
    }

    /// Declare a resource and thread it into the sequence chain.
    pub fn declare(
        &mut self,
        resource_type: &str,
        id: &str,
        attrs: Attributes,
    ) -> Result<ResourceRef, CoreError> {
        let reference = self.insert(resource_type, id, attrs)?;
        if self.ordering == Ordering::Chain {
            if let Some(previous) = self.sequence.take() {
                self.graph.add_edge(&previous, &reference, EdgeKind::Require);
            }
            self.sequence = Some(reference.clone());
        }
        Ok(reference)
    }

    /// Declare a resource outside the sequence chain.
    pub fn declare_unsequenced(
        &mut self,
        resource_type: &str,
        id: &str,
        attrs: Attributes,
    ) -> Result<ResourceRef, CoreError> {
        self.insert(resource_type, id, attrs)
    }

    fn insert(
        &mut self,
        resource_type: &str,
        id: &str,
        attrs: Attributes,
    ) -> Result<ResourceRef, CoreError> {
        let reference = ResourceRef::new(resource_type, id);
        if self.contains(resource_type, id) {
            return Err(CoreError::AlreadyManaged {
                resource_type: resource_type.to_owned(),
                id: id.to_owned(),
                reference: reference.to_string(),
            });
        }
        trace!(resource = %reference, "declared resource");
        self.resources.entry(resource_type.to_owned()).or_default().insert(
            id.to_owned(),
            Resource {
                reference: reference.clone(),
                attrs,
            },
        );
        Ok(reference)
    }

    /// `dependent` requires `prerequisite`.
    pub fn require(&mut self, dependent: &ResourceRef, prerequisite: &ResourceRef) {
        self.graph.add_edge(prerequisite, dependent, EdgeKind::Require);
    }

    /// A dependency the chain already implies; recorded only in graph ordering.
    pub fn depends(&mut self, dependent: &ResourceRef, prerequisite: &ResourceRef) {
        if self.ordering == Ordering::Graph {
            self.require(dependent, prerequisite);
        }
    }

    /// `prerequisite` is applied before `dependent`, rendered on the prerequisite.
    pub fn before(&mut self, prerequisite: &ResourceRef, dependent: &ResourceRef) {
        self.graph.add_edge(prerequisite, dependent, EdgeKind::Before);
    }

    pub fn contains(&self, resource_type: &str, id: &str) -> bool {
        self.resources
            .get(resource_type)
            .is_some_and(|by_id| by_id.contains_key(id))
    }

    pub fn get(&self, resource_type: &str, id: &str) -> Option<&Resource> {
        self.resources.get(resource_type)?.get(id)
    }

    pub fn get_mut(&mut self, resource_type: &str, id: &str) -> Option<&mut Resource> {
        self.resources.get_mut(resource_type)?.get_mut(id)
    }

    pub fn is_empty(&self) -> bool {
        self.resources.values().all(IndexMap::is_empty)
    }

    pub fn len(&self) -> usize {
        self.resources.values().map(IndexMap::len).sum()
    }

    /// Every declared resource in declaration order, grouped by type.
    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values().flat_map(IndexMap::values)
    }

    pub fn graph(&self) -> &ResourceGraph {
        &self.graph
    }

    /// Flatten into the shape handed to the apply engine.
    ///
    /// Fails if the recorded edges contain a cycle.
    pub fn to_manifest(&self) -> Result<Manifest, CoreError> {
        self.graph.topological_order()?;

        let mut manifest = Manifest::default();
        for resource in self.iter() {
            let mut rendered: IndexMap<String, serde_json::Value> = resource
                .attrs
                .iter()
                .map(|(name, value)| (name.clone(), serde_json::Value::String(value.render())))
                .collect();

            let requires = self.graph.requires_of(&resource.reference);
            if let Some(value) = render_refs(&requires) {
                rendered.insert("require".into(), value);
            }
            let befores = self.graph.befores_of(&resource.reference);
            if let Some(value) = render_refs(&befores) {
                rendered.insert("before".into(), value);
            }

            manifest
                .0
                .entry(resource.reference.resource_type().to_owned())
                .or_default()
                .insert(resource.reference.id().to_owned(), rendered);
        }
        Ok(manifest)
    }
}

/// A single reference renders as a string, several as a list.
fn render_refs(refs: &[ResourceRef]) -> Option<serde_json::Value> {
    match refs {
        [] => None,
        [single] => Some(serde_json::Value::String(single.to_string())),
        many => Some(serde_json::Value::Array(
            many.iter()
                .map(|r| serde_json::Value::String(r.to_string()))
                .collect(),
        )),
    }
}

// ── Manifest ────────────────────────────────────────────────────────

/// Serialized resource set: `{type: {id: {attr: value}}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest(IndexMap<String, IndexMap<String, IndexMap<String, serde_json::Value>>>);

impl Manifest {
    pub fn is_empty(&self) -> bool {
        self.0.values().all(IndexMap::is_empty)
    }

    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn resources(
        &self,
        resource_type: &str,
    ) -> Option<&IndexMap<String, IndexMap<String, serde_json::Value>>> {
        self.0.get(resource_type)
    }

    pub fn attr(&self, resource_type: &str, id: &str, name: &str) -> Option<&serde_json::Value> {
        self.0.get(resource_type)?.get(id)?.get(name)
    }

    /// String-valued attribute, for the common case.
    pub fn attr_str(&self, resource_type: &str, id: &str, name: &str) -> Option<&str> {
        self.attr(resource_type, id, name)?.as_str()
    }

    /// Flat `(type, id, attributes)` rows, in declaration order.
    pub fn rows(&self) -> impl Iterator<Item = (&str, &str, &IndexMap<String, serde_json::Value>)> {
        self.0.iter().flat_map(|(resource_type, by_id)| {
            by_id
                .iter()
                .map(move |(id, attrs)| (resource_type.as_str(), id.as_str(), attrs))
        })
    }

    pub fn len(&self) -> usize {
        self.0.values().map(IndexMap::len).sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::resource::value::AttrsBuilder;

    fn present() -> Attributes {
        AttrsBuilder::new().with("ensure", "present").build()
    }

    #[test]
    fn duplicate_declaration_names_the_resource() {
        let mut set = ResourceSet::new(Ordering::Chain);
        set.declare("force10_portchannel", "128", present()).unwrap();
        let err = set.declare("force10_portchannel", "128", present()).unwrap_err();
        assert_eq!(err.to_string(), "Force10_portchannel[128] is already being managed");
        match err {
            CoreError::AlreadyManaged {
                resource_type, id, ..
            } => {
                assert_eq!(resource_type, "force10_portchannel");
                assert_eq!(id, "128");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn chain_requires_previous_declaration() {
        let mut set = ResourceSet::new(Ordering::Chain);
        for id in ["a", "b", "c"] {
            set.declare("force10_interface", id, present()).unwrap();
        }
        let manifest = set.to_manifest().unwrap();
        assert!(manifest.attr("force10_interface", "a", "require").is_none());
        assert_eq!(
            manifest.attr_str("force10_interface", "b", "require"),
            Some("Force10_interface[a]")
        );
        assert_eq!(
            manifest.attr_str("force10_interface", "c", "require"),
            Some("Force10_interface[b]")
        );
    }

    #[test]
    fn chain_starts_at_supplied_sequence() {
        let mut set = ResourceSet::new(Ordering::Chain);
        set.reset(Some(ResourceRef::new("exec", "bootstrap")));
        set.declare("force10_vlan", "18", present()).unwrap();
        let manifest = set.to_manifest().unwrap();
        assert_eq!(manifest.attr_str("force10_vlan", "18", "require"), Some("Exec[bootstrap]"));
    }

    #[test]
    fn graph_ordering_records_only_explicit_edges() {
        let mut set = ResourceSet::new(Ordering::Graph);
        let a = set.declare("force10_interface", "a", present()).unwrap();
        set.declare("force10_interface", "b", present()).unwrap();
        let c = set.declare("force10_interface", "c", present()).unwrap();
        set.require(&c, &a);
        let manifest = set.to_manifest().unwrap();
        assert!(manifest.attr("force10_interface", "b", "require").is_none());
        assert_eq!(
            manifest.attr_str("force10_interface", "c", "require"),
            Some("Force10_interface[a]")
        );
    }

    #[test]
    fn several_requires_render_as_list() {
        let mut set = ResourceSet::new(Ordering::Chain);
        let pc = set.declare("force10_portchannel", "1", present()).unwrap();
        set.declare("force10_interface", "Te 0/1", present()).unwrap();
        let vlan = set.declare("force10_vlan", "10", present()).unwrap();
        set.require(&vlan, &pc);
        let manifest = set.to_manifest().unwrap();
        assert_eq!(
            manifest.attr("force10_vlan", "10", "require").unwrap(),
            &serde_json::json!(["Force10_interface[Te 0/1]", "Force10_portchannel[1]"])
        );
    }

    #[test]
    fn reset_allows_redeclaration() {
        let mut set = ResourceSet::new(Ordering::Chain);
        set.declare("ioa_mode", "ioa_mode", present()).unwrap();
        set.reset(None);
        assert!(set.is_empty());
        assert!(set.sequence().is_none());
        set.declare("ioa_mode", "ioa_mode", present()).unwrap();
    }
}

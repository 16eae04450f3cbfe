// ── Declarative resources ──
//
// Everything a builder produces ends up here: references, attribute
// values, the dependency graph, and the set/manifest pair handed to the
// apply engine.

pub mod graph;
pub mod reference;
pub mod set;
pub mod value;

pub use graph::{EdgeKind, ResourceGraph};
pub use reference::ResourceRef;
pub use set::{Manifest, Ordering, ResourceSet};
pub use value::{AttrValue, Attributes, AttrsBuilder, Resource, join_sorted_unique};

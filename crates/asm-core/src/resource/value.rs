// ── Resource attribute values ──

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::reference::ResourceRef;

/// One attribute value on a declared resource.
///
/// Lists stay lists until the manifest is rendered; only then are they
/// sorted, de-duplicated and comma-joined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Str(String),
    List(Vec<String>),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Render into the string form handed to the apply engine.
    pub fn render(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Str(s) => s.clone(),
            Self::List(items) => join_sorted_unique(items),
        }
    }
}

/// Sort, de-duplicate and comma-join a list of values.
pub fn join_sorted_unique(items: &[String]) -> String {
    let mut sorted: Vec<&str> = items.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    sorted.dedup();
    sorted.join(",")
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_owned())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Vec<String>> for AttrValue {
    fn from(items: Vec<String>) -> Self {
        Self::List(items)
    }
}

/// Ordered attribute map of a resource.
pub type Attributes = IndexMap<String, AttrValue>;

/// A declared resource: its reference plus attributes, minus ordering.
///
/// `require` / `before` are never stored here; they live on the
/// dependency graph and are rendered at manifest time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resource {
    pub(crate) reference: ResourceRef,
    pub(crate) attrs: Attributes,
}

impl Resource {
    pub fn reference(&self) -> &ResourceRef {
        &self.reference
    }

    pub fn attrs(&self) -> &Attributes {
        &self.attrs
    }

    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<AttrValue>) {
        self.attrs.insert(name.into(), value.into());
    }

    /// Append values to a list attribute, creating it when absent.
    pub fn extend_list<I, S>(&mut self, name: &str, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entry = self
            .attrs
            .entry(name.to_owned())
            .or_insert_with(|| AttrValue::List(Vec::new()));
        if let AttrValue::List(items) = entry {
            items.extend(values.into_iter().map(Into::into));
        }
    }
}

/// Small builder for attribute maps, so creators read declaratively.
#[derive(Debug, Default)]
pub struct AttrsBuilder(Attributes);

impl AttrsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<AttrValue>) -> Self {
        self.0.insert(name.to_owned(), value.into());
        self
    }

    /// Add a list attribute only when the list is non-empty.
    #[must_use]
    pub fn with_list(mut self, name: &str, values: Vec<String>) -> Self {
        if !values.is_empty() {
            self.0.insert(name.to_owned(), AttrValue::List(values));
        }
        self
    }

    #[must_use]
    pub fn with_opt(mut self, name: &str, value: Option<impl Into<AttrValue>>) -> Self {
        if let Some(v) = value {
            self.0.insert(name.to_owned(), v.into());
        }
        self
    }

    pub fn build(self) -> Attributes {
        self.0
    }
}

// ── Top-of-rack creator ──
//
// Force10 S-series/Z-series, Nexus and PowerConnect share the same
// interface + VLAN model and differ only in resource type names.

use indexmap::IndexMap;

use super::materialize::materialize_requests;
use super::quadmode::declare_quadmode;
use super::{CreatorCore, ResourceCreator};
use crate::error::CoreError;
use crate::model::{Action, SwitchFamily};
use crate::resource::{AttrValue, Ordering, ResourceRef};

#[derive(Debug, Clone)]
pub struct RackCreator {
    core: CreatorCore,
}

impl RackCreator {
    pub fn new(family: SwitchFamily, ordering: Ordering) -> Self {
        Self {
            core: CreatorCore::new(family, ordering),
        }
    }
}

impl ResourceCreator for RackCreator {
    fn core(&self) -> &CreatorCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut CreatorCore {
        &mut self.core
    }

    fn materialize(&mut self, action: Action) -> Result<(), CoreError> {
        materialize_requests(&mut self.core, action, true)
    }

    fn configure_quadmode(&mut self, interfaces: &[String], enable: bool) -> Result<usize, CoreError> {
        match self.core.vocabulary().quadmode {
            Some(resource_type) => declare_quadmode(&mut self.core, resource_type, interfaces, enable),
            None => Err(CoreError::unsupported("quad-port mode", self.family())),
        }
    }

    fn configure_settings(&mut self, settings: &IndexMap<String, String>) -> Result<ResourceRef, CoreError> {
        declare_settings(&mut self.core, settings)
    }
}

/// One `<family>_settings` resource carrying `settings` verbatim.
pub(crate) fn declare_settings(
    core: &mut CreatorCore,
    settings: &IndexMap<String, String>,
) -> Result<ResourceRef, CoreError> {
    let Some(resource_type) = core.vocabulary().settings else {
        return Err(CoreError::unsupported("settings", core.family()));
    };
    let attrs = settings
        .iter()
        .map(|(key, value)| (key.clone(), AttrValue::from(value.as_str())))
        .collect();
    core.resources.declare(resource_type, "settings", attrs)
}

// ── Blade MXL creator ──
//
// Rack-style interface + VLAN resources, plus a second configuration
// path: pushing a complete startup configuration file that the switch
// fetches over TFTP and reboots into.

use indexmap::IndexMap;
use tracing::info;

use super::materialize::materialize_requests;
use super::quadmode::declare_quadmode;
use super::rack::declare_settings;
use super::{CreatorCore, ResourceCreator};
use crate::apply::DeploymentStore;
use crate::config_file::{ConfigRewrite, ManagementAddress, SwitchCredential};
use crate::error::CoreError;
use crate::model::{Action, SwitchFamily};
use crate::resource::{AttrsBuilder, Ordering, ResourceRef};

const CONFIG_ID: &str = "apply_config";

/// Settings for one MXL switch.
///
/// With a `config_file` blob the switch gets a rewritten startup
/// configuration; without one, `settings` are passed through verbatim.
#[derive(Debug, Clone, Default)]
pub struct MxlSettings {
    /// Base64-encoded startup configuration.
    pub config_file: Option<String>,
    pub hostname: Option<String>,
    pub management: Option<ManagementAddress>,
    pub credentials: Vec<SwitchCredential>,
    pub boot: Vec<String>,
    pub settings: IndexMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct MxlCreator {
    core: CreatorCore,
}

impl MxlCreator {
    pub fn new(ordering: Ordering) -> Self {
        Self {
            core: CreatorCore::new(SwitchFamily::Force10BladeMxl, ordering),
        }
    }

    /// Declare either the config-file push or the settings pass-through.
    ///
    /// The hostname falls back to `current_hostname` (from facts) when the
    /// settings do not name one.
    pub fn configure_force10_settings<S: DeploymentStore>(
        &mut self,
        settings: &MxlSettings,
        current_hostname: Option<&str>,
        store: &S,
        file_name: &str,
    ) -> Result<ResourceRef, CoreError> {
        let Some(blob) = settings.config_file.as_deref() else {
            return declare_settings(&mut self.core, &settings.settings);
        };

        let rewrite = ConfigRewrite {
            hostname: settings
                .hostname
                .clone()
                .or_else(|| current_hostname.map(str::to_owned)),
            management: settings.management.clone(),
            credentials: settings.credentials.clone(),
            boot: settings.boot.clone(),
        };
        let text = rewrite.rewrite_base64(blob)?;
        let uri = store.save_file_to_deployment(file_name, &text)?;
        info!(%uri, "persisted startup configuration");
        self.config_file_resource(&uri)
    }

    /// Copy `uri` to the startup configuration and reboot into it.
    pub fn config_file_resource(&mut self, uri: &str) -> Result<ResourceRef, CoreError> {
        let resource_type = self
            .core
            .vocabulary()
            .config
            .ok_or_else(|| CoreError::unsupported("configuration file", self.core.family()))?;
        let attrs = AttrsBuilder::new()
            .with("url", uri)
            .with("startup_config", true)
            .with("force", true)
            .build();
        self.core.resources.declare(resource_type, CONFIG_ID, attrs)
    }
}

impl ResourceCreator for MxlCreator {
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
        let resource_type = self
            .core
            .vocabulary()
            .quadmode
            .ok_or_else(|| CoreError::unsupported("quad-port mode", self.core.family()))?;
        declare_quadmode(&mut self.core, resource_type, interfaces, enable)
    }

    fn configure_settings(&mut self, settings: &IndexMap<String, String>) -> Result<ResourceRef, CoreError> {
        declare_settings(&mut self.core, settings)
    }
}

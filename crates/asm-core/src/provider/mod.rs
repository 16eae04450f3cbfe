//! Switch providers.
//!
//! A [`SwitchProvider`] owns exactly one creator for one switch and turns
//! high-level intents (configure a server's ports, tear them down, set
//! up uplink port-channels, quad mode, IOM mode, settings) into creator
//! calls. Each apply cycle ends with a reset, so a provider can be
//! reused across cycles.

pub mod portchannel;
pub mod vlt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::apply::{ApplyEngine, ApplyRequest, DeploymentStore, fan_out};
use crate::config::PlannerConfig;
use crate::creator::{IomMode, MxlSettings, ResourceCreator, SwitchCreator, VltPeering};
use crate::error::CoreError;
use crate::facts::{CycleContext, SwitchFacts};
use crate::model::{Action, NetworkCatalog, PortNetwork, SwitchFamily, Uplink, is_pe_fn};
use crate::resource::{Manifest, ResourceRef};
use crate::teardown::TeardownReport;

pub use portchannel::{MemberRemoval, PlanOptions, PortChannelDescriptor, PortChannelPlan};
pub use vlt::{VltBackupLink, backup_link_ip_for_vlt};

/// VLT peering requested by the deployment template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VltRequest {
    pub portchannel: String,
    #[serde(default)]
    pub interfaces: Vec<String>,
}

/// One server-facing port to tear down.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerPort {
    pub server: String,
    pub interface: String,
    #[serde(default)]
    pub networks: Vec<PortNetwork>,
    #[serde(default)]
    pub portchannel: Option<String>,
}

#[derive(Debug)]
pub struct SwitchProvider {
    cert_name: String,
    facts: SwitchFacts,
    config: PlannerConfig,
    creator: SwitchCreator,
}

impl SwitchProvider {
    /// Build a provider for the switch described by `facts`.
    ///
    /// The creator is chosen from the `model` fact.
    pub fn new(
        cert_name: impl Into<String>,
        facts: SwitchFacts,
        config: PlannerConfig,
    ) -> Result<Self, CoreError> {
        let model = facts
            .model()
            .ok_or_else(|| CoreError::missing("model fact"))?;
        let family = SwitchFamily::classify(model)?;
        let cert_name = cert_name.into();
        debug!(switch = %cert_name, model, %family, "created switch provider");
        Ok(Self {
            cert_name,
            creator: SwitchCreator::for_family(family, config.ordering),
            facts,
            config,
        })
    }

    pub fn cert_name(&self) -> &str {
        &self.cert_name
    }

    pub fn family(&self) -> SwitchFamily {
        self.creator.family()
    }

    pub fn model(&self) -> &str {
        self.facts.model().unwrap_or_default()
    }

    pub fn facts(&self) -> &SwitchFacts {
        &self.facts
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn creator(&self) -> &SwitchCreator {
        &self.creator
    }

    pub fn creator_mut(&mut self) -> &mut SwitchCreator {
        &mut self.creator
    }

    pub fn context(&self) -> CycleContext<'_> {
        CycleContext::new(&self.facts)
    }

    // ── Server port intents ──────────────────────────────────────────

    /// Record the VLANs a server port should carry.
    pub fn configure_server_port(
        &mut self,
        interface: &str,
        networks: &[PortNetwork],
        portchannel: Option<&str>,
        mtu: Option<&str>,
    ) -> Result<(), CoreError> {
        self.record_port(interface, networks, portchannel, mtu, false)
    }

    /// Record the VLANs to take off a server port.
    pub fn teardown_server_port(
        &mut self,
        interface: &str,
        networks: &[PortNetwork],
        portchannel: Option<&str>,
    ) -> Result<(), CoreError> {
        self.record_port(interface, networks, portchannel, None, true)
    }

    fn record_port(
        &mut self,
        interface: &str,
        networks: &[PortNetwork],
        portchannel: Option<&str>,
        mtu: Option<&str>,
        remove: bool,
    ) -> Result<(), CoreError> {
        let mtu = mtu.unwrap_or(self.config.default_mtu.as_str()).to_owned();
        for network in networks {
            self.creator.configure_interface_vlan(
                interface,
                &network.vlan,
                network.tagged,
                remove,
                portchannel,
                Some(&mtu),
            )?;
        }
        Ok(())
    }

    // ── Apply cycle ──────────────────────────────────────────────────

    /// Materialize one pass without applying it.
    pub fn plan(&mut self, action: Action) -> Result<Option<Manifest>, CoreError> {
        if self.creator.prepare(action)? {
            self.creator.to_manifest().map(Some)
        } else {
            Ok(None)
        }
    }

    /// Apply the removal pass then the add pass, skipping empty ones.
    ///
    /// The creator is reset afterwards whether or not the passes
    /// succeeded. Returns the number of manifests applied.
    pub async fn process<E: ApplyEngine>(&mut self, engine: &E) -> Result<usize, CoreError> {
        let result = self.run_passes(engine).await;
        self.creator.reset(None);
        result
    }

    async fn run_passes<E: ApplyEngine>(&mut self, engine: &E) -> Result<usize, CoreError> {
        let mut applied = 0;
        for action in [Action::Remove, Action::Add] {
            let Some(manifest) = self.plan(action)? else {
                debug!(switch = %self.cert_name, %action, "nothing to apply");
                continue;
            };
            info!(
                switch = %self.cert_name,
                %action,
                resources = manifest.len(),
                "applying switch configuration"
            );
            engine.process_generic(self.apply_request(manifest)).await?;
            applied += 1;
        }
        Ok(applied)
    }

    /// Apply direct declarations (port-channels, quad mode, IOM mode,
    /// settings) made since the last cycle.
    ///
    /// Returns `false` when nothing was declared. The declarations are
    /// cleared either way; the request log is kept.
    pub async fn apply_declared<E: ApplyEngine>(&mut self, engine: &E) -> Result<bool, CoreError> {
        if self.creator.resources().is_empty() {
            return Ok(false);
        }
        let result = self.apply_current(engine).await;
        self.creator.core_mut().resources_mut().reset(None);
        result.map(|()| true)
    }

    /// Flatten and clear the direct declarations without applying them.
    pub fn take_declared(&mut self) -> Result<Option<Manifest>, CoreError> {
        if self.creator.resources().is_empty() {
            return Ok(None);
        }
        let manifest = self.creator.to_manifest();
        self.creator.core_mut().resources_mut().reset(None);
        manifest.map(Some)
    }

    async fn apply_current<E: ApplyEngine>(&self, engine: &E) -> Result<(), CoreError> {
        let manifest = self.creator.to_manifest()?;
        info!(
            switch = %self.cert_name,
            resources = manifest.len(),
            "applying declared resources"
        );
        engine.process_generic(self.apply_request(manifest)).await
    }

    fn apply_request(&self, manifest: Manifest) -> ApplyRequest {
        ApplyRequest::new(self.cert_name.clone(), manifest)
            .mode(self.config.apply_mode)
            .synchronous(self.config.synchronous)
            .device_guid(self.facts.string("device_guid").map(str::to_owned))
    }

    // ── Whole-switch intents ─────────────────────────────────────────

    /// Declare uplink port-channels and their VLANs.
    ///
    /// Returns the plan that was declared, or `None` when there are no
    /// uplinks to configure.
    pub fn configure_portchannels(
        &mut self,
        uplinks: &[Uplink],
        networks: &NetworkCatalog,
    ) -> Result<Option<PortChannelPlan>, CoreError> {
        if uplinks.is_empty() {
            debug!(switch = %self.cert_name, "no uplinks, skipping port-channel configuration");
            return Ok(None);
        }
        let options = PlanOptions {
            quad_port_mode: self.config.quad_port_mode,
            default_mtu: self.config.default_mtu.clone(),
            vlan_on_portchannel: self.family() == SwitchFamily::Force10BladeMxl
                || is_pe_fn(self.model()),
        };
        let ctx = CycleContext::new(&self.facts);
        let plan = PortChannelPlan::compute(uplinks, networks, &ctx, &options);
        let declared = plan.declare(&mut self.creator)?;
        info!(
            switch = %self.cert_name,
            portchannels = plan.desired.len(),
            removals = plan.member_removals.len() + plan.removed_portchannels.len(),
            declared,
            "planned port-channels"
        );
        Ok(Some(plan))
    }

    pub fn configure_quadmode(&mut self, interfaces: &[String], enable: bool) -> Result<usize, CoreError> {
        self.creator.configure_quadmode(interfaces, enable)
    }

    /// Declare the IOA personality.
    ///
    /// PE-FN models always run full-switch. Otherwise a VLT request wins,
    /// then pmux when uplinks exist. Returns `None` when there is nothing
    /// to declare.
    pub fn configure_iom_mode(
        &mut self,
        vlt: Option<&VltRequest>,
        uplinks_present: bool,
    ) -> Result<Option<ResourceRef>, CoreError> {
        if self.creator.as_ioa_mut().is_none() {
            return Err(CoreError::unsupported("IOM mode", self.family()));
        }

        let mode = if is_pe_fn(self.model()) {
            IomMode::FullSwitch
        } else if let Some(vlt) = vlt {
            if self.facts.is_standalone_teaming() {
                return Err(CoreError::VltInStandaloneMode);
            }
            if !uplinks_present {
                return Err(CoreError::missing("uplinks for VLT mode"));
            }
            let backup = CycleContext::new(&self.facts).vlt_backup_link()?;
            IomMode::Vlt(VltPeering {
                portchannel: vlt.portchannel.clone(),
                interfaces: vlt.interfaces.clone(),
                backup,
            })
        } else if uplinks_present {
            IomMode::Pmux
        } else {
            debug!(switch = %self.cert_name, "no uplinks, leaving IOM mode alone");
            return Ok(None);
        };

        match self.creator.as_ioa_mut() {
            Some(ioa) => ioa.iom_mode_resource(&mode).map(Some),
            None => Err(CoreError::unsupported("IOM mode", self.family())),
        }
    }

    /// MXL switches accept a full configuration file; other Force10
    /// switches only the settings pass-through.
    pub fn configure_force10_settings<S: DeploymentStore>(
        &mut self,
        settings: &MxlSettings,
        store: &S,
    ) -> Result<ResourceRef, CoreError> {
        let file_name = format!("{}.cfg", self.cert_name);
        let hostname = self.facts.hostname().map(str::to_owned);
        match self.creator.as_mxl_mut() {
            Some(mxl) => mxl.configure_force10_settings(settings, hostname.as_deref(), store, &file_name),
            None if settings.config_file.is_some() => {
                Err(CoreError::unsupported("configuration file", self.family()))
            }
            None => self.creator.configure_settings(&settings.settings),
        }
    }

    pub fn configure_settings(&mut self, settings: &IndexMap<String, String>) -> Result<ResourceRef, CoreError> {
        self.creator.configure_settings(settings)
    }

    /// Reset every IOA port to untagged VLAN 1 and apply it.
    ///
    /// Returns whether a manifest was applied.
    pub async fn initialize_ports<E: ApplyEngine>(&mut self, engine: &E) -> Result<bool, CoreError> {
        let prepared = match self.creator.as_ioa_mut() {
            Some(ioa) => ioa.initialize_ports(&self.facts),
            None => Ok(false),
        };
        // Requests recorded by the caller survive when nothing was prepared.
        let result = match prepared {
            Ok(false) => return Ok(false),
            Ok(true) => self.apply_current(engine).await.map(|()| true),
            Err(e) => Err(e),
        };
        self.creator.reset(None);
        result
    }

    /// Tear down each server port in turn, continuing past failures.
    pub async fn teardown_servers<E: ApplyEngine>(
        &mut self,
        engine: &E,
        ports: &[ServerPort],
    ) -> TeardownReport {
        let mut report = TeardownReport::new();
        for port in ports {
            let step = format!("{} {} on {}", port.server, port.interface, self.cert_name);
            let recorded =
                self.teardown_server_port(&port.interface, &port.networks, port.portchannel.as_deref());
            let result = match recorded {
                Ok(()) => self.process(engine).await.map(|_| ()),
                Err(e) => {
                    self.creator.reset(None);
                    Err(e)
                }
            };
            report.record(step, result);
        }
        report
    }
}

/// Run one apply cycle on every provider concurrently.
///
/// Results are paired with each switch's certificate name, in input order.
pub async fn process_all<E: ApplyEngine>(
    providers: &mut [SwitchProvider],
    engine: &E,
) -> Vec<(String, Result<usize, CoreError>)> {
    fan_out(providers.iter_mut(), move |provider| async move {
        let result = provider.process(engine).await;
        (provider.cert_name.clone(), result)
    })
    .await
}

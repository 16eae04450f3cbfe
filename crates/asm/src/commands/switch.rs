//! Switch subcommand handlers.

use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;
use tracing::{debug, info};

use asm_core::{
    Action, ApplyEngine, ApplyRequest, ConfigRewrite, CycleContext, InterfaceRequest,
    ManagementAddress, ManifestDirEngine, MxlSettings, NetworkCatalog, NetworkInfo, PortNetwork,
    ServerPort, SwitchCredential, SwitchFacts, SwitchProvider, Uplink, VltRequest,
};

use crate::cli::{GlobalOpts, PassSelection, SwitchArgs, SwitchCommand};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output::{self, Stage};

use super::util;

// ── Request file ────────────────────────────────────────────────────

/// Everything one `switch plan` run should declare, in one JSON document.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RequestFile {
    requests: Vec<InterfaceRequest>,
    teardown: Vec<ServerPort>,
    portchannels: Vec<Uplink>,
    networks: Vec<NetworkInfo>,
    quadmode: Option<QuadModeIntent>,
    iom_mode: Option<IomModeIntent>,
    settings: IndexMap<String, String>,
    force10_settings: Option<Force10SettingsIntent>,
}

#[derive(Debug, Deserialize)]
struct QuadModeIntent {
    interfaces: Vec<String>,
    #[serde(default = "enabled")]
    enable: bool,
}

fn enabled() -> bool {
    true
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct IomModeIntent {
    vlt: Option<VltRequest>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Force10SettingsIntent {
    /// Base64-encoded startup configuration.
    config_file: Option<String>,
    hostname: Option<String>,
    management_ip: Option<String>,
    boot: Vec<String>,
    /// Deployment id the rewritten file is stored under.
    deployment: Option<String>,
    /// Config profile whose credentials are written into the file.
    credentials_from: Option<String>,
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: SwitchArgs, cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        SwitchCommand::Plan {
            facts,
            requests,
            action,
            out_dir,
            name,
        } => {
            let facts: SwitchFacts = util::read_json("facts file", &facts)?;
            let request_file: RequestFile = util::read_json("request file", &requests)?;
            let target = name
                .or_else(|| facts.hostname().map(str::to_owned))
                .unwrap_or_else(|| "switch".into());

            let mut provider = SwitchProvider::new(target.clone(), facts, config::planner_config(cfg)?)?;
            let stages = plan_switch(&mut provider, &request_file, action, cfg)?;

            if let Some(dir) = out_dir {
                write_stages(&dir, &provider, stages).await?;
                return Ok(());
            }

            let out = output::render_stages(config::output_format(global, cfg), &stages)?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        SwitchCommand::MxlConfig {
            config_file,
            facts,
            hostname,
            management_ip,
            switch,
            boot,
        } => {
            let blob = util::read_text("configuration file", &config_file)?;
            let facts: Option<SwitchFacts> = facts
                .map(|path| util::read_json("facts file", &path))
                .transpose()?;

            let rewrite = ConfigRewrite {
                hostname: hostname.or_else(|| {
                    facts
                        .as_ref()
                        .and_then(|f| f.hostname().map(str::to_owned))
                }),
                management: management_ip
                    .as_deref()
                    .map(str::parse::<ManagementAddress>)
                    .transpose()?,
                credentials: switch
                    .as_deref()
                    .map(|name| switch_credential(cfg, name))
                    .transpose()?
                    .into_iter()
                    .collect(),
                boot,
            };
            let text = rewrite.rewrite_base64(blob.trim())?;
            output::print_output(text.trim_end(), global.quiet);
            Ok(())
        }

        SwitchCommand::VltPeer { facts } => {
            let facts: SwitchFacts = util::read_json("facts file", &facts)?;
            let link = CycleContext::new(&facts).vlt_backup_link()?;
            let out = output::render_single(config::output_format(global, cfg), &link, |l| {
                format!("Unit:        {}\nDestination: {}", l.unit_id, l.destination_ip)
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}

// ── Planning ────────────────────────────────────────────────────────

/// Record and declare everything in `request`, then materialize the
/// selected passes. Direct declarations come out as a `declared` stage
/// ahead of the passes, since each pass starts from an empty set.
fn plan_switch(
    provider: &mut SwitchProvider,
    request: &RequestFile,
    selection: PassSelection,
    cfg: &Config,
) -> Result<Vec<Stage>, CliError> {
    for req in &request.requests {
        let network = PortNetwork {
            vlan: req.vlan.clone(),
            tagged: req.tagged,
        };
        match req.action {
            Action::Add => provider.configure_server_port(
                &req.interface,
                std::slice::from_ref(&network),
                req.portchannel(),
                Some(req.mtu.as_str()),
            )?,
            Action::Remove => provider.teardown_server_port(
                &req.interface,
                std::slice::from_ref(&network),
                req.portchannel(),
            )?,
        }
    }
    for port in &request.teardown {
        provider.teardown_server_port(&port.interface, &port.networks, port.portchannel.as_deref())?;
    }

    let catalog = NetworkCatalog::new(request.networks.iter().cloned());
    provider.configure_portchannels(&request.portchannels, &catalog)?;
    if let Some(quad) = &request.quadmode {
        provider.configure_quadmode(&quad.interfaces, quad.enable)?;
    }
    if let Some(mode) = &request.iom_mode {
        provider.configure_iom_mode(mode.vlt.as_ref(), !request.portchannels.is_empty())?;
    }
    if let Some(intent) = &request.force10_settings {
        let settings = mxl_settings(intent, &request.settings, cfg)?;
        let deployment = intent.deployment.as_deref().unwrap_or(provider.cert_name());
        let store = asm_config::deployment_store(cfg, deployment);
        provider.configure_force10_settings(&settings, &store)?;
    } else if !request.settings.is_empty() {
        provider.configure_settings(&request.settings)?;
    }

    let target = provider.cert_name().to_owned();
    let mut stages = Vec::new();
    if let Some(manifest) = provider.take_declared()? {
        stages.push(Stage {
            stage: "declared".into(),
            target: target.clone(),
            resources: manifest,
        });
    }

    let actions: &[Action] = match selection {
        PassSelection::Add => &[Action::Add],
        PassSelection::Remove => &[Action::Remove],
        PassSelection::Both => &[Action::Remove, Action::Add],
    };
    for &action in actions {
        match provider.plan(action)? {
            Some(manifest) => stages.push(Stage {
                stage: action.to_string(),
                target: target.clone(),
                resources: manifest,
            }),
            None => debug!(switch = %target, %action, "pass produced no resources"),
        }
    }
    Ok(stages)
}

fn mxl_settings(
    intent: &Force10SettingsIntent,
    settings: &IndexMap<String, String>,
    cfg: &Config,
) -> Result<MxlSettings, CliError> {
    let management = intent
        .management_ip
        .as_deref()
        .map(str::parse::<ManagementAddress>)
        .transpose()?;
    let credentials = intent
        .credentials_from
        .as_deref()
        .map(|name| switch_credential(cfg, name))
        .transpose()?
        .into_iter()
        .collect();
    Ok(MxlSettings {
        config_file: intent.config_file.clone(),
        hostname: intent.hostname.clone(),
        management,
        credentials,
        boot: intent.boot.clone(),
        settings: settings.clone(),
    })
}

fn switch_credential(cfg: &Config, switch: &str) -> Result<SwitchCredential, CliError> {
    let profile = cfg.switches.get(switch).ok_or_else(|| CliError::NoCredentials {
        switch: switch.into(),
    })?;
    Ok(config::resolve_switch_credential(profile, switch)?)
}

/// Hand each stage to a manifest-directory engine, in order.
async fn write_stages(dir: &Path, provider: &SwitchProvider, stages: Vec<Stage>) -> Result<(), CliError> {
    let engine = ManifestDirEngine::new(dir);
    let planner = provider.config();
    let device_guid = provider.facts().string("device_guid").map(str::to_owned);
    let count = stages.len();
    for stage in stages {
        let request = ApplyRequest::new(stage.target, stage.resources)
            .mode(planner.apply_mode)
            .synchronous(planner.synchronous)
            .device_guid(device_guid.clone());
        engine.process_generic(request).await?;
    }
    info!(dir = %engine.dir().display(), manifests = count, "wrote switch manifests");
    Ok(())
}

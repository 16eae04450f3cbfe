//! Command dispatch: bridges CLI args -> core planners -> output formatting.

pub mod cluster;
pub mod config_cmd;
pub mod switch;
pub mod util;

use serde::Serialize;

use asm_core::SwitchFamily;

use crate::cli::{ClassifyArgs, Command, GlobalOpts};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

/// Dispatch a planning command to the appropriate handler.
pub async fn dispatch(cmd: Command, cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Classify(args) => classify(&args, cfg, global),
        Command::Switch(args) => switch::handle(args, cfg, global).await,
        Command::Cluster(args) => cluster::handle(args, cfg, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}

// ── Classify ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct Classification {
    model: String,
    family: SwitchFamily,
    blade: bool,
    interface: &'static str,
    portchannel: &'static str,
    vlan: Option<&'static str>,
    quadmode: Option<&'static str>,
    settings: Option<&'static str>,
    mode: Option<&'static str>,
    config: Option<&'static str>,
}

fn classify(args: &ClassifyArgs, cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let family = SwitchFamily::classify(&args.model)?;
    let vocab = family.vocabulary();
    let view = Classification {
        model: args.model.clone(),
        family,
        blade: family.is_blade(),
        interface: vocab.interface,
        portchannel: vocab.portchannel,
        vlan: vocab.vlan,
        quadmode: vocab.quadmode,
        settings: vocab.settings,
        mode: vocab.mode,
        config: vocab.config,
    };

    let out = output::render_single(config::output_format(global, cfg), &view, classification_detail)?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn classification_detail(c: &Classification) -> String {
    let optional = |v: Option<&str>| v.unwrap_or("-").to_owned();
    [
        format!("Model:        {}", c.model),
        format!("Family:       {}", c.family),
        format!("Blade:        {}", c.blade),
        format!("Interface:    {}", c.interface),
        format!("Port-channel: {}", c.portchannel),
        format!("VLAN:         {}", optional(c.vlan)),
        format!("Quad mode:    {}", optional(c.quadmode)),
        format!("Settings:     {}", optional(c.settings)),
        format!("IOM mode:     {}", optional(c.mode)),
        format!("Config file:  {}", optional(c.config)),
    ]
    .join("\n")
}

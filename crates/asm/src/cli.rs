//! Clap derive structures for the `asm` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// asm -- offline planner for switch and cluster resource sets
#[derive(Debug, Parser)]
#[command(
    name = "asm",
    version,
    about = "Plan switch and cluster resource sets for ASM deployments",
    long_about = "Builds the declarative resource sets an apply engine enforces on\n\
        Dell Force10/MXL/IOA, Nexus and PowerConnect switches, and the VDS and\n\
        vSAN teardown sets for ESX hosts, from JSON fact snapshots.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "ASM_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format (overrides `defaults.output`)
    #[arg(long, short = 'o', env = "ASM_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output Enum ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Pretty table
    Table,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the switch family and resource types for a model string
    Classify(ClassifyArgs),

    /// Plan switch resource sets
    #[command(alias = "sw")]
    Switch(SwitchArgs),

    /// Plan ESX host eviction resource sets
    Cluster(ClusterArgs),

    /// Manage the configuration file
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct ClassifyArgs {
    /// Model string as reported by the switch, e.g. "MXL-10/40GbE"
    pub model: String,
}

// ── Switch ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SwitchArgs {
    #[command(subcommand)]
    pub command: SwitchCommand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PassSelection {
    /// Only the add pass
    Add,
    /// Only the removal pass
    Remove,
    /// Removal pass, then add pass
    Both,
}

#[derive(Debug, Subcommand)]
pub enum SwitchCommand {
    /// Build the resource sets for a request file
    Plan {
        /// Switch fact snapshot (JSON)
        #[arg(long)]
        facts: PathBuf,

        /// Request file (JSON): requests, portchannels, networks, quadmode, iom_mode, settings
        #[arg(long)]
        requests: PathBuf,

        /// Which passes to materialize
        #[arg(long, value_enum, default_value = "both")]
        action: PassSelection,

        /// Write each manifest as JSON into this directory instead of printing
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Target name (defaults to the hostname fact)
        #[arg(long)]
        name: Option<String>,
    },

    /// Rewrite an MXL startup configuration and print it
    MxlConfig {
        /// Base64-encoded configuration file
        #[arg(long)]
        config_file: PathBuf,

        /// Switch fact snapshot (JSON), for the current hostname
        #[arg(long)]
        facts: Option<PathBuf>,

        /// Hostname to set
        #[arg(long)]
        hostname: Option<String>,

        /// Static management address as IP/prefix; omit for DHCP
        #[arg(long)]
        management_ip: Option<String>,

        /// Switch name whose credentials (from config) are written
        #[arg(long)]
        switch: Option<String>,

        /// Boot line to write (repeatable)
        #[arg(long)]
        boot: Vec<String>,
    },

    /// Show the VLT backup link for an IOA
    VltPeer {
        /// Switch fact snapshot (JSON)
        #[arg(long)]
        facts: PathBuf,
    },
}

// ── Cluster ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ClusterArgs {
    #[command(subcommand)]
    pub command: ClusterCommand,
}

#[derive(Debug, Subcommand)]
pub enum ClusterCommand {
    /// Build the VDS eviction resources for one host
    EvictVds {
        /// ESX host facts (JSON)
        #[arg(long)]
        host_facts: PathBuf,

        /// Live uplink inventory (JSON map of "host:vds" to NIC list)
        #[arg(long)]
        inventory: Option<PathBuf>,

        /// NIC to move management onto when the VDS has one uplink
        #[arg(long)]
        template_backup_nic: Option<String>,

        #[command(flatten)]
        target: VcenterTarget,
    },

    /// Build the vSAN teardown resources
    EvictVsan {
        /// Cluster name
        #[arg(long)]
        cluster: String,

        /// Datacenter name
        #[arg(long)]
        datacenter: String,

        /// Hosts in the cluster (comma-separated)
        #[arg(long, value_delimiter = ',')]
        hosts: Vec<String>,

        /// Limit the teardown to one host
        #[arg(long)]
        host: Option<String>,

        #[command(flatten)]
        target: VcenterTarget,
    },
}

/// Where cluster manifests go when they are written instead of printed.
#[derive(Debug, Args)]
pub struct VcenterTarget {
    /// vCenter target name the manifests are addressed to
    #[arg(long, default_value = "vcenter")]
    pub vcenter: String,

    /// Write each manifest as JSON into this directory instead of printing
    #[arg(long)]
    pub out_dir: Option<PathBuf>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file path
    Path,

    /// Display current resolved configuration
    Show,

    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Store a switch password in the system keyring
    SetPassword {
        /// Switch name
        switch: String,
    },
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

//! Resource-dependency builder for ASM switch and cluster providers.
//!
//! Intents about a switch (which VLANs a server port carries, which
//! uplinks form port-channels, how an IOA should run) become a declarative
//! resource set: `{type: {id: {attr: value}}}` with `require`/`before`
//! edges, handed to an external apply engine.
//!
//! - **[`ResourceSet`]** accumulates declarations and their dependency
//!   graph. [`Ordering::Chain`] threads every sequenced declaration after
//!   the previous one; [`Ordering::Graph`] keeps only explicit edges.
//!
//! - **Creators** ([`creator`]) record [`InterfaceRequest`]s and
//!   materialize them one pass (`add` / `remove`) at a time, with a
//!   per-family resource vocabulary.
//!
//! - **[`SwitchProvider`]** owns one creator per switch, plans uplink
//!   port-channels ([`PortChannelPlan`]), picks the VLT backup link, and
//!   runs the apply cycle against an [`ApplyEngine`].
//!
//! - **[`SwitchConfigFile`]** rewrites MXL startup configurations
//!   (hostname, management address, credentials, boot lines).
//!
//! - **Cluster eviction** ([`cluster`]) builds the VDS and vSAN teardown
//!   resource sets for ESX hosts.
//!
//! The crate does no I/O of its own beyond what [`FsDeploymentStore`] and
//! [`ManifestDirEngine`] are asked to write.

pub mod apply;
pub mod cluster;
pub mod config;
pub mod config_file;
pub mod creator;
pub mod error;
pub mod facts;
pub mod model;
pub mod provider;
pub mod resource;
pub mod teardown;

// ── Primary re-exports ──────────────────────────────────────────────
pub use apply::{
    ApplyEngine, ApplyMode, ApplyRequest, DeploymentStore, FsDeploymentStore, ManifestDirEngine,
    fan_out,
};
pub use config::PlannerConfig;
pub use config_file::{ConfigRewrite, ManagementAddress, SwitchConfigFile, SwitchCredential};
pub use creator::{IomMode, MxlSettings, PortChannelSpec, ResourceCreator, SwitchCreator};
pub use error::CoreError;
pub use facts::{ChassisIom, CycleContext, SwitchFacts};
pub use model::{
    Action, InterfaceName, InterfaceRequest, NetworkCatalog, NetworkInfo, PortNetwork,
    SwitchFamily, Uplink,
};
pub use provider::{
    PortChannelPlan, ServerPort, SwitchProvider, VltBackupLink, VltRequest, process_all,
};
pub use resource::{Manifest, Ordering, ResourceRef, ResourceSet};
pub use teardown::{StepOutcome, TeardownReport};

// ── Planner configuration ──

use std::time::Duration;

use crate::apply::ApplyMode;
use crate::model::DEFAULT_MTU;
use crate::resource::Ordering;

/// Knobs shared by every provider in one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannerConfig {
    pub ordering: Ordering,
    /// MTU used when an uplink or request does not name one.
    pub default_mtu: String,
    /// Treat every uplink port as part of a quad-port group.
    pub quad_port_mode: bool,
    /// Wait before the single retry of a cluster-wide vSAN eviction.
    pub vsan_retry_delay: Duration,
    pub apply_mode: ApplyMode,
    pub synchronous: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            ordering: Ordering::Chain,
            default_mtu: DEFAULT_MTU.into(),
            quad_port_mode: false,
            vsan_retry_delay: Duration::from_secs(60),
            apply_mode: ApplyMode::Apply,
            synchronous: true,
        }
    }
}

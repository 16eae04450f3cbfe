//! Cluster-side eviction builders.
//!
//! Resource sets for removing an ESX host from its distributed switches
//! ([`vds`]) and for tearing down vSAN ([`vsan`]). Both are applied
//! against the vCenter target, not the host.

pub mod vds;
pub mod vsan;

use tracing::info;

use crate::apply::{ApplyEngine, ApplyRequest};
use crate::config::PlannerConfig;
use crate::error::CoreError;
use crate::teardown::TeardownReport;

pub use vds::{
    EsxHostFacts, HostInventory, StaticInventory, VdsEvictionOptions, VdsMembership, Vmknic,
    build_vds_eviction,
};
pub use vsan::{VsanEviction, build_vsan_eviction, evict_vsan};

pub(crate) const TRANSPORT: &str = "Transport[vcenter]";
pub(crate) const MANAGEMENT_VMKNIC: &str = "vmk0";
pub(crate) const STANDARD_VSWITCH: &str = "vSwitch0";

/// Evict one host: leave its distributed switches, then tear down vSAN
/// for it when `vsan` is given.
///
/// Steps run best-effort; the report carries every failure.
pub async fn evict_host<E, I>(
    engine: &E,
    vcenter: &str,
    host: &EsxHostFacts,
    inventory: &I,
    config: &PlannerConfig,
    template_backup_nic: Option<&str>,
    vsan: Option<&VsanEviction>,
) -> TeardownReport
where
    E: ApplyEngine,
    I: HostInventory + Sync + ?Sized,
{
    let mut report = TeardownReport::new();
    let options = VdsEvictionOptions {
        ordering: config.ordering,
        template_backup_nic: template_backup_nic.map(str::to_owned),
    };

    report
        .run_step(format!("leave distributed switches on {}", host.hostname), async {
            let manifest = build_vds_eviction(host, inventory, &options)?.to_manifest()?;
            if manifest.is_empty() {
                return Ok::<(), CoreError>(());
            }
            engine
                .process_generic(
                    ApplyRequest::new(vcenter, manifest)
                        .mode(config.apply_mode)
                        .synchronous(config.synchronous),
                )
                .await
        })
        .await;

    if let Some(vsan) = vsan {
        report
            .run_step(
                format!("tear down vSAN on {}", vsan.cluster),
                evict_vsan(engine, vcenter, vsan, config),
            )
            .await;
    }

    info!(
        host = %host.hostname,
        failures = report.failures().count(),
        "host eviction finished"
    );
    report
}

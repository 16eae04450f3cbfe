// ── vSAN teardown ──
//
// Two-phase: disable vSAN on the cluster and put hosts into maintenance
// mode without data migration, initialize their disks, then declare a
// transient "restore" vSAN resource that can only run once the disk
// claims are released.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::TRANSPORT;
use crate::apply::{ApplyEngine, ApplyRequest};
use crate::config::PlannerConfig;
use crate::error::CoreError;
use crate::resource::{AttrsBuilder, Ordering, ResourceSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VsanEviction {
    pub cluster: String,
    pub datacenter: String,
    #[serde(default)]
    pub hosts: Vec<String>,
    /// Limit the teardown to this one host.
    #[serde(default)]
    pub evict_host: Option<String>,
}

impl VsanEviction {
    pub fn is_cluster_wide(&self) -> bool {
        self.evict_host.is_none()
    }

    fn affected_hosts(&self) -> Vec<String> {
        match &self.evict_host {
            Some(host) => vec![host.clone()],
            None => self.hosts.clone(),
        }
    }
}

pub fn build_vsan_eviction(request: &VsanEviction, ordering: Ordering) -> Result<ResourceSet, CoreError> {
    let cluster = request.cluster.as_str();
    let mut set = ResourceSet::new(ordering);

    let disable = set.declare(
        "vc_vsan",
        cluster,
        AttrsBuilder::new()
            .with("ensure", "absent")
            .with("cluster", cluster)
            .with("datacenter", request.datacenter.as_str())
            .with("transport", TRANSPORT)
            .build(),
    )?;

    let hosts = request.affected_hosts();
    let mut maint_refs = Vec::new();
    for host in &hosts {
        let maint = set.declare(
            "esx_maintmode",
            host,
            AttrsBuilder::new()
                .with("ensure", "present")
                .with("vsan_action", "noAction")
                .with("evacuate_powered_off_vms", true)
                .with("transport", TRANSPORT)
                .build(),
        )?;
        set.depends(&maint, &disable);
        maint_refs.push(maint);
    }

    let initialize = set.declare(
        "vc_vsan_disk_initialize",
        cluster,
        AttrsBuilder::new()
            .with("ensure", "present")
            .with("cluster", cluster)
            .with("datacenter", request.datacenter.as_str())
            .with_list("cleanup_hosts", hosts.clone())
            .with("transport", TRANSPORT)
            .build(),
    )?;
    for maint in &maint_refs {
        set.depends(&initialize, maint);
    }

    let restore = set.declare(
        "vc_vsan",
        &format!("{cluster}:restore"),
        AttrsBuilder::new()
            .with("ensure", "present")
            .with("cluster", cluster)
            .with("datacenter", request.datacenter.as_str())
            .with("auto_claim", false)
            .with("transport", TRANSPORT)
            .build(),
    )?;
    set.require(&restore, &initialize);

    info!(cluster, hosts = hosts.len(), "built vSAN eviction");
    Ok(set)
}

/// Build and apply the vSAN teardown against `vcenter`.
///
/// A cluster-wide teardown is retried once after
/// `config.vsan_retry_delay`; a single-host teardown is not.
pub async fn evict_vsan<E: ApplyEngine>(
    engine: &E,
    vcenter: &str,
    request: &VsanEviction,
    config: &PlannerConfig,
) -> Result<(), CoreError> {
    let manifest = build_vsan_eviction(request, config.ordering)?.to_manifest()?;
    let apply = || {
        engine.process_generic(
            ApplyRequest::new(vcenter, manifest.clone())
                .mode(config.apply_mode)
                .synchronous(config.synchronous),
        )
    };

    match apply().await {
        Err(e) if request.is_cluster_wide() => {
            warn!(
                cluster = %request.cluster,
                error = %e,
                delay_secs = config.vsan_retry_delay.as_secs(),
                "vSAN teardown failed, retrying once"
            );
            tokio::time::sleep(config.vsan_retry_delay).await;
            apply().await
        }
        other => other,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use std::time::Duration;

    use super::*;

    /// Fails the first `failures` calls.
    struct FlakyEngine {
        failures: usize,
        calls: AtomicUsize,
    }

    impl FlakyEngine {
        fn new(failures: usize) -> Self {
            Self {
                failures,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(AtomicOrdering::SeqCst)
        }
    }

    impl ApplyEngine for FlakyEngine {
        async fn process_generic(&self, request: ApplyRequest) -> Result<(), CoreError> {
            let n = self.calls.fetch_add(1, AtomicOrdering::SeqCst);
            if n < self.failures {
                return Err(CoreError::Apply {
                    target: request.target_id,
                    message: "task in progress".into(),
                });
            }
            Ok(())
        }
    }

    fn cluster_wide() -> VsanEviction {
        VsanEviction {
            cluster: "prod".into(),
            datacenter: "dc1".into(),
            hosts: vec!["esx-1".into(), "esx-2".into()],
            evict_host: None,
        }
    }

    fn config() -> PlannerConfig {
        PlannerConfig {
            vsan_retry_delay: Duration::from_secs(60),
            ..PlannerConfig::default()
        }
    }

    #[test]
    fn restore_requires_disk_initialization() {
        let m = build_vsan_eviction(&cluster_wide(), Ordering::Chain)
            .unwrap()
            .to_manifest()
            .unwrap();
        assert_eq!(m.attr_str("vc_vsan", "prod", "ensure"), Some("absent"));
        assert_eq!(m.attr_str("esx_maintmode", "esx-2", "vsan_action"), Some("noAction"));
        assert_eq!(
            m.attr_str("vc_vsan_disk_initialize", "prod", "cleanup_hosts"),
            Some("esx-1,esx-2")
        );
        assert_eq!(
            m.attr_str("vc_vsan", "prod:restore", "require"),
            Some("Vc_vsan_disk_initialize[prod]")
        );
        assert_eq!(m.attr_str("vc_vsan", "prod:restore", "auto_claim"), Some("false"));
    }

    #[test]
    fn single_host_scope() {
        let request = VsanEviction {
            evict_host: Some("esx-2".into()),
            ..cluster_wide()
        };
        let m = build_vsan_eviction(&request, Ordering::Graph)
            .unwrap()
            .to_manifest()
            .unwrap();
        assert!(m.resources("esx_maintmode").unwrap().get("esx-1").is_none());
        assert_eq!(
            m.attr_str("vc_vsan_disk_initialize", "prod", "cleanup_hosts"),
            Some("esx-2")
        );
        assert_eq!(
            m.attr_str("vc_vsan_disk_initialize", "prod", "require"),
            Some("Esx_maintmode[esx-2]")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cluster_wide_teardown_retries_once_after_delay() {
        let engine = FlakyEngine::new(1);
        let started = tokio::time::Instant::now();
        evict_vsan(&engine, "vcenter-1", &cluster_wide(), &config())
            .await
            .unwrap();
        assert_eq!(engine.calls(), 2);
        assert!(started.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn second_failure_is_returned() {
        let engine = FlakyEngine::new(5);
        let err = evict_vsan(&engine, "vcenter-1", &cluster_wide(), &config())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Apply { .. }));
        assert_eq!(engine.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn single_host_teardown_is_not_retried() {
        let engine = FlakyEngine::new(1);
        let request = VsanEviction {
            evict_host: Some("esx-1".into()),
            ..cluster_wide()
        };
        assert!(evict_vsan(&engine, "vcenter-1", &request, &config()).await.is_err());
        assert_eq!(engine.calls(), 1);
    }
}

// ── Apply-engine and deployment-store seams ──
//
// The core never applies anything itself. It hands a manifest to an
// `ApplyEngine` and treats the outcome as binary. Generated files (MXL
// startup configurations) go through a `DeploymentStore`.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::CoreError;
use crate::resource::Manifest;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ApplyMode {
    /// Enforce the manifest on the device.
    #[default]
    Apply,
    /// Report what would change without changing it.
    Noop,
}

/// One manifest bound for one target device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplyRequest {
    pub target_id: String,
    pub manifest: Manifest,
    pub mode: ApplyMode,
    pub synchronous: bool,
    pub device_guid: Option<String>,
}

impl ApplyRequest {
    pub fn new(target_id: impl Into<String>, manifest: Manifest) -> Self {
        Self {
            target_id: target_id.into(),
            manifest,
            mode: ApplyMode::default(),
            synchronous: true,
            device_guid: None,
        }
    }

    pub fn mode(mut self, mode: ApplyMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn synchronous(mut self, synchronous: bool) -> Self {
        self.synchronous = synchronous;
        self
    }

    pub fn device_guid(mut self, guid: Option<String>) -> Self {
        self.device_guid = guid;
        self
    }
}

/// The external configuration-management runtime.
pub trait ApplyEngine: Sync {
    fn process_generic(
        &self,
        request: ApplyRequest,
    ) -> impl Future<Output = Result<(), CoreError>> + Send;
}

/// Where generated deployment files are persisted.
pub trait DeploymentStore {
    /// Store `contents` as `file_name`, returning the URI a device can
    /// fetch it from.
    fn save_file_to_deployment(&self, file_name: &str, contents: &str) -> Result<String, CoreError>;
}

// ── Filesystem store ────────────────────────────────────────────────

/// Files land under `<root>/<deployment_id>/`.
#[derive(Debug, Clone)]
pub struct FsDeploymentStore {
    root: PathBuf,
    deployment_id: String,
    tftp_server: Option<String>,
}

impl FsDeploymentStore {
    pub fn new(root: impl Into<PathBuf>, deployment_id: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            deployment_id: deployment_id.into(),
            tftp_server: None,
        }
    }

    /// Return `tftp://<server>/<deployment_id>/<file>` URIs instead of paths.
    pub fn with_tftp_server(mut self, server: Option<String>) -> Self {
        self.tftp_server = server.filter(|s| !s.trim().is_empty());
        self
    }

    pub fn deployment_dir(&self) -> PathBuf {
        self.root.join(&self.deployment_id)
    }
}

impl DeploymentStore for FsDeploymentStore {
    fn save_file_to_deployment(&self, file_name: &str, contents: &str) -> Result<String, CoreError> {
        let name = Path::new(file_name)
            .file_name()
            .ok_or_else(|| CoreError::Persistence {
                message: format!("invalid deployment file name '{file_name}'"),
            })?;
        let dir = self.deployment_dir();
        let persist = |e: std::io::Error| CoreError::Persistence {
            message: format!("{}: {e}", dir.display()),
        };
        std::fs::create_dir_all(&dir).map_err(persist)?;
        let path = dir.join(name);
        std::fs::write(&path, contents).map_err(persist)?;
        debug!(path = %path.display(), "saved deployment file");

        Ok(match &self.tftp_server {
            Some(server) => format!(
                "tftp://{server}/{}/{}",
                self.deployment_id,
                name.to_string_lossy()
            ),
            None => path.display().to_string(),
        })
    }
}

// ── Manifest directory engine ───────────────────────────────────────

/// Writes each manifest as `<dir>/<target>-<n>.json` instead of applying it.
#[derive(Debug)]
pub struct ManifestDirEngine {
    dir: PathBuf,
    counter: AtomicUsize,
}

impl ManifestDirEngine {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            counter: AtomicUsize::new(0),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ApplyEngine for ManifestDirEngine {
    async fn process_generic(&self, request: ApplyRequest) -> Result<(), CoreError> {
        let n = self.counter.fetch_add(1, AtomicOrdering::SeqCst) + 1;
        let safe_target: String = request
            .target_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
            .collect();
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("{safe_target}-{n}.json"));
        std::fs::write(&path, serde_json::to_string_pretty(&request)?)?;
        info!(
            target = %request.target_id,
            resources = request.manifest.len(),
            path = %path.display(),
            "wrote manifest"
        );
        Ok(())
    }
}

// ── Fan-out ─────────────────────────────────────────────────────────

/// Run one future per independent target and wait for all of them.
///
/// Results come back in input order.
pub async fn fan_out<T, F, Fut>(targets: impl IntoIterator<Item = T>, run: F) -> Vec<Fut::Output>
where
    F: FnMut(T) -> Fut,
    Fut: Future,
{
    futures::future::join_all(targets.into_iter().map(run)).await
}

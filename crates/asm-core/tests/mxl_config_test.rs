#![allow(clippy::unwrap_used)]
// Golden-file tests for MXL startup configuration rewrites.

use std::path::PathBuf;
use std::sync::Mutex;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use pretty_assertions::assert_eq;
use serde_json::json;

use asm_core::{
    ApplyEngine, ApplyRequest, ConfigRewrite, CoreError, FsDeploymentStore, MxlSettings,
    PlannerConfig, SwitchCredential, SwitchFacts, SwitchProvider,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn fixture(name: &str) -> String {
    let path: PathBuf = [env!("CARGO_MANIFEST_DIR"), "tests", "fixtures", "mxl", name]
        .iter()
        .collect();
    std::fs::read_to_string(path).unwrap()
}

fn encoded(name: &str) -> String {
    STANDARD.encode(fixture(name))
}

fn admin() -> SwitchCredential {
    SwitchCredential {
        username: "admin".into(),
        password: "calvin".to_string().into(),
        privilege: Some(15),
    }
}

#[derive(Default)]
struct RecordingEngine {
    requests: Mutex<Vec<ApplyRequest>>,
}

impl ApplyEngine for RecordingEngine {
    async fn process_generic(&self, request: ApplyRequest) -> Result<(), CoreError> {
        self.requests.lock().unwrap().push(request);
        Ok(())
    }
}

// ── Rewrite tests ───────────────────────────────────────────────────

#[test]
fn test_static_management_rewrite_matches_golden() {
    let rewrite = ConfigRewrite {
        hostname: Some("mxl-a1".into()),
        management: Some("172.17.9.171/16".parse().unwrap()),
        credentials: vec![admin()],
        boot: vec!["boot system stack-unit 0 primary tftp://172.17.0.1/FTOS-XL-9.10.bin".into()],
    };

    let text = rewrite.rewrite_base64(&encoded("startup.cfg")).unwrap();
    assert_eq!(text, fixture("rewritten.cfg"));
}

#[test]
fn test_dhcp_stanza_is_dropped_without_static_address() {
    let rewrite = ConfigRewrite {
        hostname: Some("mxl-b2".into()),
        ..ConfigRewrite::default()
    };

    let text = rewrite.rewrite_base64(&encoded("dhcp.cfg")).unwrap();
    assert_eq!(text, fixture("dhcp-rewritten.cfg"));
}

#[test]
fn test_wrapped_base64_is_accepted() {
    let blob = encoded("dhcp.cfg");
    let wrapped: String = blob
        .as_bytes()
        .chunks(16)
        .map(|chunk| format!("{}\n", std::str::from_utf8(chunk).unwrap()))
        .collect();

    let rewrite = ConfigRewrite {
        hostname: Some("mxl-b2".into()),
        ..ConfigRewrite::default()
    };
    assert_eq!(rewrite.rewrite_base64(&wrapped).unwrap(), fixture("dhcp-rewritten.cfg"));
}

#[test]
fn test_config_without_end_is_rejected() {
    let blob = STANDARD.encode("hostname X\n");
    let result = ConfigRewrite::default().rewrite_base64(&blob);
    assert!(
        matches!(result, Err(CoreError::InvalidConfigFile { .. })),
        "expected InvalidConfigFile, got: {result:?}"
    );
}

// ── Provider flow ───────────────────────────────────────────────────

#[tokio::test]
async fn test_provider_persists_and_declares_rewritten_config() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsDeploymentStore::new(dir.path(), "deployment-7");
    let facts = SwitchFacts::from_value(json!({
        "model": "MXL-10/40GbE",
        "hostname": "mxl-a1",
        "device_guid": "guid-42"
    }))
    .unwrap();
    let mut provider = SwitchProvider::new("mxl-a1", facts, PlannerConfig::default()).unwrap();

    let settings = MxlSettings {
        config_file: Some(encoded("startup.cfg")),
        management: Some("172.17.9.171/16".parse().unwrap()),
        credentials: vec![admin()],
        boot: vec!["boot system stack-unit 0 primary tftp://172.17.0.1/FTOS-XL-9.10.bin".into()],
        ..MxlSettings::default()
    };
    provider.configure_force10_settings(&settings, &store).unwrap();

    let saved_path = dir.path().join("deployment-7").join("mxl-a1.cfg");
    assert_eq!(std::fs::read_to_string(&saved_path).unwrap(), fixture("rewritten.cfg"));

    let engine = RecordingEngine::default();
    assert!(provider.apply_declared(&engine).await.unwrap());

    let requests = engine.requests.into_inner().unwrap();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.target_id, "mxl-a1");
    assert_eq!(request.device_guid.as_deref(), Some("guid-42"));
    assert_eq!(
        request.manifest.attr_str("mxl_config", "apply_config", "url"),
        Some(saved_path.display().to_string().as_str())
    );
}

#[test]
fn test_tftp_store_returns_tftp_uri() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsDeploymentStore::new(dir.path(), "deployment-7")
        .with_tftp_server(Some("172.17.0.1".into()));
    let facts = SwitchFacts::from_value(json!({"model": "MXL-10/40GbE"})).unwrap();
    let mut provider = SwitchProvider::new("mxl-a1", facts, PlannerConfig::default()).unwrap();

    let settings = MxlSettings {
        config_file: Some(encoded("dhcp.cfg")),
        hostname: Some("mxl-b2".into()),
        ..MxlSettings::default()
    };
    provider.configure_force10_settings(&settings, &store).unwrap();

    let manifest = provider.take_declared().unwrap().unwrap();
    assert_eq!(
        manifest.attr_str("mxl_config", "apply_config", "url"),
        Some("tftp://172.17.0.1/deployment-7/mxl-a1.cfg")
    );
    assert!(provider.take_declared().unwrap().is_none());
}

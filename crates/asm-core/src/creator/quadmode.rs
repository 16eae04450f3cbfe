// ── Quad-port mode ──

use tracing::{info, warn};

use super::CreatorCore;
use crate::error::CoreError;
use crate::model::{is_forty_gig, normalize_interface};
use crate::resource::AttrsBuilder;

/// Declare one quad-mode resource per eligible interface.
///
/// Enabling only applies to 40G (`fo`) interfaces; others are skipped
/// with a warning. Disabling applies to every interface given. Only the
/// last resource asks for a reboot. Returns the number declared.
pub(crate) fn declare_quadmode(
    core: &mut CreatorCore,
    resource_type: &str,
    interfaces: &[String],
    enable: bool,
) -> Result<usize, CoreError> {
    let eligible: Vec<String> = interfaces
        .iter()
        .filter(|name| {
            let keep = !enable || is_forty_gig(name);
            if !keep {
                warn!(interface = %name, "skipping non-40G interface for quad mode");
            }
            keep
        })
        .map(|name| normalize_interface(name))
        .collect();

    let last = eligible.len().saturating_sub(1);
    for (index, interface) in eligible.iter().enumerate() {
        let attrs = AttrsBuilder::new()
            .with("ensure", if enable { "present" } else { "absent" })
            .with("reboot_required", index == last)
            .build();
        core.resources.declare(resource_type, interface, attrs)?;
    }
    info!(count = eligible.len(), enable, "declared quad-port mode changes");
    Ok(eligible.len())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::SwitchFamily;
    use crate::resource::Ordering;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn enabling_only_touches_forty_gig_ports() {
        let mut core = CreatorCore::new(SwitchFamily::Force10Rack, Ordering::Chain);
        let count =
            declare_quadmode(&mut core, "force10_quadmode", &names(&["Fo 0/1", "Te 0/1"]), true)
                .unwrap();
        assert_eq!(count, 1);
        assert!(core.resources().contains("force10_quadmode", "Fo 0/1"));
        assert!(!core.resources().contains("force10_quadmode", "Te 0/1"));
    }

    #[test]
    fn disabling_touches_every_port() {
        let mut core = CreatorCore::new(SwitchFamily::Force10Rack, Ordering::Chain);
        let count =
            declare_quadmode(&mut core, "force10_quadmode", &names(&["Fo 0/1", "Te 0/1"]), false)
                .unwrap();
        assert_eq!(count, 2);
        assert!(core.resources().contains("force10_quadmode", "Te 0/1"));
    }

    #[test]
    fn only_the_last_port_requires_reboot() {
        let mut core = CreatorCore::new(SwitchFamily::Force10BladeMxl, Ordering::Chain);
        declare_quadmode(
            &mut core,
            "mxl_quadmode",
            &names(&["Fo 0/33", "Fo 0/37", "Fo 0/41"]),
            true,
        )
        .unwrap();
        let manifest = core.resources().to_manifest().unwrap();
        let reboot = |id: &str| manifest.attr_str("mxl_quadmode", id, "reboot_required").unwrap();
        assert_eq!(reboot("Fo 0/33"), "false");
        assert_eq!(reboot("Fo 0/37"), "false");
        assert_eq!(reboot("Fo 0/41"), "true");
    }
}

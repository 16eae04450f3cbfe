// ── VLT backup-link selection ──

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::facts::ChassisIom;

/// Peer chosen as the VLT backup-link destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VltBackupLink {
    /// `"1"` when the peer sits at slot + 1, `"0"` when at slot - 1.
    pub unit_id: String,
    pub destination_ip: String,
}

/// Pick the adjacent same-model IOM with a management IP.
///
/// `siblings` must already be filtered to the switch's model. The slot
/// above is preferred over the slot below.
pub fn backup_link_ip_for_vlt(
    slot: u32,
    siblings: &[ChassisIom],
) -> Result<VltBackupLink, CoreError> {
    let mut sorted: Vec<&ChassisIom> = siblings.iter().collect();
    sorted.sort_by_key(|iom| iom.slot);

    let at = |wanted: u32| {
        sorted
            .iter()
            .find(|iom| iom.slot == wanted)
            .and_then(|iom| iom.reachable_ip())
    };

    if let Some(ip) = slot.checked_add(1).and_then(at) {
        return Ok(VltBackupLink {
            unit_id: "1".into(),
            destination_ip: ip.to_owned(),
        });
    }
    if let Some(ip) = slot.checked_sub(1).and_then(at) {
        return Ok(VltBackupLink {
            unit_id: "0".into(),
            destination_ip: ip.to_owned(),
        });
    }
    Err(CoreError::NoVltPeer { slot })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn iom(slot: u32, ip: Option<&str>) -> ChassisIom {
        ChassisIom {
            slot,
            model: "I/O-Aggregator".into(),
            management_ip: ip.map(Into::into),
        }
    }

    #[test]
    fn lower_neighbour_yields_unit_zero() {
        let siblings = [iom(1, Some("172.17.4.11")), iom(2, Some("172.17.4.12")), iom(3, None)];
        let link = backup_link_ip_for_vlt(2, &siblings).unwrap();
        assert_eq!(link.unit_id, "0");
        assert_eq!(link.destination_ip, "172.17.4.11");
    }

    #[test]
    fn upper_neighbour_is_preferred() {
        let siblings = [iom(1, Some("172.17.4.11")), iom(3, Some("172.17.4.13"))];
        let link = backup_link_ip_for_vlt(2, &siblings).unwrap();
        assert_eq!(link.unit_id, "1");
        assert_eq!(link.destination_ip, "172.17.4.13");
    }

    #[test]
    fn blank_ips_do_not_count() {
        let siblings = [iom(1, Some("  ")), iom(3, None), iom(4, Some("172.17.4.14"))];
        let err = backup_link_ip_for_vlt(2, &siblings).unwrap_err();
        assert!(matches!(err, CoreError::NoVltPeer { slot: 2 }));
    }

    #[test]
    fn slot_zero_does_not_underflow() {
        let err = backup_link_ip_for_vlt(0, &[]).unwrap_err();
        assert!(matches!(err, CoreError::NoVltPeer { slot: 0 }));
    }
}

// ── Domain model ──
//
// Plain data the builders consume: interface names, VLAN requests,
// switch families and uplink/network definitions.

pub mod family;
pub mod interface;
pub mod network;
pub mod request;

pub use family::{SwitchFamily, Vocabulary, is_aggregator, is_pe_fn};
pub use interface::{InterfaceKind, InterfaceName, is_forty_gig, normalize_interface};
pub use network::{NetworkCatalog, NetworkInfo, NetworkType, Uplink};
pub use request::{Action, DEFAULT_MTU, DEFAULT_VLAN, InterfaceRequest, PortNetwork};

// ── Switch interface names ──
//
// Dell OS9 switches accept both the long (`TenGigabitEthernet 0/1`) and
// short (`Te 0/1`) spellings. Everything is normalised to the short
// form so membership comparisons between facts and requests work.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static INTERFACE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(gigabitethernet|gi|tengigabitethernet|te|fortygige|fo|fibrechannel|fc)\s*((?:\d+/)*\d+)/(\d+)\s*$",
    )
    .expect("interface name regex is valid")
});

/// Physical interface speed class, keyed by the naming prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InterfaceKind {
    GigabitEthernet,
    TenGigabitEthernet,
    FortyGigE,
    FibreChannel,
}

impl InterfaceKind {
    fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix.to_ascii_lowercase().as_str() {
            "gi" | "gigabitethernet" => Some(Self::GigabitEthernet),
            "te" | "tengigabitethernet" => Some(Self::TenGigabitEthernet),
            "fo" | "fortygige" => Some(Self::FortyGigE),
            "fc" | "fibrechannel" => Some(Self::FibreChannel),
            _ => None,
        }
    }

    pub fn short(self) -> &'static str {
        match self {
            Self::GigabitEthernet => "Gi",
            Self::TenGigabitEthernet => "Te",
            Self::FortyGigE => "Fo",
            Self::FibreChannel => "Fc",
        }
    }
}

/// A parsed physical interface name: `<kind> <unit>/<port>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InterfaceName {
    kind: InterfaceKind,
    unit: String,
    port: u32,
}

impl InterfaceName {
    pub fn parse(raw: &str) -> Option<Self> {
        let caps = INTERFACE_RE.captures(raw)?;
        let kind = InterfaceKind::from_prefix(caps.get(1)?.as_str())?;
        let unit = caps.get(2)?.as_str().to_owned();
        let port = caps.get(3)?.as_str().parse().ok()?;
        Some(Self { kind, unit, port })
    }

    pub fn kind(&self) -> InterfaceKind {
        self.kind
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn port(&self) -> u32 {
        self.port
    }

    #[must_use]
    pub fn with_kind(&self, kind: InterfaceKind) -> Self {
        Self {
            kind,
            unit: self.unit.clone(),
            port: self.port,
        }
    }

    /// First port of the 40G group this port belongs to.
    ///
    /// Ports `N..N+3` form one group when `N ≡ 1 (mod 4)`.
    pub fn quad_group_start(&self) -> u32 {
        if self.port == 0 {
            return 0;
        }
        self.port - ((self.port - 1) % 4)
    }

    /// The four 10G member names of this port's quad group.
    pub fn quad_group(&self) -> Vec<Self> {
        let kind = match self.kind {
            InterfaceKind::FortyGigE => InterfaceKind::TenGigabitEthernet,
            other => other,
        };
        let start = self.quad_group_start();
        (start..start + 4)
            .map(|port| Self {
                kind,
                unit: self.unit.clone(),
                port,
            })
            .collect()
    }
}

impl fmt::Display for InterfaceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.kind.short(), self.unit, self.port)
    }
}

/// Normalise an interface name to its short form, or trim it when it
/// does not follow the `<kind> <unit>/<port>` convention.
pub fn normalize_interface(raw: &str) -> String {
    InterfaceName::parse(raw).map_or_else(|| raw.trim().to_owned(), |name| name.to_string())
}

/// Whether an interface name follows the 40-gigabit (`fo`-prefixed) naming.
pub fn is_forty_gig(raw: &str) -> bool {
    raw.trim_start().to_ascii_lowercase().starts_with("fo")
}

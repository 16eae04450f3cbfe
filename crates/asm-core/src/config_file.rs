// ── MXL startup configuration rewrite ──
//
// A pre-built OS9 configuration is patched for one switch before it is
// pushed as the startup configuration. The text is held as an ordered
// list of lines; each concern (hostname, management interface,
// credentials, boot) is a find-or-insert operation. Insertions always
// land immediately before the final `end` line, in call order.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CoreError;

const MANAGEMENT_INTERFACE: &str = "interface ManagementEthernet";
const DEFAULT_MANAGEMENT_PORT: &str = "0/0";

/// Desired static management address, e.g. `172.17.9.171/16`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ManagementAddress {
    pub ip: IpAddr,
    pub prefix_len: u8,
}

impl fmt::Display for ManagementAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.ip, self.prefix_len)
    }
}

impl FromStr for ManagementAddress {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::InvalidConfigFile {
            reason: format!("invalid management address '{s}', expected IP/CIDR"),
        };
        let (ip, prefix) = s.trim().split_once('/').ok_or_else(invalid)?;
        let ip: IpAddr = ip.parse().map_err(|_| invalid())?;
        let prefix_len: u8 = prefix.parse().map_err(|_| invalid())?;
        let max = if ip.is_ipv4() { 32 } else { 128 };
        if prefix_len > max {
            return Err(invalid());
        }
        Ok(Self { ip, prefix_len })
    }
}

impl TryFrom<String> for ManagementAddress {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ManagementAddress> for String {
    fn from(value: ManagementAddress) -> Self {
        value.to_string()
    }
}

/// One local user account written into the configuration.
#[derive(Debug, Clone)]
pub struct SwitchCredential {
    pub username: String,
    pub password: SecretString,
    pub privilege: Option<u8>,
}

impl SwitchCredential {
    fn config_line(&self) -> String {
        let mut line = format!(
            "username {} password 0 {}",
            self.username,
            self.password.expose_secret()
        );
        if let Some(privilege) = self.privilege {
            line.push_str(&format!(" privilege {privilege}"));
        }
        line
    }
}

/// What happened to the management interface stanza.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagementRewrite {
    Replaced,
    StrippedDhcp,
    Inserted,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchConfigFile {
    lines: Vec<String>,
    trailing_newline: bool,
}

impl SwitchConfigFile {
    /// Parse configuration text. The text must contain an `end` line.
    pub fn parse(text: &str) -> Result<Self, CoreError> {
        let normalized = text.replace("\r\n", "\n");
        let trailing_newline = normalized.ends_with('\n');
        let lines: Vec<String> = normalized.lines().map(str::to_owned).collect();
        if !lines.iter().any(|line| line.trim() == "end") {
            return Err(CoreError::InvalidConfigFile {
                reason: "no 'end' marker".into(),
            });
        }
        Ok(Self {
            lines,
            trailing_newline,
        })
    }

    pub fn from_base64(blob: &str) -> Result<Self, CoreError> {
        let compact: String = blob.split_whitespace().collect();
        let bytes = STANDARD
            .decode(compact)
            .map_err(|e| CoreError::InvalidConfigFile {
                reason: format!("base64 decode failed: {e}"),
            })?;
        let text = String::from_utf8(bytes).map_err(|e| CoreError::InvalidConfigFile {
            reason: format!("configuration is not UTF-8: {e}"),
        })?;
        Self::parse(&text)
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn render(&self) -> String {
        let mut out = self.lines.join("\n");
        if self.trailing_newline {
            out.push('\n');
        }
        out
    }

    fn end_index(&self) -> usize {
        self.lines
            .iter()
            .rposition(|line| line.trim() == "end")
            .unwrap_or(self.lines.len())
    }

    fn insert_before_end(&mut self, new_lines: impl IntoIterator<Item = String>) {
        let at = self.end_index();
        self.lines.splice(at..at, new_lines);
    }

    fn strip_prefixed(&mut self, keyword: &str) -> usize {
        let before = self.lines.len();
        self.lines.retain(|line| !starts_with_keyword(line, keyword));
        before - self.lines.len()
    }

    /// Leave exactly one `hostname` line, inserting it when missing.
    pub fn replace_hostname(&mut self, hostname: &str) {
        let desired = format!("hostname {hostname}");
        match self
            .lines
            .iter()
            .position(|line| starts_with_keyword(line, "hostname"))
        {
            Some(first) => {
                self.lines[first] = desired;
                let mut index = 0;
                self.lines.retain(|line| {
                    let keep = index == first || !starts_with_keyword(line, "hostname");
                    index += 1;
                    keep
                });
            }
            None => self.insert_before_end([desired]),
        }
    }

    /// Rewrite the ManagementEthernet stanza for `desired`.
    ///
    /// A static stanza gets its address replaced, a DHCP stanza is removed
    /// together with its closing `!`, and a missing stanza is inserted.
    pub fn replace_management_interface(
        &mut self,
        desired: Option<&ManagementAddress>,
    ) -> ManagementRewrite {
        let Some(start) = self
            .lines
            .iter()
            .position(|line| line.trim_start().starts_with(MANAGEMENT_INTERFACE))
        else {
            return match desired {
                Some(address) => {
                    self.insert_before_end([
                        format!("{MANAGEMENT_INTERFACE} {DEFAULT_MANAGEMENT_PORT}"),
                        format!(" ip address {address}"),
                        " no shutdown".to_owned(),
                        "!".to_owned(),
                    ]);
                    ManagementRewrite::Inserted
                }
                None => ManagementRewrite::Unchanged,
            };
        };

        let body_end = self.lines[start + 1..]
            .iter()
            .position(|line| is_stanza_boundary(line))
            .map_or(self.lines.len(), |offset| start + 1 + offset);
        let address_line = (start + 1..body_end)
            .find(|&i| self.lines[i].trim_start().starts_with("ip address"));

        if let Some(i) = address_line {
            if self.lines[i].trim() == "ip address dhcp" {
                let remove_to = if self.lines.get(body_end).is_some_and(|l| l.trim() == "!") {
                    body_end + 1
                } else {
                    body_end
                };
                self.lines.drain(start..remove_to);
                return ManagementRewrite::StrippedDhcp;
            }
        }

        let Some(address) = desired else {
            return ManagementRewrite::Unchanged;
        };
        let line = format!(" ip address {address}");
        match address_line {
            Some(i) => self.lines[i] = line,
            None => self.lines.insert(start + 1, line),
        }
        ManagementRewrite::Replaced
    }

    /// Replace every `username` line with `credentials`.
    pub fn replace_credentials(&mut self, credentials: &[SwitchCredential]) {
        let stripped = self.strip_prefixed("username");
        debug!(stripped, inserted = credentials.len(), "rewrote credential lines");
        self.insert_before_end(credentials.iter().map(SwitchCredential::config_line));
    }

    /// Replace every `boot` line with `boot_lines`.
    pub fn replace_boot(&mut self, boot_lines: &[String]) {
        self.strip_prefixed("boot");
        self.insert_before_end(boot_lines.iter().map(|line| line.trim().to_owned()));
    }
}

fn starts_with_keyword(line: &str, keyword: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed
        .strip_prefix(keyword)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
}

fn is_stanza_boundary(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed == "!" || trimmed == "end" || !line.starts_with(char::is_whitespace)
}

/// Everything one switch needs patched into a configuration blob.
#[derive(Debug, Clone, Default)]
pub struct ConfigRewrite {
    pub hostname: Option<String>,
    pub management: Option<ManagementAddress>,
    pub credentials: Vec<SwitchCredential>,
    pub boot: Vec<String>,
}

impl ConfigRewrite {
    /// Apply hostname, management, credential and boot rewrites, in that order.
    pub fn apply(&self, config: &mut SwitchConfigFile) -> ManagementRewrite {
        if let Some(hostname) = &self.hostname {
            config.replace_hostname(hostname);
        }
        let management = config.replace_management_interface(self.management.as_ref());
        config.replace_credentials(&self.credentials);
        config.replace_boot(&self.boot);
        management
    }

    /// Decode a base64 blob, rewrite it and return the final text.
    pub fn rewrite_base64(&self, blob: &str) -> Result<String, CoreError> {
        let mut config = SwitchConfigFile::from_base64(blob)?;
        let management = self.apply(&mut config);
        debug!(?management, "rewrote switch configuration file");
        Ok(config.render())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config(text: &str) -> SwitchConfigFile {
        SwitchConfigFile::parse(text).unwrap()
    }

    fn count(cfg: &SwitchConfigFile, wanted: &str) -> usize {
        cfg.lines().iter().filter(|l| l.trim() == wanted).count()
    }

    #[test]
    fn hostname_is_replaced_exactly_once() {
        let mut cfg = config("hostname X\n!\nhostname X\nend\n");
        cfg.replace_hostname("Y");
        assert_eq!(count(&cfg, "hostname Y"), 1);
        assert_eq!(count(&cfg, "hostname X"), 0);
    }

    #[test]
    fn missing_hostname_is_inserted_before_end() {
        let mut cfg = config("!\ninterface Te 0/1\n no shutdown\n!\nend\n");
        cfg.replace_hostname("mxl-a1");
        let lines = cfg.lines();
        assert_eq!(count(&cfg, "hostname mxl-a1"), 1);
        assert_eq!(lines[lines.len() - 2], "hostname mxl-a1");
        assert_eq!(lines[lines.len() - 1], "end");
    }

    #[test]
    fn hostname_prefix_does_not_match_other_keywords() {
        let mut cfg = config("hostnames-are-not-this\nend");
        cfg.replace_hostname("a");
        assert_eq!(count(&cfg, "hostnames-are-not-this"), 1);
    }

    #[test]
    fn static_management_address_is_rewritten() {
        let mut cfg = config(
            "interface ManagementEthernet 0/0\n ip address 172.17.9.171/16\n no shutdown\n!\nend\n",
        );
        let outcome = cfg.replace_management_interface(Some(&"10.1.1.5/24".parse().unwrap()));
        assert_eq!(outcome, ManagementRewrite::Replaced);
        assert_eq!(count(&cfg, "ip address 10.1.1.5/24"), 1);
        assert_eq!(count(&cfg, "ip address 172.17.9.171/16"), 0);
    }

    #[test]
    fn dhcp_management_stanza_is_stripped() {
        let mut cfg = config(
            "hostname a\n!\ninterface ManagementEthernet 0/0\n ip address dhcp\n no shutdown\n!\nend\n",
        );
        let outcome = cfg.replace_management_interface(Some(&"10.1.1.5/24".parse().unwrap()));
        assert_eq!(outcome, ManagementRewrite::StrippedDhcp);
        assert_eq!(cfg.render(), "hostname a\n!\nend\n");
    }

    #[test]
    fn missing_management_stanza_is_inserted() {
        let mut cfg = config("hostname a\n!\nend");
        let outcome = cfg.replace_management_interface(Some(&"10.1.1.5/24".parse().unwrap()));
        assert_eq!(outcome, ManagementRewrite::Inserted);
        assert_eq!(
            cfg.render(),
            "hostname a\n!\ninterface ManagementEthernet 0/0\n ip address 10.1.1.5/24\n no shutdown\n!\nend"
        );
    }

    #[test]
    fn management_separator_elsewhere_is_left_alone() {
        let mut cfg = config(
            "interface ManagementEthernet 0/0\n ip address 1.2.3.4/8\n!\ninterface Te 0/1\n ip address 5.6.7.8/8\n!\nend\n",
        );
        cfg.replace_management_interface(Some(&"9.9.9.9/8".parse().unwrap()));
        assert_eq!(count(&cfg, "ip address 5.6.7.8/8"), 1);
        assert_eq!(count(&cfg, "ip address 9.9.9.9/8"), 1);
    }

    #[test]
    fn credentials_and_boot_lines_are_replaced() {
        let mut cfg = config("username old password 7 abc privilege 15\nboot system stack-unit 0 primary system: A:\n!\nend\n");
        cfg.replace_credentials(&[SwitchCredential {
            username: "admin".into(),
            password: SecretString::from("s3cret".to_owned()),
            privilege: Some(15),
        }]);
        cfg.replace_boot(&["boot system stack-unit 0 primary tftp://10.0.0.1/FTOS-XL.bin".into()]);
        assert_eq!(
            cfg.render(),
            "!\nusername admin password 0 s3cret privilege 15\nboot system stack-unit 0 primary tftp://10.0.0.1/FTOS-XL.bin\nend\n"
        );
    }

    #[test]
    fn config_without_end_is_rejected() {
        let err = SwitchConfigFile::parse("hostname a\n").unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfigFile { .. }));
    }

    #[test]
    fn bad_base64_is_rejected() {
        let err = SwitchConfigFile::from_base64("***").unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfigFile { .. }));
    }

    #[test]
    fn management_address_parses_cidr() {
        let addr: ManagementAddress = "172.17.9.171/16".parse().unwrap();
        assert_eq!(addr.prefix_len, 16);
        assert!("172.17.9.171".parse::<ManagementAddress>().is_err());
        assert!("172.17.9.171/33".parse::<ManagementAddress>().is_err());
    }
}

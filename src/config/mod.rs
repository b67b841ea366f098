//! Configuration loading and validation.
//!
//! Loads the daemon configuration from a TOML file. The path comes from the
//! `--config` flag, then `$WOLPVE_CONFIG_PATH`, then [`DEFAULT_CONFIG_PATH`].
//!
//! Filter values end up inside a BPF expression, so [`Config::validate`]
//! restricts them to characters that can appear in MAC and IP literals.

use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

/// Config file used when neither the flag nor the env var is set.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/wolpve/config.toml";

/// Environment variable overriding the config file path.
pub const CONFIG_PATH_ENV: &str = "WOLPVE_CONFIG_PATH";

// ── Top-level config ────────────────────────────────────────────

/// Top-level daemon configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// One capture session is started per entry.
    #[serde(default)]
    pub listen: Vec<ListenSpec>,

    /// Descriptor roots searched for MAC addresses, in order.
    #[serde(default)]
    pub descriptor_dirs: Vec<PathBuf>,

    /// Remote syslog destination.
    #[serde(default)]
    pub syslog: SyslogConfig,
}

impl Config {
    /// Parse a TOML string into config without validating it.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed.
    pub fn from_toml(toml_str: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(toml_str).context("failed to parse config TOML")?;
        Ok(config)
    }

    /// Validate that the configuration can drive the server.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first offending setting.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            !self.listen.is_empty(),
            "at least one [[listen]] interface is required"
        );
        for spec in &self.listen {
            spec.validate()
                .with_context(|| format!("invalid [[listen]] entry for '{}'", spec.interface))?;
        }

        anyhow::ensure!(
            !self.descriptor_dirs.is_empty(),
            "descriptor_dirs must list at least one directory"
        );

        if self.syslog.enabled {
            self.syslog.socket_addr()?;
        }
        Ok(())
    }
}

// ── Listen config ───────────────────────────────────────────────

/// Capture parameters for one interface.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ListenSpec {
    /// Interface to capture on (e.g. `vmbr0`).
    pub interface: String,

    /// Put the interface into promiscuous mode.
    #[serde(default)]
    pub promiscuous: bool,

    /// Accepted source MAC addresses.
    pub src_macs: Vec<String>,

    /// Accepted source IP addresses.
    pub src_ips: Vec<String>,

    /// Accepted destination IP addresses.
    pub dst_ips: Vec<String>,

    /// Accepted destination MAC addresses.
    pub dst_macs: Vec<String>,

    /// UDP destination port, usually 7 or 9.
    #[serde(default = "default_dst_port")]
    pub dst_port: u16,
}

impl ListenSpec {
    /// Validate interface name, filter lists, and port.
    ///
    /// # Errors
    ///
    /// Returns an error naming the offending field.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            !self.interface.is_empty()
                && self
                    .interface
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '@')),
            "interface name must be non-empty and contain no spaces or shell characters"
        );
        anyhow::ensure!(self.dst_port > 0, "dst_port must be > 0");

        for (field, values) in [
            ("src_macs", &self.src_macs),
            ("src_ips", &self.src_ips),
            ("dst_ips", &self.dst_ips),
            ("dst_macs", &self.dst_macs),
        ] {
            anyhow::ensure!(!values.is_empty(), "{field} must list at least one value");
            for value in values {
                anyhow::ensure!(
                    is_filter_literal(value),
                    "{field} value '{value}' is not a valid address literal"
                );
            }
        }
        Ok(())
    }
}

/// Address literal safe to splice into a BPF expression.
fn is_filter_literal(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, ':' | '.' | '-'))
}

fn default_dst_port() -> u16 {
    9
}

// ── Syslog config ───────────────────────────────────────────────

/// Remote syslog destination.
#[derive(Debug, Clone, Deserialize)]
pub struct SyslogConfig {
    /// Send log lines to the remote collector instead of the console.
    #[serde(default)]
    pub enabled: bool,

    /// Collector host name or IP (IPv6 without brackets).
    #[serde(default = "default_syslog_address")]
    pub address: String,

    /// Collector UDP port.
    #[serde(default = "default_syslog_port")]
    pub port: u16,
}

impl Default for SyslogConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            address: default_syslog_address(),
            port: default_syslog_port(),
        }
    }
}

impl SyslogConfig {
    /// Resolve the collector address.
    ///
    /// # Errors
    ///
    /// Returns an error if the host cannot be resolved.
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        (self.address.as_str(), self.port)
            .to_socket_addrs()
            .with_context(|| format!("failed to resolve syslog address {}", self.address))?
            .next()
            .ok_or_else(|| anyhow::anyhow!("syslog address {} resolved to nothing", self.address))
    }
}

fn default_syslog_address() -> String {
    "127.0.0.1".to_owned()
}

fn default_syslog_port() -> u16 {
    514
}

// ── Loading ─────────────────────────────────────────────────────

/// Resolve the config file path: explicit flag > env var > default.
///
/// Takes a resolver function for testability (avoids `set_var` in tests).
pub fn resolve_config_path(
    explicit: Option<PathBuf>,
    env: impl Fn(&str) -> Option<String>,
) -> PathBuf {
    explicit
        .or_else(|| env(CONFIG_PATH_ENV).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Load and validate configuration from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed, or fails validation.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config at {}", path.display()))?;
    let config = Config::from_toml(&contents)
        .with_context(|| format!("failed to parse config at {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

// ── Tests ───────────────────────────────────────────────────────

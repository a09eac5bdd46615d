// src/config/models.rs
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub forward: ForwardConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        self.discovery.validate()?;
        self.forward.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the gateway itself listens on.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Host all candidate backends live on.
    #[serde(default = "default_host")]
    pub host: String,
    /// First port of the candidate range.
    #[serde(default = "default_base_port")]
    pub base_port: u16,
    /// Width of the candidate range, and the probe concurrency bound.
    #[serde(default = "default_max_servers")]
    pub max_servers: u16,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// How long an unconfirmed descriptor is retained before eviction.
    /// Must be at least twice the interval so one missed probe is tolerated.
    #[serde(default = "default_grace_period_secs")]
    pub grace_period_secs: u64,
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
}

impl DiscoveryConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn grace_period(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.grace_period_secs as i64)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    /// Candidate ports scanned each cycle: base_port .. base_port + max_servers.
    pub fn candidate_ports(&self) -> impl Iterator<Item = u16> + '_ {
        (0..self.max_servers).map(|offset| self.base_port + offset)
    }

    fn validate(&self) -> Result<()> {
        if self.max_servers == 0 {
            bail!("discovery.max_servers must be at least 1");
        }
        if self.interval_secs == 0 {
            bail!("discovery.interval_secs must be at least 1");
        }
        if self.grace_period_secs < 2 * self.interval_secs {
            bail!(
                "discovery.grace_period_secs ({}) must be at least twice interval_secs ({})",
                self.grace_period_secs,
                self.interval_secs
            );
        }
        if u32::from(self.base_port) + u32::from(self.max_servers) > u32::from(u16::MAX) {
            bail!("discovery port range overflows u16");
        }
        Ok(())
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            base_port: default_base_port(),
            max_servers: default_max_servers(),
            interval_secs: default_interval_secs(),
            grace_period_secs: default_grace_period_secs(),
            probe_timeout_secs: default_probe_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwardConfig {
    /// Analysis operations can be slow, so this is much longer than a probe.
    #[serde(default = "default_forward_timeout_secs")]
    pub timeout_secs: u64,
    /// Extra attempts after the first, connection failures only.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,
}

impl ForwardConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_millis(self.backoff_max_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            bail!("forward.timeout_secs must be at least 1");
        }
        Ok(())
    }
}

impl Default for ForwardConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_forward_timeout_secs(),
            max_retries: default_max_retries(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_ms: default_backoff_max_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_metrics_path(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    "0.0.0.0:8010".parse().expect("valid default listen addr")
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_base_port() -> u16 {
    9009
}

fn default_max_servers() -> u16 {
    10
}

fn default_interval_secs() -> u64 {
    30
}

fn default_grace_period_secs() -> u64 {
    60
}

fn default_probe_timeout_secs() -> u64 {
    2
}

fn default_forward_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    1
}

fn default_backoff_base_ms() -> u64 {
    200
}

fn default_backoff_max_ms() -> u64 {
    2000
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

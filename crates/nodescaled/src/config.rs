//! nodescale.toml configuration parser.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, bail};
use nodescale_autoscale::ScalingConfig;
use nodescale_cluster::ProtectionRule;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub scaling: ScalingSection,
    pub protection: ProtectionSection,
    pub daemon: LoopSection,
    pub pool: PoolSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScalingSection {
    /// Millicpu per block of demand.
    pub block_size: u64,
    /// Spare blocks to keep free.
    pub target_buffer: i64,
    /// How long a cordoned node waits before deletion (e.g. "10m").
    pub grace_period: String,
}

impl Default for ScalingSection {
    fn default() -> Self {
        Self {
            block_size: 100,
            target_buffer: 5,
            grace_period: "10m".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtectionSection {
    pub label: String,
    pub value: String,
}

impl Default for ProtectionSection {
    fn default() -> Self {
        let rule = ProtectionRule::default();
        Self {
            label: rule.label,
            value: rule.value,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopSection {
    /// Time between ticks (e.g. "30s").
    pub interval: String,
}

impl Default for LoopSection {
    fn default() -> Self {
        Self {
            interval: "30s".to_string(),
        }
    }
}

/// Shape of nodes the simulated pool provisions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolSection {
    pub node_capacity: u64,
    pub name_prefix: String,
}

impl Default for PoolSection {
    fn default() -> Self {
        Self {
            node_capacity: 1000,
            name_prefix: "node".to_string(),
        }
    }
}

impl DaemonConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: DaemonConfig = toml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    /// Load `path` if given, otherwise fall back to defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::default()),
        }
    }

    pub fn scaling_config(&self) -> anyhow::Result<ScalingConfig> {
        let grace_period = parse_duration(&self.scaling.grace_period)
            .context("scaling.grace_period")?;
        let config = ScalingConfig::new(
            self.scaling.block_size,
            self.scaling.target_buffer,
            grace_period,
            ProtectionRule::new(&self.protection.label, &self.protection.value),
        )?;
        Ok(config)
    }

    pub fn interval(&self) -> anyhow::Result<Duration> {
        let interval = parse_duration(&self.daemon.interval).context("daemon.interval")?;
        if interval.is_zero() {
            bail!("daemon.interval must be positive");
        }
        Ok(interval)
    }
}

/// Parse a duration string like "30s", "10m", "1h" or bare seconds.
pub fn parse_duration(s: &str) -> anyhow::Result<Duration> {
    let s = s.trim();
    let (digits, unit) = match s.find(|c: char| !c.is_ascii_digit()) {
        Some(idx) => s.split_at(idx),
        None => (s, "s"),
    };
    let value: u64 = digits
        .parse()
        .with_context(|| format!("invalid duration {s:?}"))?;
    let secs = match unit {
        "s" => value,
        "m" => value.saturating_mul(60),
        "h" => value.saturating_mul(3600),
        other => bail!("unknown duration unit {other:?} in {s:?}"),
    };
    Ok(Duration::from_secs(secs))
}

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::module::cluster::{Endpoint, EndpointRing};

/// Which acquisition path to run. The two are alternative modes, never
/// concurrent in one process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    Cluster,
    Web,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Operator callsign used for cluster logins. The placeholder default
    /// works on feeds that accept arbitrary identities.
    #[serde(default = "default_callsign")]
    pub callsign: String,

    #[serde(default = "default_source")]
    pub source: SourceMode,

    /// Primary cluster as host:port.
    #[serde(default = "default_cluster")]
    pub cluster: String,

    /// Ordered backup clusters, tried after the primary.
    #[serde(default = "default_backup_clusters")]
    pub backup_clusters: Vec<String>,

    /// Band configuration CSV. Required at startup.
    #[serde(default = "default_band_config")]
    pub band_config: String,

    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Collection stops once the output directory exceeds this size.
    #[serde(default = "default_max_size_gb")]
    pub max_size_gb: f64,

    /// Collection stops after this much wall-clock time.
    #[serde(default = "default_max_runtime_hours")]
    pub max_runtime_hours: u64,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

pub const PLACEHOLDER_CALLSIGN: &str = "ANALYZER";

fn default_callsign() -> String {
    PLACEHOLDER_CALLSIGN.to_string()
}

fn default_source() -> SourceMode {
    SourceMode::Cluster
}

fn default_cluster() -> String {
    "cluster.dxwatch.com:8000".to_string()
}

fn default_backup_clusters() -> Vec<String> {
    vec![
        "dxc.w1nr.net:8000".to_string(),
        "dxc.ve7cc.net:23".to_string(),
        "dxspots.com:8000".to_string(),
        "cluster-eu-is.com:7300".to_string(),
        "arcluster.net:7373".to_string(),
    ]
}

fn default_band_config() -> String {
    "band_config.csv".to_string()
}

fn default_output_dir() -> String {
    "dx_data".to_string()
}

fn default_max_size_gb() -> f64 {
    500.0
}

fn default_max_runtime_hours() -> u64 {
    // Two weeks.
    14 * 24
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            callsign: default_callsign(),
            source: default_source(),
            cluster: default_cluster(),
            backup_clusters: default_backup_clusters(),
            band_config: default_band_config(),
            output_dir: default_output_dir(),
            max_size_gb: default_max_size_gb(),
            max_runtime_hours: default_max_runtime_hours(),
            log_level: default_log_level(),
        }
    }
}

impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {path}"))?;
        let config: AppConfig =
            toml::from_str(&content).with_context(|| format!("malformed config file {path}"))?;
        Ok(config)
    }

    /// Load the config file, falling back to defaults when it is absent.
    /// A present-but-malformed file is an error.
    pub fn load(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn endpoint_ring(&self) -> Result<EndpointRing> {
        let primary: Endpoint = self
            .cluster
            .parse()
            .with_context(|| format!("invalid cluster address '{}'", self.cluster))?;
        let backups: Vec<Endpoint> = self
            .backup_clusters
            .iter()
            .map(|s| {
                s.parse()
                    .with_context(|| format!("invalid backup cluster address '{s}'"))
            })
            .collect::<Result<_>>()?;
        Ok(EndpointRing::new(primary, backups))
    }

    pub fn max_runtime(&self) -> Duration {
        Duration::from_secs(self.max_runtime_hours * 3600)
    }

    pub fn max_output_bytes(&self) -> u64 {
        (self.max_size_gb * 1024.0 * 1024.0 * 1024.0) as u64
    }
}

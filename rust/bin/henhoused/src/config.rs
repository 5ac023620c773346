//! Server configuration, read from `/etc/henhouse/<name>.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use farm::service::FarmConfig;
use farm::worker::SweepConfig;

/// Directory searched when `-c` is given a bare context name.
pub const CONFIG_DIR: &str = "/etc/henhouse";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub storage: StorageConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub billing: BillingConfig,
    #[serde(default)]
    pub alerts: AlertsConfig,
    #[serde(default)]
    pub farm: FarmSettings,
    #[serde(default)]
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
    /// Overrides `{data_dir}/data.sqlite`.
    #[serde(default)]
    pub sqlite_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    /// Access token lifetime in seconds.
    #[serde(default = "default_expire_secs")]
    pub expire_secs: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingConfig {
    /// Enables `POST /billing/simulate-callback`. Never on in production.
    #[serde(default)]
    pub allow_simulation: bool,
    #[serde(default = "default_shortcode")]
    pub shortcode: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertsConfig {
    #[serde(default = "default_stale_after_hours")]
    pub stale_after_hours: i64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FarmSettings {
    #[serde(default = "default_starter_limit")]
    pub starter_active_flock_limit: usize,
    #[serde(default = "default_true")]
    pub generate_vaccination_schedule: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Browser origins allowed to call the API. Empty allows none.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

fn default_expire_secs() -> i64 {
    604800
}

fn default_shortcode() -> String {
    "174379".to_string()
}

fn default_stale_after_hours() -> i64 {
    24
}

fn default_sweep_interval_secs() -> u64 {
    3600
}

fn default_starter_limit() -> usize {
    2
}

fn default_true() -> bool {
    true
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            allow_simulation: false,
            shortcode: default_shortcode(),
        }
    }
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            stale_after_hours: default_stale_after_hours(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl Default for FarmSettings {
    fn default() -> Self {
        Self {
            starter_active_flock_limit: default_starter_limit(),
            generate_vaccination_schedule: true,
        }
    }
}

impl ServerConfig {
    /// Resolve `-c` to a file path. A value containing `/` or ending in
    /// `.toml` is a path; anything else names `/etc/henhouse/<name>.toml`.
    pub fn resolve_path(name_or_path: &str) -> PathBuf {
        if name_or_path.contains('/') || name_or_path.ends_with(".toml") {
            PathBuf::from(name_or_path)
        } else {
            PathBuf::from(CONFIG_DIR).join(format!("{}.toml", name_or_path))
        }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read {}: {}", path.display(), e))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Service settings for the farm module.
    pub fn farm_config(&self) -> FarmConfig {
        FarmConfig {
            jwt_secret: self.jwt.secret.clone(),
            token_ttl: self.jwt.expire_secs,
            starter_active_flock_limit: self.farm.starter_active_flock_limit,
            generate_vaccination_schedule: self.farm.generate_vaccination_schedule,
            allow_payment_simulation: self.billing.allow_simulation,
        }
    }

    pub fn sweep_config(&self) -> SweepConfig {
        SweepConfig {
            interval_secs: self.alerts.sweep_interval_secs,
            stale_after_hours: self.alerts.stale_after_hours,
        }
    }
}

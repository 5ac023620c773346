//! Bootstrap: first-start checks.

use crate::config::ServerConfig;

/// Verify server configuration is ready for use.
pub fn verify_config(config: &ServerConfig) -> anyhow::Result<()> {
    if config.jwt.secret.is_empty() {
        anyhow::bail!("JWT secret is empty in configuration.");
    }
    if config.jwt.expire_secs <= 0 {
        anyhow::bail!("JWT expire_secs must be positive.");
    }
    if config.storage.data_dir.is_empty() {
        anyhow::bail!("Storage data_dir is empty in configuration.");
    }
    if config.alerts.stale_after_hours <= 0 {
        anyhow::bail!("alerts.stale_after_hours must be positive.");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{JwtConfig, StorageConfig};

    fn config(secret: &str, data_dir: &str) -> ServerConfig {
        ServerConfig {
            storage: StorageConfig {
                data_dir: data_dir.to_string(),
                sqlite_path: None,
            },
            jwt: JwtConfig {
                secret: secret.to_string(),
                expire_secs: 3600,
            },
            billing: Default::default(),
            alerts: Default::default(),
            farm: Default::default(),
            cors: Default::default(),
        }
    }

    #[test]
    fn test_verify_config() {
        assert!(verify_config(&config("secret", "/tmp")).is_ok());
        assert!(verify_config(&config("", "/tmp")).is_err());
        assert!(verify_config(&config("secret", "")).is_err());
    }
}

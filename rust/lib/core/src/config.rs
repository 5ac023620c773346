use std::path::PathBuf;

/// Storage and listen settings resolved by the server binary before it
/// opens the database.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Root directory for on-disk state.
    pub data_dir: Option<PathBuf>,

    /// Explicit SQLite file. Defaults to `{data_dir}/data.sqlite`.
    pub sqlite_path: Option<PathBuf>,

    pub listen: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            sqlite_path: None,
            listen: "0.0.0.0:8080".to_string(),
        }
    }
}

impl ServiceConfig {
    pub fn resolve_sqlite_path(&self) -> PathBuf {
        if let Some(path) = &self.sqlite_path {
            return path.clone();
        }
        match &self.data_dir {
            Some(dir) => dir.join("data.sqlite"),
            None => PathBuf::from("data.sqlite"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_sqlite_path() {
        let config = ServiceConfig {
            data_dir: Some(PathBuf::from("/var/lib/henhouse")),
            ..Default::default()
        };
        assert_eq!(
            config.resolve_sqlite_path(),
            PathBuf::from("/var/lib/henhouse/data.sqlite")
        );

        let config = ServiceConfig {
            data_dir: Some(PathBuf::from("/var/lib/henhouse")),
            sqlite_path: Some(PathBuf::from("/fast/farm.sqlite")),
            ..Default::default()
        };
        assert_eq!(config.resolve_sqlite_path(), PathBuf::from("/fast/farm.sqlite"));

        assert_eq!(
            ServiceConfig::default().resolve_sqlite_path(),
            PathBuf::from("data.sqlite")
        );
    }
}

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub lookup: LookupConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory with the browser front end, served at `/`
    pub assets: Option<String>,
}

/// Remote row/blob service. Without a url the server runs in demo mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub url: Option<String>,
    pub key: Option<String>,
    /// Request timeout in seconds
    pub timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub bucket: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// JSON file the auth layer keeps the signed-in user in
    pub actor: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    pub ttl: u64,
    pub timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
            assets: None,
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: None,
            key: None,
            timeout: 15,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: crate::repository::DEFAULT_BUCKET.to_string(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            actor: "actor.json".to_string(),
        }
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            ttl: 300,
            timeout: 5,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and config file
    pub fn load() -> anyhow::Result<Self> {
        let mut config = config::Config::builder();

        config = config.add_source(config::Config::try_from(&AppConfig::default())?);

        config = config.add_source(config::File::with_name("config").required(false));

        // CATALOG_BACKEND_URL, CATALOG_LOOKUP_TTL, ...
        config = config.add_source(
            config::Environment::with_prefix("CATALOG")
                .separator("_")
                .prefix_separator("_"),
        );

        let config = config.build()?;
        let app_config: AppConfig = config.try_deserialize()?;

        Ok(app_config)
    }

    /// Demo mode runs on the in-memory service and the fallback datasets
    pub fn is_demo(&self) -> bool {
        self.backend
            .url
            .as_deref()
            .map_or(true, |url| url.trim().is_empty())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.backend.timeout)
    }

    pub fn lookup_ttl(&self) -> Duration {
        Duration::from_secs(self.lookup.ttl)
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup.timeout)
    }

    /// Get the server bind address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert!(config.is_demo());
        assert_eq!(config.server_address(), "127.0.0.1:3001");
        assert_eq!(config.lookup_ttl(), Duration::from_secs(300));
        assert_eq!(config.lookup_timeout(), Duration::from_secs(5));
        assert_eq!(config.storage.bucket, "catalogo");
    }

    #[test]
    fn test_blank_url_is_demo() {
        let mut config = AppConfig::default();
        config.backend.url = Some("  ".to_string());
        assert!(config.is_demo());

        config.backend.url = Some("https://db.example.com".to_string());
        assert!(!config.is_demo());
    }
}

//! Configuration manager for taskhub.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::FromRef;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::AppState;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";
const DEFAULT_PORT: u16 = 5001;
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    /// Instance name.
    pub name: String,
    /// Public URL of current instance; the single base URL clients resolve.
    pub url: String,
    /// Listening port.
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    version: String,
    #[serde(skip)]
    path: PathBuf,
    /// Related to JsonWebToken configuration.
    #[serde(skip_serializing)]
    pub token: Option<Token>,
    /// Related to PostgreSQL configuration.
    #[serde(skip_serializing)]
    pub postgres: Option<Postgres>,
    /// Related to Argon2 configuration.
    #[serde(skip_serializing)]
    pub argon2: Option<Argon2>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

/// PostgreSQL configuration.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
pub struct Postgres {
    /// Hostname:(?port) for PostgreSQL instance.
    pub address: String,
    /// Database name.
    pub database: Option<String>,
    /// Username credential to connect.
    pub username: Option<String>,
    /// Password credential to connect.
    pub password: Option<String>,
    /// Maximum pool connections.
    pub pool_size: Option<u32>,
}

/// Argon2 configuration.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Argon2 {
    /// Memory used while hashing.
    pub memory_cost: u32,
    /// Iterations of hash.
    pub iterations: u32,
    /// Parallelism degree.
    pub parallelism: u32,
    /// Output hash length.
    pub hash_length: usize,
}

impl Default for Argon2 {
    fn default() -> Self {
        Self {
            memory_cost: 1024 * 64, // 64 MiB.
            iterations: 4,
            parallelism: 2,
            hash_length: 32,
        }
    }
}

/// Json Web Token configuration.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Token {
    /// HMAC secret used to sign session tokens.
    pub secret: String,
    /// Session lifetime in minutes.
    /// Default is one day.
    pub expires_in_minutes: Option<u64>,
    /// Update token issuer.
    /// Default is the instance `url`.
    pub issuer: Option<String>,
}

impl FromRef<AppState> for Arc<Configuration> {
    fn from_ref(state: &AppState) -> Arc<Configuration> {
        Arc::clone(&state.config)
    }
}

impl Configuration {
    pub fn path(mut self, path: PathBuf) -> Self {
        self.path = path;
        self
    }

    /// Normalizes a URL string by ensuring it starts with a valid scheme
    /// (`http` or `https`).
    fn normalize_url(&self, url: &str) -> Result<String, url::ParseError> {
        let url_with_scheme = if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("https://{url}")
        };

        let parsed_url = Url::parse(&url_with_scheme)?;
        Ok(parsed_url.to_string())
    }

    /// Reads the `config.yaml` file from the specified path or the default
    /// location.
    pub fn read(self) -> Result<Arc<Self>, url::ParseError> {
        let file_path = if self.path.is_file() {
            &self.path
        } else {
            &Path::new(DEFAULT_CONFIG_PATH).to_path_buf()
        };

        match File::open(file_path) {
            Ok(file) => {
                let mut config: Configuration =
                    serde_yaml::from_reader(file).unwrap_or_else(|error| {
                        tracing::warn!(%error, "cannot parse configuration file, using default");
                        Configuration::default()
                    });

                config.url = self.normalize_url(&config.url)?;
                config.version = VERSION.to_owned();

                Ok(Arc::new(config))
            },
            Err(error) => {
                tracing::warn!(%error, "cannot open configuration file, using default");
                Ok(Arc::new(Configuration {
                    version: VERSION.to_owned(),
                    ..Default::default()
                }))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_configuration() {
        let raw = r#"
name: taskhub
url: tasks.example.com
port: 8080
token:
  secret: super-secret
  expires_in_minutes: 60
postgres:
  address: localhost:5432
  database: taskhub
argon2:
  memory_cost: 65536
  iterations: 4
  parallelism: 2
  hash_length: 32
"#;
        let config: Configuration = serde_yaml::from_str(raw).unwrap();

        assert_eq!(config.name, "taskhub");
        assert_eq!(config.port, 8080);
        assert_eq!(
            config.token,
            Some(Token {
                secret: "super-secret".into(),
                expires_in_minutes: Some(60),
                issuer: None,
            })
        );
        assert_eq!(config.argon2, Some(Argon2::default()));
        assert_eq!(
            config.postgres.and_then(|p| p.database),
            Some("taskhub".to_owned())
        );
    }

    #[test]
    fn test_default_port() {
        let config: Configuration = serde_yaml::from_str("name: t\nurl: t.example.com").unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn test_normalize_url() {
        let config = Configuration::default();
        assert_eq!(
            config.normalize_url("tasks.example.com").unwrap(),
            "https://tasks.example.com/"
        );
        assert_eq!(
            config.normalize_url("http://localhost:5001").unwrap(),
            "http://localhost:5001/"
        );
    }
}

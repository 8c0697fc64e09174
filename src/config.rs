//! Application configuration

use std::env;
use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Directory served for any path no route matches
    pub static_dir: PathBuf,
    /// File returned for `GET /`
    pub index_file: PathBuf,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DatabaseConfig {
    /// Postgres connection string. When unset, libpq-style `PG*` variables apply.
    pub url: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("server.port", i64::from(DEFAULT_PORT))?
            .set_default("server.static_dir", "public")?
            .set_default("server.index_file", "index.html")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(
                Environment::with_prefix("VEHICLE_API")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("database.url", env::var("DATABASE_URL").ok())?
            .build()?;

        config.try_deserialize()
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            static_dir: PathBuf::from("public"),
            index_file: PathBuf::from("index.html"),
        }
    }
}

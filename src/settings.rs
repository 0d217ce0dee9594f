use crate::AppError;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Json,
    Redb,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(StoreBackend::Json),
            "redb" => Ok(StoreBackend::Redb),
            _ => Err(format!("Invalid value for StoreBackend: {}", s)),
        }
    }
}

impl<'de> serde::Deserialize<'de> for StoreBackend {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        StoreBackend::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub http: HttpSettings,
    pub store: StoreSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpSettings {
    pub host: String,
    pub port: u16,
    pub static_dir: String,
}

impl HttpSettings {
    pub fn bind_address(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AppError::Config(format!("invalid bind address {}:{}: {}", self.host, self.port, e)))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    pub data_file: String,
    pub db_dir: String,
}

impl AppConfig {
    /// Loads settings from an optional file, `HAUL__*` environment overrides
    /// and the bare `PORT`/`HOST` variables the deployment contract uses.
    pub fn new(path: &str) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .set_default("http.host", "0.0.0.0")?
            .set_default("http.port", 5050)?
            .set_default("http.static_dir", "dist")?
            .set_default("store.backend", "json")?
            .set_default("store.data_file", "data/haulbase.json")?
            .set_default("store.db_dir", "data/haulbase_redb")?
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("HAUL").try_parsing(true).separator("__"))
            .set_override_option("http.host", env::var("HOST").ok())?
            .set_override_option("http.port", env::var("PORT").ok())?;
        builder.build()?.try_deserialize()
    }
}

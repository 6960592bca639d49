//! # Configuración del servidor
//!
//! Se lee de variables de entorno (y de `.env` si existe):
//!
//! ```env
//! STORE_BACKEND=mongodb        # o "memory"
//! MONGODB_URI=mongodb://localhost:27017/?replicaSet=rs0
//! MONGODB_DATABASE=pos_orders
//! BIND_ADDRESS=0.0.0.0:8080
//! RUST_LOG=debug,mongodb=info
//! ```

use std::env;
use std::str::FromStr;

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Valor inválido para '{name}': '{value}' ({expected})")]
    InvalidValue {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Backend de almacenamiento de pedidos
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    MongoDb,
    Memory,
}

impl FromStr for Backend {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mongodb" | "mongo" => Ok(Backend::MongoDb),
            "memory" => Ok(Backend::Memory),
            _ => Err(ConfigError::InvalidValue {
                name: "STORE_BACKEND",
                value: value.to_string(),
                expected: "mongodb | memory",
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub backend: Backend,
    pub mongo: MongoConfig,
    pub bind_address: String,
}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Config, ConfigError> {
        let backend = match lookup("STORE_BACKEND") {
            Some(value) => value.parse()?,
            None => Backend::MongoDb,
        };

        Ok(Config {
            backend,
            mongo: MongoConfig {
                uri: lookup("MONGODB_URI")
                    .unwrap_or_else(|| "mongodb://localhost:27017".to_string()),
                database: lookup("MONGODB_DATABASE").unwrap_or_else(|| "pos_orders".to_string()),
            },
            bind_address: lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.backend, Backend::MongoDb);
        assert_eq!(config.mongo.uri, "mongodb://localhost:27017");
        assert_eq!(config.mongo.database, "pos_orders");
        assert_eq!(config.bind_address, "0.0.0.0:8080");
    }

    #[test]
    fn reads_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("STORE_BACKEND", "Memory"),
            ("BIND_ADDRESS", "127.0.0.1:3000"),
        ]))
        .unwrap();
        assert_eq!(config.backend, Backend::Memory);
        assert_eq!(config.bind_address, "127.0.0.1:3000");
    }

    #[test]
    fn rejects_unknown_backend() {
        let err = Config::from_lookup(lookup(&[("STORE_BACKEND", "postgres")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { name: "STORE_BACKEND", .. }));
    }
}

use super::types::{DevServiceConfig, Topology};
use crate::error_handling::types::ConfigError;
use log::debug;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::Path;

/// Well-known property key under which the service host address is published.
pub const HOSTS_KEY: &str = "mongodev.hosts";
/// Well-known property key under which the database name is published.
pub const DATABASE_KEY: &str = "mongodev.database";

/// String properties shared with the rest of the host application.
///
/// The resolver is the surface of the external configuration system: the
/// lifecycle manager reads the host-override signal from it, and the result
/// publisher writes the managed service's address back into it. Downstream
/// consumers (connection builders, health probes) read these entries as
/// ordinary configuration.
///
/// Caller-declared properties and dev-service-published values are kept in
/// separate layers. The override check consults only the caller layer, so a
/// published `mongodev.hosts` from a previous cycle is never mistaken for an
/// explicit override.
#[derive(Debug, Default, Clone)]
pub struct ConfigResolver {
    properties: HashMap<String, String>,
    published: HashMap<String, String>,
}

impl ConfigResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a property value by key. Caller-declared properties shadow
    /// published ones.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties
            .get(key)
            .or_else(|| self.published.get(key))
            .map(String::as_str)
    }

    /// Sets a caller-declared property, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    /// Records a dev-service-published value, replacing any previous one.
    pub fn publish(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.published.insert(key.into(), value.into());
    }

    /// Returns the explicitly configured server addresses, if the caller
    /// declared any under [`HOSTS_KEY`].
    ///
    /// When this returns `Some`, the lifecycle manager must not start a
    /// container: the caller has opted into an external MongoDB. Values
    /// published by the dev service itself are not considered.
    pub fn explicit_hosts(&self) -> Option<&str> {
        self.properties
            .get(HOSTS_KEY)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }
}

/// On-disk layout of the configuration file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    devservice: DevServiceConfig,
    properties: HashMap<String, String>,
}

/// Full resolved configuration: the dev-service snapshot plus the property
/// resolver it was loaded alongside.
#[derive(Debug, Clone)]
pub struct Config {
    pub devservice: DevServiceConfig,
    pub resolver: ConfigResolver,
}

impl Config {
    /// Returns the built-in defaults with an empty resolver.
    pub fn new() -> Self {
        Config {
            devservice: DevServiceConfig::default(),
            resolver: ConfigResolver::new(),
        }
    }

    /// Loads configuration from a TOML file.
    ///
    /// The file carries a `[devservice]` section (all fields optional, see
    /// [`DevServiceConfig::default`]) and a `[properties]` table of string
    /// properties seeded into the resolver.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let parsed: ConfigFile =
            toml::from_str(&raw).map_err(|e| ConfigError::TomlError(e.to_string()))?;

        debug!(
            "Loaded configuration from {} ({} properties)",
            path.display(),
            parsed.properties.len()
        );

        let mut resolver = ConfigResolver::new();
        for (key, value) in parsed.properties {
            resolver.set(key, value);
        }

        Ok(Config {
            devservice: parsed.devservice,
            resolver,
        })
    }

    /// Applies process-environment overrides on top of the current values.
    ///
    /// Recognized variables: `MONGODEV_ENABLED`, `MONGODEV_IMAGE`,
    /// `MONGODEV_DATABASE_NAME`, `MONGODEV_TOPOLOGY` (`standalone` or
    /// `replica-set`) and `MONGODEV_HOSTS` (seeds [`HOSTS_KEY`] in the
    /// resolver).
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(v) = env::var("MONGODEV_ENABLED") {
            self.devservice.enabled = parse_bool("MONGODEV_ENABLED", &v)?;
        }
        if let Ok(v) = env::var("MONGODEV_IMAGE") {
            self.devservice.image = v;
        }
        if let Ok(v) = env::var("MONGODEV_DATABASE_NAME") {
            self.devservice.database_name = v;
        }
        if let Ok(v) = env::var("MONGODEV_TOPOLOGY") {
            self.devservice.topology = parse_topology(&v)?;
        }
        if let Ok(v) = env::var("MONGODEV_HOSTS") {
            self.resolver.set(HOSTS_KEY, v);
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(ConfigError::InvalidValue(format!(
            "{}: expected a boolean, got '{}'",
            name, other
        ))),
    }
}

fn parse_topology(value: &str) -> Result<Topology, ConfigError> {
    match value.trim() {
        "standalone" => Ok(Topology::Standalone),
        "replica-set" => Ok(Topology::ReplicaSet),
        other => Err(ConfigError::InvalidValue(format!(
            "MONGODEV_TOPOLOGY: expected 'standalone' or 'replica-set', got '{}'",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    fn clear_env() {
        for var in [
            "MONGODEV_ENABLED",
            "MONGODEV_IMAGE",
            "MONGODEV_DATABASE_NAME",
            "MONGODEV_TOPOLOGY",
            "MONGODEV_HOSTS",
        ] {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn devservice_defaults() {
        let config = DevServiceConfig::default();
        assert!(config.enabled);
        assert_eq!(config.image, "mongo:8");
        assert_eq!(config.database_name, "mongodev");
        assert_eq!(config.topology, Topology::Standalone);
    }

    #[test]
    fn from_file_parses_devservice_section_and_properties() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[devservice]
enabled = true
image = "mongo:7"
database-name = "orders"
topology = "replica-set"

[properties]
"app.name" = "demo"
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.devservice.image, "mongo:7");
        assert_eq!(config.devservice.database_name, "orders");
        assert_eq!(config.devservice.topology, Topology::ReplicaSet);
        assert_eq!(config.resolver.get("app.name"), Some("demo"));
    }

    #[test]
    fn from_file_empty_file_yields_defaults() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.devservice, DevServiceConfig::default());
        assert!(config.resolver.explicit_hosts().is_none());
    }

    #[test]
    fn from_file_rejects_malformed_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[devservice\nenabled = maybe").unwrap();
        match Config::from_file(file.path()) {
            Err(ConfigError::TomlError(_)) => {}
            other => panic!("Expected TomlError, got {:?}", other),
        }
    }

    #[test]
    fn from_file_rejects_unknown_topology() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[devservice]\ntopology = \"sharded\"").unwrap();
        assert!(Config::from_file(file.path()).is_err());
    }

    #[test]
    fn explicit_hosts_ignores_blank_values() {
        let mut resolver = ConfigResolver::new();
        assert!(resolver.explicit_hosts().is_none());

        resolver.set(HOSTS_KEY, "   ");
        assert!(resolver.explicit_hosts().is_none());

        resolver.set(HOSTS_KEY, "db.internal:27017");
        assert_eq!(resolver.explicit_hosts(), Some("db.internal:27017"));
    }

    #[test]
    #[serial]
    fn env_overrides_take_precedence() {
        clear_env();
        std::env::set_var("MONGODEV_ENABLED", "false");
        std::env::set_var("MONGODEV_IMAGE", "mongo:6");
        std::env::set_var("MONGODEV_TOPOLOGY", "replica-set");
        std::env::set_var("MONGODEV_HOSTS", "mongo.example:27017");

        let mut config = Config::new();
        config.apply_env_overrides().unwrap();

        assert!(!config.devservice.enabled);
        assert_eq!(config.devservice.image, "mongo:6");
        assert_eq!(config.devservice.topology, Topology::ReplicaSet);
        assert_eq!(
            config.resolver.explicit_hosts(),
            Some("mongo.example:27017")
        );
        clear_env();
    }

    #[test]
    #[serial]
    fn env_override_rejects_bad_boolean() {
        clear_env();
        std::env::set_var("MONGODEV_ENABLED", "maybe");
        let mut config = Config::new();
        match config.apply_env_overrides() {
            Err(ConfigError::InvalidValue(msg)) => assert!(msg.contains("MONGODEV_ENABLED")),
            other => panic!("Expected InvalidValue, got {:?}", other),
        }
        clear_env();
    }
}

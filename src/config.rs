//! Configuration loaded from `~/.config/vibra/config.toml`.
//!
//! Every section is optional; a missing file means defaults. Provider
//! pools given here replace the built-in pools entirely.
//!
//! ```toml
//! [server]
//! listen = "0.0.0.0:10000"
//!
//! [relay]
//! prefix_bytes = 65536
//!
//! [[providers.search]]
//! base = "https://pipedapi.kavin.rocks"
//! timeout_ms = 7000
//!
//! [[providers.extract]]
//! base = "https://co.wuk.sh/api/json"
//! dialect = "cobalt"
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::registry::{
    Dialect, OperationKind, Provider, ProviderRegistry, COBALT_TIMEOUT, PIPED_TIMEOUT,
};
use crate::relay::DEFAULT_PREFIX_BYTES;

/// Listen port used when neither the file nor `PORT` says otherwise.
pub const DEFAULT_PORT: u16 = 10_000;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub server: ServerConfig,
    pub relay: RelayConfig,
    pub providers: ProvidersConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RelayConfig {
    /// Bytes fetched and flushed ahead of the continuation.
    pub prefix_bytes: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            prefix_bytes: DEFAULT_PREFIX_BYTES,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProvidersConfig {
    pub search: Option<Vec<ProviderEntry>>,
    pub extract: Option<Vec<ProviderEntry>>,
}

/// One `[[providers.*]]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderEntry {
    pub base: String,
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub dialect: Dialect,
}

impl ProviderEntry {
    fn to_provider(&self) -> Provider {
        let timeout = self.timeout_ms.map_or(
            match self.dialect {
                Dialect::Piped => PIPED_TIMEOUT,
                Dialect::Cobalt => COBALT_TIMEOUT,
            },
            Duration::from_millis,
        );
        Provider::new(&self.base, timeout, self.dialect)
    }
}

impl Config {
    /// Load from `path`, or from the default location when `None`.
    ///
    /// An explicit path must exist; the default one is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let path = config_path();
                if path.exists() {
                    Self::from_file(&path)?
                } else {
                    Self::default()
                }
            }
        };
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("invalid config in {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    fn validate(&self) -> Result<()> {
        if self.relay.prefix_bytes == 0 {
            bail!("relay.prefix_bytes must be greater than zero");
        }
        for (name, pool) in [("search", &self.providers.search), ("extract", &self.providers.extract)] {
            let Some(pool) = pool else { continue };
            if pool.is_empty() {
                bail!("providers.{name} must list at least one provider");
            }
            if let Some(entry) = pool.iter().find(|e| url::Url::parse(&e.base).is_err()) {
                bail!("providers.{name}: invalid base address {:?}", entry.base);
            }
            if name == "search" && pool.iter().any(|e| e.dialect == Dialect::Cobalt) {
                bail!("providers.search: cobalt providers cannot search");
            }
        }
        Ok(())
    }

    /// Apply the conventional `PORT` variable on top of the file.
    #[must_use]
    pub fn with_port_env(mut self, port: Option<&str>) -> Self {
        if let Some(port) = port.and_then(|p| p.trim().parse::<u16>().ok()) {
            self.server.listen.set_port(port);
        }
        self
    }

    /// Freeze the provider pools. Unset pools fall back to the defaults.
    pub fn registry(&self) -> ProviderRegistry {
        let defaults = ProviderRegistry::default();
        let pool = |entries: &Option<Vec<ProviderEntry>>, kind: OperationKind| -> Vec<Provider> {
            match entries {
                Some(entries) => entries.iter().map(ProviderEntry::to_provider).collect(),
                None => defaults.providers_for(kind).to_vec(),
            }
        };

        ProviderRegistry::new(
            pool(&self.providers.search, OperationKind::Search),
            pool(&self.providers.extract, OperationKind::Extract),
        )
    }
}

/// Return the path to the config file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vibra")
        .join("config.toml")
}

//! Provider registry.
//!
//! An ordered, read-only list of backend base addresses per operation kind.
//! Order is priority order and never changes after startup: there is no
//! health tracking and no adaptive routing.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default per-attempt budget for Piped instances.
pub const PIPED_TIMEOUT: Duration = Duration::from_millis(7000);

/// Default per-attempt budget for Cobalt instances.
pub const COBALT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Public Piped API instances, in priority order.
const PIPED_INSTANCES: &[&str] = &[
    "https://pipedapi.kavin.rocks",
    "https://pipedapi.nadeko.net",
    "https://pipedapi.adminforge.de",
    "https://pipedapi.smnz.de",
    "https://pa.il.ax",
    "https://piped-api.garudalinux.org",
    "https://pipedapi.in.projectsegfau.lt",
    "https://piped-api.lunar.icu",
    "https://pipedapi.tokhmi.xyz",
    "https://pipedapi.drgns.space",
    "https://pipedapi.nebulacentre.net",
    "https://pipedapi.dedyn.io",
];

/// Cobalt endpoints, tried after every Piped instance failed.
const COBALT_INSTANCES: &[&str] = &["https://api.cobalt.tools/api/json", "https://co.wuk.sh/api/json"];

/// The two operations a provider can be asked to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Turn a free-text query into candidate identifiers.
    Search,
    /// Turn an identifier into downloadable audio encodings.
    Extract,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::Search => "search",
            OperationKind::Extract => "stream-extraction",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire protocol spoken by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Piped API: `GET /search`, `GET /streams/{id}`.
    #[default]
    Piped,
    /// Cobalt API: `POST /` with a watch URL. Extraction only.
    Cobalt,
}

impl Dialect {
    /// Whether providers of this dialect can perform `kind` at all.
    pub fn supports(self, kind: OperationKind) -> bool {
        match self {
            Dialect::Piped => true,
            Dialect::Cobalt => kind == OperationKind::Extract,
        }
    }
}

/// An opaque backend descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provider {
    pub base_address: String,
    pub per_attempt_timeout: Duration,
    pub dialect: Dialect,
}

impl Provider {
    pub fn new(base_address: impl Into<String>, per_attempt_timeout: Duration, dialect: Dialect) -> Self {
        Self {
            base_address: base_address.into().trim_end_matches('/').to_string(),
            per_attempt_timeout,
            dialect,
        }
    }

    pub fn piped(base_address: impl Into<String>) -> Self {
        Self::new(base_address, PIPED_TIMEOUT, Dialect::Piped)
    }

    pub fn cobalt(base_address: impl Into<String>) -> Self {
        Self::new(base_address, COBALT_TIMEOUT, Dialect::Cobalt)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base_address)
    }
}

/// Ordered provider pools, one per [`OperationKind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderRegistry {
    search: Vec<Provider>,
    extract: Vec<Provider>,
}

impl ProviderRegistry {
    pub fn new(search: Vec<Provider>, extract: Vec<Provider>) -> Self {
        Self { search, extract }
    }

    /// Providers to try for `kind`, highest priority first.
    pub fn providers_for(&self, kind: OperationKind) -> &[Provider] {
        match kind {
            OperationKind::Search => &self.search,
            OperationKind::Extract => &self.extract,
        }
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        let piped: Vec<Provider> = PIPED_INSTANCES.iter().map(|base| Provider::piped(*base)).collect();
        let extract = piped
            .iter()
            .cloned()
            .chain(COBALT_INSTANCES.iter().map(|base| Provider::cobalt(*base)))
            .collect();

        Self::new(piped, extract)
    }
}

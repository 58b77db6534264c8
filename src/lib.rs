//! `Vibra` - song resolver and low-latency audio relay
//!
//! Turns a song query or a known video id into a playable audio stream by
//! asking interchangeable public backends (Piped, Cobalt) in a fixed
//! priority order.
//!
//! # Components
//!
//! - **Provider registry** ([`registry`]): ordered, immutable backend pools
//! - **Failover controller** ([`failover`]): sequential attempts with per-attempt deadlines
//! - **Format selector** ([`select`]): M4A first, then bitrate, then upstream order
//! - **Streaming relay** ([`relay`]): prefix first, continuation streamed
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use vibra::{Engine, FailoverController, Lifecycle, ProviderRegistry, ResolutionRequest, Resolver};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let registry = Arc::new(ProviderRegistry::default());
//!     let engine = Lifecycle::ready(Engine::bootstrap(Arc::clone(&registry)).await?);
//!     let resolver = Resolver::new(FailoverController::new(registry), engine);
//!
//!     let resolution = resolver.resolve(&ResolutionRequest::for_query("daft punk one more time")).await?;
//!     println!("{} -> {}", resolution.stream.identifier, resolution.stream.chosen_encoding.url);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod backend;
pub mod config;
pub mod engine;
pub mod error;
pub mod failover;
pub mod fingerprint;
pub mod http_client;
pub mod registry;
pub mod relay;
pub mod resolver;
pub mod select;

pub use backend::{AttemptError, AudioEncoding, Backend, Candidate, Container, HttpBackend};
pub use config::Config;
pub use engine::{Engine, EngineState, Lifecycle};
pub use error::ResolveError;
pub use failover::{Attempted, ExhaustionError, FailoverController};
pub use fingerprint::choose_identity;
pub use registry::{Dialect, OperationKind, Provider, ProviderRegistry};
pub use relay::{relay, HttpOrigin, MediaOrigin, RelayError, RelayOutcome, RelaySink};
pub use resolver::{Resolution, ResolutionRequest, ResolvedStream, Resolver};
pub use select::select_best;

/// Version of vibra
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Extraction engine lifecycle.
//!
//! The engine (HTTP clients plus the backend and media-origin adapters on
//! top of them) starts asynchronously while the server already accepts
//! requests. [`Lifecycle`] makes the startup an explicit state machine:
//!
//! ```text
//! Uninitialized ──start──▶ Initializing ──▶ Ready
//!                                      └──▶ InitFailed
//! ```
//!
//! Requests ask [`Lifecycle::get`] for the engine and receive
//! [`ResolveError::NotReady`] (retryable) until it is `Ready`.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::backend::{Backend, HttpBackend};
use crate::error::ResolveError;
use crate::http_client::{api_client, media_client};
use crate::registry::{OperationKind, ProviderRegistry};
use crate::relay::{HttpOrigin, MediaOrigin};

/// Budget for the best-effort warm-up request per pool.
const WARM_UP_TIMEOUT: Duration = Duration::from_secs(3);

/// Observable engine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Initializing,
    Ready,
    InitFailed,
}

impl EngineState {
    pub fn as_str(self) -> &'static str {
        match self {
            EngineState::Uninitialized => "uninitialized",
            EngineState::Initializing => "initializing",
            EngineState::Ready => "ready",
            EngineState::InitFailed => "failed",
        }
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

enum Slot<T> {
    Uninitialized,
    Initializing,
    Ready(Arc<T>),
    Failed(String),
}

impl<T> Slot<T> {
    fn state(&self) -> EngineState {
        match self {
            Slot::Uninitialized => EngineState::Uninitialized,
            Slot::Initializing => EngineState::Initializing,
            Slot::Ready(_) => EngineState::Ready,
            Slot::Failed(_) => EngineState::InitFailed,
        }
    }
}

/// Startup state machine around a value of type `T`.
pub struct Lifecycle<T> {
    slot: watch::Sender<Slot<T>>,
}

impl<T: Send + Sync + 'static> Lifecycle<T> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            slot: watch::Sender::new(Slot::Uninitialized),
        })
    }

    /// A lifecycle that is already `Ready`.
    pub fn ready(value: T) -> Arc<Self> {
        Arc::new(Self {
            slot: watch::Sender::new(Slot::Ready(Arc::new(value))),
        })
    }

    pub fn state(&self) -> EngineState {
        self.slot.borrow().state()
    }

    /// Capability check used before any request touches the engine.
    pub fn engine_ready(&self) -> bool {
        self.state() == EngineState::Ready
    }

    /// The engine, or why it cannot be used yet.
    pub fn get(&self) -> Result<Arc<T>, ResolveError> {
        match &*self.slot.borrow() {
            Slot::Ready(value) => Ok(Arc::clone(value)),
            Slot::Uninitialized | Slot::Initializing => Err(ResolveError::NotReady),
            Slot::Failed(reason) => Err(ResolveError::ServiceUnavailable(format!(
                "engine failed to start: {reason}"
            ))),
        }
    }

    /// Run `init` in the background. Only the first call from
    /// `Uninitialized` starts anything; later calls return `None`.
    pub fn start<F>(self: &Arc<Self>, init: F) -> Option<JoinHandle<()>>
    where
        F: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let claimed = self.slot.send_if_modified(|slot| {
            if matches!(slot, Slot::Uninitialized) {
                *slot = Slot::Initializing;
                true
            } else {
                false
            }
        });
        if !claimed {
            return None;
        }

        let this = Arc::clone(self);
        Some(tokio::spawn(async move {
            let next = match init.await {
                Ok(value) => {
                    info!("engine ready");
                    Slot::Ready(Arc::new(value))
                }
                Err(err) => {
                    error!(error = %format!("{err:#}"), "engine failed to start");
                    Slot::Failed(format!("{err:#}"))
                }
            };
            this.slot.send_replace(next);
        }))
    }

    /// Wait until startup has finished either way.
    pub async fn wait_settled(&self) -> EngineState {
        let mut rx = self.slot.subscribe();
        let settled = rx
            .wait_for(|slot| matches!(slot, Slot::Ready(_) | Slot::Failed(_)))
            .await;
        match settled {
            Ok(slot) => slot.state(),
            Err(_) => self.state(),
        }
    }
}

/// The heavier extraction engine: provider API access and media origin.
pub struct Engine {
    pub backend: Arc<dyn Backend>,
    pub origin: Arc<dyn MediaOrigin>,
}

impl Engine {
    pub fn new(backend: Arc<dyn Backend>, origin: Arc<dyn MediaOrigin>) -> Self {
        Self { backend, origin }
    }

    /// Build the HTTP stack and warm the connection pool.
    ///
    /// Warm-up failures are logged and ignored; only client construction
    /// can fail startup.
    pub async fn bootstrap(registry: Arc<ProviderRegistry>) -> anyhow::Result<Self> {
        let api = api_client()?;
        let media = media_client()?;

        for kind in [OperationKind::Search, OperationKind::Extract] {
            if let Some(provider) = registry.providers_for(kind).first() {
                warm_up(&api, &provider.base_address).await;
            }
        }

        Ok(Self::new(
            Arc::new(HttpBackend::new(api)),
            Arc::new(HttpOrigin::new(media)),
        ))
    }
}

async fn warm_up(client: &Client, base: &str) {
    match tokio::time::timeout(WARM_UP_TIMEOUT, client.head(base).send()).await {
        Ok(Ok(response)) => debug!(base, status = %response.status(), "warm-up done"),
        Ok(Err(err)) => debug!(base, error = %err, "warm-up failed"),
        Err(_) => debug!(base, "warm-up timed out"),
    }
}

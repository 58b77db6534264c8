use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use vibra::api::{self, AppState};
use vibra::{Config, Engine, FailoverController, Lifecycle, Resolver};

pub async fn cmd_serve(config: Config, listen: Option<SocketAddr>, prefix_bytes: Option<u64>) -> Result<()> {
    let mut config = config.with_port_env(std::env::var("PORT").ok().as_deref());
    if let Some(listen) = listen {
        config.server.listen = listen;
    }
    if let Some(prefix_bytes) = prefix_bytes.filter(|&n| n > 0) {
        config.relay.prefix_bytes = prefix_bytes;
    }

    let registry = Arc::new(config.registry());
    info!(
        search = registry.providers_for(vibra::OperationKind::Search).len(),
        extract = registry.providers_for(vibra::OperationKind::Extract).len(),
        prefix_bytes = config.relay.prefix_bytes,
        "starting vibra {}",
        vibra::VERSION
    );

    // The listener comes up immediately; requests get NotReady until the engine settles
    let engine = Lifecycle::new();
    engine.start(Engine::bootstrap(Arc::clone(&registry)));

    let resolver = Resolver::new(FailoverController::new(registry), engine)
        .with_prefix_bytes(config.relay.prefix_bytes);

    api::serve(
        config.server.listen,
        AppState {
            resolver: Arc::new(resolver),
        },
    )
    .await
}

mod providers;
mod resolve;
mod search;
mod serve;

pub use providers::cmd_providers;
pub use resolve::cmd_resolve;
pub use search::cmd_search;
pub use serve::cmd_serve;

use std::sync::Arc;

use anyhow::Result;

use vibra::{Config, Engine, FailoverController, Lifecycle, Resolver};

/// Resolver with an engine that is already running, for one-shot commands.
async fn ready_resolver(config: &Config) -> Result<Resolver> {
    let registry = Arc::new(config.registry());
    let engine = Engine::bootstrap(Arc::clone(&registry)).await?;
    Ok(Resolver::new(FailoverController::new(registry), Lifecycle::ready(engine))
        .with_prefix_bytes(config.relay.prefix_bytes))
}

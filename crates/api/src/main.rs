use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use storegate_api::app::{self, services};
use storegate_api::config::ApiConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ApiConfig::from_env()?;
    storegate_observability::init_with(config.log_format);

    if config.bind_addr_defaulted {
        tracing::warn!(addr = %config.bind_addr, "STOREGATE_BIND_ADDR not set; using default");
    }

    let services = Arc::new(
        services::build_services(config.policy.clone()).context("failed to build identity service")?,
    );

    // Idle sessions are also dropped lazily on access; this just bounds memory.
    let sessions = services.sessions.clone();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_secs(60));
        loop {
            tick.tick().await;
            match sessions.purge_expired() {
                Ok(0) => {}
                Ok(n) => tracing::info!(purged = n, "expired sessions purged"),
                Err(e) => tracing::error!(error = %e, "session purge failed"),
            }
        }
    });

    let router = app::build_app(services);
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, router).await?;
    Ok(())
}

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tracing::info;

use key_rotator::config::Args;
use key_rotator::handlers::router;
use key_rotator::logging::init_logging;
use key_rotator::metrics::CONFIGURED_KEYS;
use key_rotator::registry::KeyRegistry;
use key_rotator::state::AppState;
use key_rotator::worker::prune_worker;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_logging(&args.log_level, args.log_format);

    let source = args.key_source();
    let keys = source.collect().context("failed to read API keys")?;

    let registry = Arc::new(KeyRegistry::new().with_retention(args.retention()));
    registry
        .initialize(keys)
        .with_context(|| format!("no keys found under {}<n>", source.prefix))?;
    CONFIGURED_KEYS.set(registry.configured_keys()?.len() as f64);

    if let Some(every) = args.prune_every() {
        let worker_registry = Arc::clone(&registry);
        tokio::spawn(async move {
            prune_worker(worker_registry, every).await;
        });
    }

    let state = Arc::new(
        AppState::new(registry)
            .with_default_limit(args.default_limit())
            .with_key_source(source),
    );
    let app = router(state);

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("Key rotator running on http://{}", addr);
    match args.default_limit() {
        Some(limit) => info!(
            "Default limit: {} uses per key per {} seconds",
            limit.max_uses,
            limit.time_window.as_secs()
        ),
        None => info!("No default limit, requests may pass time_window and max_uses"),
    }

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

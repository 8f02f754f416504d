use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

mod app;
mod auth;
mod http;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "snooze_gateway=info,tower_http=debug".into()),
        )
        .init();

    // load config: explicit path > SNOOZE_CONFIG env > ~/.snooze/snooze.toml
    let config_path = std::env::var("SNOOZE_CONFIG").ok();
    let config =
        snooze_core::config::SnoozeConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
            tracing::warn!("Config load failed ({}), using defaults", e);
            snooze_core::config::SnoozeConfig::default()
        });

    let bind = config.gateway.bind.clone();
    let port = config.gateway.port;

    // open the durable store — the only startup failure treated as fatal
    let db_path = &config.database.path;
    ensure_parent_dir(db_path);
    info!(path = %db_path, "opening SQLite database");

    let db = rusqlite::Connection::open(db_path)?;
    db.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    snooze_queue::db::init_db(&db)?;
    info!("database migrations complete");

    // queue handle shared by handlers and the dispatcher
    let queue = snooze_queue::JobQueue::new(db)?;

    let caller = snooze_scheduler::HttpCaller::new(Duration::from_secs(
        config.dispatch.http_timeout_secs,
    ))?;
    let dispatcher = snooze_scheduler::Dispatcher::new(
        queue.clone(),
        caller,
        Duration::from_secs(config.dispatch.poll_interval_secs),
    );

    let scheduler = snooze_scheduler::SchedulerService::new(queue.clone());
    let state = Arc::new(app::AppState::new(config, scheduler, queue));
    let router = app::build_router(Arc::clone(&state));

    // spawn the dispatcher loop in background
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move { dispatcher.run(shutdown_rx).await });

    let addr: SocketAddr = format!("{}:{}", bind, port).parse()?;
    info!("snooze gateway listening on {}", addr);
    info!(
        "To schedule a job, run: curl -H \"x-api-key: <key>\" \"{}/add-job?id=1&targetUrl=https%3A%2F%2Fexample.com&runAt=17:34\"",
        state.config.gateway.public_url
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    // signal dispatcher to stop
    let _ = shutdown_tx.send(true);
    Ok(())
}

/// Ensure the parent directory for a file path exists.
fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}

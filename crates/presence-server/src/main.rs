mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::trace::TraceLayer;
use tracing::{error, info};

use presence_api::AppStateInner;
use presence_db::Database;
use presence_sampler::ProbeClient;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: {}", e);
            eprintln!("       DATABASE_URL, SECRET_KEY, PROBE_URL and API_KEY are required.");
            std::process::exit(1);
        }
    };

    // Init logging
    let default_filter = if config.debug {
        "presence=debug,presence_api=debug,presence_db=debug,presence_sampler=debug,tower_http=debug"
    } else {
        "presence=info,presence_api=info,presence_db=info,presence_sampler=info,tower_http=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    // Init database and probe session
    let db = Arc::new(Database::connect(&config.database_url)?);
    let probe = ProbeClient::new(config.probe.clone())?;

    info!(
        "Probing {} target(s) at {} (timeout {:?}, {} retries)",
        config.targets.len(),
        config.probe.url,
        config.probe.timeout,
        config.probe.retries
    );

    let state = Arc::new(AppStateInner {
        db,
        api_key: config.api_key.clone(),
        probe,
        targets: config.targets.clone(),
        started_at: chrono::Utc::now(),
    });

    let app = presence_api::router(state).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Presence server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Presence server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(sigterm) => sigterm,
                Err(e) => {
                    error!("Failed to install SIGTERM handler: {}", e);
                    ctrl_c.await.ok();
                    info!("Received Ctrl+C, shutting down...");
                    return;
                }
            };
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}

use anyhow::{Context, Result};
use clap::Parser;
use prepstage::{create_router, AppState, BackendClient, Config};
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "prepstage")]
#[command(about = "Interview practice session service")]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config/prepstage")]
    config: String,

    /// Override the HTTP port from the config file
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));
    info!("Interview backend: {}", cfg.backend.base_url);

    let backend = Arc::new(BackendClient::new(
        cfg.backend.base_url.as_str(),
        cfg.backend.auth_token.as_str(),
    ));

    let state = AppState::new(backend, cfg.session_config());
    let app = create_router(state);

    let bind = format!(
        "{}:{}",
        cfg.service.http.bind,
        args.port.unwrap_or(cfg.service.http.port)
    );
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;

    info!("Listening on {}", bind);
    axum::serve(listener, app).await.context("HTTP server failed")?;

    Ok(())
}

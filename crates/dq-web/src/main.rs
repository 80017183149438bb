use std::sync::Arc;

use anyhow::{Context, Result};
use dq_core::{config, logging};
use dq_web::{router, WebState};

#[tokio::main]
async fn main() {
    if logging::init_logging().is_err() {
        logging::init_logging_stderr();
    }

    if let Err(err) = serve().await {
        eprintln!("dqweb error: {:#}", err);
        std::process::exit(1);
    }
}

async fn serve() -> Result<()> {
    let cfg = config::load_or_init()?;
    let state = Arc::new(WebState::from_config(&cfg));

    let addr = std::env::var("DQ_WEB_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "dashboard listening");

    axum::serve(listener, router(state))
        .await
        .context("server exited")?;
    Ok(())
}

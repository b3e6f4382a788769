mod cache;
mod config;
mod error;
mod handlers;
mod metrics;
mod models;
mod pages;
mod prompt;
mod render;
mod state;
mod upstream;

use anyhow::Context;
use clap::Parser; // for cli
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::{Args, Settings};
use crate::state::AppState;

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("page_oracle=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("page_oracle=info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional
    let _ = dotenvy::dotenv();

    // parse cli arguments
    let args = Args::parse();
    init_tracing(args.debug);

    // bad settings stop us here, not on the first request
    let settings = Settings::from_args(args).context("invalid configuration")?;
    let state = Arc::new(AppState::from_settings(&settings).await?);

    let app = handlers::router(state);

    let listener = tokio::net::TcpListener::bind(&settings.addr)
        .await
        .with_context(|| format!("cannot bind {}", settings.addr))?;

    info!("Page server running on http://{}", settings.addr);
    info!("Model: {} via {}", settings.model, settings.base_url);
    info!("Prompt template: {:?}", settings.template.source());
    match settings.cache_ttl {
        Some(ttl) => info!("Cache TTL: {} seconds", ttl.as_secs()),
        None => info!("Cache TTL: never expires"),
    }

    axum::serve(listener, app).await?;
    Ok(())
}

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use axum::http::{header, HeaderValue};
use axum::routing::{any, get};
use axum::Router;
use clap::Parser;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

mod handlers;
mod state;

use crate::handlers::{ping_handler, proxy_handler};
use crate::state::AppState;

#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    /// Directory holding index.html and the wasm bundle.
    #[arg(long)]
    public_dir: Option<PathBuf>,
    /// Trails REST backend that `/api/*` is forwarded to.
    #[arg(long, env = "TRAILMAP_UPSTREAM")]
    upstream: Option<String>,
    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let public_dir = args
        .public_dir
        .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../public"));
    match &args.upstream {
        Some(upstream) => tracing::info!(%upstream, "forwarding API requests"),
        None => tracing::warn!("no --upstream given; API requests will return 404"),
    }
    let state = AppState {
        client: reqwest::Client::builder()
            .build()
            .context("failed to build HTTP client")?,
        upstream: args.upstream,
    };

    let static_files = ServeDir::new(&public_dir).append_index_html_on_directories(true);
    let app = Router::new()
        .route("/ping", get(ping_handler))
        .route("/api/*path", any(proxy_handler))
        .route("/advanced-js-mapping/api/*path", any(proxy_handler))
        .fallback_service(static_files)
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(public_dir = %public_dir.display(), "trail map running at http://localhost:{}", args.port);
    axum::serve(listener, app).await.context("server crashed")?;
    Ok(())
}

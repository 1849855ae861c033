//! `mcp-passthrough-proxy` binary entry point
//!
//! Parses configuration, builds the hook chain, and hands off to either the
//! stdio front (one `PassthroughContext` wired directly to stdin/stdout) or
//! the HTTP front (a `SessionManager` behind an axum listener), per
//! `--stdio`. Grounded on the bind/serve pattern in
//! `airs_mcp::transport::http::axum_server::AxumHttpServer` — `TcpListener`
//! + `axum::serve`, with `tower::ServiceBuilder` layering trace and CORS —
//! adapted from a long-lived handler registry to a per-session
//! `PassthroughContext` built by the `SessionManager`.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mcp_passthrough_proxy::context::PassthroughContext;
use mcp_passthrough_proxy::session::SessionManager;
use mcp_passthrough_proxy::transport::http::front::{build_router, ProxyFrontState};
use mcp_passthrough_proxy::transport::{HttpClientTransport, StdioTransport};
use mcp_passthrough_proxy::ProxyConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // All logging goes to stderr: stdout is the wire in `--stdio` mode, and
    // a stray line there would corrupt the frame a peer is parsing.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = ProxyConfig::from_args()?;

    if config.stdio {
        run_stdio(config).await
    } else {
        run_http(config).await
    }
}

fn target_transport(config: &ProxyConfig) -> HttpClientTransport {
    HttpClientTransport::new(config.target_url.clone(), config.target_transport, config.auth_token.clone())
}

async fn run_stdio(config: ProxyConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!(target = %config.target_url, "starting stdio passthrough");

    let target = target_transport(&config);
    let context = PassthroughContext::new("stdio", config.hooks, config.other_policy);
    context.connect(StdioTransport::new(), Some(target)).await?;

    // The stdio front has no listener loop of its own: `StdioTransport::start`
    // already spawned the stdin read task. Block until the peer closes it.
    tokio::signal::ctrl_c().await?;
    context.close().await?;
    Ok(())
}

async fn run_http(config: ProxyConfig) -> Result<(), Box<dyn std::error::Error>> {
    let target_base_url = config.target_base_url.clone();
    let auth_token = config.auth_token.clone();
    let source_mcp_path = config.source_mcp_path.clone();
    let port = config.port;

    let target_url = config.target_url.clone();
    let target_transport_mode = config.target_transport;
    let hook_configs = config.hooks;
    let factory_auth_token = auth_token.clone();
    let other_policy = config.other_policy;

    let sessions = Arc::new(SessionManager::new(
        move || HttpClientTransport::new(target_url.clone(), target_transport_mode, factory_auth_token.clone()),
        move || hook_configs.clone(),
        other_policy,
    ));

    let state = ProxyFrontState::new(sessions.clone(), target_base_url, auth_token);
    let router = build_router(&source_mcp_path, state).layer(
        ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, mcp_path = %source_mcp_path, "listening");

    axum::serve(listener, router).await?;
    sessions.remove_all_sessions().await;
    Ok(())
}

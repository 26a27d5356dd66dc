//! DawnCache node server
//!
//! Runs one cache node: the inter-peer endpoint, an optional client-facing
//! API, and a built-in demo loader standing in for a real source of truth.
//!
//! A three-node local fleet:
//!
//! ```text
//! dawncache-server --listen 127.0.0.1:8001 --peers http://127.0.0.1:8001,http://127.0.0.1:8002,http://127.0.0.1:8003 --api-listen 127.0.0.1:9001
//! dawncache-server --listen 127.0.0.1:8002 --peers http://127.0.0.1:8001,http://127.0.0.1:8002,http://127.0.0.1:8003
//! dawncache-server --listen 127.0.0.1:8003 --peers http://127.0.0.1:8001,http://127.0.0.1:8002,http://127.0.0.1:8003
//! ```

#[path = "server/handlers.rs"]
mod handlers;
#[path = "server/types.rs"]
mod types;

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, Level};

use dawncache::{new_group, BoxError, FnLoader, HttpPool, PeerPicker};

#[derive(Parser, Debug)]
#[command(author, version, about = "DawnCache distributed cache node")]
struct Args {
    /// Address to listen on for inter-peer traffic
    #[arg(short, long, default_value = "127.0.0.1:8001")]
    listen: SocketAddr,

    /// URL advertised to peers (defaults to http://{listen})
    #[arg(long)]
    public_url: Option<String>,

    /// Peer URLs for the whole fleet, this node included
    #[arg(long, value_delimiter = ',')]
    peers: Vec<String>,

    /// Address for the client-facing API (omit to disable)
    #[arg(long)]
    api_listen: Option<SocketAddr>,

    /// Per-group cache budget in bytes
    #[arg(long, default_value = "67108864")] // 64 MiB
    cache_bytes: u64,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: Level,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "dawncache node starting");

    // Demo source of truth; a real deployment supplies its own loader
    let group = new_group(
        "scores",
        args.cache_bytes,
        FnLoader(|key: String| async move {
            tracing::debug!(key = %key, "consulting source table");
            let table: &[(&str, &str)] = &[("tom", "630"), ("jack", "589"), ("sam", "567")];
            match table.iter().find(|(name, _)| *name == key) {
                Some((_, score)) => Ok(score.as_bytes().to_vec()),
                None => Err(BoxError::from(format!("{key} not in source table"))),
            }
        }),
    );

    let public_url = args
        .public_url
        .clone()
        .unwrap_or_else(|| format!("http://{}", args.listen));
    let pool = Arc::new(HttpPool::new(&public_url));
    if !args.peers.is_empty() {
        pool.set_peers(&args.peers);
    }
    group.register_peers(Arc::clone(&pool) as Arc<dyn PeerPicker>);

    let peer_listener = tokio::net::TcpListener::bind(args.listen).await?;
    info!(addr = %args.listen, public_url = %public_url, "peer endpoint listening");
    let peer_server = axum::serve(peer_listener, pool.router())
        .with_graceful_shutdown(shutdown_signal());

    if let Some(api_addr) = args.api_listen {
        let api_listener = tokio::net::TcpListener::bind(api_addr).await?;
        info!(addr = %api_addr, "client API listening");
        let api_server = axum::serve(api_listener, handlers::router())
            .with_graceful_shutdown(shutdown_signal());
        tokio::try_join!(
            async { peer_server.await },
            async { api_server.await }
        )?;
    } else {
        peer_server.await?;
    }

    info!("dawncache node stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}

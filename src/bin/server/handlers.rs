//! Client-facing API handlers
//!
//! Served separately from the inter-peer endpoint so the two surfaces can
//! be firewalled apart. Lookups go through the same group pipeline the
//! peers use.

use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

use dawncache::{get_group, groups, Error};

use crate::types::{GroupStatsResponse, HealthResponse, StatsResponse};

/// Build the client API router
pub fn router() -> Router {
    Router::new()
        .route("/api/{group}/{*key}", get(get_value))
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/metrics", get(metrics))
}

/// Look up one value through the full cache pipeline
async fn get_value(Path((group_name, key)): Path<(String, String)>) -> Response {
    let Some(group) = get_group(&group_name) else {
        let err = Error::NoSuchGroup(group_name);
        return (StatusCode::NOT_FOUND, err.to_string()).into_response();
    };

    match group.get(&key).await {
        Ok(view) => view.to_vec().into_response(),
        Err(err @ Error::EmptyKey) => (StatusCode::BAD_REQUEST, err.to_string()).into_response(),
        Err(err @ Error::Loader { .. }) => (StatusCode::NOT_FOUND, err.to_string()).into_response(),
        Err(err) => (StatusCode::BAD_GATEWAY, err.to_string()).into_response(),
    }
}

/// Liveness probe
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Per-group counters as JSON
async fn stats() -> Json<StatsResponse> {
    let groups = groups()
        .iter()
        .map(|group| GroupStatsResponse {
            name: group.name().to_string(),
            stats: group.stats(),
        })
        .collect();
    Json(StatsResponse { groups })
}

/// Per-group counters in Prometheus exposition format
async fn metrics() -> impl IntoResponse {
    let mut out = String::from(
        "# HELP dawncache_gets_total Lookups received by the group\n\
         # TYPE dawncache_gets_total counter\n\
         # HELP dawncache_cache_hits_total Lookups served from the local cache\n\
         # TYPE dawncache_cache_hits_total counter\n\
         # HELP dawncache_peer_loads_total Values fetched from owning peers\n\
         # TYPE dawncache_peer_loads_total counter\n\
         # HELP dawncache_local_loads_total Values produced by the loader\n\
         # TYPE dawncache_local_loads_total counter\n\
         # HELP dawncache_load_errors_total Failed peer fetches and loader calls\n\
         # TYPE dawncache_load_errors_total counter\n\
         # HELP dawncache_resident_bytes Bytes charged against the cache budget\n\
         # TYPE dawncache_resident_bytes gauge\n",
    );
    for group in groups() {
        let name = group.name().to_string();
        let stats = group.stats();
        out.push_str(&format!(
            "dawncache_gets_total{{group=\"{name}\"}} {}\n\
             dawncache_cache_hits_total{{group=\"{name}\"}} {}\n\
             dawncache_peer_loads_total{{group=\"{name}\"}} {}\n\
             dawncache_local_loads_total{{group=\"{name}\"}} {}\n\
             dawncache_load_errors_total{{group=\"{name}\"}} {}\n\
             dawncache_resident_bytes{{group=\"{name}\"}} {}\n",
            stats.gets,
            stats.cache_hits,
            stats.peer_loads,
            stats.local_loads,
            stats.load_errors,
            stats.resident_bytes,
        ));
    }
    (StatusCode::OK, [("content-type", "text/plain")], out)
}

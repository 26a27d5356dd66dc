//! Response types for the client-facing API

use dawncache::StatsSnapshot;
use serde::Serialize;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Counters for every registered group
#[derive(Serialize)]
pub struct StatsResponse {
    pub groups: Vec<GroupStatsResponse>,
}

/// One group's counters
#[derive(Serialize)]
pub struct GroupStatsResponse {
    pub name: String,
    #[serde(flatten)]
    pub stats: StatsSnapshot,
}

use serde::{Deserialize, Serialize};

use crate::models::domain::{MatchResult, ServiceListing};

/// Response for the find-matches endpoint (the engine's MatchResult as-is)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindMatchesResponse {
    #[serde(flatten)]
    pub result: MatchResult,
    /// True when the result was served from the cache unchanged
    #[serde(rename = "fromCache")]
    pub from_cache: bool,
}

/// Response for the open listing search endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingSearchResponse {
    pub listings: Vec<ServiceListing>,
    #[serde(rename = "totalResults")]
    pub total_results: usize,
    #[serde(rename = "fromCache")]
    pub from_cache: bool,
}

/// Aggregate marketplace statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    #[serde(rename = "activeListings")]
    pub active_listings: u64,
    pub categories: Vec<CategoryCount>,
    #[serde(rename = "generatedAt")]
    pub generated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: u64,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

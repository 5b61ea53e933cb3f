use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::RequestStatus;

/// Request to run matching for a search request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FindMatchesRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "request_id", rename = "requestId")]
    pub request_id: String,
    /// "advanced" (default) or "legacy"
    #[serde(default)]
    pub strategy: Option<String>,
    /// Result-size override, capped at the configured maximum
    #[serde(default)]
    pub limit: Option<u16>,
}

/// Open browsing search over listings, keyed by filter-set hash in the cache
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ListingSearchQuery {
    #[serde(default)]
    pub category: Option<String>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lon: f64,
    #[serde(rename = "radiusKm", default = "default_search_radius")]
    #[validate(range(min = 0.1, max = 500.0))]
    pub radius_km: f64,
    #[serde(rename = "budgetMin", default)]
    pub budget_min: Option<f64>,
    #[serde(rename = "budgetMax", default)]
    pub budget_max: Option<f64>,
    #[serde(rename = "urgentOnly", default)]
    pub urgent_only: bool,
}

fn default_search_radius() -> f64 {
    10.0
}

/// Request to transition a search request's status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusTransitionRequest {
    pub status: RequestStatus,
}

use serde::{Deserialize, Serialize};

/// Lifecycle status of a search request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Active,
    Paused,
    Completed,
    Cancelled,
}

impl RequestStatus {
    /// Whether a transition into `next` re-triggers matching
    pub fn reactivates(&self, next: RequestStatus) -> bool {
        matches!(self, RequestStatus::Paused | RequestStatus::Cancelled)
            && next == RequestStatus::Active
    }
}

/// Pricing model declared on a listing or preferred by a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceType {
    Fixed,
    Hourly,
    Daily,
    Negotiable,
}

/// Provider education level, as declared on the listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EducationLevel {
    Primary,
    Secondary,
    Associate,
    Bachelor,
    Master,
    Doctorate,
}

impl EducationLevel {
    /// Bachelor and above count as the advanced tier for verification scoring
    pub fn is_advanced(&self) -> bool {
        *self >= EducationLevel::Bachelor
    }
}

/// A requester's open search for a service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(rename = "requestId")]
    pub id: String,
    #[serde(rename = "requesterId")]
    pub requester_id: String,
    #[serde(default)]
    pub category: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(rename = "radiusKm", default = "default_radius_km")]
    pub radius_km: f64,
    #[serde(rename = "budgetMin", default)]
    pub budget_min: Option<f64>,
    #[serde(rename = "budgetMax", default)]
    pub budget_max: Option<f64>,
    #[serde(rename = "priceType", default)]
    pub price_type: Option<PriceType>,
    #[serde(rename = "isUrgent", default)]
    pub is_urgent: bool,
    #[serde(rename = "requiredAt", default)]
    pub required_at: Option<chrono::DateTime<chrono::Utc>>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: RequestStatus,
}

pub(crate) fn default_radius_km() -> f64 {
    10.0
}

impl SearchRequest {
    pub fn is_active(&self) -> bool {
        self.status == RequestStatus::Active
    }

    /// Whether an explicit budget range is present
    pub fn has_budget(&self) -> bool {
        self.budget_min.is_some() || self.budget_max.is_some()
    }

    /// Combined title + description, lowercased, for keyword cue scanning
    pub fn free_text(&self) -> String {
        let mut text = self.title.to_lowercase();
        text.push(' ');
        text.push_str(&self.description.to_lowercase());
        text
    }
}

/// An active provider listing offering a service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceListing {
    #[serde(rename = "listingId")]
    pub id: String,
    #[serde(rename = "providerId")]
    pub provider_id: String,
    pub category: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(rename = "priceFrom")]
    pub price_from: f64,
    #[serde(rename = "priceTo")]
    pub price_to: f64,
    #[serde(rename = "priceType")]
    pub price_type: PriceType,
    #[serde(rename = "isActive", default = "default_true")]
    pub is_active: bool,
    #[serde(rename = "isAvailable", default = "default_true")]
    pub is_available: bool,
    #[serde(rename = "subscriptionActive", default)]
    pub subscription_active: bool,
    #[serde(rename = "urgentCapable", default)]
    pub urgent_capable: bool,
    #[serde(rename = "identityVerified", default)]
    pub identity_verified: bool,
    #[serde(rename = "professionalVerified", default)]
    pub professional_verified: bool,
    #[serde(rename = "educationLevel")]
    pub education_level: EducationLevel,
    #[serde(rename = "hasMobility", default)]
    pub has_mobility: bool,
    #[serde(rename = "lastActiveAt")]
    pub last_active_at: chrono::DateTime<chrono::Utc>,
}

fn default_true() -> bool {
    true
}

impl ServiceListing {
    /// Eligible for matching at all: active, available, paying subscription
    pub fn is_matchable(&self) -> bool {
        self.is_active && self.is_available && self.subscription_active
    }
}

/// Aggregated provider reputation, read alongside the listing
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ReputationSnapshot {
    #[serde(rename = "averageRating")]
    pub average_rating: f64,
    #[serde(rename = "ratingCount")]
    pub rating_count: u32,
    #[serde(rename = "completedJobs")]
    pub completed_jobs: u32,
}

/// Prior completed interactions between one requester and one provider
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CollaborationRecord {
    #[serde(rename = "completedCount")]
    pub completed_count: u32,
    #[serde(rename = "averageRating")]
    pub average_rating: f64,
}

impl CollaborationRecord {
    pub fn exists(&self) -> bool {
        self.completed_count > 0
    }
}

/// The eight compatibility dimensions, each normalized to [0, 1]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FactorVector {
    pub category: f64,
    pub proximity: f64,
    pub budget: f64,
    pub temporal: f64,
    pub reputation: f64,
    pub verification: f64,
    pub collaboration: f64,
    pub preference: f64,
}

/// A scored pairing of one request with one listing (engine-owned, transient)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub listing: ServiceListing,
    pub reputation: ReputationSnapshot,
    #[serde(rename = "distanceKm")]
    pub distance_km: f64,
    pub factors: FactorVector,
    pub score: f64,
    #[serde(rename = "explanationTags")]
    pub explanation_tags: Vec<String>,
}

/// The criteria the engine actually applied, echoed back for explainability
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppliedCriteria {
    pub strategy: String,
    #[serde(rename = "radiusKm")]
    pub radius_km: f64,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(rename = "budgetMin", default)]
    pub budget_min: Option<f64>,
    #[serde(rename = "budgetMax", default)]
    pub budget_max: Option<f64>,
    #[serde(rename = "minScore")]
    pub min_score: f64,
    #[serde(rename = "maxPerProvider")]
    pub max_per_provider: usize,
    #[serde(rename = "maxResults")]
    pub max_results: usize,
}

/// Fully assembled matching output for one invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    pub request: SearchRequest,
    pub candidates: Vec<MatchCandidate>,
    #[serde(rename = "totalCandidatesConsidered")]
    pub total_candidates_considered: usize,
    #[serde(rename = "totalReturned")]
    pub total_returned: usize,
    #[serde(rename = "appliedCriteria")]
    pub applied_criteria: AppliedCriteria,
    #[serde(rename = "generatedAt")]
    pub generated_at: chrono::DateTime<chrono::Utc>,
}

/// Geospatial bounding box used for SQL pre-filtering
#[derive(Debug, Clone, Copy)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

/// Listing Store query parameters for candidate retrieval
#[derive(Debug, Clone)]
pub struct RetrievalCriteria {
    pub origin_lat: f64,
    pub origin_lon: f64,
    pub radius_km: f64,
    pub category: Option<String>,
    pub budget_min: Option<f64>,
    pub budget_max: Option<f64>,
    pub urgent_only: bool,
    pub limit: usize,
}

impl RetrievalCriteria {
    /// Build retrieval criteria from a search request and the fan-out limit
    pub fn from_request(request: &SearchRequest, fan_out_limit: usize) -> Self {
        Self {
            origin_lat: request.latitude,
            origin_lon: request.longitude,
            radius_km: request.radius_km,
            category: request.category.clone(),
            budget_min: request.budget_min,
            budget_max: request.budget_max,
            urgent_only: false,
            limit: fan_out_limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_reactivation() {
        assert!(RequestStatus::Paused.reactivates(RequestStatus::Active));
        assert!(RequestStatus::Cancelled.reactivates(RequestStatus::Active));
        assert!(!RequestStatus::Active.reactivates(RequestStatus::Active));
        assert!(!RequestStatus::Paused.reactivates(RequestStatus::Completed));
    }

    #[test]
    fn test_education_advanced_tier() {
        assert!(!EducationLevel::Secondary.is_advanced());
        assert!(!EducationLevel::Associate.is_advanced());
        assert!(EducationLevel::Bachelor.is_advanced());
        assert!(EducationLevel::Doctorate.is_advanced());
    }

    #[test]
    fn test_collaboration_exists() {
        assert!(!CollaborationRecord::default().exists());
        let record = CollaborationRecord {
            completed_count: 2,
            average_rating: 4.6,
        };
        assert!(record.exists());
    }
}

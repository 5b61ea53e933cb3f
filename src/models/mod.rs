// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    AppliedCriteria, BoundingBox, CollaborationRecord, EducationLevel, FactorVector,
    MatchCandidate, MatchResult, PriceType, ReputationSnapshot, RequestStatus, RetrievalCriteria,
    SearchRequest, ServiceListing,
};
pub use requests::{FindMatchesRequest, ListingSearchQuery, StatusTransitionRequest};
pub use responses::{
    CategoryCount, ErrorResponse, FindMatchesResponse, HealthResponse, ListingSearchResponse,
    StatsResponse,
};

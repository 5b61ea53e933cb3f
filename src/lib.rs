//! CraftLink Match - request/provider matching engine for the CraftLink marketplace
//!
//! This library implements the matching pipeline: candidate retrieval,
//! 8-factor compatibility scoring, fairness-constrained ranking, explanation
//! tagging, and tiered result caching.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{
    haversine_distance, EngineConfig, MatchEngine, MatchError, RankingCaps, ScoringWeights,
    StrategyKind,
};
pub use models::{
    FactorVector, MatchCandidate, MatchResult, ReputationSnapshot, SearchRequest, ServiceListing,
};

// Core engine exports
pub mod distance;
pub mod explain;
pub mod factors;
pub mod matcher;
pub mod rank;
pub mod scoring;

pub use distance::{calculate_bounding_box, haversine_distance, is_within_bounding_box};
pub use explain::explanation_tags;
pub use factors::compute_factors;
pub use matcher::{
    CollaborationStore, EngineConfig, ListingStore, MatchEngine, MatchError, MatchOutcome,
    ResultCache, StoreError, StrategyKind,
};
pub use rank::{rank_and_diversify, RankingCaps};
pub use scoring::{AdvancedStrategy, LegacyStrategy, ScoringStrategy, ScoringWeights, StrategyError};

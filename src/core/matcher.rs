use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use thiserror::Error;

use crate::core::{
    distance::haversine_distance,
    explain::explanation_tags,
    factors::compute_factors,
    rank::{rank_and_diversify, RankingCaps},
    scoring::{AdvancedStrategy, LegacyStrategy, ScoringStrategy, ScoringWeights, StrategyError},
};
use crate::models::{
    AppliedCriteria, CollaborationRecord, MatchCandidate, MatchResult, ReputationSnapshot,
    RetrievalCriteria, SearchRequest, ServiceListing,
};

/// Opaque failure from a backing store, carried up through the narrow traits
#[derive(Debug, Error)]
#[error("{0}")]
pub struct StoreError(pub String);

/// Candidate retrieval seam against the Listing Store
#[async_trait]
pub trait ListingStore: Send + Sync {
    /// Fetch matchable listings with their aggregated reputation, pre-sorted
    /// by ascending distance and capped at `criteria.limit`
    async fn fetch_candidates(
        &self,
        criteria: &RetrievalCriteria,
    ) -> Result<Vec<(ServiceListing, ReputationSnapshot)>, StoreError>;
}

/// Collaboration History Store seam (best-effort)
#[async_trait]
pub trait CollaborationStore: Send + Sync {
    async fn history(
        &self,
        requester_id: &str,
        provider_id: &str,
    ) -> Result<Option<CollaborationRecord>, StoreError>;
}

/// Result Cache seam; implementations own key construction and TTLs
///
/// Both operations are best-effort: a miss and an unavailable cache look the
/// same to the engine, which recomputes either way.
#[async_trait]
pub trait ResultCache: Send + Sync {
    async fn get_matches(&self, request_id: &str, strategy: &str) -> Option<MatchResult>;
    async fn put_matches(&self, request_id: &str, strategy: &str, result: &MatchResult);
    async fn invalidate_matches(&self, request_id: &str);
}

/// Which aggregation strategy the caller wants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrategyKind {
    #[default]
    Advanced,
    Legacy,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Advanced => "advanced",
            StrategyKind::Legacy => "legacy",
        }
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "advanced" => Ok(StrategyKind::Advanced),
            "legacy" => Ok(StrategyKind::Legacy),
            other => Err(format!("unknown strategy: {}", other)),
        }
    }
}

/// Errors fatal to a matching invocation
///
/// Lookup failures never reach here: the Request Store client reports a
/// missing request before the engine runs.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("search request {0} is not active")]
    RequestNotActive(String),

    #[error("listing store unavailable: {0}")]
    ListingStoreUnavailable(#[from] StoreError),

    #[error("scoring strategy failed: {0}")]
    Strategy(#[from] StrategyError),
}

/// Engine tunables, loaded from configuration with fixed defaults
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub fan_out_limit: usize,
    pub worker_pool_size: usize,
    pub caps: RankingCaps,
    pub weights: ScoringWeights,
    pub advanced_min_score: f64,
    pub legacy_min_score: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fan_out_limit: 100,
            worker_pool_size: 16,
            caps: RankingCaps::default(),
            weights: ScoringWeights::default(),
            advanced_min_score: 0.4,
            legacy_min_score: 0.3,
        }
    }
}

/// A computed result plus whether it came straight from the cache
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    pub result: MatchResult,
    pub from_cache: bool,
}

/// Candidates scored by whichever strategy actually ran
struct ScoredSet {
    candidates: Vec<MatchCandidate>,
    strategy_name: &'static str,
    min_score: f64,
}

/// The matching engine: retrieval, factor fan-out, aggregation, ranking
///
/// Holds its collaborators behind narrow injected traits so tests can swap in
/// in-memory doubles. One invocation is all-or-nothing: partial factor
/// results are never emitted.
pub struct MatchEngine<L, H, C> {
    listings: Arc<L>,
    collaborations: Arc<H>,
    cache: Arc<C>,
    config: EngineConfig,
}

impl<L, H, C> MatchEngine<L, H, C>
where
    L: ListingStore,
    H: CollaborationStore,
    C: ResultCache,
{
    pub fn new(listings: Arc<L>, collaborations: Arc<H>, cache: Arc<C>, config: EngineConfig) -> Self {
        Self {
            listings,
            collaborations,
            cache,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run the full matching pipeline for one active search request
    ///
    /// Cache hits short-circuit retrieval entirely. A failing Advanced
    /// aggregation is retried with Legacy over the same factor vectors
    /// before any error surfaces. An empty candidate list is a valid
    /// result, cached like any other.
    ///
    /// Cached sets are stored untrimmed; a caller's `limit_override` is
    /// applied on the way out, so differently-limited calls for the same
    /// request and strategy share one cache entry.
    pub async fn find_matches(
        &self,
        request: &SearchRequest,
        strategy: StrategyKind,
        limit_override: Option<usize>,
    ) -> Result<MatchOutcome, MatchError> {
        if !request.is_active() {
            return Err(MatchError::RequestNotActive(request.id.clone()));
        }

        if let Some(cached) = self.cache.get_matches(&request.id, strategy.as_str()).await {
            tracing::debug!("Match cache hit for request {}", request.id);
            return Ok(MatchOutcome {
                result: apply_result_limit(cached, limit_override),
                from_cache: true,
            });
        }

        let criteria = RetrievalCriteria::from_request(request, self.config.fan_out_limit);
        let retrieved = self.listings.fetch_candidates(&criteria).await?;
        let total_considered = retrieved.len();

        tracing::debug!(
            "Retrieved {} candidates for request {} within {}km",
            total_considered,
            request.id,
            request.radius_km
        );

        let unscored = self.compute_factor_vectors(request, retrieved).await;
        let scored = self.aggregate(request, unscored, strategy)?;
        let (candidates, applied) = self.assemble(request, scored);

        let result = MatchResult {
            request: request.clone(),
            total_candidates_considered: total_considered,
            total_returned: candidates.len(),
            candidates,
            applied_criteria: applied,
            generated_at: Utc::now(),
        };

        tracing::info!(
            "Matched request {}: {} returned of {} considered",
            request.id,
            result.total_returned,
            result.total_candidates_considered
        );

        self.cache
            .put_matches(&request.id, strategy.as_str(), &result)
            .await;

        Ok(MatchOutcome {
            result: apply_result_limit(result, limit_override),
            from_cache: false,
        })
    }

    /// Bounded parallel fan-out of per-candidate factor computation
    ///
    /// The collaboration lookup is the only suspension point; `buffered`
    /// preserves input order so repeated runs stay deterministic, and the
    /// fan-in completes before aggregation sees anything.
    async fn compute_factor_vectors(
        &self,
        request: &SearchRequest,
        retrieved: Vec<(ServiceListing, ReputationSnapshot)>,
    ) -> Vec<MatchCandidate> {
        let now = Utc::now();
        let concurrency = self.config.worker_pool_size.max(1);

        let mut candidates: Vec<MatchCandidate> = stream::iter(retrieved)
            .map(|(listing, reputation)| async move {
                let distance_km = haversine_distance(
                    request.latitude,
                    request.longitude,
                    listing.latitude,
                    listing.longitude,
                );

                let collaboration = match self
                    .collaborations
                    .history(&request.requester_id, &listing.provider_id)
                    .await
                {
                    Ok(record) => record,
                    Err(e) => {
                        tracing::warn!(
                            "Collaboration lookup failed for provider {}, degrading factor: {}",
                            listing.provider_id,
                            e
                        );
                        None
                    }
                };

                let factors = compute_factors(
                    request,
                    &listing,
                    &reputation,
                    collaboration.as_ref(),
                    distance_km,
                    now,
                );

                MatchCandidate {
                    listing,
                    reputation,
                    distance_km,
                    factors,
                    score: 0.0,
                    explanation_tags: vec![],
                }
            })
            .buffered(concurrency)
            .collect()
            .await;

        // Listings past the radius can slip through the SQL bounding box
        candidates.retain(|c| c.distance_km <= request.radius_km);
        candidates
    }

    /// Reduce factor vectors to scores, falling back to legacy on failure
    fn aggregate(
        &self,
        request: &SearchRequest,
        mut candidates: Vec<MatchCandidate>,
        strategy: StrategyKind,
    ) -> Result<ScoredSet, MatchError> {
        if strategy == StrategyKind::Advanced {
            match self.try_advanced(&mut candidates) {
                Ok(()) => {
                    return Ok(ScoredSet {
                        candidates,
                        strategy_name: "advanced",
                        min_score: self.config.advanced_min_score,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        "Advanced strategy failed for request {}, retrying with legacy: {}",
                        request.id,
                        e
                    );
                }
            }
        }

        let legacy = LegacyStrategy::new(self.config.legacy_min_score);
        for candidate in candidates.iter_mut() {
            candidate.score = legacy.aggregate(&candidate.factors)?;
        }

        Ok(ScoredSet {
            candidates,
            strategy_name: "legacy",
            min_score: legacy.min_score(),
        })
    }

    fn try_advanced(&self, candidates: &mut [MatchCandidate]) -> Result<(), StrategyError> {
        let strategy = AdvancedStrategy::new(self.config.weights, self.config.advanced_min_score)?;
        for candidate in candidates.iter_mut() {
            candidate.score = strategy.aggregate(&candidate.factors)?;
        }
        Ok(())
    }

    /// Rank, diversify, and attach explanations
    fn assemble(
        &self,
        request: &SearchRequest,
        scored: ScoredSet,
    ) -> (Vec<MatchCandidate>, AppliedCriteria) {
        let caps = self.config.caps;
        let mut admitted = rank_and_diversify(scored.candidates, scored.min_score, caps);
        for candidate in admitted.iter_mut() {
            candidate.explanation_tags = explanation_tags(&candidate.factors);
        }

        let applied = AppliedCriteria {
            strategy: scored.strategy_name.to_string(),
            radius_km: request.radius_km,
            category: request.category.clone(),
            budget_min: request.budget_min,
            budget_max: request.budget_max,
            min_score: scored.min_score,
            max_per_provider: caps.per_provider,
            max_results: caps.total,
        };

        (admitted, applied)
    }
}

/// Trim a full result down to a caller-requested size
///
/// An override can only narrow the configured total cap, never widen it, and
/// the trimmed size is echoed back through `applied_criteria`.
fn apply_result_limit(mut result: MatchResult, limit_override: Option<usize>) -> MatchResult {
    let Some(limit) = limit_override else {
        return result;
    };

    let limit = limit.min(result.applied_criteria.max_results);
    result.candidates.truncate(limit);
    result.total_returned = result.candidates.len();
    result.applied_criteria.max_results = limit;
    result
}

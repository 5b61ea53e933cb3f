// Engine-level integration tests against in-memory store doubles

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};

use craftlink_match::core::{
    CollaborationStore, EngineConfig, ListingStore, MatchEngine, ResultCache, StoreError,
    StrategyKind,
};
use craftlink_match::models::{
    CollaborationRecord, EducationLevel, MatchResult, PriceType, ReputationSnapshot,
    RequestStatus, RetrievalCriteria, SearchRequest, ServiceListing,
};

struct CountingListings {
    listings: Vec<(ServiceListing, ReputationSnapshot)>,
    calls: AtomicUsize,
}

impl CountingListings {
    fn new(listings: Vec<(ServiceListing, ReputationSnapshot)>) -> Self {
        Self {
            listings,
            calls: AtomicUsize::new(0),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ListingStore for CountingListings {
    async fn fetch_candidates(
        &self,
        criteria: &RetrievalCriteria,
    ) -> Result<Vec<(ServiceListing, ReputationSnapshot)>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // Mirror the store-side category filter
        let filtered: Vec<_> = self
            .listings
            .iter()
            .filter(|(listing, _)| listing.is_matchable())
            .cloned()
            .take(criteria.limit)
            .collect();
        Ok(filtered)
    }
}

struct FailingListings;

#[async_trait]
impl ListingStore for FailingListings {
    async fn fetch_candidates(
        &self,
        _: &RetrievalCriteria,
    ) -> Result<Vec<(ServiceListing, ReputationSnapshot)>, StoreError> {
        Err(StoreError("connection refused".to_string()))
    }
}

#[derive(Default)]
struct MapCollaborations {
    records: HashMap<(String, String), CollaborationRecord>,
}

#[async_trait]
impl CollaborationStore for MapCollaborations {
    async fn history(
        &self,
        requester_id: &str,
        provider_id: &str,
    ) -> Result<Option<CollaborationRecord>, StoreError> {
        Ok(self
            .records
            .get(&(requester_id.to_string(), provider_id.to_string()))
            .copied())
    }
}

struct FailingCollaborations;

#[async_trait]
impl CollaborationStore for FailingCollaborations {
    async fn history(&self, _: &str, _: &str) -> Result<Option<CollaborationRecord>, StoreError> {
        Err(StoreError("history store timeout".to_string()))
    }
}

#[derive(Default)]
struct MemoryCache {
    store: tokio::sync::Mutex<HashMap<String, MatchResult>>,
}

#[async_trait]
impl ResultCache for MemoryCache {
    async fn get_matches(&self, request_id: &str, strategy: &str) -> Option<MatchResult> {
        self.store
            .lock()
            .await
            .get(&format!("{}:{}", request_id, strategy))
            .cloned()
    }

    async fn put_matches(&self, request_id: &str, strategy: &str, result: &MatchResult) {
        self.store
            .lock()
            .await
            .insert(format!("{}:{}", request_id, strategy), result.clone());
    }

    async fn invalidate_matches(&self, request_id: &str) {
        self.store
            .lock()
            .await
            .retain(|key, _| !key.starts_with(&format!("{}:", request_id)));
    }
}

struct NoCache;

#[async_trait]
impl ResultCache for NoCache {
    async fn get_matches(&self, _: &str, _: &str) -> Option<MatchResult> {
        None
    }
    async fn put_matches(&self, _: &str, _: &str, _: &MatchResult) {}
    async fn invalidate_matches(&self, _: &str) {}
}

// Origin for all tests: Istanbul city center
const ORIGIN_LAT: f64 = 41.0;
const ORIGIN_LON: f64 = 29.0;

fn test_request() -> SearchRequest {
    SearchRequest {
        id: "req-1".to_string(),
        requester_id: "user-1".to_string(),
        category: Some("plumbing".to_string()),
        latitude: ORIGIN_LAT,
        longitude: ORIGIN_LON,
        radius_km: 10.0,
        budget_min: Some(1000.0),
        budget_max: Some(2000.0),
        price_type: Some(PriceType::Fixed),
        is_urgent: true,
        required_at: None,
        title: "Urgent pipe repair".to_string(),
        description: "Burst pipe in the kitchen".to_string(),
        status: RequestStatus::Active,
    }
}

fn listing_at(id: &str, provider: &str, km_north: f64) -> ServiceListing {
    ServiceListing {
        id: id.to_string(),
        provider_id: provider.to_string(),
        category: "plumbing".to_string(),
        latitude: ORIGIN_LAT + km_north / 111.0,
        longitude: ORIGIN_LON,
        price_from: 1500.0,
        price_to: 2500.0,
        price_type: PriceType::Fixed,
        is_active: true,
        is_available: true,
        subscription_active: true,
        urgent_capable: true,
        identity_verified: true,
        professional_verified: true,
        education_level: EducationLevel::Bachelor,
        has_mobility: false,
        last_active_at: Utc::now() - Duration::hours(1),
    }
}

fn top_reputation() -> ReputationSnapshot {
    ReputationSnapshot {
        average_rating: 5.0,
        rating_count: 50,
        completed_jobs: 100,
    }
}

fn engine_with(
    listings: Arc<CountingListings>,
) -> MatchEngine<CountingListings, MapCollaborations, NoCache> {
    MatchEngine::new(
        listings,
        Arc::new(MapCollaborations::default()),
        Arc::new(NoCache),
        EngineConfig::default(),
    )
}

#[tokio::test]
async fn test_scenario_strong_candidate_scores_high_with_tags() {
    // 2km away, in budget, top reputation, fully verified, urgent-capable
    let listings = Arc::new(CountingListings::new(vec![(
        listing_at("l1", "p1", 1.99),
        top_reputation(),
    )]));
    let engine = engine_with(Arc::clone(&listings));

    let outcome = engine
        .find_matches(&test_request(), StrategyKind::Advanced, None)
        .await
        .unwrap();

    assert_eq!(outcome.result.total_returned, 1);
    let candidate = &outcome.result.candidates[0];
    assert!(candidate.score > 0.85, "score was {}", candidate.score);
    assert!(candidate.distance_km <= 10.0);

    for expected in [
        "category match",
        "very close",
        "within budget",
        "excellent reputation",
        "verified provider",
    ] {
        assert!(
            candidate.explanation_tags.contains(&expected.to_string()),
            "missing tag '{}' in {:?}",
            expected,
            candidate.explanation_tags
        );
    }
}

#[tokio::test]
async fn test_scenario_category_mismatch_excluded() {
    // 5km away, unremarkable otherwise; the zeroed category factor leaves the
    // weighted sum below the 0.4 floor
    let mut listing = listing_at("l1", "p1", 5.0);
    listing.category = "electrical".to_string();
    listing.urgent_capable = false;
    listing.identity_verified = false;
    listing.professional_verified = false;
    listing.education_level = EducationLevel::Secondary;
    listing.last_active_at = Utc::now() - Duration::days(10);

    let reputation = ReputationSnapshot {
        average_rating: 2.5,
        rating_count: 1,
        completed_jobs: 1,
    };

    let listings = Arc::new(CountingListings::new(vec![(listing, reputation)]));
    let engine = engine_with(Arc::clone(&listings));

    let mut request = test_request();
    request.is_urgent = false;

    let outcome = engine
        .find_matches(&request, StrategyKind::Advanced, None)
        .await
        .unwrap();

    assert_eq!(outcome.result.total_candidates_considered, 1);
    assert_eq!(outcome.result.total_returned, 0);
}

#[tokio::test]
async fn test_scenario_provider_diversity_cap() {
    // Five candidates from one provider at increasing distances, so scores
    // strictly decrease; two independent providers further out
    let mut listings = Vec::new();
    for (i, km) in [1.0, 2.0, 3.0, 4.0, 5.0].iter().enumerate() {
        listings.push((
            listing_at(&format!("dom-{}", i), "dominant", *km),
            top_reputation(),
        ));
    }
    listings.push((listing_at("other-1", "p2", 6.0), top_reputation()));
    listings.push((listing_at("other-2", "p3", 7.0), top_reputation()));

    let store = Arc::new(CountingListings::new(listings));
    let engine = engine_with(Arc::clone(&store));

    let outcome = engine
        .find_matches(&test_request(), StrategyKind::Advanced, None)
        .await
        .unwrap();

    let dominant: Vec<_> = outcome
        .result
        .candidates
        .iter()
        .filter(|c| c.listing.provider_id == "dominant")
        .collect();

    // Only the two highest-scored entries from the dominant provider survive
    assert_eq!(dominant.len(), 2);
    assert_eq!(dominant[0].listing.id, "dom-0");
    assert_eq!(dominant[1].listing.id, "dom-1");

    // Other providers are unaffected
    assert!(outcome
        .result
        .candidates
        .iter()
        .any(|c| c.listing.provider_id == "p2"));
    assert!(outcome
        .result
        .candidates
        .iter()
        .any(|c| c.listing.provider_id == "p3"));

    // Global invariants
    assert!(outcome.result.candidates.len() <= 20);
    let mut per_provider: HashMap<&str, usize> = HashMap::new();
    for candidate in &outcome.result.candidates {
        *per_provider.entry(candidate.listing.provider_id.as_str()).or_insert(0) += 1;
    }
    assert!(per_provider.values().all(|&count| count <= 2));
}

#[tokio::test]
async fn test_scenario_empty_retrieval() {
    let listings = Arc::new(CountingListings::new(vec![]));
    let engine = engine_with(Arc::clone(&listings));

    let outcome = engine
        .find_matches(&test_request(), StrategyKind::Advanced, None)
        .await
        .unwrap();

    assert_eq!(outcome.result.total_returned, 0);
    assert!(outcome.result.candidates.is_empty());
    assert_eq!(outcome.result.total_candidates_considered, 0);
}

#[tokio::test]
async fn test_scores_within_bounds_and_threshold() {
    let listings: Vec<_> = (0..15)
        .map(|i| {
            (
                listing_at(&format!("l{}", i), &format!("p{}", i), 0.5 + i as f64 * 0.6),
                top_reputation(),
            )
        })
        .collect();
    let store = Arc::new(CountingListings::new(listings));
    let engine = engine_with(Arc::clone(&store));

    let outcome = engine
        .find_matches(&test_request(), StrategyKind::Advanced, None)
        .await
        .unwrap();

    assert!(!outcome.result.candidates.is_empty());
    for candidate in &outcome.result.candidates {
        assert!(candidate.score >= 0.4 && candidate.score <= 1.0);
        assert!(candidate.distance_km <= 10.0);
    }
}

#[tokio::test]
async fn test_determinism_across_runs() {
    let listings: Vec<_> = (0..10)
        .map(|i| {
            (
                listing_at(&format!("l{}", i), &format!("p{}", i % 4), 1.0 + i as f64),
                top_reputation(),
            )
        })
        .collect();
    let store = Arc::new(CountingListings::new(listings));
    let engine = engine_with(Arc::clone(&store));

    let first = engine
        .find_matches(&test_request(), StrategyKind::Advanced, None)
        .await
        .unwrap();
    let second = engine
        .find_matches(&test_request(), StrategyKind::Advanced, None)
        .await
        .unwrap();

    let first_view: Vec<(String, String)> = first
        .result
        .candidates
        .iter()
        .map(|c| (c.listing.id.clone(), format!("{:.12}", c.score)))
        .collect();
    let second_view: Vec<(String, String)> = second
        .result
        .candidates
        .iter()
        .map(|c| (c.listing.id.clone(), format!("{:.12}", c.score)))
        .collect();

    assert_eq!(first_view, second_view);
}

#[tokio::test]
async fn test_cache_idempotence_skips_retrieval() {
    let store = Arc::new(CountingListings::new(vec![(
        listing_at("l1", "p1", 2.0),
        top_reputation(),
    )]));
    let engine = MatchEngine::new(
        Arc::clone(&store),
        Arc::new(MapCollaborations::default()),
        Arc::new(MemoryCache::default()),
        EngineConfig::default(),
    );

    let first = engine
        .find_matches(&test_request(), StrategyKind::Advanced, None)
        .await
        .unwrap();
    assert!(!first.from_cache);
    assert_eq!(store.call_count(), 1);

    let second = engine
        .find_matches(&test_request(), StrategyKind::Advanced, None)
        .await
        .unwrap();
    assert!(second.from_cache);
    assert_eq!(store.call_count(), 1, "retriever must not run on a cache hit");

    let first_json = serde_json::to_string(&first.result).unwrap();
    let second_json = serde_json::to_string(&second.result).unwrap();
    assert_eq!(first_json, second_json);
}

#[tokio::test]
async fn test_limit_override_does_not_truncate_cache_entry() {
    // Ten distinct providers, all strong candidates within radius
    let listings: Vec<_> = (0..10)
        .map(|i| {
            (
                listing_at(&format!("l{}", i), &format!("p{}", i), 1.0 + i as f64 * 0.5),
                top_reputation(),
            )
        })
        .collect();
    let store = Arc::new(CountingListings::new(listings));
    let engine = MatchEngine::new(
        Arc::clone(&store),
        Arc::new(MapCollaborations::default()),
        Arc::new(MemoryCache::default()),
        EngineConfig::default(),
    );

    let limited = engine
        .find_matches(&test_request(), StrategyKind::Advanced, Some(1))
        .await
        .unwrap();
    assert_eq!(limited.result.total_returned, 1);
    assert_eq!(limited.result.applied_criteria.max_results, 1);

    // The full set must survive the earlier narrow call
    let full = engine
        .find_matches(&test_request(), StrategyKind::Advanced, None)
        .await
        .unwrap();
    assert!(full.from_cache);
    assert_eq!(full.result.total_returned, 10);

    // And a tighter override trims the shared entry on the hit path
    let trimmed = engine
        .find_matches(&test_request(), StrategyKind::Advanced, Some(5))
        .await
        .unwrap();
    assert!(trimmed.from_cache);
    assert_eq!(trimmed.result.total_returned, 5);
    assert_eq!(store.call_count(), 1);
}

#[tokio::test]
async fn test_empty_result_is_cached() {
    let store = Arc::new(CountingListings::new(vec![]));
    let engine = MatchEngine::new(
        Arc::clone(&store),
        Arc::new(MapCollaborations::default()),
        Arc::new(MemoryCache::default()),
        EngineConfig::default(),
    );

    let first = engine
        .find_matches(&test_request(), StrategyKind::Advanced, None)
        .await
        .unwrap();
    assert_eq!(first.result.total_returned, 0);

    let second = engine
        .find_matches(&test_request(), StrategyKind::Advanced, None)
        .await
        .unwrap();
    assert!(second.from_cache);
    assert_eq!(store.call_count(), 1);
}

#[tokio::test]
async fn test_listing_store_failure_is_fatal() {
    let engine = MatchEngine::new(
        Arc::new(FailingListings),
        Arc::new(MapCollaborations::default()),
        Arc::new(NoCache),
        EngineConfig::default(),
    );

    let result = engine
        .find_matches(&test_request(), StrategyKind::Advanced, None)
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_collaboration_failure_degrades_single_factor() {
    let store = Arc::new(CountingListings::new(vec![(
        listing_at("l1", "p1", 2.0),
        top_reputation(),
    )]));
    let engine = MatchEngine::new(
        Arc::clone(&store),
        Arc::new(FailingCollaborations),
        Arc::new(NoCache),
        EngineConfig::default(),
    );

    let outcome = engine
        .find_matches(&test_request(), StrategyKind::Advanced, None)
        .await
        .unwrap();

    assert_eq!(outcome.result.total_returned, 1);
    let candidate = &outcome.result.candidates[0];
    assert_eq!(candidate.factors.collaboration, 0.0);
    assert!(!candidate
        .explanation_tags
        .contains(&"prior successful collaboration".to_string()));
    // The other factors are untouched
    assert_eq!(candidate.factors.category, 1.0);
}

#[tokio::test]
async fn test_collaboration_history_raises_score_and_tag() {
    let mut collaborations = MapCollaborations::default();
    collaborations.records.insert(
        ("user-1".to_string(), "p1".to_string()),
        CollaborationRecord {
            completed_count: 3,
            average_rating: 4.8,
        },
    );

    let store = Arc::new(CountingListings::new(vec![(
        listing_at("l1", "p1", 2.0),
        top_reputation(),
    )]));
    let engine = MatchEngine::new(
        Arc::clone(&store),
        Arc::new(collaborations),
        Arc::new(NoCache),
        EngineConfig::default(),
    );

    let outcome = engine
        .find_matches(&test_request(), StrategyKind::Advanced, None)
        .await
        .unwrap();

    let candidate = &outcome.result.candidates[0];
    assert!(candidate.factors.collaboration > 0.0);
    assert!(candidate
        .explanation_tags
        .contains(&"prior successful collaboration".to_string()));
}

#[tokio::test]
async fn test_legacy_strategy_end_to_end() {
    let store = Arc::new(CountingListings::new(vec![(
        listing_at("l1", "p1", 2.0),
        top_reputation(),
    )]));
    let engine = engine_with(Arc::clone(&store));

    let outcome = engine
        .find_matches(&test_request(), StrategyKind::Legacy, None)
        .await
        .unwrap();

    assert_eq!(outcome.result.applied_criteria.strategy, "legacy");
    assert_eq!(outcome.result.total_returned, 1);
    assert!(outcome.result.candidates[0].score >= 0.3);
}

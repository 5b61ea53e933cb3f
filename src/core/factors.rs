use chrono::{DateTime, Utc};

use crate::models::{CollaborationRecord, FactorVector, ReputationSnapshot, SearchRequest, ServiceListing};

/// Text cues suggesting the work happens at the requester's premises
const ON_SITE_CUES: &[&str] = &[
    "on-site", "on site", "at home", "my home", "my house", "my place", "come to", "visit",
    "address", "apartment", "office",
];

/// Text cues suggesting the job is complex enough to favor certified pros
const COMPLEXITY_CUES: &[&str] = &[
    "complex", "complicated", "advanced", "professional", "certified", "expert", "detailed",
    "large", "industrial", "renovation",
];

/// Compute the full 8-dimension factor vector for one candidate listing
///
/// Each factor is independent and clamped to [0, 1]. A missing collaboration
/// record (lookup failed or no history) degrades only that factor, so the
/// caller passes `None` rather than aborting the candidate.
pub fn compute_factors(
    request: &SearchRequest,
    listing: &ServiceListing,
    reputation: &ReputationSnapshot,
    collaboration: Option<&CollaborationRecord>,
    distance_km: f64,
    now: DateTime<Utc>,
) -> FactorVector {
    FactorVector {
        category: category_factor(request, listing),
        proximity: proximity_factor(distance_km, request.radius_km),
        budget: budget_factor(request, listing),
        temporal: temporal_factor(request, listing, now),
        reputation: reputation_factor(reputation),
        verification: verification_factor(listing),
        collaboration: collaboration_factor(collaboration),
        preference: preference_factor(request, listing),
    }
}

/// Category compatibility: exact match or nothing
#[inline]
pub fn category_factor(request: &SearchRequest, listing: &ServiceListing) -> f64 {
    match &request.category {
        Some(category) if *category == listing.category => 1.0,
        Some(_) => 0.0,
        // Open browsing without a category treats every listing as compatible
        None => 1.0,
    }
}

/// Geographic proximity: linear decay, zero at the search-radius boundary
#[inline]
pub fn proximity_factor(distance_km: f64, radius_km: f64) -> f64 {
    if radius_km <= 0.0 {
        return 0.0;
    }
    (1.0 - distance_km / radius_km).max(0.0)
}

/// Budget compatibility against the listing's starting price
///
/// Tiers: inside the range 1.0, up to 20% over 0.7, up to 50% over 0.4,
/// beyond that 0.1. A request without a budget scores a neutral 0.8.
pub fn budget_factor(request: &SearchRequest, listing: &ServiceListing) -> f64 {
    let (min, max) = match (request.budget_min, request.budget_max) {
        (None, None) => return 0.8,
        (min, max) => (min.unwrap_or(0.0), max.unwrap_or(f64::MAX)),
    };

    let price = listing.price_from;
    if price >= min && price <= max {
        1.0
    } else if price <= max * 1.2 {
        0.7
    } else if price <= max * 1.5 {
        0.4
    } else {
        0.1
    }
}

/// Temporal availability: recency of provider activity plus urgency fit
pub fn temporal_factor(request: &SearchRequest, listing: &ServiceListing, now: DateTime<Utc>) -> f64 {
    let mut score: f64 = 0.5;

    if request.is_urgent && listing.urgent_capable {
        score += 0.4;
    }

    let idle_hours = (now - listing.last_active_at).num_hours();
    if idle_hours < 24 {
        score += 0.3;
    } else if idle_hours < 72 {
        score += 0.1;
    }

    if request.required_at.is_some() && listing.is_available {
        score += 0.2;
    }

    score.min(1.0)
}

/// Reputation: normalized rating plus stepped volume bonuses
pub fn reputation_factor(reputation: &ReputationSnapshot) -> f64 {
    let mut score = (reputation.average_rating / 5.0).clamp(0.0, 1.0);

    score += match reputation.rating_count {
        n if n >= 50 => 0.2,
        n if n >= 20 => 0.15,
        n if n >= 10 => 0.1,
        n if n >= 5 => 0.05,
        _ => 0.0,
    };

    score += match reputation.completed_jobs {
        n if n >= 100 => 0.15,
        n if n >= 50 => 0.1,
        n if n >= 20 => 0.05,
        _ => 0.0,
    };

    score.min(1.0)
}

/// Verification: identity, professional credentials, education tier
pub fn verification_factor(listing: &ServiceListing) -> f64 {
    let mut score: f64 = 0.0;

    if listing.identity_verified {
        score += 0.6;
    }
    if listing.professional_verified {
        score += 0.4;
    }
    if listing.education_level.is_advanced() {
        score += 0.2;
    }

    score.min(1.0)
}

/// Collaboration history between this requester and provider
///
/// `None` covers both "no prior history" and "lookup unavailable"; either way
/// the factor degrades to zero without affecting the other seven.
pub fn collaboration_factor(collaboration: Option<&CollaborationRecord>) -> f64 {
    let record = match collaboration {
        Some(record) if record.exists() => record,
        _ => return 0.0,
    };

    let mut score = (record.completed_count as f64 * 0.2).min(0.8);

    if record.average_rating >= 4.5 {
        score += 0.2;
    } else if record.average_rating >= 4.0 {
        score += 0.1;
    }

    score.min(1.0)
}

/// Requester-preference affinity derived from free-text cues
pub fn preference_factor(request: &SearchRequest, listing: &ServiceListing) -> f64 {
    let text = request.free_text();
    let mut score: f64 = 0.5;

    if listing.has_mobility && contains_cue(&text, ON_SITE_CUES) {
        score += 0.3;
    }
    if listing.professional_verified && contains_cue(&text, COMPLEXITY_CUES) {
        score += 0.2;
    }

    score.min(1.0)
}

#[inline]
fn contains_cue(text: &str, cues: &[&str]) -> bool {
    cues.iter().any(|cue| text.contains(cue))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use crate::models::{EducationLevel, PriceType, RequestStatus};

    fn test_request() -> SearchRequest {
        SearchRequest {
            id: "req-1".to_string(),
            requester_id: "user-1".to_string(),
            category: Some("plumbing".to_string()),
            latitude: 41.0082,
            longitude: 28.9784,
            radius_km: 10.0,
            budget_min: Some(1000.0),
            budget_max: Some(2000.0),
            price_type: Some(PriceType::Fixed),
            is_urgent: false,
            required_at: None,
            title: "Fix leaking pipe".to_string(),
            description: "Kitchen sink pipe is leaking".to_string(),
            status: RequestStatus::Active,
        }
    }

    fn test_listing() -> ServiceListing {
        ServiceListing {
            id: "lst-1".to_string(),
            provider_id: "prov-1".to_string(),
            category: "plumbing".to_string(),
            latitude: 41.01,
            longitude: 28.98,
            price_from: 1500.0,
            price_to: 2500.0,
            price_type: PriceType::Fixed,
            is_active: true,
            is_available: true,
            subscription_active: true,
            urgent_capable: false,
            identity_verified: false,
            professional_verified: false,
            education_level: EducationLevel::Secondary,
            has_mobility: false,
            last_active_at: Utc::now(),
        }
    }

    #[test]
    fn test_category_exact_match() {
        let request = test_request();
        let listing = test_listing();
        assert_eq!(category_factor(&request, &listing), 1.0);

        let mut other = test_listing();
        other.category = "electrical".to_string();
        assert_eq!(category_factor(&request, &other), 0.0);
    }

    #[test]
    fn test_category_open_browsing() {
        let mut request = test_request();
        request.category = None;
        assert_eq!(category_factor(&request, &test_listing()), 1.0);
    }

    #[test]
    fn test_proximity_linear_decay() {
        assert_eq!(proximity_factor(0.0, 10.0), 1.0);
        assert!((proximity_factor(2.0, 10.0) - 0.8).abs() < 1e-9);
        assert!((proximity_factor(5.0, 10.0) - 0.5).abs() < 1e-9);
        assert_eq!(proximity_factor(10.0, 10.0), 0.0);
        assert_eq!(proximity_factor(15.0, 10.0), 0.0);
    }

    #[test]
    fn test_budget_tiers() {
        let request = test_request(); // budget [1000, 2000]
        let mut listing = test_listing();

        listing.price_from = 1500.0;
        assert_eq!(budget_factor(&request, &listing), 1.0);

        listing.price_from = 2300.0; // within 1.2×
        assert_eq!(budget_factor(&request, &listing), 0.7);

        listing.price_from = 2900.0; // within 1.5×
        assert_eq!(budget_factor(&request, &listing), 0.4);

        listing.price_from = 5000.0;
        assert_eq!(budget_factor(&request, &listing), 0.1);
    }

    #[test]
    fn test_budget_neutral_without_range() {
        let mut request = test_request();
        request.budget_min = None;
        request.budget_max = None;
        assert_eq!(budget_factor(&request, &test_listing()), 0.8);
    }

    #[test]
    fn test_temporal_urgency_and_recency() {
        let mut request = test_request();
        let mut listing = test_listing();
        let now = Utc::now();

        // Recently active, no urgency involved: 0.5 + 0.3
        listing.last_active_at = now - Duration::hours(1);
        assert!((temporal_factor(&request, &listing, now) - 0.8).abs() < 1e-9);

        // Urgent request met by an urgent-capable provider caps at 1.0
        request.is_urgent = true;
        listing.urgent_capable = true;
        assert_eq!(temporal_factor(&request, &listing, now), 1.0);

        // Stale provider: 0.5 + 0.4 only
        listing.last_active_at = now - Duration::hours(100);
        assert!((temporal_factor(&request, &listing, now) - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_temporal_required_date_bonus() {
        let mut request = test_request();
        request.required_at = Some(Utc::now() + Duration::days(3));
        let mut listing = test_listing();
        let now = Utc::now();
        listing.last_active_at = now - Duration::hours(48);

        // 0.5 + 0.1 (72h recency) + 0.2 (date declared available)
        assert!((temporal_factor(&request, &listing, now) - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_reputation_steps() {
        let top = ReputationSnapshot {
            average_rating: 5.0,
            rating_count: 50,
            completed_jobs: 100,
        };
        assert_eq!(reputation_factor(&top), 1.0);

        let mid = ReputationSnapshot {
            average_rating: 4.0,
            rating_count: 12,
            completed_jobs: 25,
        };
        // 0.8 + 0.1 + 0.05
        assert!((reputation_factor(&mid) - 0.95).abs() < 1e-9);

        let fresh = ReputationSnapshot::default();
        assert_eq!(reputation_factor(&fresh), 0.0);
    }

    #[test]
    fn test_verification_components() {
        let mut listing = test_listing();
        assert_eq!(verification_factor(&listing), 0.0);

        listing.identity_verified = true;
        assert!((verification_factor(&listing) - 0.6).abs() < 1e-9);

        listing.professional_verified = true;
        assert!((verification_factor(&listing) - 1.0).abs() < 1e-9);

        listing.education_level = EducationLevel::Master;
        assert_eq!(verification_factor(&listing), 1.0);
    }

    #[test]
    fn test_collaboration_history() {
        assert_eq!(collaboration_factor(None), 0.0);

        let none = CollaborationRecord::default();
        assert_eq!(collaboration_factor(Some(&none)), 0.0);

        let good = CollaborationRecord {
            completed_count: 2,
            average_rating: 4.7,
        };
        // 0.4 + 0.2
        assert!((collaboration_factor(Some(&good)) - 0.6).abs() < 1e-9);

        let many = CollaborationRecord {
            completed_count: 10,
            average_rating: 4.2,
        };
        // capped count contribution 0.8 + 0.1
        assert!((collaboration_factor(Some(&many)) - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_preference_cues() {
        let mut request = test_request();
        let mut listing = test_listing();
        assert!((preference_factor(&request, &listing) - 0.5).abs() < 1e-9);

        request.description = "Please come to my home, it is a complex renovation".to_string();
        listing.has_mobility = true;
        listing.professional_verified = true;
        assert_eq!(preference_factor(&request, &listing), 1.0);

        listing.professional_verified = false;
        assert!((preference_factor(&request, &listing) - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_all_factors_in_range() {
        let request = test_request();
        let listing = test_listing();
        let reputation = ReputationSnapshot {
            average_rating: 4.8,
            rating_count: 120,
            completed_jobs: 300,
        };
        let collab = CollaborationRecord {
            completed_count: 7,
            average_rating: 5.0,
        };

        let factors = compute_factors(&request, &listing, &reputation, Some(&collab), 3.0, Utc::now());

        for value in [
            factors.category,
            factors.proximity,
            factors.budget,
            factors.temporal,
            factors.reputation,
            factors.verification,
            factors.collaboration,
            factors.preference,
        ] {
            assert!((0.0..=1.0).contains(&value), "factor out of range: {}", value);
        }
    }
}

use std::collections::HashMap;

use crate::models::MatchCandidate;

/// Caps applied when ranking and diversifying scored candidates
#[derive(Debug, Clone, Copy)]
pub struct RankingCaps {
    /// Candidates kept after sorting, before the provider walk
    pub shortlist: usize,
    /// Admissions allowed per provider
    pub per_provider: usize,
    /// Final result size
    pub total: usize,
}

impl Default for RankingCaps {
    fn default() -> Self {
        Self {
            shortlist: 25,
            per_provider: 2,
            total: 20,
        }
    }
}

/// Filter by minimum score, sort, and enforce the per-provider cap
///
/// Sort order is descending score with ascending distance then listing id as
/// tie-breaks, so identical inputs always produce identical orderings. The
/// provider walk admits in score order using a per-provider counter.
pub fn rank_and_diversify(
    mut candidates: Vec<MatchCandidate>,
    min_score: f64,
    caps: RankingCaps,
) -> Vec<MatchCandidate> {
    candidates.retain(|c| c.score >= min_score);

    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                a.distance_km
                    .partial_cmp(&b.distance_km)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| a.listing.id.cmp(&b.listing.id))
    });

    candidates.truncate(caps.shortlist);

    let mut admitted_per_provider: HashMap<String, usize> = HashMap::new();
    let mut admitted = Vec::with_capacity(caps.total.min(candidates.len()));

    for candidate in candidates {
        if admitted.len() >= caps.total {
            break;
        }
        let count = admitted_per_provider
            .entry(candidate.listing.provider_id.clone())
            .or_insert(0);
        if *count < caps.per_provider {
            *count += 1;
            admitted.push(candidate);
        }
    }

    admitted
}

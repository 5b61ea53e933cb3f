use thiserror::Error;

use crate::models::FactorVector;

/// Weight vectors must sum to 1.0 within this tolerance
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Errors from score aggregation
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("strategy weights sum to {0}, expected 1.0")]
    InvalidWeights(f64),

    #[error("aggregation produced a non-finite score")]
    NonFiniteScore,
}

/// A score-aggregation strategy over the shared factor vector
///
/// Both implementations reduce the same eight factors to a single normalized
/// score in [0, 1], so they stay interchangeable and cannot drift apart on
/// factor semantics.
pub trait ScoringStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Candidates scoring below this are discarded before ranking
    fn min_score(&self) -> f64;

    fn aggregate(&self, factors: &FactorVector) -> Result<f64, StrategyError>;
}

/// Per-factor weights for the advanced strategy
#[derive(Debug, Clone, Copy)]
pub struct ScoringWeights {
    pub category: f64,
    pub proximity: f64,
    pub budget: f64,
    pub temporal: f64,
    pub reputation: f64,
    pub verification: f64,
    pub collaboration: f64,
    pub preference: f64,
}

impl ScoringWeights {
    pub fn sum(&self) -> f64 {
        self.category
            + self.proximity
            + self.budget
            + self.temporal
            + self.reputation
            + self.verification
            + self.collaboration
            + self.preference
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            category: 0.25,
            proximity: 0.20,
            budget: 0.15,
            temporal: 0.10,
            reputation: 0.10,
            verification: 0.08,
            collaboration: 0.07,
            preference: 0.05,
        }
    }
}

/// Weighted-sum strategy with a 0.4 floor
#[derive(Debug, Clone)]
pub struct AdvancedStrategy {
    weights: ScoringWeights,
    min_score: f64,
}

impl AdvancedStrategy {
    /// Build the strategy, rejecting weight vectors that do not sum to 1.0
    pub fn new(weights: ScoringWeights, min_score: f64) -> Result<Self, StrategyError> {
        let sum = weights.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(StrategyError::InvalidWeights(sum));
        }
        Ok(Self { weights, min_score })
    }

    pub fn with_default_weights() -> Self {
        Self {
            weights: ScoringWeights::default(),
            min_score: 0.4,
        }
    }
}

impl ScoringStrategy for AdvancedStrategy {
    fn name(&self) -> &'static str {
        "advanced"
    }

    fn min_score(&self) -> f64 {
        self.min_score
    }

    fn aggregate(&self, factors: &FactorVector) -> Result<f64, StrategyError> {
        let w = &self.weights;
        let score = factors.category * w.category
            + factors.proximity * w.proximity
            + factors.budget * w.budget
            + factors.temporal * w.temporal
            + factors.reputation * w.reputation
            + factors.verification * w.verification
            + factors.collaboration * w.collaboration
            + factors.preference * w.preference;

        if !score.is_finite() {
            return Err(StrategyError::NonFiniteScore);
        }

        Ok(score.clamp(0.0, 1.0))
    }
}

/// Tiered point scheme kept for fallback compatibility
///
/// Points accumulate against a running maximum; bonuses for urgency-match and
/// mobility-match raise both sides, so the final points/max ratio stays
/// self-normalizing in [0, 1].
#[derive(Debug, Clone, Default)]
pub struct LegacyStrategy {
    min_score: f64,
}

impl LegacyStrategy {
    pub fn new(min_score: f64) -> Self {
        Self { min_score }
    }
}

impl ScoringStrategy for LegacyStrategy {
    fn name(&self) -> &'static str {
        "legacy"
    }

    fn min_score(&self) -> f64 {
        if self.min_score > 0.0 {
            self.min_score
        } else {
            0.3
        }
    }

    fn aggregate(&self, factors: &FactorVector) -> Result<f64, StrategyError> {
        let mut points = 0.0;
        let mut max_points = 0.0;

        // Category: all or nothing
        max_points += 40.0;
        if factors.category >= 1.0 {
            points += 40.0;
        }

        // Distance tiers
        max_points += 25.0;
        points += if factors.proximity >= 0.8 {
            25.0
        } else if factors.proximity >= 0.6 {
            20.0
        } else if factors.proximity >= 0.4 {
            15.0
        } else if factors.proximity >= 0.2 {
            10.0
        } else {
            5.0
        };

        // Budget tiers
        max_points += 20.0;
        points += if factors.budget >= 1.0 {
            20.0
        } else if factors.budget >= 0.7 {
            17.0
        } else if factors.budget >= 0.4 {
            15.0
        } else {
            0.0
        };

        // Reputation and verification scale into their caps
        max_points += 10.0;
        points += factors.reputation * 10.0;

        max_points += 5.0;
        points += factors.verification * 5.0;

        // Bonuses widen the scale as well as the score
        if factors.temporal >= 0.9 {
            points += 5.0;
            max_points += 5.0;
        }
        if factors.preference >= 0.8 {
            points += 5.0;
            max_points += 5.0;
        }

        let score = points / max_points;
        if !score.is_finite() {
            return Err(StrategyError::NonFiniteScore);
        }

        Ok(score.clamp(0.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strong_factors() -> FactorVector {
        FactorVector {
            category: 1.0,
            proximity: 0.8,
            budget: 1.0,
            temporal: 1.0,
            reputation: 1.0,
            verification: 1.0,
            collaboration: 0.0,
            preference: 0.5,
        }
    }

    #[test]
    fn test_default_weights_sum_to_one() {
        let sum = ScoringWeights::default().sum();
        assert!((sum - 1.0).abs() < 1e-6, "weights sum to {}", sum);
    }

    #[test]
    fn test_advanced_rejects_bad_weights() {
        let mut weights = ScoringWeights::default();
        weights.category = 0.5;
        assert!(AdvancedStrategy::new(weights, 0.4).is_err());
    }

    #[test]
    fn test_advanced_strong_candidate() {
        let strategy = AdvancedStrategy::with_default_weights();
        let score = strategy.aggregate(&strong_factors()).unwrap();
        assert!(score > 0.85, "expected > 0.85, got {}", score);
        assert!(score <= 1.0);
    }

    #[test]
    fn test_advanced_category_mismatch_sinks_weak_candidate() {
        let strategy = AdvancedStrategy::with_default_weights();
        let factors = FactorVector {
            category: 0.0,
            proximity: 0.5,
            budget: 1.0,
            temporal: 0.5,
            reputation: 0.5,
            verification: 0.0,
            collaboration: 0.0,
            preference: 0.5,
        };
        let score = strategy.aggregate(&factors).unwrap();
        assert!(score < strategy.min_score(), "expected < 0.4, got {}", score);
    }

    #[test]
    fn test_advanced_score_bounds() {
        let strategy = AdvancedStrategy::with_default_weights();

        let zero = strategy.aggregate(&FactorVector::default()).unwrap();
        assert_eq!(zero, 0.0);

        let max = strategy
            .aggregate(&FactorVector {
                category: 1.0,
                proximity: 1.0,
                budget: 1.0,
                temporal: 1.0,
                reputation: 1.0,
                verification: 1.0,
                collaboration: 1.0,
                preference: 1.0,
            })
            .unwrap();
        assert!((max - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_legacy_self_normalizing() {
        let strategy = LegacyStrategy::default();

        let perfect = strategy
            .aggregate(&FactorVector {
                category: 1.0,
                proximity: 1.0,
                budget: 1.0,
                temporal: 1.0,
                reputation: 1.0,
                verification: 1.0,
                collaboration: 1.0,
                preference: 1.0,
            })
            .unwrap();
        assert!((perfect - 1.0).abs() < 1e-9);

        let nothing = strategy.aggregate(&FactorVector::default()).unwrap();
        assert!(nothing > 0.0 && nothing < strategy.min_score());
    }

    #[test]
    fn test_legacy_bonus_widens_scale() {
        let strategy = LegacyStrategy::default();
        let mut factors = strong_factors();
        // A perfect base would stay at 1.0 either way; drop proximity a tier
        factors.proximity = 0.5;

        let without_bonus = {
            factors.temporal = 0.5;
            strategy.aggregate(&factors).unwrap()
        };
        let with_bonus = {
            factors.temporal = 1.0;
            strategy.aggregate(&factors).unwrap()
        };

        assert!(with_bonus > without_bonus);
        assert!(with_bonus <= 1.0);
    }

    #[test]
    fn test_strategies_agree_on_direction() {
        let advanced = AdvancedStrategy::with_default_weights();
        let legacy = LegacyStrategy::default();

        let strong = strong_factors();
        let weak = FactorVector {
            category: 0.0,
            proximity: 0.1,
            ..FactorVector::default()
        };

        assert!(advanced.aggregate(&strong).unwrap() > advanced.aggregate(&weak).unwrap());
        assert!(legacy.aggregate(&strong).unwrap() > legacy.aggregate(&weak).unwrap());
    }
}

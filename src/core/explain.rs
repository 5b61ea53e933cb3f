use crate::models::FactorVector;

/// Derive ordered rationale tags from a factor vector
///
/// Pure threshold checks; the order is fixed so identical vectors always
/// produce identical tag lists.
pub fn explanation_tags(factors: &FactorVector) -> Vec<String> {
    let mut tags = Vec::new();

    if factors.category >= 1.0 {
        tags.push("category match");
    }

    if factors.proximity >= 0.8 {
        tags.push("very close");
    } else if factors.proximity >= 0.5 {
        tags.push("acceptable distance");
    }

    if factors.budget >= 0.8 {
        tags.push("within budget");
    }

    if factors.reputation >= 0.8 {
        tags.push("excellent reputation");
    }

    if factors.verification >= 0.6 {
        tags.push("verified provider");
    }

    if factors.collaboration > 0.0 {
        tags.push("prior successful collaboration");
    }

    tags.into_iter().map(str::to_string).collect()
}

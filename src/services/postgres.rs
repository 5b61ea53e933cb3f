use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::time::Duration;
use thiserror::Error;

use crate::core::{CollaborationStore, ListingStore, StoreError};
use crate::core::distance::calculate_bounding_box;
use crate::models::{
    CollaborationRecord, EducationLevel, PriceType, ReputationSnapshot, RetrievalCriteria,
    ServiceListing,
};

/// Errors that can occur when interacting with PostgreSQL
#[derive(Debug, Error)]
pub enum PostgresError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// PostgreSQL client for the Listing and Collaboration History stores
///
/// The schema is owned by the platform backend; this client only reads it.
/// Reputation is aggregated per provider at read time via a join, so every
/// candidate arrives with its snapshot in one round trip.
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, PostgresError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(600))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Create a new PostgreSQL client from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
    ) -> Result<Self, PostgresError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(url, max_connections.unwrap_or(10), min_connections.unwrap_or(1)).await
    }

    /// Query matchable listings near an origin, nearest first
    ///
    /// The bounding box does the cheap SQL pre-filter; the engine applies the
    /// exact haversine cut afterwards. Ordering uses squared coordinate
    /// deltas, which preserves the distance order at these radii.
    pub async fn query_listings(
        &self,
        criteria: &RetrievalCriteria,
    ) -> Result<Vec<(ServiceListing, ReputationSnapshot)>, PostgresError> {
        let bbox = calculate_bounding_box(criteria.origin_lat, criteria.origin_lon, criteria.radius_km);

        let query = r#"
            SELECT
                l.listing_id, l.provider_id, l.category,
                l.latitude, l.longitude,
                l.price_from, l.price_to, l.price_type,
                l.is_active, l.is_available, l.subscription_active,
                l.urgent_capable, l.identity_verified, l.professional_verified,
                l.education_level, l.has_mobility, l.last_active_at,
                COALESCE(r.average_rating, 0) AS average_rating,
                COALESCE(r.rating_count, 0) AS rating_count,
                COALESCE(r.completed_jobs, 0) AS completed_jobs
            FROM service_listings l
            LEFT JOIN provider_reputation r ON r.provider_id = l.provider_id
            WHERE l.is_active = TRUE
              AND l.is_available = TRUE
              AND l.subscription_active = TRUE
              AND l.latitude BETWEEN $1 AND $2
              AND l.longitude BETWEEN $3 AND $4
              AND ($5::text IS NULL OR l.category = $5)
              AND ($6::float8 IS NULL OR l.price_from >= $6)
              AND ($7::float8 IS NULL OR l.price_from <= $7)
              AND (NOT $8 OR l.urgent_capable)
            ORDER BY
                (l.latitude - $9) * (l.latitude - $9)
                + (l.longitude - $10) * (l.longitude - $10) ASC
            LIMIT $11
        "#;

        let rows = sqlx::query(query)
            .bind(bbox.min_lat)
            .bind(bbox.max_lat)
            .bind(bbox.min_lon)
            .bind(bbox.max_lon)
            .bind(criteria.category.as_deref())
            .bind(criteria.budget_min)
            .bind(criteria.budget_max)
            .bind(criteria.urgent_only)
            .bind(criteria.origin_lat)
            .bind(criteria.origin_lon)
            .bind(criteria.limit as i64)
            .fetch_all(&self.pool)
            .await?;

        let candidates = rows
            .iter()
            .map(|row| {
                let listing = ServiceListing {
                    id: row.get("listing_id"),
                    provider_id: row.get("provider_id"),
                    category: row.get("category"),
                    latitude: row.get("latitude"),
                    longitude: row.get("longitude"),
                    price_from: row.get("price_from"),
                    price_to: row.get("price_to"),
                    price_type: parse_price_type(&row.get::<String, _>("price_type")),
                    is_active: row.get("is_active"),
                    is_available: row.get("is_available"),
                    subscription_active: row.get("subscription_active"),
                    urgent_capable: row.get("urgent_capable"),
                    identity_verified: row.get("identity_verified"),
                    professional_verified: row.get("professional_verified"),
                    education_level: parse_education_level(&row.get::<String, _>("education_level")),
                    has_mobility: row.get("has_mobility"),
                    last_active_at: row.get("last_active_at"),
                };
                let reputation = ReputationSnapshot {
                    average_rating: row.get("average_rating"),
                    rating_count: row.get::<i64, _>("rating_count") as u32,
                    completed_jobs: row.get::<i64, _>("completed_jobs") as u32,
                };
                (listing, reputation)
            })
            .collect();

        Ok(candidates)
    }

    /// Prior completed interactions between one requester and one provider
    pub async fn collaboration_history(
        &self,
        requester_id: &str,
        provider_id: &str,
    ) -> Result<Option<CollaborationRecord>, PostgresError> {
        let query = r#"
            SELECT
                COUNT(*) AS completed_count,
                COALESCE(AVG((requester_rating + provider_rating) / 2.0), 0)::float8 AS average_rating
            FROM collaborations
            WHERE requester_id = $1
              AND provider_id = $2
              AND status = 'completed'
        "#;

        let row = sqlx::query(query)
            .bind(requester_id)
            .bind(provider_id)
            .fetch_one(&self.pool)
            .await?;

        let completed_count = row.get::<i64, _>("completed_count") as u32;
        if completed_count == 0 {
            return Ok(None);
        }

        Ok(Some(CollaborationRecord {
            completed_count,
            average_rating: row.get("average_rating"),
        }))
    }

    /// Count of active, available, subscribed listings
    pub async fn count_active_listings(&self) -> Result<u64, PostgresError> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total
            FROM service_listings
            WHERE is_active = TRUE AND is_available = TRUE AND subscription_active = TRUE
        "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get::<i64, _>("total") as u64)
    }

    /// Active listing counts per category, largest first
    pub async fn category_counts(&self) -> Result<Vec<(String, u64)>, PostgresError> {
        let rows = sqlx::query(
            r#"
            SELECT category, COUNT(*) AS total
            FROM service_listings
            WHERE is_active = TRUE AND is_available = TRUE AND subscription_active = TRUE
            GROUP BY category
            ORDER BY total DESC, category ASC
        "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| (row.get("category"), row.get::<i64, _>("total") as u64))
            .collect())
    }

    /// Check database connectivity
    pub async fn health_check(&self) -> Result<bool, PostgresError> {
        let row = sqlx::query("SELECT 1 AS one").fetch_one(&self.pool).await?;
        Ok(row.get::<i32, _>("one") == 1)
    }
}

fn parse_price_type(raw: &str) -> PriceType {
    match raw {
        "fixed" => PriceType::Fixed,
        "hourly" => PriceType::Hourly,
        "daily" => PriceType::Daily,
        "negotiable" => PriceType::Negotiable,
        other => {
            tracing::warn!("Unknown price type '{}', treating as negotiable", other);
            PriceType::Negotiable
        }
    }
}

fn parse_education_level(raw: &str) -> EducationLevel {
    match raw {
        "primary" => EducationLevel::Primary,
        "secondary" => EducationLevel::Secondary,
        "associate" => EducationLevel::Associate,
        "bachelor" => EducationLevel::Bachelor,
        "master" => EducationLevel::Master,
        "doctorate" => EducationLevel::Doctorate,
        other => {
            tracing::warn!("Unknown education level '{}', treating as secondary", other);
            EducationLevel::Secondary
        }
    }
}

#[async_trait]
impl ListingStore for PostgresClient {
    async fn fetch_candidates(
        &self,
        criteria: &RetrievalCriteria,
    ) -> Result<Vec<(ServiceListing, ReputationSnapshot)>, StoreError> {
        self.query_listings(criteria)
            .await
            .map_err(|e| StoreError(e.to_string()))
    }
}

#[async_trait]
impl CollaborationStore for PostgresClient {
    async fn history(
        &self,
        requester_id: &str,
        provider_id: &str,
    ) -> Result<Option<CollaborationRecord>, StoreError> {
        self.collaboration_history(requester_id, provider_id)
            .await
            .map_err(|e| StoreError(e.to_string()))
    }
}

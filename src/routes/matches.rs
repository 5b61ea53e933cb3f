use actix_web::{web, HttpResponse, Responder};
use std::str::FromStr;
use std::sync::Arc;
use validator::Validate;

use crate::core::{MatchEngine, MatchError, ResultCache, StrategyKind};
use crate::models::{
    ErrorResponse, FindMatchesRequest, FindMatchesResponse, HealthResponse, ListingSearchQuery,
    ListingSearchResponse, RetrievalCriteria, StatsResponse, StatusTransitionRequest,
};
use crate::models::responses::CategoryCount;
use crate::services::{
    BackendClient, BackendError, CacheKey, CacheTier, EventBus, MatchCache, MatchesComputedEvent,
    PostgresClient,
};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<BackendClient>,
    pub postgres: Arc<PostgresClient>,
    pub cache: MatchCache,
    pub engine: Arc<MatchEngine<PostgresClient, PostgresClient, MatchCache>>,
    pub events: EventBus,
}

/// Configure all matching-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/matches/find", web::post().to(find_matches))
        .route("/listings/search", web::get().to(search_listings))
        .route("/stats", web::get().to(stats))
        .route("/requests/{id}/status", web::post().to(update_request_status));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let pg_healthy = state.postgres.health_check().await.unwrap_or(false);
    let status = if pg_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Run matching for a search request
///
/// POST /api/v1/matches/find
///
/// Request body:
/// ```json
/// {
///   "requestId": "string",
///   "strategy": "advanced|legacy",
///   "limit": 20
/// }
/// ```
async fn find_matches(
    state: web::Data<AppState>,
    req: web::Json<FindMatchesRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Validation failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        });
    }

    let strategy = match &req.strategy {
        Some(raw) => match StrategyKind::from_str(raw) {
            Ok(kind) => kind,
            Err(message) => {
                return HttpResponse::BadRequest().json(ErrorResponse {
                    error: "Invalid strategy".to_string(),
                    message,
                    status_code: 400,
                });
            }
        },
        None => StrategyKind::default(),
    };

    tracing::info!(
        "Finding matches for request {} (strategy {})",
        req.request_id,
        strategy.as_str()
    );

    // Request Context Loader: resolve the full request snapshot
    let request = match state.backend.get_request(&req.request_id).await {
        Ok(request) => request,
        Err(BackendError::NotFound(message)) => {
            return HttpResponse::NotFound().json(ErrorResponse {
                error: "Request not found".to_string(),
                message,
                status_code: 404,
            });
        }
        Err(e) => {
            tracing::error!("Failed to load request {}: {}", req.request_id, e);
            return HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Failed to load request".to_string(),
                message: e.to_string(),
                status_code: 500,
            });
        }
    };

    let limit_override = req.limit.map(|limit| limit as usize);

    match state.engine.find_matches(&request, strategy, limit_override).await {
        Ok(outcome) => {
            if !outcome.from_cache {
                state
                    .events
                    .emit(MatchesComputedEvent::from_result(&outcome.result));
            }
            HttpResponse::Ok().json(FindMatchesResponse {
                result: outcome.result,
                from_cache: outcome.from_cache,
            })
        }
        Err(e @ MatchError::RequestNotActive(_)) => {
            HttpResponse::NotFound().json(ErrorResponse {
                error: "Request not matchable".to_string(),
                message: e.to_string(),
                status_code: 404,
            })
        }
        Err(e) => {
            tracing::error!("Matching failed for request {}: {}", req.request_id, e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Matching failed".to_string(),
                message: e.to_string(),
                status_code: 500,
            })
        }
    }
}

/// Open browsing search over listings, cached by filter-set hash
///
/// GET /api/v1/listings/search?category=...&lat=...&lon=...&radiusKm=...
async fn search_listings(
    state: web::Data<AppState>,
    query: web::Query<ListingSearchQuery>,
) -> impl Responder {
    if let Err(errors) = query.validate() {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Validation failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        });
    }

    let key = CacheKey::listing_search(&query);

    if let Some(manager) = state.cache.manager() {
        if let Ok(mut cached) = manager.get::<ListingSearchResponse>(&key).await {
            cached.from_cache = true;
            return HttpResponse::Ok().json(cached);
        }
    }

    let criteria = RetrievalCriteria {
        origin_lat: query.lat,
        origin_lon: query.lon,
        radius_km: query.radius_km,
        category: query.category.clone(),
        budget_min: query.budget_min,
        budget_max: query.budget_max,
        urgent_only: query.urgent_only,
        limit: state.engine.config().fan_out_limit,
    };

    let listings = match state.postgres.query_listings(&criteria).await {
        Ok(rows) => rows.into_iter().map(|(listing, _)| listing).collect::<Vec<_>>(),
        Err(e) => {
            tracing::error!("Listing search failed: {}", e);
            return HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Listing search failed".to_string(),
                message: e.to_string(),
                status_code: 500,
            });
        }
    };

    let response = ListingSearchResponse {
        total_results: listings.len(),
        listings,
        from_cache: false,
    };

    if let Some(manager) = state.cache.manager() {
        if let Err(e) = manager.set(&key, &response, CacheTier::ListingSearch).await {
            tracing::warn!("Failed to cache listing search: {}", e);
        }
    }

    HttpResponse::Ok().json(response)
}

/// Aggregate marketplace statistics, cached at the long tier
///
/// GET /api/v1/stats
async fn stats(state: web::Data<AppState>) -> impl Responder {
    let key = CacheKey::stats();

    if let Some(manager) = state.cache.manager() {
        if let Ok(cached) = manager.get::<StatsResponse>(&key).await {
            return HttpResponse::Ok().json(cached);
        }
    }

    let active_listings = match state.postgres.count_active_listings().await {
        Ok(count) => count,
        Err(e) => {
            tracing::error!("Stats query failed: {}", e);
            return HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Stats query failed".to_string(),
                message: e.to_string(),
                status_code: 500,
            });
        }
    };

    let categories = match state.postgres.category_counts().await {
        Ok(counts) => counts
            .into_iter()
            .map(|(category, count)| CategoryCount { category, count })
            .collect(),
        Err(e) => {
            tracing::error!("Category counts query failed: {}", e);
            return HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Stats query failed".to_string(),
                message: e.to_string(),
                status_code: 500,
            });
        }
    };

    let response = StatsResponse {
        active_listings,
        categories,
        generated_at: chrono::Utc::now(),
    };

    if let Some(manager) = state.cache.manager() {
        if let Err(e) = manager.set(&key, &response, CacheTier::Aggregate).await {
            tracing::warn!("Failed to cache stats: {}", e);
        }
    }

    HttpResponse::Ok().json(response)
}

/// Proxy a status transition to the Request Store
///
/// POST /api/v1/requests/{id}/status
///
/// A reactivation (paused/cancelled -> active) invalidates the request's
/// cached match sets so the next find call recomputes against fresh listings.
async fn update_request_status(
    state: web::Data<AppState>,
    path: web::Path<String>,
    req: web::Json<StatusTransitionRequest>,
) -> impl Responder {
    let request_id = path.into_inner();

    let previous = match state.backend.get_request(&request_id).await {
        Ok(request) => request,
        Err(BackendError::NotFound(message)) => {
            return HttpResponse::NotFound().json(ErrorResponse {
                error: "Request not found".to_string(),
                message,
                status_code: 404,
            });
        }
        Err(e) => {
            tracing::error!("Failed to load request {}: {}", request_id, e);
            return HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Failed to load request".to_string(),
                message: e.to_string(),
                status_code: 500,
            });
        }
    };

    let updated = match state.backend.update_request_status(&request_id, req.status).await {
        Ok(request) => request,
        Err(e) => {
            tracing::error!("Failed to transition request {}: {}", request_id, e);
            return HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Failed to transition request".to_string(),
                message: e.to_string(),
                status_code: 500,
            });
        }
    };

    if previous.status.reactivates(req.status) {
        tracing::info!("Request {} reactivated, invalidating cached matches", request_id);
        state.cache.invalidate_matches(&request_id).await;
    }

    HttpResponse::Ok().json(updated)
}

// Service exports
pub mod backend;
pub mod cache;
pub mod events;
pub mod postgres;

pub use backend::{BackendClient, BackendError};
pub use cache::{CacheError, CacheKey, CacheManager, CacheTier, MatchCache};
pub use events::{run_event_logger, EventBus, MatchesComputedEvent};
pub use postgres::{PostgresClient, PostgresError};

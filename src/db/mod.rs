pub mod cache;
pub mod memory;
pub mod postgres;
pub mod redis;

pub use cache::CachedCatalog;
pub use memory::InMemoryStore;
pub use postgres::{create_pool, PgStore};
pub use redis::create_redis_client;
pub use redis::Cache;
pub use redis::CacheKey;

use crate::{
    error::AppResult,
    models::{FeedbackRow, FoodItem, Rating},
};

/// Source of the food catalog
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogSource: Send + Sync {
    /// Loads every known food; storage failures surface as data-unavailable errors
    async fn load_catalog(&self) -> AppResult<Vec<FoodItem>>;
}

/// Storage for user ratings
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait FeedbackStore: Send + Sync {
    /// The user's own rating history, oldest first. Empty when the user has not rated anything.
    async fn load_feedback(&self, user_id: &str) -> AppResult<Vec<Rating>>;

    /// Ratings from other users who rated at least one food this user rated
    async fn load_neighbour_ratings(&self, user_id: &str) -> AppResult<Vec<Rating>>;

    /// Appends ratings atomically: either every row is stored or none is
    async fn save_feedback(&self, user_id: &str, rows: &[FeedbackRow]) -> AppResult<usize>;
}

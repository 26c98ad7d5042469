use std::collections::HashSet;

use tokio::sync::RwLock;

use super::{CatalogSource, FeedbackStore};
use crate::{
    error::AppResult,
    models::{FeedbackRow, FoodItem, FoodKey, Rating},
};

/// Catalog and feedback held in process memory, for tests and local demos
#[derive(Default)]
pub struct InMemoryStore {
    catalog: RwLock<Vec<FoodItem>>,
    ratings: RwLock<Vec<Rating>>,
}

impl InMemoryStore {
    pub fn new(catalog: Vec<FoodItem>, ratings: Vec<Rating>) -> Self {
        Self {
            catalog: RwLock::new(catalog),
            ratings: RwLock::new(ratings),
        }
    }

    /// Snapshot of every stored rating
    pub async fn ratings(&self) -> Vec<Rating> {
        self.ratings.read().await.clone()
    }
}

#[async_trait::async_trait]
impl CatalogSource for InMemoryStore {
    async fn load_catalog(&self) -> AppResult<Vec<FoodItem>> {
        Ok(self.catalog.read().await.clone())
    }
}

#[async_trait::async_trait]
impl FeedbackStore for InMemoryStore {
    async fn load_feedback(&self, user_id: &str) -> AppResult<Vec<Rating>> {
        let ratings = self.ratings.read().await;
        Ok(ratings
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn load_neighbour_ratings(&self, user_id: &str) -> AppResult<Vec<Rating>> {
        let ratings = self.ratings.read().await;

        let rated: HashSet<&FoodKey> = ratings
            .iter()
            .filter(|r| r.user_id == user_id)
            .map(|r| &r.food)
            .collect();
        let neighbours: HashSet<&str> = ratings
            .iter()
            .filter(|r| r.user_id != user_id && rated.contains(&r.food))
            .map(|r| r.user_id.as_str())
            .collect();

        Ok(ratings
            .iter()
            .filter(|r| neighbours.contains(r.user_id.as_str()))
            .cloned()
            .collect())
    }

    async fn save_feedback(&self, user_id: &str, rows: &[FeedbackRow]) -> AppResult<usize> {
        let mut ratings = self.ratings.write().await;
        ratings.extend(rows.iter().map(|row| Rating {
            user_id: user_id.to_string(),
            food: row.food.clone(),
            rating: row.rating,
        }));
        Ok(rows.len())
    }
}

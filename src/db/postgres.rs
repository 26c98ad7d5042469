use chrono::Utc;
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};

use super::{CatalogSource, FeedbackStore};
use crate::{
    error::AppResult,
    models::{FeedbackRow, FoodItem, FoodKey, Rating},
};

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

#[derive(Debug, FromRow)]
struct FoodRow {
    food_code: String,
    food_number: String,
    company: Option<String>,
    food_name: String,
    food_code_name: String,
    kcal: Option<f64>,
    protein: Option<f64>,
    fat: Option<f64>,
    carb: Option<f64>,
    food_weight: Option<f64>,
}

impl FoodRow {
    /// Rows with a missing nutrient are rejected rather than read as zero
    fn into_food(self) -> Option<FoodItem> {
        Some(FoodItem {
            kcal: self.kcal?,
            protein: self.protein?,
            fat: self.fat?,
            carb: self.carb?,
            food_weight: self.food_weight?,
            food_code: self.food_code,
            food_number: self.food_number,
            company: self.company.unwrap_or_default(),
            food_name: self.food_name,
            food_code_name: self.food_code_name,
        })
    }
}

#[derive(Debug, FromRow)]
struct RatingRow {
    user_id: String,
    food_code: String,
    food_number: String,
    rating: f64,
}

impl From<RatingRow> for Rating {
    fn from(row: RatingRow) -> Self {
        Rating {
            user_id: row.user_id,
            food: FoodKey {
                food_code: row.food_code,
                food_number: row.food_number,
            },
            rating: row.rating,
        }
    }
}

/// Catalog and feedback storage backed by PostgreSQL
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl CatalogSource for PgStore {
    async fn load_catalog(&self) -> AppResult<Vec<FoodItem>> {
        let rows: Vec<FoodRow> = sqlx::query_as(
            r#"
            SELECT food_code, food_number, company, food_name, food_code_name,
                   kcal, protein, fat, carb, food_weight
            FROM food_data
            ORDER BY food_code, food_number
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let total = rows.len();
        let catalog: Vec<FoodItem> = rows.into_iter().filter_map(FoodRow::into_food).collect();

        if catalog.len() < total {
            tracing::warn!(
                rejected = total - catalog.len(),
                "Food rows with missing nutrients skipped"
            );
        }

        tracing::info!(foods = catalog.len(), "Catalog loaded from database");

        Ok(catalog)
    }
}

#[async_trait::async_trait]
impl FeedbackStore for PgStore {
    async fn load_feedback(&self, user_id: &str) -> AppResult<Vec<Rating>> {
        let rows: Vec<RatingRow> = sqlx::query_as(
            r#"
            SELECT user_id, food_code, food_number, rating
            FROM feedback
            WHERE user_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Rating::from).collect())
    }

    async fn load_neighbour_ratings(&self, user_id: &str) -> AppResult<Vec<Rating>> {
        let rows: Vec<RatingRow> = sqlx::query_as(
            r#"
            SELECT f.user_id, f.food_code, f.food_number, f.rating
            FROM feedback f
            WHERE f.user_id <> $1
              AND f.user_id IN (
                SELECT DISTINCT other.user_id
                FROM feedback other
                JOIN feedback mine
                  ON mine.food_code = other.food_code
                 AND mine.food_number = other.food_number
                WHERE mine.user_id = $1
              )
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        tracing::debug!(user_id = %user_id, ratings = rows.len(), "Neighbour ratings loaded");

        Ok(rows.into_iter().map(Rating::from).collect())
    }

    async fn save_feedback(&self, user_id: &str, rows: &[FeedbackRow]) -> AppResult<usize> {
        let created_at = Utc::now();
        let mut tx = self.pool.begin().await?;

        for row in rows {
            sqlx::query(
                r#"
                INSERT INTO feedback (user_id, food_code, food_number, rating, created_at)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(user_id)
            .bind(&row.food.food_code)
            .bind(&row.food.food_number)
            .bind(row.rating)
            .bind(created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(user_id = %user_id, saved = rows.len(), "Feedback stored");

        Ok(rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> FoodRow {
        FoodRow {
            food_code: "D101".to_string(),
            food_number: "001".to_string(),
            company: None,
            food_name: "비빔밥".to_string(),
            food_code_name: "밥류".to_string(),
            kcal: Some(550.0),
            protein: Some(18.0),
            fat: Some(14.0),
            carb: Some(85.0),
            food_weight: Some(300.0),
        }
    }

    #[test]
    fn test_complete_row_converts() {
        let food = row().into_food().unwrap();
        assert_eq!(food.kcal, 550.0);
        assert_eq!(food.company, "");
    }

    #[test]
    fn test_missing_nutrient_is_not_zeroed() {
        let mut incomplete = row();
        incomplete.fat = None;
        assert!(incomplete.into_food().is_none());
    }

    #[test]
    fn test_rating_row_conversion() {
        let rating = Rating::from(RatingRow {
            user_id: "u1".to_string(),
            food_code: "D101".to_string(),
            food_number: "001".to_string(),
            rating: 4.0,
        });
        assert_eq!(rating.food.food_code, "D101");
        assert_eq!(rating.rating, 4.0);
    }
}

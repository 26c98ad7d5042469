use serde::{Deserialize, Serialize};

use super::FoodKey;
use crate::error::{AppError, AppResult};

pub const MIN_RATING: f64 = 0.0;
pub const MAX_RATING: f64 = 5.0;

/// A stored rating
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub user_id: String,
    pub food: FoodKey,
    pub rating: f64,
}

/// A validated rating waiting to be persisted
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackRow {
    pub food: FoodKey,
    pub rating: f64,
}

/// A rating as submitted, either a JSON number or a numeric string
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RatingValue {
    Number(f64),
    Text(String),
}

impl RatingValue {
    fn parse(&self) -> AppResult<f64> {
        let value = match self {
            RatingValue::Number(n) => *n,
            RatingValue::Text(s) => s.trim().parse::<f64>().map_err(|_| {
                AppError::Validation(format!("Rating '{}' is not a number", s))
            })?,
        };

        if !value.is_finite() || !(MIN_RATING..=MAX_RATING).contains(&value) {
            return Err(AppError::Validation(format!(
                "Rating {} is outside {}..={}",
                value, MIN_RATING, MAX_RATING
            )));
        }

        Ok(value)
    }
}

/// Ratings for one meal, submitted as parallel lists
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MealRatings {
    #[serde(default)]
    pub food_codes: Vec<String>,
    #[serde(default)]
    pub food_numbers: Vec<String>,
    #[serde(default)]
    pub ratings: Vec<RatingValue>,
}

impl MealRatings {
    /// Zips the parallel lists; mismatched lengths are rejected rather than truncated
    pub fn rows(&self, meal: &str) -> AppResult<Vec<FeedbackRow>> {
        let codes = self.food_codes.len();
        if self.food_numbers.len() != codes || self.ratings.len() != codes {
            return Err(AppError::Validation(format!(
                "{} lists differ in length: {} food codes, {} food numbers, {} ratings",
                meal,
                codes,
                self.food_numbers.len(),
                self.ratings.len()
            )));
        }

        self.food_codes
            .iter()
            .zip(&self.food_numbers)
            .zip(&self.ratings)
            .map(|((code, number), rating)| {
                Ok(FeedbackRow {
                    food: FoodKey {
                        food_code: code.clone(),
                        food_number: number.clone(),
                    },
                    rating: rating.parse()?,
                })
            })
            .collect()
    }
}

/// Feedback for a previously recommended meal plan
#[derive(Debug, Clone, Deserialize)]
pub struct FeedbackSubmission {
    pub user_id: String,
    #[serde(default)]
    pub lunch: MealRatings,
    #[serde(default)]
    pub dinner: MealRatings,
}

impl FeedbackSubmission {
    /// Validates the whole submission; any bad row rejects all of them
    pub fn rows(&self) -> AppResult<Vec<FeedbackRow>> {
        if self.user_id.trim().is_empty() {
            return Err(AppError::Validation("user_id must not be empty".to_string()));
        }

        let mut rows = self.lunch.rows("lunch")?;
        rows.extend(self.dinner.rows("dinner")?);
        Ok(rows)
    }
}

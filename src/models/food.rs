use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Identity of a food as stored alongside ratings
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FoodKey {
    pub food_code: String,
    pub food_number: String,
}

impl Display for FoodKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.food_code, self.food_number)
    }
}

/// A food record from the catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FoodItem {
    pub food_code: String,
    pub food_number: String,
    pub company: String,
    pub food_name: String,
    /// Category label (e.g. "밥류")
    pub food_code_name: String,
    pub kcal: f64,
    pub protein: f64,
    pub fat: f64,
    pub carb: f64,
    /// Serving weight in grams
    pub food_weight: f64,
}

/// Nutrients normalized to a 100g serving
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Per100g {
    pub kcal100: f64,
    pub protein100: f64,
    pub fat100: f64,
    pub carb100: f64,
}

impl Per100g {
    pub fn as_array(&self) -> [f64; 4] {
        [self.kcal100, self.protein100, self.fat100, self.carb100]
    }
}

impl FoodItem {
    pub fn key(&self) -> FoodKey {
        FoodKey {
            food_code: self.food_code.clone(),
            food_number: self.food_number.clone(),
        }
    }

    /// Per-100g nutrients, or `None` when the serving weight is not a positive finite number
    pub fn per_100g(&self) -> Option<Per100g> {
        if !self.food_weight.is_finite() || self.food_weight <= 0.0 {
            return None;
        }

        let factor = 100.0 / self.food_weight;
        Some(Per100g {
            kcal100: self.kcal * factor,
            protein100: self.protein * factor,
            fat100: self.fat * factor,
            carb100: self.carb * factor,
        })
    }
}

/// A scored food on its way into the candidate pool
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub food: FoodItem,
    pub score: f64,
    pub source: CandidateSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    Content,
    Collaborative,
}

/// Output row for a recommended food; relevance scores are not exposed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MealItem {
    pub food_name: String,
    pub kcal: f64,
    pub protein: f64,
    pub fat: f64,
    pub carb: f64,
    pub company: String,
    pub food_number: String,
    pub food_code: String,
}

impl From<&FoodItem> for MealItem {
    fn from(food: &FoodItem) -> Self {
        Self {
            food_name: food.food_name.clone(),
            kcal: food.kcal,
            protein: food.protein,
            fat: food.fat,
            carb: food.carb,
            company: food.company.clone(),
            food_number: food.food_number.clone(),
            food_code: food.food_code.clone(),
        }
    }
}

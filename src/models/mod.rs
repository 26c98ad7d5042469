use serde::{Deserialize, Serialize};

mod feedback;
mod food;
mod user_profile;

pub use feedback::{FeedbackRow, FeedbackSubmission, MealRatings, Rating, RatingValue};
pub use food::{Candidate, CandidateSource, FoodItem, FoodKey, MealItem, Per100g};
pub use user_profile::{NutrientTargets, UserProfile};

/// An optimized set of foods for one meal slot
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MealSet {
    pub items: Vec<MealItem>,
    /// Sum of the members' nutrients
    pub nutrition: NutrientTargets,
    /// Sum of squared relative deviations from the meal target
    pub nutrition_error: f64,
}

/// Lunch and dinner for one request
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MealPlan {
    pub lunch: MealSet,
    pub dinner: MealSet,
}

/// Request for a meal plan
#[derive(Debug, Deserialize)]
pub struct RecommendationRequest {
    pub user_id: String,
    /// Falls back to the default profile when omitted
    #[serde(default)]
    pub profile: Option<UserProfile>,
    /// Fixes the optimizer's random source for reproducible plans
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Response with both meal sets
#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    pub lunch: Vec<MealItem>,
    pub dinner: Vec<MealItem>,
    pub lunch_nutrition: NutrientTargets,
    pub dinner_nutrition: NutrientTargets,
}

impl From<MealPlan> for RecommendationResponse {
    fn from(plan: MealPlan) -> Self {
        Self {
            lunch_nutrition: plan.lunch.nutrition,
            dinner_nutrition: plan.dinner.nutrition,
            lunch: plan.lunch.items,
            dinner: plan.dinner.items,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FeedbackResponse {
    pub status: String,
    pub saved: usize,
}

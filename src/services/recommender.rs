use std::sync::Arc;
use std::time::Instant;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::{
    db::{CatalogSource, FeedbackStore},
    error::{AppError, AppResult},
    models::{FeedbackSubmission, MealItem, MealPlan, MealSet, NutrientTargets, UserProfile},
    services::{
        collaborative::CollaborativeScorer,
        content_based,
        features::FeatureSpace,
        genetic::{MealOptimizer, OptimizerSettings},
        merger::merge_candidates,
    },
};

/// Pipeline tuning
#[derive(Debug, Clone)]
pub struct RecommenderSettings {
    pub content_top_n: usize,
    pub collaborative_top_n: usize,
    pub min_predicted_rating: f64,
    /// Serve users without ratings from content-based candidates alone
    pub allow_cold_start: bool,
    /// Fraction of the daily targets allotted to lunch
    pub lunch_share: f64,
    /// Fraction of the daily targets allotted to dinner
    pub dinner_share: f64,
    pub optimizer: OptimizerSettings,
}

impl Default for RecommenderSettings {
    fn default() -> Self {
        Self {
            content_top_n: 10,
            collaborative_top_n: 10,
            min_predicted_rating: 3.0,
            allow_cold_start: false,
            lunch_share: 0.5,
            dinner_share: 0.5,
            optimizer: OptimizerSettings::default(),
        }
    }
}

/// Recommendation pipeline: vectorize, score, merge, then optimize lunch and dinner
#[derive(Clone)]
pub struct Recommender {
    catalog: Arc<dyn CatalogSource>,
    feedback: Arc<dyn FeedbackStore>,
    settings: Arc<RecommenderSettings>,
}

impl Recommender {
    pub fn new(
        catalog: Arc<dyn CatalogSource>,
        feedback: Arc<dyn FeedbackStore>,
        settings: RecommenderSettings,
    ) -> Self {
        Self {
            catalog,
            feedback,
            settings: Arc::new(settings),
        }
    }

    /// Builds the merged candidate pool for a user, best candidates first
    pub async fn candidate_pool(
        &self,
        user_id: &str,
        profile: &UserProfile,
    ) -> AppResult<Vec<MealItem>> {
        if user_id.trim().is_empty() {
            return Err(AppError::Validation("user_id must not be empty".to_string()));
        }

        let (catalog, history) = tokio::try_join!(
            self.catalog.load_catalog(),
            self.feedback.load_feedback(user_id)
        )?;

        if catalog.is_empty() {
            return Err(AppError::DataUnavailable("Food catalog is empty".to_string()));
        }

        if history.is_empty() && !self.settings.allow_cold_start {
            return Err(AppError::NoFeedbackHistory(user_id.to_string()));
        }

        let neighbours = if history.is_empty() {
            Vec::new()
        } else {
            self.feedback.load_neighbour_ratings(user_id).await?
        };

        let space = FeatureSpace::fit(&catalog, profile);
        let content =
            content_based::recommend(&space, profile, &catalog, self.settings.content_top_n)?;

        let scorer = CollaborativeScorer::new(
            self.settings.collaborative_top_n,
            self.settings.min_predicted_rating,
        );
        let collaborative = scorer.recommend(user_id, &catalog, &history, &neighbours);

        tracing::info!(
            user_id = %user_id,
            catalog = catalog.len(),
            history = history.len(),
            content = content.len(),
            collaborative = collaborative.len(),
            "Candidates scored"
        );

        Ok(merge_candidates(&content, &collaborative))
    }

    /// Recommends lunch and dinner for a user.
    ///
    /// Both meals are optimized independently from the same pool, so a food may
    /// appear in both. The seed fixes the optimizer's random source.
    ///
    /// The plan is all-or-nothing: if either meal fails, the first error (lunch, then
    /// dinner) is returned. Both meals share the pool and the size bounds, so an
    /// infeasible pool fails both at once; the failing meal is logged by `spawn_meal`.
    pub async fn recommend(
        &self,
        user_id: &str,
        profile: &UserProfile,
        seed: u64,
    ) -> AppResult<MealPlan> {
        let start = Instant::now();
        let pool = Arc::new(self.candidate_pool(user_id, profile).await?);

        let mut seeder = ChaCha8Rng::seed_from_u64(seed);
        let lunch_seed: u64 = seeder.gen();
        let dinner_seed: u64 = seeder.gen();

        let lunch_target = profile.targets.scaled(self.settings.lunch_share);
        let dinner_target = profile.targets.scaled(self.settings.dinner_share);

        let (lunch, dinner) = tokio::join!(
            self.spawn_meal("lunch", pool.clone(), lunch_target, lunch_seed),
            self.spawn_meal("dinner", pool.clone(), dinner_target, dinner_seed)
        );

        let plan = MealPlan {
            lunch: lunch?,
            dinner: dinner?,
        };

        tracing::info!(
            user_id = %user_id,
            pool = pool.len(),
            lunch_items = plan.lunch.items.len(),
            dinner_items = plan.dinner.items.len(),
            processing_time_ms = start.elapsed().as_millis(),
            "Meal plan ready"
        );

        Ok(plan)
    }

    /// Runs one meal's optimization on the blocking pool
    async fn spawn_meal(
        &self,
        meal: &'static str,
        pool: Arc<Vec<MealItem>>,
        target: NutrientTargets,
        seed: u64,
    ) -> AppResult<MealSet> {
        let settings = self.settings.clone();

        let result = tokio::task::spawn_blocking(move || {
            optimize_meal(&pool, target, &settings.optimizer, seed)
        })
        .await
        .map_err(|e| AppError::Internal(format!("{} optimizer task failed: {}", meal, e)))?;

        if let Err(e) = &result {
            tracing::warn!(meal, error = %e, "Meal optimization failed");
        }

        result
    }

    /// Validates and stores ratings for a previously recommended plan
    pub async fn record_feedback(&self, submission: &FeedbackSubmission) -> AppResult<usize> {
        let rows = submission.rows()?;
        if rows.is_empty() {
            return Err(AppError::Validation("No ratings submitted".to_string()));
        }

        self.feedback
            .save_feedback(&submission.user_id, &rows)
            .await
    }
}

/// Optimizes a single meal with a seeded random source
pub fn optimize_meal(
    pool: &[MealItem],
    target: NutrientTargets,
    settings: &OptimizerSettings,
    seed: u64,
) -> AppResult<MealSet> {
    let optimizer = MealOptimizer::new(pool, target, settings);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let outcome = optimizer.optimize(&mut rng)?;
    Ok(optimizer.meal_set(&outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{InMemoryStore, MockCatalogSource, MockFeedbackStore};
    use crate::models::{FoodItem, FoodKey, MealRatings, Rating, RatingValue};
    use crate::services::features::tests::food;

    fn catalog() -> Vec<FoodItem> {
        vec![
            food("R01", "비빔밥", "밥류", [550.0, 18.0, 14.0, 85.0], 300.0),
            food("N01", "짜장면", "면류", [670.0, 16.0, 18.0, 110.0], 450.0),
            food("R02", "김치볶음밥", "밥류", [520.0, 12.0, 16.0, 80.0], 280.0),
            food("S01", "새우깡", "과자류", [450.0, 5.0, 22.0, 60.0], 90.0),
            food("R03", "제육덮밥", "밥류", [700.0, 30.0, 22.0, 95.0], 350.0),
            food("B01", "우유", "음료류", [130.0, 6.0, 7.0, 10.0], 200.0),
            food("N02", "잔치국수", "면류", [420.0, 12.0, 5.0, 80.0], 400.0),
            food("R04", "유부초밥", "밥류", [380.0, 9.0, 8.0, 68.0], 200.0),
            food("S02", "초코파이", "과자류", [170.0, 2.0, 7.0, 24.0], 39.0),
            food("R05", "참치마요덮밥", "밥류", [610.0, 20.0, 21.0, 84.0], 320.0),
        ]
    }

    fn rating(user: &str, code: &str, value: f64) -> Rating {
        Rating {
            user_id: user.to_string(),
            food: FoodKey {
                food_code: code.to_string(),
                food_number: "001".to_string(),
            },
            rating: value,
        }
    }

    fn recommender(store: Arc<InMemoryStore>, settings: RecommenderSettings) -> Recommender {
        Recommender::new(store.clone(), store, settings)
    }

    #[tokio::test]
    async fn test_missing_history_is_an_error() {
        let store = Arc::new(InMemoryStore::new(catalog(), Vec::new()));
        let recommender = recommender(store, RecommenderSettings::default());

        let result = recommender
            .recommend("nobody", &UserProfile::default(), 1)
            .await;

        assert!(matches!(result, Err(AppError::NoFeedbackHistory(_))));
    }

    #[tokio::test]
    async fn test_cold_start_uses_content_candidates_only() {
        let store = Arc::new(InMemoryStore::new(catalog(), Vec::new()));
        let settings = RecommenderSettings {
            allow_cold_start: true,
            ..RecommenderSettings::default()
        };
        let recommender = recommender(store, settings);

        let plan = recommender
            .recommend("new-user", &UserProfile::default(), 1)
            .await
            .unwrap();

        for meal in [&plan.lunch, &plan.dinner] {
            assert!((3..=5).contains(&meal.items.len()));
            assert!(meal.items.iter().all(|i| i.food_code != "B01"));
        }
    }

    #[tokio::test]
    async fn test_collaborative_candidates_join_the_pool() {
        let ratings = vec![
            rating("me", "R01", 5.0),
            rating("me", "N01", 1.0),
            rating("u2", "R01", 5.0),
            rating("u2", "N01", 1.0),
            rating("u2", "B01", 5.0),
            rating("u3", "R01", 4.0),
            rating("u3", "N01", 2.0),
            rating("u3", "B01", 4.0),
        ];
        let store = Arc::new(InMemoryStore::new(catalog(), ratings));
        let recommender = recommender(store, RecommenderSettings::default());

        let pool = recommender
            .candidate_pool("me", &UserProfile::default())
            .await
            .unwrap();

        // 우유 is outside every preferred category, so only collaborative filtering can add it
        assert!(pool.iter().any(|i| i.food_code == "B01"));
        let mut names: Vec<&str> = pool.iter().map(|i| i.food_name.as_str()).collect();
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), total);
    }

    #[tokio::test]
    async fn test_same_seed_same_plan() {
        let store = Arc::new(InMemoryStore::new(catalog(), vec![rating("me", "R01", 4.0)]));
        let recommender = recommender(store, RecommenderSettings::default());
        let profile = UserProfile::default();

        let first = recommender.recommend("me", &profile, 77).await.unwrap();
        let second = recommender.recommend("me", &profile, 77).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_small_pool_is_infeasible() {
        let catalog = vec![
            food("R01", "비빔밥", "밥류", [550.0, 18.0, 14.0, 85.0], 300.0),
            food("R02", "김밥", "밥류", [480.0, 12.0, 10.0, 82.0], 250.0),
            food("B01", "우유", "음료류", [130.0, 6.0, 7.0, 10.0], 200.0),
        ];
        let store = Arc::new(InMemoryStore::new(catalog, vec![rating("me", "R01", 4.0)]));
        let recommender = recommender(store, RecommenderSettings::default());

        let result = recommender
            .recommend("me", &UserProfile::default(), 1)
            .await;

        assert!(matches!(result, Err(AppError::InfeasibleConstraint(_))));
    }

    #[tokio::test]
    async fn test_one_failing_meal_fails_the_plan() {
        let store = Arc::new(InMemoryStore::new(catalog(), vec![rating("me", "R01", 4.0)]));
        let settings = RecommenderSettings {
            dinner_share: f64::NAN,
            ..RecommenderSettings::default()
        };
        let recommender = recommender(store, settings);

        let result = recommender
            .recommend("me", &UserProfile::default(), 1)
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_catalog_failure_is_data_unavailable() {
        let mut catalog = MockCatalogSource::new();
        catalog
            .expect_load_catalog()
            .returning(|| Err(AppError::DataUnavailable("connection refused".to_string())));
        let mut feedback = MockFeedbackStore::new();
        feedback
            .expect_load_feedback()
            .returning(|_| Ok(Vec::new()));

        let recommender = Recommender::new(
            Arc::new(catalog),
            Arc::new(feedback),
            RecommenderSettings::default(),
        );

        let result = recommender
            .recommend("me", &UserProfile::default(), 1)
            .await;
        assert!(matches!(result, Err(AppError::DataUnavailable(_))));
    }

    #[tokio::test]
    async fn test_invalid_feedback_writes_nothing() {
        let mut feedback = MockFeedbackStore::new();
        feedback.expect_save_feedback().never();

        let recommender = Recommender::new(
            Arc::new(MockCatalogSource::new()),
            Arc::new(feedback),
            RecommenderSettings::default(),
        );

        let submission = FeedbackSubmission {
            user_id: "me".to_string(),
            lunch: MealRatings {
                food_codes: vec!["R01".into(), "R02".into(), "R03".into()],
                food_numbers: vec!["001".into(), "001".into(), "001".into()],
                ratings: vec![RatingValue::Number(4.0), RatingValue::Number(3.0)],
            },
            dinner: MealRatings::default(),
        };

        let result = recommender.record_feedback(&submission).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_valid_feedback_is_stored() {
        let store = Arc::new(InMemoryStore::new(catalog(), Vec::new()));
        let recommender = recommender(store.clone(), RecommenderSettings::default());

        let submission = FeedbackSubmission {
            user_id: "me".to_string(),
            lunch: MealRatings {
                food_codes: vec!["R01".into()],
                food_numbers: vec!["001".into()],
                ratings: vec![RatingValue::Text("4".into())],
            },
            dinner: MealRatings {
                food_codes: vec!["N01".into()],
                food_numbers: vec!["001".into()],
                ratings: vec![RatingValue::Number(2.0)],
            },
        };

        assert_eq!(recommender.record_feedback(&submission).await.unwrap(), 2);
        assert_eq!(store.ratings().await.len(), 2);
    }
}

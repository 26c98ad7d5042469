pub mod collaborative;
pub mod content_based;
pub mod features;
pub mod genetic;
pub mod merger;
pub mod recommender;

pub use genetic::{MealOptimizer, OptimizerSettings};
pub use recommender::{Recommender, RecommenderSettings};

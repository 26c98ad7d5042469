use std::collections::HashSet;

use crate::models::{Candidate, MealItem};

/// Unions content-based and collaborative candidates into one pool.
///
/// Content-based candidates come first; the first occurrence of a food name wins.
/// Scores are dropped here, but pool order still carries relevance.
pub fn merge_candidates(content: &[Candidate], collaborative: &[Candidate]) -> Vec<MealItem> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut pool = Vec::with_capacity(content.len() + collaborative.len());

    for candidate in content.iter().chain(collaborative) {
        if seen.insert(candidate.food.food_name.as_str()) {
            pool.push(MealItem::from(&candidate.food));
        }
    }

    tracing::debug!(
        content = content.len(),
        collaborative = collaborative.len(),
        pool = pool.len(),
        "Candidate pool merged"
    );

    pool
}

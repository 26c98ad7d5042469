use crate::{
    error::AppResult,
    models::{Candidate, CandidateSource, FoodItem, UserProfile},
    services::features::{cosine_similarity, FeatureSpace},
};

/// Ranks foods in the user's preferred categories by cosine similarity to the user vector.
///
/// Ties keep catalog order. Foods outside the preferred categories, or without a
/// usable serving weight, are never emitted here.
pub fn recommend(
    space: &FeatureSpace,
    profile: &UserProfile,
    catalog: &[FoodItem],
    top_n: usize,
) -> AppResult<Vec<Candidate>> {
    let user_vector = space.encode_user(&profile.targets);

    let mut scored = Vec::new();
    for food in catalog {
        if !space.has_category(&food.food_code_name) {
            continue;
        }
        let Some(food_vector) = space.encode_food(food) else {
            continue;
        };

        let score = cosine_similarity(&user_vector, &food_vector)?;
        scored.push(Candidate {
            food: food.clone(),
            score,
            source: CandidateSource::Content,
        });
    }

    // Stable sort keeps catalog order for equal scores
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(top_n);

    tracing::debug!(count = scored.len(), "Content-based candidates ranked");

    Ok(scored)
}

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::models::{Candidate, CandidateSource, FoodItem, FoodKey, Rating};

/// Item-based collaborative filtering over the rating matrix.
///
/// Item similarity is the adjusted cosine (ratings centered on each user's mean)
/// across users who rated both items. A food the user has not rated is predicted
/// from the user's own ratings of positively similar foods:
/// `Σ sim(i, j) · r(u, i) / Σ sim(i, j)`.
#[derive(Debug, Clone)]
pub struct CollaborativeScorer {
    pub top_n: usize,
    pub min_predicted_rating: f64,
}

/// Centered ratings: food -> (user -> rating minus that user's mean)
type ItemVectors<'a> = HashMap<&'a FoodKey, BTreeMap<&'a str, f64>>;

impl CollaborativeScorer {
    pub fn new(top_n: usize, min_predicted_rating: f64) -> Self {
        Self {
            top_n,
            min_predicted_rating,
        }
    }

    /// Returns the foods the user is predicted to rate highly, best first.
    ///
    /// An empty result means there was no usable overlap (cold start), not an error.
    pub fn recommend(
        &self,
        user_id: &str,
        catalog: &[FoodItem],
        history: &[Rating],
        neighbour_ratings: &[Rating],
    ) -> Vec<Candidate> {
        let user_ratings: Vec<&Rating> = history.iter().filter(|r| r.user_id == user_id).collect();
        if user_ratings.is_empty() {
            tracing::info!(user_id = %user_id, "No rating history, collaborative result is empty");
            return Vec::new();
        }

        let matrix = build_matrix(user_ratings.iter().copied().chain(neighbour_ratings));
        let items = center_by_user(&matrix);
        let Some(own) = matrix.get(user_id) else {
            return Vec::new();
        };

        let mut seen = HashSet::new();
        let mut scored = Vec::new();
        for food in catalog {
            let key = food.key();
            if own.contains_key(&key) || !seen.insert(key.clone()) {
                continue;
            }
            let Some(target) = items.get(&key) else {
                continue;
            };

            let mut numerator = 0.0;
            let mut denominator = 0.0;
            for (rated, rating) in own {
                let Some(source) = items.get(rated) else {
                    continue;
                };
                if let Some(sim) = adjusted_cosine(source, target) {
                    if sim > 0.0 {
                        numerator += sim * rating;
                        denominator += sim;
                    }
                }
            }

            if denominator <= 0.0 {
                continue;
            }

            let predicted = numerator / denominator;
            if predicted >= self.min_predicted_rating {
                scored.push(Candidate {
                    food: food.clone(),
                    score: predicted,
                    source: CandidateSource::Collaborative,
                });
            }
        }

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(self.top_n);

        tracing::info!(
            user_id = %user_id,
            rated = own.len(),
            neighbours = matrix.len() - 1,
            recommended = scored.len(),
            "Collaborative candidates ranked"
        );

        scored
    }
}

/// user -> food -> mean rating (repeated ratings of the same food are averaged).
/// Inner maps are ordered so floating-point sums are reproducible.
fn build_matrix<'a>(
    ratings: impl Iterator<Item = &'a Rating>,
) -> HashMap<&'a str, BTreeMap<FoodKey, f64>> {
    let mut sums: HashMap<&str, BTreeMap<FoodKey, (f64, usize)>> = HashMap::new();
    for rating in ratings {
        let entry = sums
            .entry(rating.user_id.as_str())
            .or_default()
            .entry(rating.food.clone())
            .or_insert((0.0, 0));
        entry.0 += rating.rating;
        entry.1 += 1;
    }

    sums.into_iter()
        .map(|(user, foods)| {
            let means = foods
                .into_iter()
                .map(|(food, (sum, count))| (food, sum / count as f64))
                .collect();
            (user, means)
        })
        .collect()
}

fn center_by_user<'a>(matrix: &'a HashMap<&'a str, BTreeMap<FoodKey, f64>>) -> ItemVectors<'a> {
    let mut items: ItemVectors = HashMap::new();
    for (user, foods) in matrix {
        let mean = foods.values().sum::<f64>() / foods.len() as f64;
        for (food, rating) in foods {
            items.entry(food).or_default().insert(*user, rating - mean);
        }
    }
    items
}

/// Similarity over co-rating users; `None` when there is no usable overlap
fn adjusted_cosine(a: &BTreeMap<&str, f64>, b: &BTreeMap<&str, f64>) -> Option<f64> {
    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (user, x) in a {
        if let Some(y) = b.get(user) {
            dot += x * y;
            norm_a += x * x;
            norm_b += y * y;
        }
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }
    Some(dot / (norm_a.sqrt() * norm_b.sqrt()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::features::tests::food;

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

    fn catalog() -> Vec<FoodItem> {
        vec![
            food("A", "비빔밥", "밥류", [550.0, 18.0, 14.0, 85.0], 300.0),
            food("B", "라면", "면류", [500.0, 10.0, 16.0, 78.0], 120.0),
            food("C", "김밥", "밥류", [480.0, 12.0, 10.0, 82.0], 250.0),
            food("D", "감자칩", "과자류", [330.0, 4.0, 20.0, 35.0], 60.0),
        ]
    }

    fn neighbours() -> Vec<Rating> {
        vec![
            rating("u2", "A", 5.0),
            rating("u2", "B", 1.0),
            rating("u2", "C", 5.0),
            rating("u2", "D", 1.0),
            rating("u3", "A", 4.0),
            rating("u3", "B", 2.0),
            rating("u3", "C", 4.0),
            rating("u3", "D", 2.0),
        ]
    }

    #[test]
    fn test_predicts_items_liked_by_similar_raters() {
        let history = vec![rating("me", "A", 5.0), rating("me", "B", 1.0)];
        let scorer = CollaborativeScorer::new(10, 3.0);

        let result = scorer.recommend("me", &catalog(), &history, &neighbours());

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].food.food_code, "C");
        assert!((result[0].score - 5.0).abs() < 1e-9);
        assert_eq!(result[0].source, CandidateSource::Collaborative);
    }

    #[test]
    fn test_already_rated_items_are_not_recommended() {
        let history = vec![rating("me", "A", 5.0), rating("me", "B", 1.0)];
        let scorer = CollaborativeScorer::new(10, 0.0);

        let result = scorer.recommend("me", &catalog(), &history, &neighbours());

        assert!(result
            .iter()
            .all(|c| c.food.food_code != "A" && c.food.food_code != "B"));
    }

    #[test]
    fn test_empty_history_is_cold_start() {
        let scorer = CollaborativeScorer::new(10, 3.0);
        assert!(scorer
            .recommend("me", &catalog(), &[], &neighbours())
            .is_empty());
    }

    #[test]
    fn test_no_overlap_yields_empty() {
        let history = vec![rating("me", "A", 5.0), rating("me", "B", 2.0)];
        let scorer = CollaborativeScorer::new(10, 0.0);

        assert!(scorer.recommend("me", &catalog(), &history, &[]).is_empty());
    }

    #[test]
    fn test_ratings_for_unknown_foods_are_ignored() {
        let history = vec![
            rating("me", "A", 5.0),
            rating("me", "B", 1.0),
            rating("me", "ZZZ", 3.0),
        ];
        let scorer = CollaborativeScorer::new(10, 3.0);

        let result = scorer.recommend("me", &catalog(), &history, &neighbours());
        assert!(result.iter().all(|c| c.food.food_code != "ZZZ"));
    }
}

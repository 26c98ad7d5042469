use serde::{Deserialize, Serialize};

/// Nutrient amounts for a day or a single meal
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct NutrientTargets {
    pub kcal: f64,
    pub protein: f64,
    pub fat: f64,
    pub carb: f64,
}

impl NutrientTargets {
    pub fn as_array(&self) -> [f64; 4] {
        [self.kcal, self.protein, self.fat, self.carb]
    }

    /// Scales every nutrient by the same factor
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            kcal: self.kcal * factor,
            protein: self.protein * factor,
            fat: self.fat * factor,
            carb: self.carb * factor,
        }
    }
}

/// Daily targets and category preferences for the requesting user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(from = "RawUserProfile")]
pub struct UserProfile {
    pub targets: NutrientTargets,
    /// Preferred categories, in order of preference
    pub preferred_categories: Vec<String>,
}

/// Wire shape of a profile before repeated categories are dropped
#[derive(Deserialize)]
struct RawUserProfile {
    targets: NutrientTargets,
    preferred_categories: Vec<String>,
}

impl From<RawUserProfile> for UserProfile {
    fn from(raw: RawUserProfile) -> Self {
        Self::new(raw.targets, raw.preferred_categories)
    }
}

impl Default for UserProfile {
    fn default() -> Self {
        Self::new(
            NutrientTargets {
                kcal: 2000.0,
                protein: 120.0,
                fat: 44.4,
                carb: 275.0,
            },
            vec!["밥류".to_string(), "면류".to_string(), "과자류".to_string()],
        )
    }
}

impl UserProfile {
    /// Creates a profile, dropping repeated categories while keeping first-seen order
    pub fn new(targets: NutrientTargets, preferred_categories: Vec<String>) -> Self {
        let mut unique: Vec<String> = Vec::with_capacity(preferred_categories.len());
        for category in preferred_categories {
            if !unique.contains(&category) {
                unique.push(category);
            }
        }

        Self {
            targets,
            preferred_categories: unique,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile() {
        let profile = UserProfile::default();
        assert_eq!(profile.targets.kcal, 2000.0);
        assert_eq!(profile.targets.fat, 44.4);
        assert_eq!(profile.preferred_categories, vec!["밥류", "면류", "과자류"]);
    }

    #[test]
    fn test_duplicate_categories_are_dropped() {
        let profile = UserProfile::new(
            UserProfile::default().targets,
            vec!["면류".to_string(), "밥류".to_string(), "면류".to_string()],
        );
        assert_eq!(profile.preferred_categories, vec!["면류", "밥류"]);
    }

    #[test]
    fn test_deserialized_profile_drops_duplicate_categories() {
        let profile: UserProfile = serde_json::from_value(serde_json::json!({
            "targets": { "kcal": 1800.0, "protein": 90.0, "fat": 50.0, "carb": 250.0 },
            "preferred_categories": ["밥류", "밥류", "면류", "밥류"]
        }))
        .unwrap();

        assert_eq!(profile.preferred_categories, vec!["밥류", "면류"]);
    }

    #[test]
    fn test_scaled_targets() {
        let meal = UserProfile::default().targets.scaled(0.5);
        assert_eq!(meal.kcal, 1000.0);
        assert_eq!(meal.carb, 137.5);
    }
}

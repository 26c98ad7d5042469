use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};

use crate::{
    error::{AppError, AppResult},
    models::{FoodItem, NutrientTargets, UserProfile},
};

/// Names of the standardized nutrient columns, in vector order
pub const NUTRIENT_COLUMNS: [&str; 4] = ["kcal_std", "protein_std", "fat_std", "carb_std"];

/// Z-score standardizer over the four per-100g nutrient columns
#[derive(Debug, Clone, PartialEq)]
pub struct Standardizer {
    means: [f64; 4],
    scales: [f64; 4],
}

impl Standardizer {
    /// Fits column means and population standard deviations.
    /// A constant column keeps a scale of 1.
    pub fn fit(rows: &[[f64; 4]]) -> Self {
        if rows.is_empty() {
            return Self {
                means: [0.0; 4],
                scales: [1.0; 4],
            };
        }

        let n = rows.len() as f64;
        let mut means = [0.0; 4];
        for row in rows {
            for (mean, value) in means.iter_mut().zip(row) {
                *mean += value / n;
            }
        }

        let mut scales = [0.0; 4];
        for row in rows {
            for col in 0..4 {
                scales[col] += (row[col] - means[col]).powi(2) / n;
            }
        }
        for scale in scales.iter_mut() {
            *scale = scale.sqrt();
            if !scale.is_normal() {
                *scale = 1.0;
            }
        }

        Self { means, scales }
    }

    pub fn transform(&self, row: [f64; 4]) -> [f64; 4] {
        let mut out = [0.0; 4];
        for col in 0..4 {
            out[col] = (row[col] - self.means[col]) / self.scales[col];
        }
        out
    }
}

/// One-hot encoder over the catalog's category vocabulary
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryEncoder {
    columns: BTreeMap<String, usize>,
}

impl CategoryEncoder {
    /// Builds the vocabulary in sorted order so column indices are stable
    pub fn fit<'a>(categories: impl IntoIterator<Item = &'a str>) -> Self {
        let vocabulary: BTreeSet<&str> = categories.into_iter().collect();
        let columns = vocabulary
            .into_iter()
            .enumerate()
            .map(|(idx, label)| (label.to_string(), idx))
            .collect();
        Self { columns }
    }

    pub fn column_of(&self, category: &str) -> Option<usize> {
        self.columns.get(category).copied()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// A vector tagged with the schema of the feature space that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    pub values: Vec<f64>,
    pub schema: u64,
}

/// Shared column schema for user and food vectors, fitted once per request
#[derive(Debug, Clone)]
pub struct FeatureSpace {
    standardizer: Standardizer,
    encoder: CategoryEncoder,
    /// Preferred categories kept as columns, with their encoder index
    selected: Vec<(String, usize)>,
    columns: Vec<String>,
    schema: u64,
}

impl FeatureSpace {
    /// Fits the standardizer and encoder on the catalog and selects the
    /// one-hot columns for the profile's preferred categories
    pub fn fit(catalog: &[FoodItem], profile: &UserProfile) -> Self {
        let rows: Vec<[f64; 4]> = catalog
            .iter()
            .filter_map(|food| food.per_100g().map(|p| p.as_array()))
            .collect();

        let skipped = catalog.len() - rows.len();
        if skipped > 0 {
            tracing::warn!(
                skipped,
                "Foods without a usable serving weight left out of the feature space"
            );
        }

        let standardizer = Standardizer::fit(&rows);
        let encoder = CategoryEncoder::fit(catalog.iter().map(|f| f.food_code_name.as_str()));

        let mut selected = Vec::new();
        for category in &profile.preferred_categories {
            match encoder.column_of(category) {
                Some(idx) => selected.push((category.clone(), idx)),
                None => tracing::debug!(
                    category = %category,
                    "Preferred category not in catalog vocabulary, dropping column"
                ),
            }
        }

        let columns: Vec<String> = NUTRIENT_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .chain(
                selected
                    .iter()
                    .map(|(label, _)| format!("food_code_name_{}", label)),
            )
            .collect();

        let mut hasher = DefaultHasher::new();
        columns.hash(&mut hasher);
        let schema = hasher.finish();

        tracing::debug!(
            vocabulary = encoder.len(),
            columns = columns.len(),
            "Feature space fitted"
        );

        Self {
            standardizer,
            encoder,
            selected,
            columns,
            schema,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Whether a category has a column in this space
    pub fn has_category(&self, category: &str) -> bool {
        self.selected.iter().any(|(label, _)| label == category)
    }

    /// Encodes a food, or `None` when it has no per-100g nutrients
    pub fn encode_food(&self, food: &FoodItem) -> Option<FeatureVector> {
        let per_100g = food.per_100g()?;
        let category_col = self.encoder.column_of(&food.food_code_name);

        let mut values = Vec::with_capacity(self.columns.len());
        values.extend(self.standardizer.transform(per_100g.as_array()));
        values.extend(
            self.selected
                .iter()
                .map(|(_, idx)| if category_col == Some(*idx) { 1.0 } else { 0.0 }),
        );

        Some(FeatureVector {
            values,
            schema: self.schema,
        })
    }

    /// Encodes daily targets with the catalog-fitted transforms. Every preferred
    /// category column of this space is set, so preferences come from the fitted profile.
    pub fn encode_user(&self, targets: &NutrientTargets) -> FeatureVector {
        let mut values = Vec::with_capacity(self.columns.len());
        values.extend(self.standardizer.transform(targets.as_array()));
        values.extend(std::iter::repeat(1.0).take(self.selected.len()));

        FeatureVector {
            values,
            schema: self.schema,
        }
    }
}

/// Cosine similarity; vectors from different feature spaces are rejected
pub fn cosine_similarity(a: &FeatureVector, b: &FeatureVector) -> AppResult<f64> {
    if a.schema != b.schema || a.values.len() != b.values.len() {
        return Err(AppError::FeatureSpaceMismatch {
            expected: a.schema,
            found: b.schema,
        });
    }

    let dot: f64 = a.values.iter().zip(&b.values).map(|(x, y)| x * y).sum();
    let norm_a = a.values.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.values.iter().map(|x| x * x).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    Ok(dot / (norm_a * norm_b))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::RecommendationRequest;

    pub(crate) fn food(
        code: &str,
        name: &str,
        category: &str,
        nutrients: [f64; 4],
        weight: f64,
    ) -> FoodItem {
        FoodItem {
            food_code: code.to_string(),
            food_number: "001".to_string(),
            company: "테스트식품".to_string(),
            food_name: name.to_string(),
            food_code_name: category.to_string(),
            kcal: nutrients[0],
            protein: nutrients[1],
            fat: nutrients[2],
            carb: nutrients[3],
            food_weight: weight,
        }
    }

    fn profile(categories: &[&str]) -> UserProfile {
        UserProfile::new(
            NutrientTargets {
                kcal: 2000.0,
                protein: 120.0,
                fat: 44.4,
                carb: 275.0,
            },
            categories.iter().map(|c| c.to_string()).collect(),
        )
    }

    fn catalog() -> Vec<FoodItem> {
        vec![
            food("A1", "비빔밥", "밥류", [550.0, 18.0, 14.0, 85.0], 300.0),
            food("A2", "라면", "면류", [500.0, 10.0, 16.0, 78.0], 120.0),
            food("A3", "감자칩", "과자류", [330.0, 4.0, 20.0, 35.0], 60.0),
            food("A4", "김밥", "밥류", [480.0, 12.0, 10.0, 82.0], 250.0),
        ]
    }

    #[test]
    fn test_standardizer_zero_mean_unit_variance() {
        let rows = vec![[1.0, 2.0, 3.0, 4.0], [3.0, 2.0, 5.0, 8.0]];
        let scaler = Standardizer::fit(&rows);

        assert_eq!(scaler.transform(rows[0]), [-1.0, 0.0, -1.0, -1.0]);
        assert_eq!(scaler.transform(rows[1]), [1.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_encoder_vocabulary_is_sorted() {
        let encoder = CategoryEncoder::fit(["면류", "밥류", "과자류", "밥류"]);
        assert_eq!(encoder.len(), 3);
        assert_eq!(encoder.column_of("과자류"), Some(0));
        assert_eq!(encoder.column_of("면류"), Some(1));
        assert_eq!(encoder.column_of("밥류"), Some(2));
        assert_eq!(encoder.column_of("음료류"), None);
    }

    #[test]
    fn test_user_and_food_vectors_share_schema() {
        let catalog = catalog();
        let space = FeatureSpace::fit(&catalog, &profile(&["밥류", "면류"]));
        let user = space.encode_user(&profile(&["밥류", "면류"]).targets);

        assert_eq!(space.columns().len(), 6);
        assert_eq!(user.values.len(), space.columns().len());
        for item in &catalog {
            let vector = space.encode_food(item).unwrap();
            assert_eq!(vector.values.len(), user.values.len());
            assert_eq!(vector.schema, user.schema);
        }
    }

    #[test]
    fn test_one_hot_marks_food_category() {
        let catalog = catalog();
        let space = FeatureSpace::fit(&catalog, &profile(&["밥류", "면류"]));

        let rice = space.encode_food(&catalog[0]).unwrap();
        assert_eq!(&rice.values[4..], &[1.0, 0.0]);
        let noodle = space.encode_food(&catalog[1]).unwrap();
        assert_eq!(&noodle.values[4..], &[0.0, 1.0]);
        let snack = space.encode_food(&catalog[2]).unwrap();
        assert_eq!(&snack.values[4..], &[0.0, 0.0]);
    }

    #[test]
    fn test_unknown_preferred_category_is_dropped() {
        let space = FeatureSpace::fit(&catalog(), &profile(&["음료류", "밥류"]));
        assert_eq!(
            space.columns(),
            &["kcal_std", "protein_std", "fat_std", "carb_std", "food_code_name_밥류"]
        );
        assert!(!space.has_category("음료류"));
    }

    #[test]
    fn test_requested_profile_gets_one_column_per_category() {
        let request: RecommendationRequest = serde_json::from_value(serde_json::json!({
            "user_id": "u1",
            "profile": {
                "targets": { "kcal": 2000.0, "protein": 120.0, "fat": 44.4, "carb": 275.0 },
                "preferred_categories": ["밥류", "밥류", "밥류"]
            }
        }))
        .unwrap();
        let profile = request.profile.unwrap();

        let space = FeatureSpace::fit(&catalog(), &profile);

        assert_eq!(
            space.columns(),
            &["kcal_std", "protein_std", "fat_std", "carb_std", "food_code_name_밥류"]
        );
        assert_eq!(space.encode_user(&profile.targets).values.len(), 5);
    }

    #[test]
    fn test_zero_weight_food_has_no_vector() {
        let mut catalog = catalog();
        catalog.push(food("A5", "무게없음", "밥류", [100.0, 1.0, 1.0, 1.0], 0.0));

        let space = FeatureSpace::fit(&catalog, &profile(&["밥류"]));
        assert!(space.encode_food(&catalog[4]).is_none());
    }

    #[test]
    fn test_cosine_rejects_foreign_schema() {
        let catalog = catalog();
        let a = FeatureSpace::fit(&catalog, &profile(&["밥류"]));
        let b = FeatureSpace::fit(&catalog, &profile(&["면류", "과자류"]));

        let user = a.encode_user(&profile(&["밥류"]).targets);
        let rice = b.encode_food(&catalog[0]).unwrap();

        let result = cosine_similarity(&user, &rice);
        assert!(matches!(result, Err(AppError::FeatureSpaceMismatch { .. })));
    }

    #[test]
    fn test_cosine_of_parallel_vectors() {
        let a = FeatureVector {
            values: vec![1.0, 2.0, 0.0],
            schema: 1,
        };
        let b = FeatureVector {
            values: vec![2.0, 4.0, 0.0],
            schema: 1,
        };
        assert!((cosine_similarity(&a, &b).unwrap() - 1.0).abs() < 1e-12);
    }
}

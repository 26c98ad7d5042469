use std::cmp::Ordering;
use std::collections::BTreeSet;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::{
    error::{AppError, AppResult},
    models::{MealItem, MealSet, NutrientTargets},
};

/// Tuning for one genetic-algorithm run
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerSettings {
    pub min_items: usize,
    pub max_items: usize,
    pub population_size: usize,
    /// Hard upper bound on generations
    pub max_generations: usize,
    /// Stop after this many generations without a better individual
    pub stagnation_limit: usize,
    pub tournament_size: usize,
    pub crossover_rate: f64,
    pub mutation_rate: f64,
    /// Weight of the relevance bonus against the nutrition error
    pub relevance_weight: f64,
    /// Relative deviation above which a nutrient counts as violated
    pub tolerance: f64,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            min_items: 3,
            max_items: 5,
            population_size: 60,
            max_generations: 200,
            stagnation_limit: 30,
            tournament_size: 3,
            crossover_rate: 0.9,
            mutation_rate: 0.2,
            relevance_weight: 0.05,
            tolerance: 0.1,
        }
    }
}

impl OptimizerSettings {
    fn validate(&self) -> AppResult<()> {
        if self.min_items == 0 || self.min_items > self.max_items {
            return Err(AppError::Validation(format!(
                "Meal size bounds {}..={} are invalid",
                self.min_items, self.max_items
            )));
        }
        if self.population_size == 0 || self.tournament_size == 0 {
            return Err(AppError::Validation(
                "Population and tournament sizes must be positive".to_string(),
            ));
        }
        for (name, rate) in [
            ("crossover_rate", self.crossover_rate),
            ("mutation_rate", self.mutation_rate),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(AppError::Validation(format!(
                    "{} must be within 0..=1, got {}",
                    name, rate
                )));
            }
        }
        if !self.relevance_weight.is_finite() || self.relevance_weight < 0.0 {
            return Err(AppError::Validation(
                "relevance_weight must be a non-negative number".to_string(),
            ));
        }
        Ok(())
    }
}

/// Goodness of an individual; lower is better
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fitness {
    /// `nutrition_error - relevance_weight * relevance`
    pub score: f64,
    /// Sum of squared relative deviations over kcal, protein, fat and carb
    pub nutrition_error: f64,
    /// Nutrients whose relative deviation exceeds the tolerance
    pub violations: usize,
    pub size: usize,
}

impl Fitness {
    /// Orders by score, then fewer violations, then smaller subsets
    pub fn compare(&self, other: &Fitness) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then(self.violations.cmp(&other.violations))
            .then(self.size.cmp(&other.size))
    }
}

#[derive(Debug, Clone)]
struct Individual {
    /// Sorted, duplicate-free pool indices
    genes: Vec<usize>,
    fitness: Fitness,
}

/// Result of one optimizer run
#[derive(Debug, Clone)]
pub struct OptimizationOutcome {
    pub indices: Vec<usize>,
    pub fitness: Fitness,
    pub generations: usize,
    /// Best score after initialization and after every generation
    pub best_history: Vec<f64>,
}

/// Genetic search for the subset of the candidate pool closest to a nutrient target.
///
/// Earlier pool entries carry a small relevance bonus, since pool order encodes
/// how strongly each food was recommended.
pub struct MealOptimizer<'a> {
    pool: &'a [MealItem],
    target: NutrientTargets,
    settings: &'a OptimizerSettings,
}

impl<'a> MealOptimizer<'a> {
    pub fn new(
        pool: &'a [MealItem],
        target: NutrientTargets,
        settings: &'a OptimizerSettings,
    ) -> Self {
        Self {
            pool,
            target,
            settings,
        }
    }

    /// Runs the search to completion. The generation budget is a hard bound.
    pub fn optimize<R: Rng + ?Sized>(&self, rng: &mut R) -> AppResult<OptimizationOutcome> {
        self.settings.validate()?;

        if self
            .target
            .as_array()
            .iter()
            .any(|t| !t.is_finite() || *t < 0.0)
        {
            return Err(AppError::Validation(
                "Nutrient targets must be non-negative numbers".to_string(),
            ));
        }

        if self.pool.len() < self.settings.min_items {
            return Err(AppError::InfeasibleConstraint(format!(
                "Candidate pool has {} items but a meal needs at least {}",
                self.pool.len(),
                self.settings.min_items
            )));
        }

        let max_items = self.settings.max_items.min(self.pool.len());

        let mut population: Vec<Individual> = (0..self.settings.population_size)
            .map(|_| {
                let genes = self.random_genes(rng, max_items);
                self.individual(genes)
            })
            .collect();

        let mut best = self.fittest(&population)?.clone();
        let mut best_history = vec![best.fitness.score];
        let mut stagnant = 0;
        let mut generations = 0;

        while generations < self.settings.max_generations {
            if best.fitness.nutrition_error == 0.0 {
                tracing::debug!(generations, "Perfect meal found, stopping early");
                break;
            }

            let mut next = Vec::with_capacity(self.settings.population_size);
            next.push(best.clone());

            while next.len() < self.settings.population_size {
                let first = self.tournament(&population, rng);
                let second = self.tournament(&population, rng);

                let mut genes = if rng.gen_bool(self.settings.crossover_rate) {
                    self.crossover(&first.genes, &second.genes, rng, max_items)
                } else {
                    first.genes.clone()
                };
                self.mutate(&mut genes, rng, max_items);
                next.push(self.individual(genes));
            }

            population = next;
            generations += 1;

            let generation_best = self.fittest(&population)?;
            if generation_best.fitness.compare(&best.fitness) == Ordering::Less {
                best = generation_best.clone();
                stagnant = 0;
            } else {
                stagnant += 1;
            }
            best_history.push(best.fitness.score);

            if stagnant >= self.settings.stagnation_limit {
                tracing::debug!(generations, "Fitness stagnated, stopping");
                break;
            }
        }

        tracing::debug!(
            generations,
            size = best.genes.len(),
            nutrition_error = best.fitness.nutrition_error,
            violations = best.fitness.violations,
            "Meal optimization finished"
        );

        Ok(OptimizationOutcome {
            indices: best.genes,
            fitness: best.fitness,
            generations,
            best_history,
        })
    }

    /// Builds the meal set for an outcome of this optimizer
    pub fn meal_set(&self, outcome: &OptimizationOutcome) -> MealSet {
        MealSet {
            items: outcome
                .indices
                .iter()
                .map(|&idx| self.pool[idx].clone())
                .collect(),
            nutrition: self.aggregate(&outcome.indices),
            nutrition_error: outcome.fitness.nutrition_error,
        }
    }

    fn aggregate(&self, genes: &[usize]) -> NutrientTargets {
        genes.iter().map(|&idx| &self.pool[idx]).fold(
            NutrientTargets {
                kcal: 0.0,
                protein: 0.0,
                fat: 0.0,
                carb: 0.0,
            },
            |acc, item| NutrientTargets {
                kcal: acc.kcal + item.kcal,
                protein: acc.protein + item.protein,
                fat: acc.fat + item.fat,
                carb: acc.carb + item.carb,
            },
        )
    }

    fn evaluate(&self, genes: &[usize]) -> Fitness {
        let totals = self.aggregate(genes).as_array();
        let targets = self.target.as_array();

        let mut nutrition_error = 0.0;
        let mut violations = 0;
        for (total, target) in totals.iter().zip(targets) {
            let deviation = (total - target) / target.max(f64::EPSILON);
            nutrition_error += deviation * deviation;
            if deviation.abs() > self.settings.tolerance {
                violations += 1;
            }
        }

        let pool_len = self.pool.len() as f64;
        let relevance = genes
            .iter()
            .map(|&idx| 1.0 - idx as f64 / pool_len)
            .sum::<f64>()
            / genes.len().max(1) as f64;

        Fitness {
            score: nutrition_error - self.settings.relevance_weight * relevance,
            nutrition_error,
            violations,
            size: genes.len(),
        }
    }

    fn individual(&self, genes: Vec<usize>) -> Individual {
        let fitness = self.evaluate(&genes);
        Individual { genes, fitness }
    }

    fn fittest<'p>(&self, population: &'p [Individual]) -> AppResult<&'p Individual> {
        population
            .iter()
            .min_by(|a, b| a.fitness.compare(&b.fitness))
            .ok_or_else(|| AppError::Internal("Empty population".to_string()))
    }

    fn random_genes<R: Rng + ?Sized>(&self, rng: &mut R, max_items: usize) -> Vec<usize> {
        let size = rng.gen_range(self.settings.min_items..=max_items);
        let mut genes = rand::seq::index::sample(rng, self.pool.len(), size).into_vec();
        genes.sort_unstable();
        genes
    }

    fn tournament<'p, R: Rng + ?Sized>(
        &self,
        population: &'p [Individual],
        rng: &mut R,
    ) -> &'p Individual {
        let mut winner = &population[rng.gen_range(0..population.len())];
        for _ in 1..self.settings.tournament_size {
            let challenger = &population[rng.gen_range(0..population.len())];
            if challenger.fitness.compare(&winner.fitness) == Ordering::Less {
                winner = challenger;
            }
        }
        winner
    }

    /// Union of both parents, shuffled and cut to a random valid size
    fn crossover<R: Rng + ?Sized>(
        &self,
        first: &[usize],
        second: &[usize],
        rng: &mut R,
        max_items: usize,
    ) -> Vec<usize> {
        let union: BTreeSet<usize> = first.iter().chain(second).copied().collect();
        let mut genes: Vec<usize> = union.into_iter().collect();
        genes.shuffle(rng);

        let upper = max_items.min(genes.len()).max(self.settings.min_items);
        let size = rng.gen_range(self.settings.min_items..=upper);
        genes.truncate(size);

        self.repair(genes, rng, max_items)
    }

    /// Swaps a member for a non-member, and occasionally grows or shrinks the subset
    fn mutate<R: Rng + ?Sized>(&self, genes: &mut Vec<usize>, rng: &mut R, max_items: usize) {
        if rng.gen_bool(self.settings.mutation_rate) {
            let outsiders = self.outsiders(genes);
            if let Some(&replacement) = outsiders.choose(rng) {
                let slot = rng.gen_range(0..genes.len());
                genes[slot] = replacement;
            }
        }

        if rng.gen_bool(self.settings.mutation_rate / 2.0) {
            let can_grow = genes.len() < max_items;
            let can_shrink = genes.len() > self.settings.min_items;
            if can_grow && (!can_shrink || rng.gen_bool(0.5)) {
                if let Some(&extra) = self.outsiders(genes).choose(rng) {
                    genes.push(extra);
                }
            } else if can_shrink {
                let slot = rng.gen_range(0..genes.len());
                genes.swap_remove(slot);
            }
        }

        let repaired = self.repair(std::mem::take(genes), rng, max_items);
        *genes = repaired;
    }

    /// Restores the invariants: sorted, unique, in range, size within bounds
    fn repair<R: Rng + ?Sized>(
        &self,
        mut genes: Vec<usize>,
        rng: &mut R,
        max_items: usize,
    ) -> Vec<usize> {
        genes.retain(|&idx| idx < self.pool.len());
        genes.sort_unstable();
        genes.dedup();

        while genes.len() < self.settings.min_items {
            match self.outsiders(&genes).choose(rng) {
                Some(&extra) => {
                    genes.push(extra);
                    genes.sort_unstable();
                }
                None => break,
            }
        }

        while genes.len() > max_items {
            let slot = rng.gen_range(0..genes.len());
            genes.remove(slot);
        }

        genes
    }

    fn outsiders(&self, genes: &[usize]) -> Vec<usize> {
        (0..self.pool.len())
            .filter(|idx| !genes.contains(idx))
            .collect()
    }
}

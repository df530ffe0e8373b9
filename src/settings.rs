use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("population size must be at least 1")]
    EmptyPopulation,
    #[error("mixing fractions must not all be zero")]
    ZeroMix,
    #[error("mutation level range is inverted ({min}..={max})")]
    InvertedLevels { min: u32, max: u32 },
}

/// run configuration for the population search. serializable so a whole run
/// can be described by a settings file and reproduced from its seed.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// population size P
    pub population: usize,
    /// generation budget
    pub generations: u64,

    // mixing fractions, normalized to sum 1 before use
    /// elite fraction carried unmodified into the next generation
    pub elite_fraction: f64,
    /// fraction produced by recombination (two children per pair)
    pub recombination_fraction: f64,
    /// fraction produced by mutating members of the pool built so far
    pub mutation_fraction: f64,
    /// fraction of fresh random individuals injected each generation
    pub random_fraction: f64,

    /// mutation intensity range; each mutant draws levels uniformly from it
    pub min_mutation_levels: u32,
    pub max_mutation_levels: u32,

    /// master RNG seed; every run with the same seed and input is identical
    pub seed: u64,

    /// generations between population checkpoints (0 = only at exit)
    pub checkpoint_interval: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        SearchSettings {
            population: 200,
            generations: 5000,
            elite_fraction: 0.20,
            recombination_fraction: 0.10,
            mutation_fraction: 0.70,
            random_fraction: 0.0,
            min_mutation_levels: 1,
            max_mutation_levels: 3,
            seed: 0xDEAD_BEEF,
            checkpoint_interval: 100,
        }
    }
}

/// per-generation offspring counts derived from the normalized fractions
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GenerationPlan {
    /// elite individuals carried over (at least 1 so the best never drops)
    pub elites: usize,
    /// recombination pairs (each yields two children)
    pub pairs: usize,
    /// mutated copies
    pub mutants: usize,
    /// fresh random individuals
    pub randoms: usize,
}

impl SearchSettings {
    pub fn checked(self) -> Result<SearchSettings, SettingsError> {
        if self.population == 0 {
            return Err(SettingsError::EmptyPopulation);
        }
        let sum = self.elite_fraction
            + self.recombination_fraction
            + self.mutation_fraction
            + self.random_fraction;
        if !(sum > 0.0) {
            return Err(SettingsError::ZeroMix);
        }
        if self.min_mutation_levels > self.max_mutation_levels {
            return Err(SettingsError::InvertedLevels {
                min: self.min_mutation_levels,
                max: self.max_mutation_levels,
            });
        }
        Ok(self)
    }

    /// normalize the four fractions and scale them by P, flooring each count
    pub fn plan(&self) -> GenerationPlan {
        let sum = self.elite_fraction
            + self.recombination_fraction
            + self.mutation_fraction
            + self.random_fraction;
        let p = self.population as f64;

        GenerationPlan {
            elites: ((self.elite_fraction / sum * p) as usize).max(1),
            pairs: (self.recombination_fraction / sum * p) as usize / 2,
            mutants: (self.mutation_fraction / sum * p) as usize,
            randoms: (self.random_fraction / sum * p) as usize,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_plan_counts() {
        let plan = SearchSettings::default().plan();
        // P=200 with fractions .2/.1/.7/0
        assert_eq!(
            plan,
            GenerationPlan {
                elites: 40,
                pairs: 10,
                mutants: 140,
                randoms: 0,
            }
        );
    }

    #[test]
    fn test_fractions_are_normalized() {
        let s = SearchSettings {
            elite_fraction: 2.0,
            recombination_fraction: 1.0,
            mutation_fraction: 7.0,
            random_fraction: 0.0,
            ..SearchSettings::default()
        };
        assert_eq!(s.plan(), SearchSettings::default().plan());
    }

    #[test]
    fn test_elites_never_zero() {
        let s = SearchSettings {
            population: 3,
            elite_fraction: 0.01,
            ..SearchSettings::default()
        };
        assert!(s.plan().elites >= 1);
    }

    #[test]
    fn test_checked_rejects_bad_configs() {
        let zero_pop = SearchSettings {
            population: 0,
            ..SearchSettings::default()
        };
        assert!(matches!(
            zero_pop.checked(),
            Err(SettingsError::EmptyPopulation)
        ));

        let zero_mix = SearchSettings {
            elite_fraction: 0.0,
            recombination_fraction: 0.0,
            mutation_fraction: 0.0,
            random_fraction: 0.0,
            ..SearchSettings::default()
        };
        assert!(matches!(zero_mix.checked(), Err(SettingsError::ZeroMix)));

        let inverted = SearchSettings {
            min_mutation_levels: 4,
            max_mutation_levels: 2,
            ..SearchSettings::default()
        };
        assert!(matches!(
            inverted.checked(),
            Err(SettingsError::InvertedLevels { min: 4, max: 2 })
        ));
    }

    #[test]
    fn test_settings_round_trip_through_json() {
        let s = SearchSettings {
            population: 64,
            generations: 123,
            seed: 42,
            ..SearchSettings::default()
        };
        let text = serde_json::to_string(&s).unwrap();
        let back: SearchSettings = serde_json::from_str(&text).unwrap();
        assert_eq!(back.population, 64);
        assert_eq!(back.generations, 123);
        assert_eq!(back.seed, 42);
    }

    #[test]
    fn test_partial_settings_file_uses_defaults() {
        let back: SearchSettings = serde_json::from_str(r#"{"population": 10}"#).unwrap();
        assert_eq!(back.population, 10);
        assert_eq!(back.generations, SearchSettings::default().generations);
    }
}

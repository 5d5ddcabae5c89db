//! Exercise library - exercise name -> muscle percentage shares

use std::collections::HashSet;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Allowed number of muscles per exercise
pub const MAX_MUSCLES: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MuscleShare {
    pub muscle: String,
    /// Share of the exercise's volume, whole percent
    pub percent: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseDefinition {
    pub name: String,
    pub muscles: Vec<MuscleShare>,
}

impl ExerciseDefinition {
    pub fn new(name: &str, muscles: &[(&str, u32)]) -> Self {
        Self {
            name: name.to_string(),
            muscles: muscles
                .iter()
                .map(|(muscle, percent)| MuscleShare {
                    muscle: muscle.to_string(),
                    percent: *percent,
                })
                .collect(),
        }
    }

    /// 1-3 muscles whose percentages sum to exactly 100
    pub fn validate(&self) -> Result<()> {
        let count = self.muscles.len();
        if count == 0 || count > MAX_MUSCLES {
            return Err(Error::MuscleCount { name: self.name.clone(), count });
        }
        let sum: u32 = self.muscles.iter().map(|m| m.percent).sum();
        if sum != 100 {
            return Err(Error::MusclePercentSum { name: self.name.clone(), sum });
        }
        Ok(())
    }
}

/// Exercise library with exact-name lookup
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExerciseLibrary {
    exercises: Vec<ExerciseDefinition>,
}

impl ExerciseLibrary {
    pub fn new(exercises: Vec<ExerciseDefinition>) -> Self {
        Self { exercises }
    }

    /// Exact name match; renamed or deleted exercises simply miss
    pub fn find_by_name(&self, name: &str) -> Option<&ExerciseDefinition> {
        self.exercises.iter().find(|e| e.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExerciseDefinition> {
        self.exercises.iter()
    }

    pub fn len(&self) -> usize {
        self.exercises.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty()
    }

    /// Every entry valid and names unique
    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for exercise in &self.exercises {
            exercise.validate()?;
            if !names.insert(exercise.name.as_str()) {
                return Err(Error::DuplicateExercise(exercise.name.clone()));
            }
        }
        Ok(())
    }
}

/// Seed entries shipped with the engine
const SEED_EXERCISES: &[(&str, &[(&str, u32)])] = &[
    ("Panca Piana", &[("Petto", 70), ("Tricipiti", 20), ("Deltoidi", 10)]),
    ("Bench Press", &[("Petto", 70), ("Tricipiti", 30)]),
    ("Squat", &[("Quadricipiti", 60), ("Glutei", 30), ("Femorali", 10)]),
    ("Stacco da Terra", &[("Femorali", 40), ("Glutei", 30), ("Dorsali", 30)]),
    ("Trazioni", &[("Dorsali", 70), ("Bicipiti", 30)]),
    ("Rematore", &[("Dorsali", 80), ("Bicipiti", 20)]),
    ("Military Press", &[("Deltoidi", 80), ("Tricipiti", 20)]),
    ("Dip", &[("Tricipiti", 60), ("Petto", 40)]),
    ("Curl", &[("Bicipiti", 100)]),
    ("Calf Raise", &[("Polpacci", 100)]),
];

pub fn default_library() -> ExerciseLibrary {
    ExerciseLibrary::new(
        SEED_EXERCISES
            .iter()
            .map(|(name, muscles)| ExerciseDefinition::new(name, muscles))
            .collect(),
    )
}

//! Error type for rejected authored input

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum Error {
    /// Technique name not in the built-in vocabulary nor in the custom table
    #[error("unknown technique: {0}")]
    UnknownTechnique(String),

    #[error("exercise '{name}' must list between 1 and 3 muscles, found {count}")]
    MuscleCount { name: String, count: usize },

    #[error("muscle percentages for '{name}' sum to {sum}, expected 100")]
    MusclePercentSum { name: String, sum: u32 },

    #[error("duplicate exercise in library: {0}")]
    DuplicateExercise(String),

    #[error("week cycle length must be at least 1")]
    InvalidWeekRemap,
}

pub type Result<T> = std::result::Result<T, Error>;

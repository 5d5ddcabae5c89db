//! Metrics module - session metrics and training analytics
//!
//! Features:
//! - Total reps / average RPE / completion per session
//! - Muscle volume with chronological week remapping
//! - RPE trend and load progression

pub mod muscle_volume;
pub mod trends;

pub use muscle_volume::{
    chronological_weeks, volume_by_muscle, volume_by_week_and_muscle, MuscleVolume, WeeklyVolume,
};
pub use trends::{load_progression, rpe_trend, LoadPoint, RpePoint};

use serde::{Deserialize, Serialize};

use crate::session::{LoggedSession, LoggedSet};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetrics {
    pub total_reps: u32,
    /// Mean over entries with an RPE; `None` when no entry has one
    #[serde(rename = "avgRPE")]
    pub avg_rpe: Option<f64>,
}

/// Reps as logged; anything non-numeric ("failed", "", "MAX") counts 0
pub fn parse_reps(text: &str) -> u32 {
    text.trim().parse::<u32>().unwrap_or(0)
}

/// Load as logged; accepts a decimal comma ("62,5")
pub fn parse_load(text: &str) -> Option<f64> {
    let text = text.trim().replace(',', ".");
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// RPE as logged; empty or non-numeric means "not rated"
pub fn parse_rpe(text: &str) -> Option<f64> {
    parse_load(text)
}

pub fn session_metrics(sets: &[LoggedSet]) -> SessionMetrics {
    let total_reps = sets
        .iter()
        .map(|s| parse_reps(&s.reps))
        .fold(0, u32::saturating_add);

    let rated: Vec<f64> = sets.iter().filter_map(|s| parse_rpe(&s.rpe)).collect();
    let avg_rpe = if rated.is_empty() {
        None
    } else {
        Some(rated.iter().sum::<f64>() / rated.len() as f64)
    };

    SessionMetrics { total_reps, avg_rpe }
}

/// Percentage of target reps achieved; 0 when there is no target
pub fn completion(total_reps: u32, target_reps: u32) -> f64 {
    if target_reps > 0 {
        total_reps as f64 / target_reps as f64 * 100.0
    } else {
        0.0
    }
}

/// Normalized volume unit of one session: sets x coefficient
pub fn session_volume(session: &LoggedSession) -> f64 {
    session.sets_count() as f64 * session.coefficient()
}

/// Training analytics over a session list
pub struct Analytics {
    sessions: Vec<LoggedSession>,
}

impl Analytics {
    pub fn new(sessions: Vec<LoggedSession>) -> Self {
        Self { sessions }
    }

    pub fn sessions(&self) -> &[LoggedSession] {
        &self.sessions
    }

    /// Sessions of one program only
    pub fn for_program(&self, program_id: &str) -> Analytics {
        Analytics::new(
            self.sessions
                .iter()
                .filter(|s| s.program_id() == program_id)
                .cloned()
                .collect(),
        )
    }

    /// Normalized volume (sets x coefficient) for an exercise
    pub fn total_volume(&self, exercise: &str) -> f64 {
        self.sessions
            .iter()
            .filter(|s| s.exercise() == exercise)
            .map(session_volume)
            .sum()
    }

    pub fn total_reps(&self, exercise: &str) -> u32 {
        self.sessions
            .iter()
            .filter(|s| s.exercise() == exercise)
            .map(|s| s.total_reps())
            .fold(0, u32::saturating_add)
    }

    /// Mean completion over sessions that had a target
    pub fn average_completion(&self) -> Option<f64> {
        let with_target: Vec<f64> = self
            .sessions
            .iter()
            .filter(|s| s.target_reps() > 0)
            .map(|s| s.completion())
            .collect();
        if with_target.is_empty() {
            return None;
        }
        Some(with_target.iter().sum::<f64>() / with_target.len() as f64)
    }

    /// Logging frequency (distinct training days per week)
    pub fn weekly_frequency(&self) -> f64 {
        let mut days: Vec<_> = self.sessions.iter().map(|s| s.date.date_naive()).collect();
        days.sort();
        days.dedup();

        if days.len() < 2 {
            return 0.0;
        }

        let first = days[0];
        let last = days[days.len() - 1];
        let span = (last - first).num_days() as f64;

        (days.len() as f64 / span) * 7.0
    }
}

//! Muscle volume tracking across logged sessions
//!
//! One session contributes `sets x coefficient` volume units, split across
//! the exercise's muscles by percent share.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::exercises::ExerciseLibrary;
use crate::session::LoggedSession;
use super::session_volume;

/// Program week identity: (program id, nominal week number)
pub type ProgramWeek = (String, u32);

/// Volume per muscle for a set of sessions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MuscleVolume {
    volumes: BTreeMap<String, f64>,
}

/// One row of the per-week table, ordered by real date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyVolume {
    /// Date-ordered index, 1-based
    pub chrono_week: u32,
    pub program_id: String,
    pub week_num: u32,
    /// Earliest log date in this program week
    pub started: DateTime<Utc>,
    pub volumes: BTreeMap<String, f64>,
}

impl MuscleVolume {
    /// Build from sessions; exercises missing from the library contribute nothing
    pub fn from_sessions(sessions: &[LoggedSession], library: &ExerciseLibrary) -> Self {
        let mut volumes: BTreeMap<String, f64> = BTreeMap::new();
        let mut missing: BTreeSet<&str> = BTreeSet::new();

        for session in sessions {
            let exercise = match library.find_by_name(session.exercise()) {
                Some(ex) => ex,
                None => {
                    missing.insert(session.exercise());
                    continue;
                }
            };

            let volume = session_volume(session);
            for share in &exercise.muscles {
                *volumes.entry(share.muscle.clone()).or_insert(0.0) +=
                    volume * share.percent as f64 / 100.0;
            }
        }

        for name in missing {
            warn!(exercise = name, "exercise not in library, volume skipped");
        }

        Self { volumes }
    }

    pub fn get(&self, muscle: &str) -> f64 {
        self.volumes.get(muscle).copied().unwrap_or(0.0)
    }

    pub fn volumes(&self) -> &BTreeMap<String, f64> {
        &self.volumes
    }

    pub fn into_volumes(self) -> BTreeMap<String, f64> {
        self.volumes
    }

    pub fn total(&self) -> f64 {
        self.volumes.values().sum()
    }

    /// Muscles sorted by volume, least worked first
    pub fn get_sorted(&self) -> Vec<(&str, f64)> {
        let mut sorted: Vec<_> = self.volumes.iter().map(|(m, v)| (m.as_str(), *v)).collect();
        sorted.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        sorted
    }

    /// Calculate balance score (0-100%)
    /// 100% = identical volume on every trained muscle
    pub fn get_balance_score(&self) -> f64 {
        if self.volumes.is_empty() {
            return 0.0;
        }

        let total = self.total();
        if total <= 0.0 {
            return 0.0;
        }

        let n = self.volumes.len() as f64;
        let target = total / n;
        let variance: f64 = self
            .volumes
            .values()
            .map(|v| (v - target).powi(2))
            .sum::<f64>()
            / n;

        // coefficient of variation 0 -> 100%, 1+ -> 0%
        let cv = variance.sqrt() / target;
        ((1.0 - cv.min(1.0)) * 100.0).max(0.0)
    }
}

/// Volume per muscle, summed across all sessions
pub fn volume_by_muscle(
    sessions: &[LoggedSession],
    library: &ExerciseLibrary,
) -> BTreeMap<String, f64> {
    MuscleVolume::from_sessions(sessions, library).into_volumes()
}

/// Date-ordered index for every (program, week) group.
///
/// Groups are ordered by their earliest log date, ties broken by program id
/// then week number, and numbered from 1.
pub fn chronological_weeks(sessions: &[LoggedSession]) -> HashMap<ProgramWeek, u32> {
    ordered_program_weeks(sessions)
        .into_iter()
        .enumerate()
        .map(|(i, (key, _))| (key, i as u32 + 1))
        .collect()
}

fn ordered_program_weeks(sessions: &[LoggedSession]) -> Vec<(ProgramWeek, DateTime<Utc>)> {
    let mut first_seen: HashMap<ProgramWeek, DateTime<Utc>> = HashMap::new();
    for session in sessions {
        let key = (session.program_id().to_string(), session.week_num());
        first_seen
            .entry(key)
            .and_modify(|d| *d = (*d).min(session.date))
            .or_insert(session.date);
    }

    let mut groups: Vec<_> = first_seen.into_iter().collect();
    groups.sort_by(|(ka, da), (kb, db)| da.cmp(db).then_with(|| ka.cmp(kb)));
    groups
}

/// Per-muscle volume for every chronological week, in date order
pub fn volume_by_week_and_muscle(
    sessions: &[LoggedSession],
    library: &ExerciseLibrary,
) -> Vec<WeeklyVolume> {
    let ordered = ordered_program_weeks(sessions);

    let mut by_group: HashMap<ProgramWeek, Vec<LoggedSession>> = HashMap::new();
    for session in sessions {
        by_group
            .entry((session.program_id().to_string(), session.week_num()))
            .or_default()
            .push(session.clone());
    }

    ordered
        .into_iter()
        .enumerate()
        .map(|(i, (key, started))| {
            let group = by_group.remove(&key).unwrap_or_default();
            WeeklyVolume {
                chrono_week: i as u32 + 1,
                program_id: key.0,
                week_num: key.1,
                started,
                volumes: volume_by_muscle(&group, library),
            }
        })
        .collect()
}

//! Percentage-of-1RM progression engine
//!
//! A progression is a 1RM plus a per-week table of (sets, reps, percentage)
//! entries. Loads are `round(1RM * pct / 100)` to the nearest increment,
//! ties away from zero.

use std::collections::{BTreeMap, HashSet};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::block::Block;
use crate::program::{Day, ExerciseEntry, Week};

/// Rounding applied to computed loads
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawRoundingPolicy")]
pub struct RoundingPolicy {
    /// Load step, e.g. 1.0 kg or 2.5 kg
    increment: f64,
}

#[derive(Deserialize)]
struct RawRoundingPolicy {
    increment: f64,
}

impl From<RawRoundingPolicy> for RoundingPolicy {
    fn from(raw: RawRoundingPolicy) -> Self {
        RoundingPolicy::new(raw.increment)
    }
}

impl Default for RoundingPolicy {
    fn default() -> Self {
        Self { increment: 1.0 }
    }
}

impl RoundingPolicy {
    pub fn new(increment: f64) -> Self {
        if increment.is_finite() && increment > 0.0 {
            Self { increment }
        } else {
            Self::default()
        }
    }

    pub fn increment(&self) -> f64 {
        self.increment
    }

    /// Nearest multiple of `increment`, halves away from zero
    pub fn apply(&self, value: f64) -> f64 {
        (value / self.increment).round() * self.increment
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentageBlock {
    pub sets: u32,
    pub reps: u32,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekConfig {
    pub week_number: u32,
    #[serde(default)]
    pub blocks: Vec<PercentageBlock>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PercentageProgression {
    pub one_rep_max: f64,
    #[serde(default)]
    pub weeks: Vec<WeekConfig>,
}

/// One percentage entry resolved to an absolute load
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandedBlock {
    pub sets: u32,
    pub reps: u32,
    pub percentage: f64,
    pub load_kg: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

/// Absolute load for a percentage of 1RM, nearest kg
pub fn load_for_percentage(one_rep_max: f64, percentage: f64) -> f64 {
    load_for_percentage_with(one_rep_max, percentage, &RoundingPolicy::default())
}

pub fn load_for_percentage_with(
    one_rep_max: f64,
    percentage: f64,
    rounding: &RoundingPolicy,
) -> f64 {
    rounding.apply(one_rep_max * percentage / 100.0)
}

/// Loads for every week entry, keyed by week number.
///
/// Gaps between week numbers are kept as gaps. Entries of a repeated week
/// number are appended in order.
pub fn expand_progression(
    progression: &PercentageProgression,
) -> BTreeMap<u32, Vec<ExpandedBlock>> {
    expand_progression_with(progression, &RoundingPolicy::default())
}

pub fn expand_progression_with(
    progression: &PercentageProgression,
    rounding: &RoundingPolicy,
) -> BTreeMap<u32, Vec<ExpandedBlock>> {
    let mut expanded: BTreeMap<u32, Vec<ExpandedBlock>> = BTreeMap::new();

    for week in &progression.weeks {
        let blocks = expanded.entry(week.week_number).or_default();
        for entry in &week.blocks {
            blocks.push(ExpandedBlock {
                sets: entry.sets,
                reps: entry.reps,
                percentage: entry.percentage,
                load_kg: load_for_percentage_with(
                    progression.one_rep_max,
                    entry.percentage,
                    rounding,
                ),
            });
        }
    }

    expanded
}

/// Collect every violation in an authored progression
pub fn validate_progression(progression: &PercentageProgression) -> ValidationReport {
    let mut errors = Vec::new();

    if progression.one_rep_max.is_nan() || progression.one_rep_max <= 0.0 {
        errors.push(format!(
            "One-rep max must be greater than 0 (got {})",
            progression.one_rep_max
        ));
    }

    let mut seen = HashSet::new();
    for week in &progression.weeks {
        if week.week_number < 1 {
            errors.push("Week numbers must start at 1".to_string());
        }
        if !seen.insert(week.week_number) {
            errors.push(format!("Week {} is defined more than once", week.week_number));
        }
        if week.blocks.is_empty() {
            errors.push(format!("Week {} has no blocks", week.week_number));
        }
        for (i, entry) in week.blocks.iter().enumerate() {
            if entry.percentage.is_nan() || entry.percentage <= 0.0 || entry.percentage > 100.0 {
                errors.push(format!(
                    "Week {}, block {}: percentage {} must be in (0, 100]",
                    week.week_number,
                    i + 1,
                    entry.percentage
                ));
            }
        }
    }

    ValidationReport {
        valid: errors.is_empty(),
        errors,
    }
}

/// Write expanded loads into the program, week by week.
///
/// Entry `i` of a progression week overwrites block `i` of the exercise at
/// (`day_index`, `exercise_index`). Missing weeks, days, exercise entries
/// and blocks are created from the first existing entry at that position.
/// Program weeks absent from the progression are left as they are.
/// Destructive: callers invoke it on explicit confirmation only.
pub fn apply_to_all_weeks(
    progression: &PercentageProgression,
    program_weeks: &[Week],
    day_index: usize,
    exercise_index: usize,
    rounding: &RoundingPolicy,
) -> Vec<Week> {
    let mut weeks = program_weeks.to_vec();
    let expanded = expand_progression_with(progression, rounding);

    let template = program_weeks
        .iter()
        .find_map(|w| w.days.get(day_index)?.exercises.get(exercise_index))
        .cloned()
        .unwrap_or_default();
    let template_block = template.blocks.first().cloned().unwrap_or_default();

    for (week_number, blocks) in &expanded {
        let pos = match weeks.iter().position(|w| w.week_number == *week_number) {
            Some(pos) => pos,
            None => {
                weeks.push(Week::new(*week_number));
                weeks.len() - 1
            }
        };
        let week = &mut weeks[pos];

        if week.days.len() <= day_index {
            week.days.resize_with(day_index + 1, Day::default);
        }
        let day = &mut week.days[day_index];
        if day.exercises.len() <= exercise_index {
            day.exercises.resize_with(exercise_index, ExerciseEntry::default);
            day.exercises.push(ExerciseEntry {
                blocks: Vec::new(),
                ..template.clone()
            });
        }
        let entry = &mut day.exercises[exercise_index];

        for (i, expanded_block) in blocks.iter().enumerate() {
            let current: &Block = entry.blocks.get(i).unwrap_or(&template_block);
            let updated = current.with_prescription(
                expanded_block.sets,
                expanded_block.reps,
                expanded_block.load_kg,
            );
            if i < entry.blocks.len() {
                entry.blocks[i] = updated;
            } else {
                entry.blocks.push(updated);
            }
        }
    }

    weeks.sort_by_key(|w| w.week_number);
    info!(
        weeks = expanded.len(),
        day_index, exercise_index, "percentage progression applied to program"
    );
    weeks
}

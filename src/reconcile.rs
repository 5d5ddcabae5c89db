//! Plan-log reconciliation
//!
//! Logged sessions point back into the plan by position (week, day,
//! exercise, block), not by identity. Everything that needs the planned
//! block behind a session goes through this module.

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::block::{Block, RepTarget};
use crate::error::{Error, Result};
use crate::program::{find_week, Week};
use crate::session::LoggedSession;

/// Folds week numbers of a longer combined history onto a program's
/// canonical week range: `((week - offset) mod cycle) + 1`.
///
/// The parameters come from how the program was generated (duplication,
/// demo seeding); they are never inferred here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawWeekRemap")]
pub struct WeekRemap {
    offset: u32,
    cycle_length: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawWeekRemap {
    offset: u32,
    cycle_length: u32,
}

impl TryFrom<RawWeekRemap> for WeekRemap {
    type Error = Error;

    fn try_from(raw: RawWeekRemap) -> Result<Self> {
        WeekRemap::new(raw.offset, raw.cycle_length)
    }
}

impl WeekRemap {
    pub fn new(offset: u32, cycle_length: u32) -> Result<Self> {
        if cycle_length == 0 {
            return Err(Error::InvalidWeekRemap);
        }
        Ok(Self { offset, cycle_length })
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn cycle_length(&self) -> u32 {
        self.cycle_length
    }

    pub fn apply(&self, week_num: u32) -> u32 {
        let shifted = week_num as i64 - self.offset as i64;
        (shifted.rem_euclid(self.cycle_length as i64) + 1) as u32
    }
}

/// Planned block a session was logged against, if it still exists.
///
/// The exercise entry at the logged index is used when its name still
/// matches; otherwise the first entry of that day with the same name.
pub fn find_original_block<'a>(
    session: &LoggedSession,
    program_weeks: &'a [Week],
    remap: Option<&WeekRemap>,
) -> Option<&'a Block> {
    let week_num = remap.map_or(session.week_num(), |r| r.apply(session.week_num()));
    let day = find_week(program_weeks, week_num)?.days.get(session.day_index())?;

    let entry = day
        .exercises
        .get(session.exercise_index())
        .filter(|e| e.exercise == session.exercise())
        .or_else(|| day.exercises.iter().find(|e| e.exercise == session.exercise()))?;

    entry.blocks.get(session.block_index())
}

/// Sessions of one compound exercise entry, in block order
#[derive(Debug, Clone, PartialEq)]
pub struct BlockGroup<'a> {
    pub program_id: String,
    pub exercise: String,
    pub day_index: usize,
    pub week_num: u32,
    pub sessions: Vec<&'a LoggedSession>,
}

/// Group sessions sharing (exercise, day, week) within one program; each
/// group is ordered by block index, then date. Groups come out by program,
/// week, day, exercise.
pub fn group_sessions_by_block(sessions: &[LoggedSession]) -> Vec<BlockGroup<'_>> {
    type GroupKey<'s> = (&'s str, u32, usize, &'s str);
    let mut groups: BTreeMap<GroupKey<'_>, Vec<&LoggedSession>> = BTreeMap::new();
    for session in sessions {
        let key = (
            session.program_id(),
            session.week_num(),
            session.day_index(),
            session.exercise(),
        );
        groups.entry(key).or_default().push(session);
    }

    groups
        .into_iter()
        .map(|((program_id, week_num, day_index, exercise), mut members)| {
            members.sort_by_key(|s| (s.block_index(), s.date));
            BlockGroup {
                program_id: program_id.to_string(),
                exercise: exercise.to_string(),
                day_index,
                week_num,
                sessions: members,
            }
        })
        .collect()
}

/// Where a target value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetSource {
    /// Live program block
    Plan,
    /// Snapshot stored on the session when it was logged
    Snapshot,
    Missing,
}

/// Logged set/cluster next to its planned target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetComparison {
    pub set_num: u32,
    pub cluster_num: u32,
    pub actual_reps: String,
    pub actual_load: String,
    pub target_reps: Option<RepTarget>,
    pub target_load: Option<f64>,
    pub source: TargetSource,
}

impl SetComparison {
    /// Format for history display, e.g. "S2.1: 8 x 60 kg (target 10 x 62.5 kg)"
    pub fn format(&self) -> String {
        let actual = format!(
            "{} x {}",
            display_or_dash(&self.actual_reps),
            format_load_text(&self.actual_load)
        );

        let target = match (self.target_reps, self.target_load) {
            (None, None) => String::new(),
            (reps, load) => format!(
                " (target {} x {})",
                reps.map_or("-".to_string(), |r| r.to_string()),
                load.map_or("-".to_string(), format_load)
            ),
        };

        format!("S{}.{}: {}{}", self.set_num, self.cluster_num, actual, target)
    }
}

/// Pair every logged entry with its planned target.
///
/// Targets come from `original` while it still carries the prescription
/// the session was logged against (technique, schema, sets, reps, loads);
/// after any edit they come from the session snapshot.
pub fn compare_to_plan(session: &LoggedSession, original: Option<&Block>) -> Vec<SetComparison> {
    let live = original.filter(|b| session.matches_plan(b));
    if original.is_some() && live.is_none() {
        debug!(
            exercise = session.exercise(),
            week = session.week_num(),
            "planned block edited since logging, using snapshot"
        );
    }

    session
        .sets()
        .iter()
        .map(|set| {
            let planned = live.map(|b| {
                (
                    b.target_reps_at(set.set_num, set.cluster_num),
                    b.target_load_at(set.set_num, set.cluster_num),
                )
            });

            let (target_reps, target_load, source) = match planned {
                Some((reps, Some(load))) => (reps, Some(load), TargetSource::Plan),
                _ => {
                    let reps = session.snapshot_reps_at(set.set_num, set.cluster_num);
                    let load = session.snapshot_load_at(set.set_num, set.cluster_num);
                    let source = if reps.is_some() || load.is_some() {
                        TargetSource::Snapshot
                    } else {
                        TargetSource::Missing
                    };
                    (reps, load, source)
                }
            };

            SetComparison {
                set_num: set.set_num,
                cluster_num: set.cluster_num,
                actual_reps: set.reps.clone(),
                actual_load: set.load.clone(),
                target_reps,
                target_load,
                source,
            }
        })
        .collect()
}

/// Sessions of `exercise` logged with exactly `schema`, oldest first
pub fn history_for_schema<'a>(
    sessions: &'a [LoggedSession],
    exercise: &str,
    schema: &str,
) -> Vec<&'a LoggedSession> {
    let mut history: Vec<_> = sessions
        .iter()
        .filter(|s| s.exercise() == exercise && s.technique_schema() == schema.trim())
        .collect();
    history.sort_by_key(|s| s.date);
    history
}

fn format_load(load: f64) -> String {
    if load.fract().abs() > f64::EPSILON {
        format!("{:.1} kg", load)
    } else {
        format!("{:.0} kg", load)
    }
}

fn format_load_text(text: &str) -> String {
    match crate::metrics::parse_load(text) {
        Some(load) => format_load(load),
        None => display_or_dash(text).to_string(),
    }
}

fn display_or_dash(text: &str) -> &str {
    let text = text.trim();
    if text.is_empty() { "-" } else { text }
}

//! RPE trend and load progression series for charting

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::LoggedSession;
use super::muscle_volume::chronological_weeks;
use super::{parse_load, parse_reps};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpePoint {
    pub chrono_week: u32,
    #[serde(rename = "avgRPE")]
    pub avg_rpe: f64,
    /// Sessions with an RPE in this week
    pub sessions: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadPoint {
    pub date: DateTime<Utc>,
    pub program_id: String,
    pub week_num: u32,
    pub top_load: f64,
    pub total_reps: u32,
    /// Sum of reps x load over sets with a numeric load
    pub tonnage: f64,
}

/// Average session RPE per chronological week, weeks without RPE omitted
pub fn rpe_trend(sessions: &[LoggedSession]) -> Vec<RpePoint> {
    let weeks = chronological_weeks(sessions);
    let mut sums: Vec<(u32, f64, usize)> = Vec::new();

    for session in sessions {
        let Some(rpe) = session.avg_rpe() else {
            continue;
        };
        let key = (session.program_id().to_string(), session.week_num());
        let Some(&week) = weeks.get(&key) else {
            continue;
        };
        match sums.iter_mut().find(|(w, _, _)| *w == week) {
            Some(entry) => {
                entry.1 += rpe;
                entry.2 += 1;
            }
            None => sums.push((week, rpe, 1)),
        }
    }

    sums.sort_by_key(|(week, _, _)| *week);
    sums.into_iter()
        .map(|(chrono_week, total, count)| RpePoint {
            chrono_week,
            avg_rpe: total / count as f64,
            sessions: count,
        })
        .collect()
}

/// Per-session load series for one exercise, date ordered.
///
/// Sessions with no numeric load are skipped.
pub fn load_progression(sessions: &[LoggedSession], exercise: &str) -> Vec<LoadPoint> {
    let mut points: Vec<LoadPoint> = sessions
        .iter()
        .filter(|s| s.exercise() == exercise)
        .filter_map(|s| {
            let top_load = s.top_load()?;
            let tonnage = s
                .sets()
                .iter()
                .filter_map(|set| parse_load(&set.load).map(|l| l * parse_reps(&set.reps) as f64))
                .sum();
            Some(LoadPoint {
                date: s.date,
                program_id: s.program_id().to_string(),
                week_num: s.week_num(),
                top_load,
                total_reps: s.total_reps(),
                tonnage,
            })
        })
        .collect();

    points.sort_by_key(|p| p.date);
    points
}

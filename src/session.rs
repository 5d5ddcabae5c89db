//! Logged sessions - immutable record of one performed block

use std::collections::BTreeSet;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::block::{Block, RepTarget, DEFAULT_COEFFICIENT};
use crate::metrics::{completion, session_metrics};
use crate::technique::Technique;

/// One logged set or cluster. Values stay as entered; parsing is lenient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggedSet {
    pub set_num: u32,
    /// Restarts at 1 within each set
    #[serde(default = "first_cluster")]
    pub cluster_num: u32,
    #[serde(default, deserialize_with = "lenient_text")]
    pub reps: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub load: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub rpe: String,
}

fn first_cluster() -> u32 {
    1
}

fn default_coefficient() -> f64 {
    DEFAULT_COEFFICIENT
}

/// Accept strings, numbers or null for free-text numeric fields
fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}

impl LoggedSet {
    pub fn new(set_num: u32, cluster_num: u32, reps: &str, load: &str, rpe: &str) -> Self {
        Self {
            set_num,
            cluster_num,
            reps: reps.to_string(),
            load: load.to_string(),
            rpe: rpe.to_string(),
        }
    }
}

/// Where a session was logged in the plan: a back-reference by position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOrigin {
    pub program_id: String,
    pub week_num: u32,
    pub day_index: usize,
    pub exercise_index: usize,
    pub block_index: usize,
    pub exercise: String,
}

/// Historical record of one performed block.
///
/// Origin, technique and schema are fixed at creation. Editing replaces
/// the sets and recomputes the derived fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggedSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(flatten)]
    origin: SessionOrigin,
    #[serde(default)]
    technique: Technique,
    #[serde(default)]
    technique_schema: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    sets: Vec<LoggedSet>,
    #[serde(default = "default_coefficient")]
    coefficient: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reps_base: Option<RepTarget>,
    /// Per-set rep overrides of the block at logging time
    #[serde(default, rename = "targetRepsBySet", skip_serializing_if = "Option::is_none")]
    rep_overrides: Option<Vec<RepTarget>>,
    #[serde(default)]
    target_loads: Vec<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    target_loads_by_cluster: Vec<Vec<f64>>,
    #[serde(default)]
    total_reps: u32,
    #[serde(default, rename = "avgRPE")]
    avg_rpe: Option<f64>,
    #[serde(default)]
    target_reps: u32,
    #[serde(default)]
    completion: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl LoggedSession {
    /// Create the record when the user finalizes logging against `block`
    pub fn finalize(
        origin: SessionOrigin,
        block: &Block,
        sets: Vec<LoggedSet>,
        date: DateTime<Utc>,
    ) -> Self {
        let session = Self {
            id: None,
            origin,
            technique: block.technique.clone(),
            technique_schema: block.technique_schema.clone(),
            date,
            sets,
            coefficient: block.coefficient,
            reps_base: block.reps_base,
            rep_overrides: block.target_reps.clone(),
            target_loads: block.target_loads.clone(),
            target_loads_by_cluster: block.target_loads_by_cluster.clone(),
            total_reps: 0,
            avg_rpe: None,
            target_reps: block.calculate_target_reps(),
            completion: 0.0,
            notes: None,
        };
        session.recomputed()
    }

    /// Copy with the sets replaced and derived fields recomputed
    pub fn with_sets(&self, sets: Vec<LoggedSet>) -> Self {
        let session = Self { sets, ..self.clone() };
        session.recomputed()
    }

    /// Copy with derived fields recomputed from the sets (e.g. after loading)
    pub fn recomputed(&self) -> Self {
        let mut session = self.clone();
        let metrics = session_metrics(&session.sets);
        session.total_reps = metrics.total_reps;
        session.avg_rpe = metrics.avg_rpe;
        session.completion = completion(session.total_reps, session.target_reps);
        session
    }

    pub fn origin(&self) -> &SessionOrigin {
        &self.origin
    }

    pub fn program_id(&self) -> &str {
        &self.origin.program_id
    }

    pub fn week_num(&self) -> u32 {
        self.origin.week_num
    }

    pub fn day_index(&self) -> usize {
        self.origin.day_index
    }

    pub fn exercise_index(&self) -> usize {
        self.origin.exercise_index
    }

    pub fn block_index(&self) -> usize {
        self.origin.block_index
    }

    pub fn exercise(&self) -> &str {
        &self.origin.exercise
    }

    pub fn technique(&self) -> &Technique {
        &self.technique
    }

    pub fn technique_schema(&self) -> &str {
        &self.technique_schema
    }

    pub fn sets(&self) -> &[LoggedSet] {
        &self.sets
    }

    pub fn coefficient(&self) -> f64 {
        self.coefficient
    }

    pub fn total_reps(&self) -> u32 {
        self.total_reps
    }

    pub fn avg_rpe(&self) -> Option<f64> {
        self.avg_rpe
    }

    pub fn target_reps(&self) -> u32 {
        self.target_reps
    }

    pub fn completion(&self) -> f64 {
        self.completion
    }

    /// Number of distinct sets logged (clusters of one set count once)
    pub fn sets_count(&self) -> usize {
        self.sets
            .iter()
            .map(|s| s.set_num)
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// Snapshot load taken at creation, 1-based (set, cluster)
    pub fn snapshot_load_at(&self, set_num: u32, cluster_num: u32) -> Option<f64> {
        let set = (set_num as usize).checked_sub(1)?;
        if self.technique.is_clustered() && !self.target_loads_by_cluster.is_empty() {
            let cluster = (cluster_num as usize).checked_sub(1)?;
            return self.target_loads_by_cluster.get(set)?.get(cluster).copied();
        }
        self.target_loads.get(set).copied()
    }

    /// Snapshot rep target taken at creation, 1-based (set, cluster)
    pub fn snapshot_reps_at(&self, set_num: u32, cluster_num: u32) -> Option<RepTarget> {
        if set_num == 0 {
            return None;
        }
        if self.technique.is_clustered() {
            let cluster = (cluster_num as usize).checked_sub(1)?;
            return crate::schema::parse_schema(&self.technique_schema)
                .get(cluster)
                .map(|r| RepTarget::Reps(*r));
        }
        self.rep_overrides
            .as_ref()
            .and_then(|o| o.get(set_num as usize - 1).copied())
            .or(self.reps_base)
    }

    /// True while `block` still carries the prescription snapshotted here
    pub fn matches_plan(&self, block: &Block) -> bool {
        block.technique == self.technique
            && block.technique_schema == self.technique_schema
            && block.reps_base == self.reps_base
            && block.target_reps == self.rep_overrides
            && block.target_loads == self.target_loads
            && block.target_loads_by_cluster == self.target_loads_by_cluster
            && block.calculate_target_reps() == self.target_reps
    }

    /// Heaviest numeric load logged, if any
    pub fn top_load(&self) -> Option<f64> {
        self.sets
            .iter()
            .filter_map(|s| crate::metrics::parse_load(&s.load))
            .fold(None, |best: Option<f64>, load| Some(best.map_or(load, |b| b.max(load))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::technique::SpecialTechnique;
    use chrono::TimeZone;

    fn create_origin() -> SessionOrigin {
        SessionOrigin {
            program_id: "p1".to_string(),
            week_num: 2,
            day_index: 0,
            exercise_index: 1,
            block_index: 0,
            exercise: "Bench Press".to_string(),
        }
    }

    fn create_date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 18, 0, 0).unwrap()
    }

    #[test]
    fn test_finalize_computes_derived() {
        let block = Block::new(3, 10, 80.0);
        let sets = vec![
            LoggedSet::new(1, 1, "10", "80", "8"),
            LoggedSet::new(2, 1, "9", "80", "9"),
            LoggedSet::new(3, 1, "8", "80", ""),
        ];
        let session = LoggedSession::finalize(create_origin(), &block, sets, create_date());

        assert_eq!(session.total_reps(), 27);
        assert_eq!(session.avg_rpe(), Some(8.5));
        assert_eq!(session.target_reps(), 30);
        assert!((session.completion() - 90.0).abs() < 1e-9);
        assert_eq!(session.sets_count(), 3);
        assert_eq!(session.top_load(), Some(80.0));
    }

    #[test]
    fn test_edit_keeps_origin() {
        let block = Block::new(2, 5, 100.0);
        let session = LoggedSession::finalize(
            create_origin(),
            &block,
            vec![LoggedSet::new(1, 1, "5", "100", "")],
            create_date(),
        );
        let edited = session.with_sets(vec![
            LoggedSet::new(1, 1, "5", "100", "7"),
            LoggedSet::new(2, 1, "5", "100", "8"),
        ]);

        assert_eq!(edited.origin(), session.origin());
        assert_eq!(edited.total_reps(), 10);
        assert_eq!(edited.completion(), 100.0);
        assert_eq!(edited.avg_rpe(), Some(7.5));
    }

    #[test]
    fn test_zero_target_completion() {
        let mut block = Block::new(3, 10, 0.0);
        block.reps_base = Some(RepTarget::Max);
        let session = LoggedSession::finalize(
            create_origin(),
            &block,
            vec![LoggedSet::new(1, 1, "15", "", "")],
            create_date(),
        );
        assert_eq!(session.target_reps(), 0);
        assert_eq!(session.completion(), 0.0);
        assert!(!session.completion().is_nan());
    }

    #[test]
    fn test_sets_count_ignores_clusters() {
        let block = Block {
            technique: Technique::Special(SpecialTechnique::DropSet),
            technique_schema: "10+8".to_string(),
            reps_base: None,
            ..Block::new(2, 0, 60.0)
        }
        .normalized();
        let sets = vec![
            LoggedSet::new(1, 1, "10", "60", ""),
            LoggedSet::new(1, 2, "8", "45", ""),
            LoggedSet::new(2, 1, "9", "60", ""),
            LoggedSet::new(2, 2, "7", "45", ""),
        ];
        let session = LoggedSession::finalize(create_origin(), &block, sets, create_date());
        assert_eq!(session.sets_count(), 2);
        assert_eq!(session.target_reps(), 36);
        assert_eq!(session.snapshot_load_at(2, 2), Some(60.0));
        assert_eq!(session.snapshot_reps_at(1, 2), Some(RepTarget::Reps(8)));
    }

    #[test]
    fn test_snapshot_keeps_rep_overrides() {
        let mut block = Block::new(3, 10, 60.0);
        block.target_reps = Some(vec![
            RepTarget::Reps(12),
            RepTarget::Reps(10),
            RepTarget::Reps(8),
        ]);
        let session = LoggedSession::finalize(
            create_origin(),
            &block,
            vec![LoggedSet::new(1, 1, "12", "60", "")],
            create_date(),
        );

        assert_eq!(session.snapshot_reps_at(1, 1), Some(RepTarget::Reps(12)));
        assert_eq!(session.snapshot_reps_at(3, 1), Some(RepTarget::Reps(8)));
        // beyond the overrides the base target applies
        assert_eq!(session.snapshot_reps_at(4, 1), Some(RepTarget::Reps(10)));
        assert_eq!(session.snapshot_reps_at(0, 1), None);

        let json = serde_json::to_string(&session).unwrap();
        let restored: LoggedSession = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.snapshot_reps_at(1, 1), Some(RepTarget::Reps(12)));
    }

    #[test]
    fn test_matches_plan() {
        let block = Block::new(3, 10, 80.0);
        let session = LoggedSession::finalize(create_origin(), &block, vec![], create_date());
        assert!(session.matches_plan(&block));

        let mut heavier = block.clone();
        heavier.target_loads = vec![100.0; 3];
        assert!(!session.matches_plan(&heavier));

        assert!(!session.matches_plan(&block.resize(4)));

        let mut pyramid = block.clone();
        pyramid.target_reps = Some(vec![
            RepTarget::Reps(12),
            RepTarget::Reps(10),
            RepTarget::Reps(8),
        ]);
        assert!(!session.matches_plan(&pyramid));
    }

    #[test]
    fn test_lenient_json() {
        let json = r#"{
            "programId": "p1", "weekNum": 1, "dayIndex": 0, "exerciseIndex": 0,
            "blockIndex": 0, "exercise": "Squat", "date": "2026-01-05T10:00:00Z",
            "sets": [
                {"setNum": 1, "reps": 5, "load": 100.5, "rpe": null},
                {"setNum": 2, "clusterNum": 1, "reps": "failed", "load": "100"}
            ]
        }"#;
        let session: LoggedSession = serde_json::from_str(json).unwrap();
        let session = session.recomputed();
        assert_eq!(session.sets()[0].reps, "5");
        assert_eq!(session.sets()[0].load, "100.5");
        assert_eq!(session.sets()[1].cluster_num, 1);
        assert_eq!(session.total_reps(), 5);
        assert_eq!(session.avg_rpe(), None);
        assert_eq!(session.exercise(), "Squat");
    }
}

//! Block model - one prescription of work within an exercise
//!
//! Shape invariant for clustered techniques:
//! - `target_loads_by_cluster.len() == sets`
//! - every row has `cluster_count()` entries
//! - `target_loads` mirrors the first column
//!
//! Every change to `sets`, schema or technique goes through `fit_shape`.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::progression::PercentageProgression;
use crate::schema::{self, generate_schema};
use crate::technique::{
    transition_effects, CustomTechniques, Technique, TechniqueParams, TransitionEffect,
};

/// Rep target restored when switching back to a straight technique
pub const DEFAULT_REPS: u32 = 10;

/// Load used when there is nothing to replicate
pub const DEFAULT_LOAD: f64 = 0.0;

pub const DEFAULT_COEFFICIENT: f64 = 1.0;

/// Per-set rep target: a number or max effort
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepTarget {
    #[serde(rename = "MAX")]
    Max,
    #[serde(untagged)]
    Reps(u32),
}

impl RepTarget {
    /// Numeric reps; `Max` has no count
    pub fn reps(&self) -> Option<u32> {
        match self {
            RepTarget::Reps(n) => Some(*n),
            RepTarget::Max => None,
        }
    }
}

impl std::fmt::Display for RepTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepTarget::Max => write!(f, "MAX"),
            RepTarget::Reps(n) => write!(f, "{}", n),
        }
    }
}

impl std::str::FromStr for RepTarget {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("max") {
            return Ok(RepTarget::Max);
        }
        s.parse::<u32>()
            .map(RepTarget::Reps)
            .map_err(|_| format!("Invalid rep target: {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepRange {
    pub min: u32,
    pub max: u32,
}

fn default_coefficient() -> f64 {
    DEFAULT_COEFFICIENT
}

/// One contiguous prescription of work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    #[serde(default)]
    pub technique: Technique,
    pub sets: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reps_base: Option<RepTarget>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rep_range: Option<RepRange>,
    #[serde(default)]
    pub technique_schema: String,
    #[serde(default, skip_serializing_if = "TechniqueParams::is_empty")]
    pub technique_params: TechniqueParams,
    #[serde(default)]
    pub target_loads: Vec<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub target_loads_by_cluster: Vec<Vec<f64>>,
    /// Per-set overrides of `reps_base` (straight techniques only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_reps: Option<Vec<RepTarget>>,
    #[serde(default = "default_coefficient")]
    pub coefficient: f64,
    #[serde(default, rename = "targetRPE", skip_serializing_if = "Option::is_none")]
    pub target_rpe: Option<f64>,
    /// Rest between sets, seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest: Option<u32>,
    /// Rest after the block, seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_rest: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage_progression: Option<PercentageProgression>,
}

impl Default for Block {
    fn default() -> Self {
        Self {
            technique: Technique::Normal,
            sets: 3,
            reps_base: Some(RepTarget::Reps(DEFAULT_REPS)),
            rep_range: None,
            technique_schema: String::new(),
            technique_params: TechniqueParams::new(),
            target_loads: vec![DEFAULT_LOAD; 3],
            target_loads_by_cluster: Vec::new(),
            target_reps: None,
            coefficient: DEFAULT_COEFFICIENT,
            target_rpe: None,
            rest: None,
            block_rest: None,
            notes: None,
            percentage_progression: None,
        }
    }
}

impl Block {
    /// Normal block: `sets` x `reps` at `load`
    pub fn new(sets: u32, reps: u32, load: f64) -> Self {
        Self {
            sets,
            reps_base: Some(RepTarget::Reps(reps)),
            target_loads: vec![load; sets as usize],
            ..Self::default()
        }
    }

    /// Clusters per set (1 for straight techniques or an empty schema)
    pub fn cluster_count(&self) -> usize {
        if self.technique.is_clustered() {
            schema::cluster_count(&self.technique_schema)
        } else {
            1
        }
    }

    /// Copy with a new set count, loads resized to match
    pub fn resize(&self, sets: u32) -> Block {
        let mut block = self.clone();
        block.sets = sets;
        block.fit_shape();
        block
    }

    /// Copy with a new schema, cluster rows resized to match
    pub fn with_schema(&self, schema: &str) -> Block {
        let mut block = self.clone();
        if !block.technique.is_clustered() {
            debug!(technique = %block.technique, "schema ignored for straight technique");
            return block;
        }
        block.technique_schema = schema.trim().to_string();
        block.fit_shape();
        block
    }

    /// Copy with the shape invariant restored
    pub fn normalized(&self) -> Block {
        let mut block = self.clone();
        block.fit_shape();
        block
    }

    /// Switch technique, applying the transition's fixed side effects.
    ///
    /// A custom technique missing from `customs` is rejected.
    pub fn apply_technique_change(
        &self,
        technique: &Technique,
        customs: &CustomTechniques,
    ) -> Result<Block> {
        let params = technique.default_params(customs)?;
        if *technique == self.technique {
            return Ok(self.clone());
        }

        let mut block = self.clone();
        let effects = transition_effects(self.technique.family(), technique.family());
        block.technique = technique.clone();

        for effect in effects {
            match effect {
                TransitionEffect::ClearRepTargets => {
                    block.reps_base = None;
                    block.rep_range = None;
                    block.target_reps = None;
                }
                TransitionEffect::RestoreDefaultReps => {
                    if block.reps_base.is_none() {
                        block.reps_base = Some(RepTarget::Reps(DEFAULT_REPS));
                    }
                }
                TransitionEffect::ClearSchema => {
                    block.technique_schema.clear();
                    block.technique_params.clear();
                }
                TransitionEffect::GenerateDefaultSchema => {
                    block.technique_schema = generate_schema(technique, &params, customs)?;
                    block.technique_params = params.clone();
                }
                TransitionEffect::BuildClusterLoads => {
                    let clusters = block.cluster_count();
                    block.target_loads_by_cluster = block
                        .target_loads
                        .iter()
                        .map(|load| vec![*load; clusters])
                        .collect();
                }
                TransitionEffect::DropClusterLoads => {
                    block.target_loads_by_cluster.clear();
                }
            }
        }

        block.fit_shape();
        debug!(from = %self.technique, to = %block.technique, ?effects, "technique changed");
        Ok(block)
    }

    /// Copy carrying a straight `sets` x `reps` @ `load` prescription
    pub fn with_prescription(&self, sets: u32, reps: u32, load: f64) -> Block {
        let mut block = self.clone();
        if !matches!(block.technique, Technique::Normal | Technique::Ramping) {
            block.technique = Technique::Normal;
            block.technique_schema.clear();
            block.technique_params.clear();
            block.target_loads_by_cluster.clear();
        }
        block.sets = sets;
        block.reps_base = Some(RepTarget::Reps(reps));
        block.rep_range = None;
        block.target_reps = None;
        block.target_loads = vec![load; sets as usize];
        block
    }

    /// Planned reps for the whole block.
    ///
    /// Max-effort targets contribute nothing; Ad-Hoc blocks have no target.
    pub fn calculate_target_reps(&self) -> u32 {
        if self.technique.is_clustered() {
            return self.sets.saturating_mul(schema::schema_total(&self.technique_schema));
        }
        if self.technique == Technique::AdHoc {
            return 0;
        }

        match &self.target_reps {
            Some(overrides) if !overrides.is_empty() => overrides
                .iter()
                .take(self.sets as usize)
                .filter_map(|t| t.reps())
                .fold(0, u32::saturating_add),
            _ => self
                .sets
                .saturating_mul(self.reps_base.and_then(|r| r.reps()).unwrap_or(0)),
        }
    }

    /// Planned load at 1-based (set, cluster)
    pub fn target_load_at(&self, set_num: u32, cluster_num: u32) -> Option<f64> {
        let set = (set_num as usize).checked_sub(1)?;
        if self.technique.is_clustered() {
            let cluster = (cluster_num as usize).checked_sub(1)?;
            return self.target_loads_by_cluster.get(set)?.get(cluster).copied();
        }
        self.target_loads.get(set).copied()
    }

    /// Planned reps at 1-based (set, cluster)
    pub fn target_reps_at(&self, set_num: u32, cluster_num: u32) -> Option<RepTarget> {
        if set_num == 0 || set_num > self.sets {
            return None;
        }
        if self.technique.is_clustered() {
            let cluster = (cluster_num as usize).checked_sub(1)?;
            return schema::parse_schema(&self.technique_schema)
                .get(cluster)
                .map(|r| RepTarget::Reps(*r));
        }
        self.target_reps
            .as_ref()
            .and_then(|o| o.get(set_num as usize - 1).copied())
            .or(self.reps_base)
    }

    /// Restore the shape invariant for the current sets, schema and technique
    fn fit_shape(&mut self) {
        let sets = self.sets as usize;

        if !self.technique.is_clustered() {
            fit_to_len(&mut self.target_loads, sets, DEFAULT_LOAD);
            if let Some(overrides) = self.target_reps.as_mut() {
                let fallback = self.reps_base.unwrap_or(RepTarget::Reps(DEFAULT_REPS));
                fit_to_len(overrides, sets, fallback);
            }
            return;
        }

        let clusters = self.cluster_count();
        if self.target_loads_by_cluster.is_empty() && !self.target_loads.is_empty() {
            self.target_loads_by_cluster = self
                .target_loads
                .iter()
                .map(|load| vec![*load; clusters])
                .collect();
        }

        let before = self.target_loads_by_cluster.len();
        fit_to_len(
            &mut self.target_loads_by_cluster,
            sets,
            vec![DEFAULT_LOAD; clusters],
        );
        for row in self.target_loads_by_cluster.iter_mut() {
            fit_to_len(row, clusters, DEFAULT_LOAD);
        }
        if before != sets {
            debug!(before, after = sets, clusters, "cluster load matrix resized");
        }

        self.target_loads = self
            .target_loads_by_cluster
            .iter()
            .map(|row| row.first().copied().unwrap_or(DEFAULT_LOAD))
            .collect();
    }
}

/// Truncate, or grow by repeating the last item (`fallback` when empty)
fn fit_to_len<T: Clone>(items: &mut Vec<T>, len: usize, fallback: T) {
    if items.len() >= len {
        items.truncate(len);
        return;
    }
    let filler = items.last().cloned().unwrap_or(fallback);
    items.resize(len, filler);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::technique::{CustomParam, CustomTechnique, SpecialTechnique};

    fn create_drop_set(sets: u32, schema: &str) -> Block {
        let mut block = Block {
            technique: Technique::Special(SpecialTechnique::DropSet),
            sets,
            reps_base: None,
            technique_schema: schema.to_string(),
            target_loads: Vec::new(),
            ..Block::default()
        };
        block.target_loads_by_cluster = (0..sets)
            .map(|s| vec![100.0 - s as f64 * 10.0; schema::cluster_count(schema)])
            .collect();
        block.normalized()
    }

    fn create_customs() -> CustomTechniques {
        CustomTechniques::new(vec![CustomTechnique {
            name: "Piramide".to_string(),
            params: vec![
                CustomParam::new("a", "A", "12"),
                CustomParam::new("b", "B", "10"),
            ],
        }])
    }

    fn assert_shape(block: &Block) {
        assert_eq!(block.target_loads_by_cluster.len(), block.sets as usize);
        for row in &block.target_loads_by_cluster {
            assert_eq!(row.len(), block.cluster_count());
        }
        assert_eq!(block.target_loads.len(), block.sets as usize);
    }

    #[test]
    fn test_rep_target_serde() {
        let targets: Vec<RepTarget> = serde_json::from_str(r#"[8, "MAX", 12]"#).unwrap();
        assert_eq!(targets, vec![RepTarget::Reps(8), RepTarget::Max, RepTarget::Reps(12)]);
        assert_eq!(serde_json::to_string(&targets).unwrap(), r#"[8,"MAX",12]"#);
        assert_eq!("max".parse::<RepTarget>(), Ok(RepTarget::Max));
        assert!("lots".parse::<RepTarget>().is_err());
    }

    #[test]
    fn test_resize_normal_grow_repeats_last() {
        let mut block = Block::new(2, 8, 60.0);
        block.target_loads = vec![60.0, 65.0];
        block.target_reps = Some(vec![RepTarget::Reps(8), RepTarget::Reps(6)]);

        let resized = block.resize(4);
        assert_eq!(resized.target_loads, vec![60.0, 65.0, 65.0, 65.0]);
        assert_eq!(resized.target_reps.unwrap()[3], RepTarget::Reps(6));
        // original untouched
        assert_eq!(block.sets, 2);
    }

    #[test]
    fn test_resize_normal_shrink() {
        let block = Block::new(5, 5, 100.0);
        let resized = block.resize(2);
        assert_eq!(resized.target_loads.len(), 2);
    }

    #[test]
    fn test_resize_cluster_matrix_copies_last_row() {
        let mut block = create_drop_set(3, "10+8+8");
        block.target_loads_by_cluster.truncate(2);

        let resized = block.resize(4);
        assert_eq!(resized.target_loads_by_cluster.len(), 4);
        assert_eq!(resized.target_loads_by_cluster[3], block.target_loads_by_cluster[1]);
        assert_eq!(resized.target_loads_by_cluster[2], block.target_loads_by_cluster[1]);
        assert_shape(&resized);
    }

    #[test]
    fn test_resize_flattens_first_column() {
        let block = create_drop_set(2, "10+8");
        let resized = block.resize(3);
        assert_eq!(resized.target_loads, vec![100.0, 90.0, 90.0]);
    }

    #[test]
    fn test_resize_always_restores_shape() {
        let block = create_drop_set(3, "10+8+8");
        for n in 0..8 {
            assert_shape(&block.resize(n));
        }
        let empty_schema = create_drop_set(2, "");
        let resized = empty_schema.resize(5);
        assert_shape(&resized);
        assert_eq!(resized.cluster_count(), 1);
    }

    #[test]
    fn test_with_schema_resizes_rows() {
        let block = create_drop_set(2, "10+8");
        let wider = block.with_schema("10+8+6+4");
        assert_shape(&wider);
        assert_eq!(wider.target_loads_by_cluster[0], vec![100.0, 100.0, 100.0, 100.0]);

        let narrower = block.with_schema("12");
        assert_eq!(narrower.target_loads_by_cluster, vec![vec![100.0], vec![90.0]]);
    }

    #[test]
    fn test_with_schema_ignored_for_normal() {
        let block = Block::new(3, 10, 50.0);
        assert_eq!(block.with_schema("5+5"), block);
    }

    #[test]
    fn test_target_reps_normal() {
        assert_eq!(Block::new(4, 8, 0.0).calculate_target_reps(), 32);

        let mut block = Block::new(3, 10, 0.0);
        block.target_reps = Some(vec![
            RepTarget::Reps(12),
            RepTarget::Reps(10),
            RepTarget::Reps(8),
        ]);
        assert_eq!(block.calculate_target_reps(), 30);
    }

    #[test]
    fn test_target_reps_max_contributes_nothing() {
        let mut block = Block::new(3, 10, 0.0);
        block.reps_base = Some(RepTarget::Max);
        assert_eq!(block.calculate_target_reps(), 0);

        block.target_reps = Some(vec![RepTarget::Reps(10), RepTarget::Max, RepTarget::Reps(10)]);
        assert_eq!(block.calculate_target_reps(), 20);
    }

    #[test]
    fn test_target_reps_special() {
        let block = create_drop_set(4, "10+8+6");
        assert_eq!(block.calculate_target_reps(), 96);
    }

    #[test]
    fn test_target_reps_huge_values_saturate() {
        let cluster = create_drop_set(2, "3000000000+3000000000");
        assert_eq!(cluster.calculate_target_reps(), u32::MAX);

        let mut normal = Block::new(3, 2_000_000_000, 0.0);
        assert_eq!(normal.calculate_target_reps(), u32::MAX);

        normal.target_reps = Some(vec![RepTarget::Reps(u32::MAX - 1); 3]);
        assert_eq!(normal.calculate_target_reps(), u32::MAX);
    }

    #[test]
    fn test_normal_to_special() {
        let mut block = Block::new(3, 10, 80.0);
        block.rep_range = Some(RepRange { min: 8, max: 12 });
        let changed = block
            .apply_technique_change(
                &Technique::Special(SpecialTechnique::DropSet),
                &CustomTechniques::default(),
            )
            .unwrap();

        assert_eq!(changed.reps_base, None);
        assert_eq!(changed.rep_range, None);
        assert_eq!(changed.technique_schema, "10+8+8");
        assert_eq!(changed.technique_params.get("drops").map(String::as_str), Some("2"));
        assert_eq!(changed.target_loads_by_cluster, vec![vec![80.0; 3]; 3]);
        assert_shape(&changed);
    }

    #[test]
    fn test_special_to_normal() {
        let block = create_drop_set(3, "10+8+8");
        let changed = block
            .apply_technique_change(&Technique::Normal, &CustomTechniques::default())
            .unwrap();

        assert!(changed.technique_schema.is_empty());
        assert!(changed.technique_params.is_empty());
        assert!(changed.target_loads_by_cluster.is_empty());
        assert_eq!(changed.reps_base, Some(RepTarget::Reps(DEFAULT_REPS)));
        assert_eq!(changed.target_loads, vec![100.0, 90.0, 80.0]);
    }

    #[test]
    fn test_special_to_custom() {
        let block = create_drop_set(2, "10+8+8");
        let changed = block
            .apply_technique_change(&Technique::Custom("Piramide".to_string()), &create_customs())
            .unwrap();
        assert_eq!(changed.technique_schema, "12+10");
        assert_eq!(changed.target_loads_by_cluster, vec![vec![100.0; 2], vec![90.0; 2]]);
    }

    #[test]
    fn test_unknown_custom_rejected() {
        let block = Block::new(3, 10, 50.0);
        let result = block.apply_technique_change(
            &Technique::Custom("Nope".to_string()),
            &create_customs(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_adhoc_round_trip() {
        let block = Block::new(3, 8, 40.0);
        let adhoc = block
            .apply_technique_change(&Technique::AdHoc, &CustomTechniques::default())
            .unwrap();
        assert_eq!(adhoc.reps_base, None);
        assert_eq!(adhoc.calculate_target_reps(), 0);

        let back = adhoc
            .apply_technique_change(&Technique::Ramping, &CustomTechniques::default())
            .unwrap();
        assert_eq!(back.reps_base, Some(RepTarget::Reps(DEFAULT_REPS)));
        assert_eq!(back.target_loads, vec![40.0; 3]);
    }

    #[test]
    fn test_empty_loads_use_default() {
        let block = Block {
            target_loads: Vec::new(),
            ..Block::new(2, 10, 0.0)
        };
        let changed = block
            .apply_technique_change(
                &Technique::Special(SpecialTechnique::Cluster),
                &CustomTechniques::default(),
            )
            .unwrap();
        assert_eq!(changed.target_loads_by_cluster, vec![vec![DEFAULT_LOAD; 4]; 2]);
    }

    #[test]
    fn test_positional_targets() {
        let block = create_drop_set(2, "10+8");
        assert_eq!(block.target_load_at(2, 1), Some(90.0));
        assert_eq!(block.target_load_at(3, 1), None);
        assert_eq!(block.target_reps_at(1, 2), Some(RepTarget::Reps(8)));
        assert_eq!(block.target_reps_at(0, 1), None);

        let normal = Block::new(2, 6, 70.0);
        assert_eq!(normal.target_load_at(1, 1), Some(70.0));
        assert_eq!(normal.target_reps_at(2, 1), Some(RepTarget::Reps(6)));
    }

    #[test]
    fn test_with_prescription_converts_to_normal() {
        let block = create_drop_set(2, "10+8");
        let prescribed = block.with_prescription(5, 5, 80.0);
        assert_eq!(prescribed.technique, Technique::Normal);
        assert!(prescribed.target_loads_by_cluster.is_empty());
        assert_eq!(prescribed.target_loads, vec![80.0; 5]);
        assert_eq!(prescribed.calculate_target_reps(), 25);
    }
}

//! Training techniques - closed built-in set plus user-defined customs

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Named parameter values, keyed by `ParamSpec::key`
pub type TechniqueParams = BTreeMap<String, String>;

/// Upper bound on clusters a built-in generator emits
const MAX_CLUSTERS: u32 = 20;

/// Technique governing how a block's sets and clusters are structured
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Technique {
    #[default]
    Normal,
    Ramping,
    AdHoc,
    Special(SpecialTechnique),
    Custom(String),
}

/// Built-in special techniques (one set = several clusters)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialTechnique {
    DropSet,
    RestPause,
    MyoReps,
    Cluster,
    SuperSet,
}

/// Declared parameter of a built-in technique
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub default: &'static str,
}

/// Transition families - the unit of the technique state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TechniqueFamily {
    /// Normal and Ramping: one load and one rep target per set
    Straight,
    Special,
    Custom,
    AdHoc,
}

impl SpecialTechnique {
    pub fn all() -> &'static [SpecialTechnique] {
        &[
            SpecialTechnique::DropSet,
            SpecialTechnique::RestPause,
            SpecialTechnique::MyoReps,
            SpecialTechnique::Cluster,
            SpecialTechnique::SuperSet,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            SpecialTechnique::DropSet => "Drop Set",
            SpecialTechnique::RestPause => "Rest Pause",
            SpecialTechnique::MyoReps => "Myo Reps",
            SpecialTechnique::Cluster => "Cluster",
            SpecialTechnique::SuperSet => "Super Set",
        }
    }

    /// Parameter schema, in generator argument order
    pub fn params(&self) -> &'static [ParamSpec] {
        match self {
            SpecialTechnique::DropSet => &[
                ParamSpec { key: "reps", label: "Reps", default: "10" },
                ParamSpec { key: "drops", label: "Drops", default: "2" },
                ParamSpec { key: "drop_reps", label: "Reps per drop", default: "8" },
            ],
            SpecialTechnique::RestPause => &[
                ParamSpec { key: "reps", label: "Reps", default: "8" },
                ParamSpec { key: "pauses", label: "Pauses", default: "2" },
                ParamSpec { key: "pause_reps", label: "Reps after pause", default: "3" },
            ],
            SpecialTechnique::MyoReps => &[
                ParamSpec { key: "activation", label: "Activation reps", default: "12" },
                ParamSpec { key: "minisets", label: "Mini-sets", default: "4" },
                ParamSpec { key: "mini_reps", label: "Reps per mini-set", default: "4" },
            ],
            SpecialTechnique::Cluster => &[
                ParamSpec { key: "clusters", label: "Clusters", default: "4" },
                ParamSpec { key: "reps", label: "Reps per cluster", default: "3" },
            ],
            SpecialTechnique::SuperSet => &[
                ParamSpec { key: "first", label: "First exercise reps", default: "10" },
                ParamSpec { key: "second", label: "Second exercise reps", default: "10" },
            ],
        }
    }

    /// Per-cluster reps from resolved parameter values (same order as `params`)
    pub fn compose(&self, values: &[u32]) -> Vec<u32> {
        let at = |i: usize| values.get(i).copied().unwrap_or(0);
        match self {
            // lead effort followed by N equal follow-up clusters
            SpecialTechnique::DropSet | SpecialTechnique::RestPause | SpecialTechnique::MyoReps => {
                let mut clusters = vec![at(0)];
                let follow_ups = at(1).min(MAX_CLUSTERS - 1) as usize;
                clusters.extend(std::iter::repeat_n(at(2), follow_ups));
                clusters
            }
            SpecialTechnique::Cluster => {
                let count = at(0).clamp(1, MAX_CLUSTERS) as usize;
                vec![at(1); count]
            }
            SpecialTechnique::SuperSet => vec![at(0), at(1)],
        }
    }

    pub fn from_name(name: &str) -> Option<SpecialTechnique> {
        let wanted = normalize_name(name);
        Self::all()
            .iter()
            .copied()
            .find(|t| normalize_name(t.name()) == wanted)
    }

    pub fn default_params(&self) -> TechniqueParams {
        self.params()
            .iter()
            .map(|p| (p.key.to_string(), p.default.to_string()))
            .collect()
    }
}

/// Parameter of a user-defined technique
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomParam {
    pub key: String,
    pub label: String,
    #[serde(default)]
    pub default: String,
}

impl CustomParam {
    pub fn new(key: &str, label: &str, default: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            default: default.to_string(),
        }
    }
}

/// User-defined technique: ordered parameters concatenated into a schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomTechnique {
    pub name: String,
    #[serde(default)]
    pub params: Vec<CustomParam>,
}

impl CustomTechnique {
    pub fn default_params(&self) -> TechniqueParams {
        self.params
            .iter()
            .map(|p| (p.key.clone(), p.default.clone()))
            .collect()
    }
}

/// Extension table of custom techniques
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomTechniques {
    techniques: Vec<CustomTechnique>,
}

impl CustomTechniques {
    pub fn new(techniques: Vec<CustomTechnique>) -> Self {
        Self { techniques }
    }

    /// Exact name match
    pub fn find(&self, name: &str) -> Option<&CustomTechnique> {
        self.techniques.iter().find(|t| t.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CustomTechnique> {
        self.techniques.iter()
    }
}

impl Technique {
    /// Resolve a display name against the built-ins, then the custom table
    pub fn from_name(name: &str, customs: &CustomTechniques) -> Result<Technique> {
        match normalize_name(name).as_str() {
            "normal" => return Ok(Technique::Normal),
            "ramping" => return Ok(Technique::Ramping),
            "adhoc" => return Ok(Technique::AdHoc),
            _ => {}
        }
        if let Some(special) = SpecialTechnique::from_name(name) {
            return Ok(Technique::Special(special));
        }
        customs
            .find(name.trim())
            .map(|c| Technique::Custom(c.name.clone()))
            .ok_or_else(|| Error::UnknownTechnique(name.to_string()))
    }

    pub fn name(&self) -> &str {
        match self {
            Technique::Normal => "Normal",
            Technique::Ramping => "Ramping",
            Technique::AdHoc => "Ad-Hoc",
            Technique::Special(special) => special.name(),
            Technique::Custom(name) => name,
        }
    }

    pub fn family(&self) -> TechniqueFamily {
        match self {
            Technique::Normal | Technique::Ramping => TechniqueFamily::Straight,
            Technique::AdHoc => TechniqueFamily::AdHoc,
            Technique::Special(_) => TechniqueFamily::Special,
            Technique::Custom(_) => TechniqueFamily::Custom,
        }
    }

    /// Clustered techniques track loads per [set][cluster]
    pub fn is_clustered(&self) -> bool {
        matches!(self.family(), TechniqueFamily::Special | TechniqueFamily::Custom)
    }

    /// Default parameter values; fails for a custom name not in the table
    pub fn default_params(&self, customs: &CustomTechniques) -> Result<TechniqueParams> {
        match self {
            Technique::Normal | Technique::Ramping | Technique::AdHoc => Ok(TechniqueParams::new()),
            Technique::Special(special) => Ok(special.default_params()),
            Technique::Custom(name) => customs
                .find(name)
                .map(|c| c.default_params())
                .ok_or_else(|| Error::UnknownTechnique(name.clone())),
        }
    }
}

impl std::fmt::Display for Technique {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Side effect applied to a block when its technique changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionEffect {
    /// Drop repsBase, repRange and per-set rep overrides
    ClearRepTargets,
    /// Put back the default rep target if none is set
    RestoreDefaultReps,
    /// Drop schema and parameters
    ClearSchema,
    /// Schema and parameters from the new technique's defaults
    GenerateDefaultSchema,
    /// Build the [set][cluster] load matrix from flat or existing loads
    BuildClusterLoads,
    /// Drop the [set][cluster] load matrix
    DropClusterLoads,
}

/// Fixed side-effect list for each family transition
pub fn transition_effects(
    from: TechniqueFamily,
    to: TechniqueFamily,
) -> &'static [TransitionEffect] {
    use TechniqueFamily::*;
    use TransitionEffect::*;

    match (from, to) {
        (Straight, Straight) | (AdHoc, AdHoc) => &[],
        (Straight | AdHoc, Special | Custom) => {
            &[ClearRepTargets, GenerateDefaultSchema, BuildClusterLoads]
        }
        (Special | Custom, Special | Custom) => &[GenerateDefaultSchema, BuildClusterLoads],
        (Special | Custom, Straight) => &[ClearSchema, DropClusterLoads, RestoreDefaultReps],
        (AdHoc, Straight) => &[RestoreDefaultReps],
        (Straight, AdHoc) => &[ClearRepTargets],
        (Special | Custom, AdHoc) => &[ClearSchema, DropClusterLoads, ClearRepTargets],
    }
}

fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_builtin() {
        let customs = CustomTechniques::default();
        assert_eq!(Technique::from_name("Normal", &customs), Ok(Technique::Normal));
        assert_eq!(Technique::from_name("ad-hoc", &customs), Ok(Technique::AdHoc));
        assert_eq!(
            Technique::from_name("drop set", &customs),
            Ok(Technique::Special(SpecialTechnique::DropSet))
        );
        assert_eq!(
            Technique::from_name("Rest-Pause", &customs),
            Ok(Technique::Special(SpecialTechnique::RestPause))
        );
    }

    #[test]
    fn test_from_name_custom_and_unknown() {
        let customs = CustomTechniques::new(vec![CustomTechnique {
            name: "Piramide".to_string(),
            params: vec![],
        }]);
        assert_eq!(
            Technique::from_name("Piramide", &customs),
            Ok(Technique::Custom("Piramide".to_string()))
        );
        assert_eq!(
            Technique::from_name("Boh", &customs),
            Err(Error::UnknownTechnique("Boh".to_string()))
        );
    }

    #[test]
    fn test_compose_shapes() {
        assert_eq!(SpecialTechnique::DropSet.compose(&[10, 2, 8]), vec![10, 8, 8]);
        assert_eq!(SpecialTechnique::MyoReps.compose(&[12, 4, 4]), vec![12, 4, 4, 4, 4]);
        assert_eq!(SpecialTechnique::Cluster.compose(&[4, 3]), vec![3, 3, 3, 3]);
        assert_eq!(SpecialTechnique::SuperSet.compose(&[10, 12]), vec![10, 12]);
        assert_eq!(SpecialTechnique::RestPause.compose(&[8, 0, 3]), vec![8]);
    }

    #[test]
    fn test_compose_caps_cluster_count() {
        assert_eq!(SpecialTechnique::Cluster.compose(&[500, 2]).len(), MAX_CLUSTERS as usize);
        assert_eq!(SpecialTechnique::DropSet.compose(&[10, 500, 5]).len(), MAX_CLUSTERS as usize);
    }

    #[test]
    fn test_every_special_has_numeric_defaults() {
        for special in SpecialTechnique::all() {
            assert!(!special.params().is_empty());
            for spec in special.params() {
                assert!(spec.default.parse::<u32>().is_ok(), "{}: {}", special.name(), spec.key);
            }
        }
    }

    #[test]
    fn test_families() {
        assert_eq!(Technique::Ramping.family(), TechniqueFamily::Straight);
        assert!(Technique::Custom("x".to_string()).is_clustered());
        assert!(!Technique::AdHoc.is_clustered());
    }

    #[test]
    fn test_transition_table_is_total() {
        use TechniqueFamily::*;
        let families = [Straight, Special, Custom, AdHoc];
        for from in families {
            for to in families {
                let effects = transition_effects(from, to);
                let to_clustered = matches!(to, Special | Custom);
                assert_eq!(
                    effects.contains(&TransitionEffect::BuildClusterLoads),
                    to_clustered,
                    "{:?} -> {:?}",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn test_serde_shape() {
        let json = serde_json::to_string(&Technique::Special(SpecialTechnique::DropSet)).unwrap();
        assert_eq!(json, r#"{"kind":"special","name":"drop_set"}"#);
        let normal: Technique = serde_json::from_str(r#"{"kind":"normal"}"#).unwrap();
        assert_eq!(normal, Technique::Normal);
    }
}

//! Schema codec - per-cluster rep counts <-> "10+8+6"
//!
//! Format: `digits('+'digits)*`. The empty string means "no clusters
//! defined" and callers fall back to a single cluster.

use crate::error::{Error, Result};
use crate::technique::{CustomTechniques, Technique, TechniqueParams};

/// Separator between numeric clusters
pub const CLUSTER_SEPARATOR: char = '+';

/// Separator used by custom techniques with label-style values
pub const LABEL_SEPARATOR: char = '-';

/// Parse a schema into per-cluster rep counts.
///
/// Any malformed token invalidates the whole schema and yields an empty
/// sequence, same as empty input.
pub fn parse_schema(text: &str) -> Vec<u32> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }

    let mut clusters = Vec::new();
    for token in text.split(CLUSTER_SEPARATOR) {
        let token = token.trim();
        if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
            return Vec::new();
        }
        match token.parse::<u32>() {
            Ok(reps) => clusters.push(reps),
            Err(_) => return Vec::new(),
        }
    }
    clusters
}

/// Join per-cluster rep counts back into schema text
pub fn join_schema(clusters: &[u32]) -> String {
    clusters
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(&CLUSTER_SEPARATOR.to_string())
}

/// Number of clusters implied by a schema, never less than 1
pub fn cluster_count(text: &str) -> usize {
    parse_schema(text).len().max(1)
}

/// Empty text or a fully numeric schema
pub fn is_valid_schema(text: &str) -> bool {
    text.is_empty() || !parse_schema(text).is_empty()
}

/// Reps per set implied by a schema (sum of clusters, saturating)
pub fn schema_total(text: &str) -> u32 {
    parse_schema(text).into_iter().fold(0, u32::saturating_add)
}

/// Generate schema text from named technique parameters.
///
/// Blank or missing values fall back to the declared default. Straight
/// techniques (Normal, Ramping, Ad-Hoc) have no schema.
pub fn generate_schema(
    technique: &Technique,
    params: &TechniqueParams,
    customs: &CustomTechniques,
) -> Result<String> {
    match technique {
        Technique::Normal | Technique::Ramping | Technique::AdHoc => Ok(String::new()),
        Technique::Special(special) => {
            let values: Vec<u32> = special
                .params()
                .iter()
                .map(|spec| {
                    resolve_param(params, spec.key, spec.default)
                        .trim()
                        .parse::<u32>()
                        .or_else(|_| spec.default.parse::<u32>())
                        .unwrap_or(0)
                })
                .collect();
            Ok(join_schema(&special.compose(&values)))
        }
        Technique::Custom(name) => {
            let custom = customs
                .find(name)
                .ok_or_else(|| Error::UnknownTechnique(name.clone()))?;
            let values: Vec<&str> = custom
                .params
                .iter()
                .map(|p| resolve_param(params, &p.key, &p.default))
                .collect();
            Ok(join_custom_values(&values))
        }
    }
}

/// Value for `key`, or `default` when absent or blank
fn resolve_param<'a>(params: &'a TechniqueParams, key: &str, default: &'a str) -> &'a str {
    match params.get(key) {
        Some(value) if !value.trim().is_empty() => value.trim(),
        _ => default,
    }
}

/// '+' when every value is numeric (a cluster scheme), '-' otherwise
fn join_custom_values(values: &[&str]) -> String {
    let numeric = values
        .iter()
        .all(|v| !v.is_empty() && v.bytes().all(|b| b.is_ascii_digit()));
    let separator = if numeric { CLUSTER_SEPARATOR } else { LABEL_SEPARATOR };
    values.join(&separator.to_string())
}

//! Phase C of snapshot generation: the per-element constraint merger (§4.3).
//!
//! [`merge_element`] takes a base element and the run of differential entries
//! that apply to it and produces the merged snapshot element plus zero or
//! more [`SnapshotIssue`]s. Merge violations are never fatal: the diff's
//! value is still applied (so downstream tooling sees the authored intent)
//! and an issue is appended describing why it's questionable.

use std::collections::HashMap;

use conform_models::choice::dispatch_choice;
use conform_models::{
    BindingStrength, ElementDefinition, ElementDefinitionBase, ElementDefinitionBinding,
    ElementDefinitionConstraint, ElementDefinitionExample, ElementDefinitionMapping,
    ElementDefinitionType,
};
use serde_json::Value;

use crate::error::{IssueCode, IssueSeverity, SnapshotIssue};

/// Merge `diff` on top of `base`, returning the merged element. `is_slice`
/// relaxes the cardinality-narrowing check: a slice is allowed to declare
/// `min=0` beneath a required base root.
pub fn merge_element(
    base: &ElementDefinition,
    diff: &ElementDefinition,
    is_slice: bool,
    issues: &mut Vec<SnapshotIssue>,
) -> ElementDefinition {
    let mut merged = base.clone();
    merged.id = diff.id.clone().or(base.id.clone());
    merged.slice_name = diff.slice_name.clone().or(base.slice_name.clone());
    merged.slice_is_constraining = diff
        .slice_is_constraining
        .or(base.slice_is_constraining);

    merge_cardinality(base, diff, is_slice, &mut merged, issues);
    merge_types(base, diff, &mut merged, issues);
    merge_binding(base, diff, &mut merged, issues);
    merge_constraints(base, diff, &mut merged);
    merge_documentation_fields(diff, &mut merged);
    merge_choice_value_fields(base, diff, &mut merged, issues);
    merge_summary_flag(base, diff, &mut merged, issues);
    merge_union_fields(base, diff, &mut merged);
    populate_base_traceability(base, &mut merged);

    cleanup_fixed_field(&mut merged);
    merged
}

fn parse_max(max: &str) -> Option<u64> {
    if max == "*" {
        None
    } else {
        max.parse::<u64>().ok()
    }
}

/// `true` when `candidate` is wider (or equal) to `limit` — "unbounded" is
/// wider than any integer, larger integers are wider than smaller ones.
fn is_wider_or_equal(candidate: &str, limit: &str) -> bool {
    match (parse_max(candidate), parse_max(limit)) {
        (None, _) => true,
        (Some(_), None) => false,
        (Some(c), Some(l)) => c >= l,
    }
}

fn merge_cardinality(
    base: &ElementDefinition,
    diff: &ElementDefinition,
    is_slice: bool,
    merged: &mut ElementDefinition,
    issues: &mut Vec<SnapshotIssue>,
) {
    if let Some(diff_min) = diff.min {
        let base_min = base.min.unwrap_or(0);
        if diff_min < base_min && !is_slice {
            issues.push(SnapshotIssue::new(
                IssueSeverity::Error,
                IssueCode::CardinalityViolation,
                format!(
                    "min {} narrows below base min {} on non-slice element",
                    diff_min, base_min
                ),
                Some(merged.path.clone()),
            ));
        }
        merged.min = Some(diff_min);
    }

    if let Some(diff_max) = &diff.max {
        if let Some(base_max) = &base.max {
            if is_wider_or_equal(diff_max, base_max) && diff_max != base_max {
                issues.push(SnapshotIssue::new(
                    IssueSeverity::Error,
                    IssueCode::CardinalityViolation,
                    format!("max '{}' widens base max '{}'", diff_max, base_max),
                    Some(merged.path.clone()),
                ));
            }
        }
        merged.max = Some(diff_max.clone());
    }
}

fn types_compatible(diff_code: &str, base_code: &str) -> bool {
    diff_code == base_code
        || base_code == "*"
        || base_code == "Resource"
        || diff_code == "Extension"
        || (base_code == "string" && diff_code == "uri")
        || (base_code == "uri" && diff_code == "string")
}

fn merge_types(
    base: &ElementDefinition,
    diff: &ElementDefinition,
    merged: &mut ElementDefinition,
    issues: &mut Vec<SnapshotIssue>,
) {
    let Some(diff_types) = &diff.types else {
        return;
    };
    let base_codes: Vec<String> = base.type_codes();

    let mut compatible: Vec<ElementDefinitionType> = Vec::new();
    for diff_type in diff_types {
        let ok = base_codes.is_empty()
            || base_codes.iter().any(|b| types_compatible(&diff_type.code, b));
        if ok {
            compatible.push(diff_type.clone());
        } else {
            issues.push(SnapshotIssue::new(
                IssueSeverity::Error,
                IssueCode::TypeIncompatible,
                format!(
                    "type '{}' is incompatible with base types [{}]",
                    diff_type.code,
                    base_codes.join(", ")
                ),
                Some(merged.path.clone()),
            ));
        }
    }

    // An all-incompatible diff type list must still collapse the snapshot to
    // a definite type list rather than silently keeping the base's original
    // one: once every candidate failed, there is nothing left to keep.
    merged.types = if compatible.is_empty() { None } else { Some(compatible) };
}

fn merge_binding(
    base: &ElementDefinition,
    diff: &ElementDefinition,
    merged: &mut ElementDefinition,
    issues: &mut Vec<SnapshotIssue>,
) {
    let Some(diff_binding) = &diff.binding else {
        return;
    };
    match &base.binding {
        Some(base_binding) if base_binding.strength == BindingStrength::Required => {
            if diff_binding.strength != BindingStrength::Required {
                issues.push(SnapshotIssue::new(
                    IssueSeverity::Error,
                    IssueCode::BindingViolation,
                    format!(
                        "binding strength '{:?}' weakens required base binding",
                        diff_binding.strength
                    ),
                    Some(merged.path.clone()),
                ));
            }
            merged.binding = Some(diff_binding.clone());
        }
        _ => {
            merged.binding = Some(diff_binding.clone());
        }
    }
}

fn merge_constraints(
    base: &ElementDefinition,
    diff: &ElementDefinition,
    merged: &mut ElementDefinition,
) {
    let Some(diff_constraints) = &diff.constraint else {
        return;
    };
    let mut by_key: Vec<ElementDefinitionConstraint> = base
        .constraint
        .clone()
        .unwrap_or_default();

    for diff_constraint in diff_constraints {
        if let Some(existing) = by_key.iter_mut().find(|c| c.key == diff_constraint.key) {
            *existing = diff_constraint.clone();
        } else {
            by_key.push(diff_constraint.clone());
        }
    }
    merged.constraint = Some(by_key);
}

fn merge_documentation_fields(diff: &ElementDefinition, merged: &mut ElementDefinition) {
    macro_rules! overwrite {
        ($field:ident) => {
            if diff.$field.is_some() {
                merged.$field = diff.$field.clone();
            }
        };
    }
    overwrite!(short);
    overwrite!(definition);
    overwrite!(comment);
    overwrite!(requirements);
    overwrite!(example);
    overwrite!(max_length);
    overwrite!(must_support);
    overwrite!(is_modifier);
    overwrite!(is_modifier_reason);
}

/// Merge `fixed*`/`pattern*`/`default_value*` choice fields.
///
/// Open question (§9): a diff `fixed*` that contradicts a different base
/// `fixed*` is treated as an override (consistent with every other
/// "overwrite" field in Phase C) but flagged with an info-severity issue so
/// the change is visible without blocking `success`.
fn merge_choice_value_fields(
    base: &ElementDefinition,
    diff: &ElementDefinition,
    merged: &mut ElementDefinition,
    issues: &mut Vec<SnapshotIssue>,
) {
    if diff.default_value.is_some() {
        merged.default_value = diff.default_value.clone();
    }
    if diff.min_value.is_some() {
        merged.min_value = diff.min_value.clone();
    }
    if diff.max_value.is_some() {
        merged.max_value = diff.max_value.clone();
    }

    if diff.fixed.is_some() {
        if base.fixed.is_some() && base.fixed != diff.fixed {
            issues.push(SnapshotIssue::new(
                IssueSeverity::Info,
                IssueCode::InvalidConstraint,
                "differential overrides a different base fixed value".to_string(),
                Some(merged.path.clone()),
            ));
        }
        merged.fixed = diff.fixed.clone();
    }
    if diff.pattern.is_some() {
        if base.pattern.is_some() && base.pattern != diff.pattern {
            issues.push(SnapshotIssue::new(
                IssueSeverity::Info,
                IssueCode::InvalidConstraint,
                "differential overrides a different base pattern value".to_string(),
                Some(merged.path.clone()),
            ));
        }
        merged.pattern = diff.pattern.clone();
    }
}

fn merge_summary_flag(
    base: &ElementDefinition,
    diff: &ElementDefinition,
    merged: &mut ElementDefinition,
    issues: &mut Vec<SnapshotIssue>,
) {
    if let Some(diff_summary) = diff.is_summary {
        match base.is_summary {
            None => merged.is_summary = Some(diff_summary),
            Some(existing) if existing == diff_summary => merged.is_summary = Some(existing),
            Some(existing) => {
                issues.push(SnapshotIssue::new(
                    IssueSeverity::Error,
                    IssueCode::InvalidConstraint,
                    format!(
                        "isSummary cannot change from {} to {} once set",
                        existing, diff_summary
                    ),
                    Some(merged.path.clone()),
                ));
                merged.is_summary = Some(existing);
            }
        }
    }
}

fn merge_union_fields(base: &ElementDefinition, diff: &ElementDefinition, merged: &mut ElementDefinition) {
    merged.alias = union_by(&base.alias, &diff.alias, |s| s.clone());
    merged.example = union_by(&base.example, &diff.example, |e: &ElementDefinitionExample| {
        e.label.clone()
    });
    merged.mapping = union_by(&base.mapping, &diff.mapping, |m: &ElementDefinitionMapping| {
        m.identity.clone()
    });
}

fn union_by<T: Clone, K: Eq + std::hash::Hash>(
    base: &Option<Vec<T>>,
    diff: &Option<Vec<T>>,
    key: impl Fn(&T) -> K,
) -> Option<Vec<T>> {
    if base.is_none() && diff.is_none() {
        return None;
    }
    let mut seen = std::collections::HashSet::new();
    let mut result = Vec::new();
    for item in base.iter().flatten().chain(diff.iter().flatten()) {
        if seen.insert(key(item)) {
            result.push(item.clone());
        }
    }
    Some(result)
}

fn populate_base_traceability(base: &ElementDefinition, merged: &mut ElementDefinition) {
    merged.base = Some(match &base.base {
        Some(existing) => existing.clone(),
        None => ElementDefinitionBase {
            path: base.path.clone(),
            min: base.min.unwrap_or(0),
            max: base.max.clone().unwrap_or_else(|| "1".to_string()),
        },
    });
}

fn combined_flatten_map(element: &ElementDefinition) -> serde_json::Map<String, Value> {
    let mut map = serde_json::Map::new();
    for candidate in [
        &element.default_value,
        &element.fixed,
        &element.pattern,
        &element.min_value,
        &element.max_value,
    ] {
        if let Some(Value::Object(obj)) = candidate {
            for (k, v) in obj {
                map.entry(k.clone()).or_insert_with(|| v.clone());
            }
        }
    }
    for (k, v) in &element.extensions {
        map.entry(k.clone()).or_insert_with(|| v.clone());
    }
    map
}

/// Fix up `serde(flatten)` routing: because `fixed`/`pattern`/`default_value`/
/// `min_value`/`max_value`/`extensions` are all `#[serde(flatten)]` fields of
/// type `Option<Value>` (or a catch-all map), deserialization hands every one
/// of them the *same* combined leftover object instead of routing each choice
/// key to the field it actually belongs to. This walks the combined object
/// once through the choice-type dispatcher and reassigns each field its own
/// single matching key, moving everything else into `extensions`.
pub(crate) fn cleanup_fixed_field(element: &mut ElementDefinition) {
    let combined = combined_flatten_map(element);
    if combined.is_empty() {
        element.default_value = None;
        element.fixed = None;
        element.pattern = None;
        element.min_value = None;
        element.max_value = None;
        return;
    }

    let mut remaining = combined.clone();
    let mut assign = |base: &str, remaining: &mut serde_json::Map<String, Value>| {
        let (matched, _issues) = dispatch_choice("ElementDefinition", base, &combined);
        matched.map(|m| {
            remaining.remove(&m.property_name);
            if let Some(sibling) = &m.sibling_extension {
                remaining.remove(&format!("_{}", m.property_name));
                let _ = sibling;
            }
            let mut obj = serde_json::Map::new();
            obj.insert(m.property_name, m.value);
            Value::Object(obj)
        })
    };

    element.default_value = assign("defaultValue", &mut remaining);
    element.fixed = assign("fixed", &mut remaining);
    element.pattern = assign("pattern", &mut remaining);
    element.min_value = assign("minValue", &mut remaining);
    element.max_value = assign("maxValue", &mut remaining);

    element.extensions = remaining.into_iter().collect::<HashMap<_, _>>();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn elem(path: &str) -> ElementDefinition {
        ElementDefinition {
            id: None,
            path: path.to_string(),
            representation: None,
            slice_name: None,
            slice_is_constraining: None,
            short: None,
            definition: None,
            comment: None,
            requirements: None,
            alias: None,
            min: None,
            max: None,
            base: None,
            content_reference: None,
            types: None,
            default_value: None,
            meaning_when_missing: None,
            order_meaning: None,
            fixed: None,
            pattern: None,
            example: None,
            min_value: None,
            max_value: None,
            max_length: None,
            condition: None,
            constraint: None,
            is_modifier: None,
            is_modifier_reason: None,
            is_summary: None,
            binding: None,
            mapping: None,
            slicing: None,
            must_support: None,
            extensions: HashMap::new(),
        }
    }

    #[test]
    fn cardinality_tightening_is_silent() {
        let mut base = elem("Patient.name");
        base.min = Some(0);
        base.max = Some("*".to_string());
        let mut diff = elem("Patient.name");
        diff.min = Some(1);

        let mut issues = Vec::new();
        let merged = merge_element(&base, &diff, false, &mut issues);

        assert_eq!(merged.min, Some(1));
        assert!(issues.is_empty());
    }

    #[test]
    fn cardinality_widening_flags_violation_but_applies() {
        let mut base = elem("Patient.name");
        base.max = Some("1".to_string());
        let mut diff = elem("Patient.name");
        diff.max = Some("*".to_string());

        let mut issues = Vec::new();
        let merged = merge_element(&base, &diff, false, &mut issues);

        assert_eq!(merged.max, Some("*".to_string()));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code as u8, IssueCode::CardinalityViolation as u8);
    }

    #[test]
    fn slice_may_narrow_min_below_required_base() {
        let mut base = elem("Patient.identifier");
        base.min = Some(1);
        let mut diff = elem("Patient.identifier");
        diff.slice_name = Some("MRN".to_string());
        diff.min = Some(0);

        let mut issues = Vec::new();
        let merged = merge_element(&base, &diff, true, &mut issues);

        assert_eq!(merged.min, Some(0));
        assert!(issues.is_empty());
    }

    #[test]
    fn type_subset_keeps_compatible_type_only() {
        let mut base = elem("Observation.value[x]");
        base.types = Some(vec![
            ElementDefinitionType {
                code: "Quantity".to_string(),
                profile: None,
                target_profile: None,
                aggregation: None,
                versioning: None,
            },
            ElementDefinitionType {
                code: "string".to_string(),
                profile: None,
                target_profile: None,
                aggregation: None,
                versioning: None,
            },
        ]);
        let mut diff = elem("Observation.value[x]");
        diff.types = Some(vec![ElementDefinitionType {
            code: "Quantity".to_string(),
            profile: None,
            target_profile: None,
            aggregation: None,
            versioning: None,
        }]);

        let mut issues = Vec::new();
        let merged = merge_element(&base, &diff, false, &mut issues);

        assert_eq!(merged.type_codes(), vec!["Quantity".to_string()]);
        assert!(issues.is_empty());
    }

    #[test]
    fn incompatible_type_is_dropped_and_flagged() {
        let mut base = elem("Observation.value[x]");
        base.types = Some(vec![ElementDefinitionType {
            code: "Quantity".to_string(),
            profile: None,
            target_profile: None,
            aggregation: None,
            versioning: None,
        }]);
        let mut diff = elem("Observation.value[x]");
        diff.types = Some(vec![ElementDefinitionType {
            code: "Reference".to_string(),
            profile: None,
            target_profile: None,
            aggregation: None,
            versioning: None,
        }]);

        let mut issues = Vec::new();
        let merged = merge_element(&base, &diff, false, &mut issues);

        assert!(merged.types.is_none() || merged.type_codes().is_empty());
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn binding_weakening_is_flagged_but_applied() {
        let mut base = elem("Observation.code");
        base.binding = Some(ElementDefinitionBinding {
            strength: BindingStrength::Required,
            description: None,
            value_set: Some("http://example.org/vs/required".to_string()),
        });
        let mut diff = elem("Observation.code");
        diff.binding = Some(ElementDefinitionBinding {
            strength: BindingStrength::Extensible,
            description: None,
            value_set: Some("http://example.org/vs/extensible".to_string()),
        });

        let mut issues = Vec::new();
        let merged = merge_element(&base, &diff, false, &mut issues);

        assert_eq!(merged.binding.unwrap().strength, BindingStrength::Extensible);
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn summary_flag_cannot_flip_once_set() {
        let mut base = elem("Patient.name");
        base.is_summary = Some(true);
        let mut diff = elem("Patient.name");
        diff.is_summary = Some(false);

        let mut issues = Vec::new();
        let merged = merge_element(&base, &diff, false, &mut issues);

        assert_eq!(merged.is_summary, Some(true));
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn base_traceability_is_populated_from_farthest_ancestor() {
        let mut base = elem("Patient.name");
        base.min = Some(0);
        base.max = Some("*".to_string());
        let diff = elem("Patient.name");

        let mut issues = Vec::new();
        let merged = merge_element(&base, &diff, false, &mut issues);

        let base_trace = merged.base.unwrap();
        assert_eq!(base_trace.path, "Patient.name");
        assert_eq!(base_trace.min, 0);
        assert_eq!(base_trace.max, "*");
    }
}

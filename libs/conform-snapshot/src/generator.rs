//! Entry points for snapshot generation (§4.3 Phases A-D).
//!
//! Phase A resolves the immediate base snapshot; Phase B walks the
//! differential against it element-by-element via [`crate::merge`]; Phase C
//! is the per-element merge itself; Phase D folds in slicing via
//! [`crate::slicing`]. [`SnapshotContext`] adds the recursive "walk the whole
//! inheritance chain from the root" case ([`generate_deep_snapshot`]) with a
//! memoizing cache, mirroring how a differential-only profile sits several
//! `baseDefinition` hops below a resource with an authored snapshot.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use conform_context::FhirContext;
use conform_models::{Differential, ElementDefinition, Snapshot, StructureDefinition};

use crate::error::{Error, IssueCode, IssueSeverity, Result, SnapshotIssue};
use crate::merge::merge_element;
use crate::normalization::normalize_snapshot;
use crate::slicing::{is_default_sliceable_path, SlicingContext};
use crate::validation::validate_differential;

/// Outcome of a snapshot generation run. `success()` is the authoritative
/// pass/fail signal — merge violations never abort generation, they're
/// collected here instead.
#[derive(Debug, Clone)]
pub struct SnapshotResult {
    pub snapshot: Snapshot,
    pub issues: Vec<SnapshotIssue>,
}

impl SnapshotResult {
    pub fn success(&self) -> bool {
        !self.issues.iter().any(SnapshotIssue::is_error)
    }
}

/// Generate a differential's snapshot against an already-resolved base
/// snapshot (Phase B/C/D). Does not consult a [`FhirContext`] — use
/// [`generate_deep_snapshot`] when the base itself might need generating.
pub fn generate_snapshot(
    differential: &Differential,
    base_snapshot: &Snapshot,
) -> Result<SnapshotResult> {
    validate_differential(differential, base_snapshot)?;

    let mut issues = Vec::new();
    let mut slicing_ctx = SlicingContext::new();
    slicing_ctx.detect_implicit_slicing(&differential.element);

    let mut merged_elements: Vec<ElementDefinition> = Vec::new();
    let mut consumed = vec![false; differential.element.len()];

    for base_elem in &base_snapshot.element {
        // The base snapshot's own slicing root (e.g. `rules: closed` on an
        // already-authored ancestor) has to be known before any new slice
        // under it is considered, even when the differential never
        // redeclares `slicing` itself.
        if let Some(slicing) = &base_elem.slicing {
            slicing_ctx.register_slice_entry(&base_elem.path, slicing.clone(), merged_elements.len())?;
        }

        let base_match = differential
            .element
            .iter()
            .position(|d| d.path == base_elem.path && d.slice_name.is_none());

        let merged = match base_match {
            Some(idx) => {
                consumed[idx] = true;
                let diff_elem = &differential.element[idx];
                if let Some(slicing) = &diff_elem.slicing {
                    slicing_ctx.register_slice_entry(
                        &diff_elem.path,
                        slicing.clone(),
                        merged_elements.len(),
                    )?;
                }
                merge_element(base_elem, diff_elem, false, &mut issues)
            }
            None => base_elem.clone(),
        };
        merged_elements.push(merged);

        for (idx, diff_elem) in differential.element.iter().enumerate() {
            if consumed[idx] || diff_elem.path != base_elem.path || diff_elem.slice_name.is_none() {
                continue;
            }
            consumed[idx] = true;

            // `.extension`/`.modifierExtension` carry an implicit default
            // slicing root even when no StructureDefinition declares one.
            if slicing_ctx.get_slice_entry(&diff_elem.path).is_none()
                && is_default_sliceable_path(&diff_elem.path)
            {
                let default = slicing_ctx.create_default_slicing_entry(&diff_elem.path);
                slicing_ctx.register_slice_entry(&diff_elem.path, default, merged_elements.len())?;
            }

            let slice_name = diff_elem.slice_name.as_deref().unwrap_or_default();
            if !slicing_ctx.can_add_slice(&diff_elem.path, slice_name)? {
                issues.push(SnapshotIssue::new(
                    IssueSeverity::Error,
                    IssueCode::SlicingError,
                    format!(
                        "cannot add slice '{}' to '{}': base slicing is closed",
                        slice_name, diff_elem.path
                    ),
                    Some(diff_elem.path.clone()),
                ));
                continue;
            }

            slicing_ctx.register_slice_instance(diff_elem)?;
            merged_elements.push(merge_element(base_elem, diff_elem, true, &mut issues));
        }
    }

    for (idx, diff_elem) in differential.element.iter().enumerate() {
        if consumed[idx] {
            continue;
        }
        if let Some(slicing) = &diff_elem.slicing {
            slicing_ctx
                .register_slice_entry(&diff_elem.path, slicing.clone(), merged_elements.len())?;
        }

        if let Some(slice_name) = &diff_elem.slice_name {
            if slicing_ctx.get_slice_entry(&diff_elem.path).is_none()
                && is_default_sliceable_path(&diff_elem.path)
            {
                let default = slicing_ctx.create_default_slicing_entry(&diff_elem.path);
                slicing_ctx.register_slice_entry(&diff_elem.path, default, merged_elements.len())?;
            }

            if !slicing_ctx.can_add_slice(&diff_elem.path, slice_name)? {
                issues.push(SnapshotIssue::new(
                    IssueSeverity::Error,
                    IssueCode::SlicingError,
                    format!(
                        "cannot add slice '{}' to '{}': base slicing is closed",
                        slice_name, diff_elem.path
                    ),
                    Some(diff_elem.path.clone()),
                ));
                continue;
            }
            slicing_ctx.register_slice_instance(diff_elem)?;
        }

        issues.push(SnapshotIssue::new(
            IssueSeverity::Info,
            IssueCode::DifferentialNotConsumed,
            format!(
                "differential element '{}' has no matching base element; appended as new",
                diff_elem.path
            ),
            Some(diff_elem.path.clone()),
        ));
        merged_elements.push(diff_elem.clone());
    }

    for (path, message) in slicing_ctx.rules_relaxations() {
        issues.push(SnapshotIssue::new(
            IssueSeverity::Error,
            IssueCode::SlicingError,
            message.clone(),
            Some(path.clone()),
        ));
    }

    validate_slicing(&slicing_ctx, &mut issues);

    let mut snapshot = Snapshot {
        element: merged_elements,
    };
    snapshot.sort_elements();
    normalize_snapshot(&mut snapshot);

    Ok(SnapshotResult { snapshot, issues })
}

fn validate_slicing(slicing_ctx: &SlicingContext, issues: &mut Vec<SnapshotIssue>) {
    for path in slicing_ctx.get_all_slice_entries().keys() {
        let slices: Vec<&ElementDefinition> = slicing_ctx
            .get_slices_for_path(path)
            .into_iter()
            .map(|instance| &instance.element)
            .collect();

        if let Err(e) = slicing_ctx.validate_slice_ordering(path, &slices) {
            issues.push(SnapshotIssue::new(
                IssueSeverity::Error,
                IssueCode::SlicingError,
                e.to_string(),
                Some(path.clone()),
            ));
        }
        if let Err(e) = slicing_ctx.validate_discriminators(path) {
            issues.push(SnapshotIssue::new(
                IssueSeverity::Error,
                IssueCode::SlicingError,
                e.to_string(),
                Some(path.clone()),
            ));
        }
    }
}

/// Produce the differential a profile would need to reconstruct `derived`'s
/// snapshot from `base`'s: every element in `derived` whose merged form
/// differs from what's already visible on `base`. Primarily useful for
/// round-tripping an externally-supplied snapshot back into an authored
/// differential.
pub fn generate_differential(base: &Snapshot, derived: &Snapshot) -> Differential {
    let base_by_key: HashMap<String, &ElementDefinition> =
        base.element.iter().map(|e| (e.key(), e)).collect();

    let element = derived
        .element
        .iter()
        .filter(|e| base_by_key.get(&e.key()).map(|b| *b != e).unwrap_or(true))
        .cloned()
        .collect();

    Differential { element }
}

/// Recursively resolves and caches materialized snapshots across a
/// `baseDefinition` chain, so a profile several levels below a
/// snapshot-bearing resource only pays the walk-and-merge cost once per
/// ancestor per process lifetime.
pub struct SnapshotContext<'a> {
    fhir_context: &'a dyn FhirContext,
    cache: RwLock<HashMap<String, Arc<Snapshot>>>,
}

impl<'a> SnapshotContext<'a> {
    pub fn new(fhir_context: &'a dyn FhirContext) -> Self {
        Self {
            fhir_context,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve `url`'s complete snapshot, generating it (and any ancestor
    /// snapshots not already authored) as needed.
    pub fn generate_deep_snapshot(&self, url: &str) -> Result<SnapshotResult> {
        if let Some(cached) = self.cache.read().unwrap().get(url) {
            return Ok(SnapshotResult {
                snapshot: (**cached).clone(),
                issues: Vec::new(),
            });
        }

        let definition = self
            .fhir_context
            .get_structure_definition(url)?
            .ok_or_else(|| Error::BaseNotFound(url.to_string()))?;

        let result = self.generate_for_definition(&definition)?;
        self.cache
            .write()
            .unwrap()
            .insert(url.to_string(), Arc::new(result.snapshot.clone()));
        Ok(result)
    }

    fn generate_for_definition(&self, definition: &StructureDefinition) -> Result<SnapshotResult> {
        if let Some(snapshot) = &definition.snapshot {
            return Ok(SnapshotResult {
                snapshot: snapshot.clone(),
                issues: Vec::new(),
            });
        }

        let base_url = definition.base_definition.clone().ok_or_else(|| {
            Error::BaseNotFound(format!(
                "{} has neither an authored snapshot nor a baseDefinition",
                definition.url
            ))
        })?;
        let base_result = self.generate_deep_snapshot(&base_url)?;

        let differential = definition.differential.clone().unwrap_or_default();
        let mut result = generate_snapshot(&differential, &base_result.snapshot)?;
        let mut issues = base_result.issues;
        issues.append(&mut result.issues);
        result.issues = issues;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conform_context::{FhirContext, InMemoryLoader, Registry};
    use conform_models::{BindingStrength, ElementDefinitionBinding};
    use std::collections::HashMap as StdHashMap;

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
            extensions: StdHashMap::new(),
        }
    }

    #[test]
    fn merges_differential_onto_base_in_place() {
        let base = Snapshot {
            element: vec![elem("Patient"), elem("Patient.name")],
        };
        let mut name_diff = elem("Patient.name");
        name_diff.min = Some(1);
        let differential = Differential {
            element: vec![name_diff],
        };

        let result = generate_snapshot(&differential, &base).unwrap();

        assert!(result.success());
        assert_eq!(result.snapshot.element.len(), 2);
        assert_eq!(
            result.snapshot.get_element("Patient.name").unwrap().min,
            Some(1)
        );
    }

    #[test]
    fn appends_unmatched_differential_element_with_info_issue() {
        let base = Snapshot {
            element: vec![elem("Patient")],
        };
        let differential = Differential {
            element: vec![elem("Patient.extension")],
        };

        let result = generate_snapshot(&differential, &base).unwrap();

        assert!(result.success());
        assert_eq!(result.snapshot.element.len(), 2);
        assert!(result
            .issues
            .iter()
            .any(|i| i.code as u8 == IssueCode::DifferentialNotConsumed as u8));
    }

    #[test]
    fn binding_violation_is_applied_and_flagged() {
        let mut base_name = elem("Patient.name");
        base_name.binding = Some(ElementDefinitionBinding {
            strength: BindingStrength::Required,
            description: None,
            value_set: Some("http://example.org/vs/a".to_string()),
        });
        let base = Snapshot {
            element: vec![elem("Patient"), base_name],
        };
        let mut diff_name = elem("Patient.name");
        diff_name.binding = Some(ElementDefinitionBinding {
            strength: BindingStrength::Preferred,
            description: None,
            value_set: Some("http://example.org/vs/b".to_string()),
        });
        let differential = Differential {
            element: vec![diff_name],
        };

        let result = generate_snapshot(&differential, &base).unwrap();

        assert!(!result.success());
        assert_eq!(
            result.snapshot.get_element("Patient.name").unwrap().binding.clone().unwrap().strength,
            BindingStrength::Preferred
        );
    }

    #[test]
    fn closed_slicing_drops_new_slice_and_flags_error() {
        use conform_models::{
            DiscriminatorType, ElementDefinitionDiscriminator, ElementDefinitionSlicing,
            SlicingRules,
        };

        let mut identifier_root = elem("Patient.identifier");
        identifier_root.slicing = Some(ElementDefinitionSlicing {
            discriminator: Some(vec![ElementDefinitionDiscriminator {
                discriminator_type: DiscriminatorType::Value,
                path: "system".to_string(),
            }]),
            description: None,
            ordered: Some(false),
            rules: SlicingRules::Closed,
        });
        let base = Snapshot {
            element: vec![elem("Patient"), identifier_root],
        };

        let mut new_slice = elem("Patient.identifier");
        new_slice.slice_name = Some("mrn".to_string());
        let differential = Differential {
            element: vec![new_slice],
        };

        let result = generate_snapshot(&differential, &base).unwrap();

        assert!(!result.success());
        assert!(result
            .issues
            .iter()
            .any(|i| i.code as u8 == IssueCode::SlicingError as u8));
        assert!(result
            .snapshot
            .element
            .iter()
            .all(|e| e.slice_name.as_deref() != Some("mrn")));
    }

    #[test]
    fn open_slicing_accepts_new_slice() {
        use conform_models::{
            DiscriminatorType, ElementDefinitionDiscriminator, ElementDefinitionSlicing,
            SlicingRules,
        };

        let mut identifier_root = elem("Patient.identifier");
        identifier_root.slicing = Some(ElementDefinitionSlicing {
            discriminator: Some(vec![ElementDefinitionDiscriminator {
                discriminator_type: DiscriminatorType::Value,
                path: "system".to_string(),
            }]),
            description: None,
            ordered: Some(false),
            rules: SlicingRules::Open,
        });
        let base = Snapshot {
            element: vec![elem("Patient"), identifier_root],
        };

        let mut new_slice = elem("Patient.identifier");
        new_slice.slice_name = Some("mrn".to_string());
        new_slice.fixed = Some(serde_json::json!("urn:oid:1.2.3"));
        let differential = Differential {
            element: vec![new_slice],
        };

        let result = generate_snapshot(&differential, &base).unwrap();

        assert!(result.success());
        assert!(result
            .snapshot
            .element
            .iter()
            .any(|e| e.slice_name.as_deref() == Some("mrn")));
    }

    #[test]
    fn deep_snapshot_walks_inheritance_chain_and_caches() {
        let mut root = elem("Patient");
        root.min = Some(0);
        root.max = Some("1".to_string());
        let root_sd = StructureDefinition {
            id: None,
            url: "http://hl7.org/fhir/StructureDefinition/Patient".to_string(),
            version: None,
            name: "Patient".to_string(),
            title: None,
            status: None,
            is_abstract: false,
            kind: conform_models::StructureDefinitionKind::Resource,
            type_name: "Patient".to_string(),
            base_definition: None,
            derivation: None,
            snapshot: Some(Snapshot {
                element: vec![root.clone()],
            }),
            differential: None,
            extensions: StdHashMap::new(),
        };

        let mut name_diff = elem("Patient.name");
        name_diff.min = Some(1);
        let profile_sd = StructureDefinition {
            id: None,
            url: "http://example.org/fhir/StructureDefinition/my-patient".to_string(),
            version: None,
            name: "MyPatient".to_string(),
            title: None,
            status: None,
            is_abstract: false,
            kind: conform_models::StructureDefinitionKind::Resource,
            type_name: "Patient".to_string(),
            base_definition: Some("http://hl7.org/fhir/StructureDefinition/Patient".to_string()),
            derivation: Some(conform_models::TypeDerivationRule::Constraint),
            snapshot: None,
            differential: Some(Differential {
                element: vec![name_diff],
            }),
            extensions: StdHashMap::new(),
        };

        let loader = InMemoryLoader::new().with(root_sd).with(profile_sd);
        let registry = Registry::with_loader(Arc::new(loader));
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            registry
                .resolve("http://hl7.org/fhir/StructureDefinition/Patient")
                .await
                .unwrap();
            registry
                .resolve("http://example.org/fhir/StructureDefinition/my-patient")
                .await
                .unwrap();
        });

        let ctx = SnapshotContext::new(&registry);
        let result = ctx
            .generate_deep_snapshot("http://example.org/fhir/StructureDefinition/my-patient")
            .unwrap();

        assert!(result.success());
        assert!(result.snapshot.get_element("Patient.name").is_some());

        let cached = ctx
            .generate_deep_snapshot("http://example.org/fhir/StructureDefinition/my-patient")
            .unwrap();
        assert_eq!(cached.snapshot.element.len(), result.snapshot.element.len());
    }
}

//! The canonical builder (component 4, §4.4): lowers a populated snapshot
//! into a [`CanonicalProfile`] with every FHIR default spelled out.

use conform_models::{
    ElementDefinition, ElementDefinitionBinding, ElementDefinitionConstraint,
    ElementDefinitionSlicing, ElementDefinitionType, StructureDefinition,
};
use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::types::{
    BindingConstraint, CanonicalElement, CanonicalProfile, Invariant, MaxCardinality,
    SlicingDefinition, SlicingDiscriminator, TypeConstraint,
};

/// Build a [`CanonicalProfile`] from `definition`'s snapshot.
pub fn build_canonical_profile(definition: &StructureDefinition) -> Result<CanonicalProfile> {
    let snapshot = definition
        .snapshot
        .as_ref()
        .filter(|s| !s.element.is_empty())
        .ok_or_else(|| Error::NoSnapshot(definition.url.clone()))?;

    let mut elements = IndexMap::with_capacity(snapshot.element.len());
    for element in &snapshot.element {
        elements.insert(element.path.clone(), lower_element(element));
    }

    Ok(CanonicalProfile {
        url: definition.url.clone(),
        version: definition.version.clone(),
        name: definition.name.clone(),
        kind: definition.kind,
        type_name: definition.type_name.clone(),
        base_profile: definition.base_definition.clone(),
        is_abstract: definition.is_abstract,
        derivation: definition.derivation,
        elements,
    })
}

fn lower_element(element: &ElementDefinition) -> CanonicalElement {
    CanonicalElement {
        path: element.path.clone(),
        id: element.id.clone().unwrap_or_else(|| element.path.clone()),
        slice_name: element.slice_name.clone(),
        min: element.min.unwrap_or(0),
        max: MaxCardinality::parse(element.max.as_deref()),
        types: element
            .types
            .as_ref()
            .map(|types| types.iter().map(lower_type).collect())
            .unwrap_or_default(),
        constraints: element
            .constraint
            .as_ref()
            .map(|constraints| constraints.iter().map(lower_constraint).collect())
            .unwrap_or_default(),
        binding: element.binding.as_ref().map(lower_binding),
        slicing: element.slicing.as_ref().map(lower_slicing),
        must_support: element.must_support.unwrap_or(false),
        is_modifier: element.is_modifier.unwrap_or(false),
        is_summary: element.is_summary.unwrap_or(false),
        short: element.short.clone(),
        definition: element.definition.clone(),
    }
}

/// Strip a type code down to its bare name, dropping FHIR-ism URI prefixes
/// such as `http://hl7.org/fhirpath/System.String` -> `String`.
fn normalize_type_code(code: &str) -> String {
    code.rsplit(['/', '.']).next().unwrap_or(code).to_string()
}

fn lower_type(t: &ElementDefinitionType) -> TypeConstraint {
    TypeConstraint {
        code: normalize_type_code(&t.code),
        profiles: t.profile.clone().unwrap_or_default(),
        target_profiles: t.target_profile.clone().unwrap_or_default(),
    }
}

fn lower_constraint(c: &ElementDefinitionConstraint) -> Invariant {
    Invariant {
        key: c.key.clone(),
        severity: c.severity.clone(),
        human: c.human.clone(),
        expression: c.expression.clone(),
        source: c.source.clone(),
    }
}

fn lower_binding(b: &ElementDefinitionBinding) -> BindingConstraint {
    BindingConstraint {
        strength: b.strength,
        value_set_url: b.value_set.clone(),
        description: b.description.clone(),
    }
}

fn lower_slicing(s: &ElementDefinitionSlicing) -> SlicingDefinition {
    let discriminator = s
        .discriminator
        .clone()
        .unwrap_or_default()
        .iter()
        .map(|d| SlicingDiscriminator {
            discriminator_type: d.discriminator_type.clone(),
            path: d.path.clone(),
        })
        .collect();

    SlicingDefinition {
        discriminator,
        description: s.description.clone(),
        ordered: s.ordered.unwrap_or(false),
        rules: s.rules.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conform_models::{Snapshot, StructureDefinitionKind};
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

    fn sd(snapshot: Option<Snapshot>) -> StructureDefinition {
        StructureDefinition {
            id: None,
            url: "http://example.org/fhir/StructureDefinition/my-patient".to_string(),
            version: Some("1.0.0".to_string()),
            name: "MyPatient".to_string(),
            title: None,
            status: None,
            is_abstract: false,
            kind: StructureDefinitionKind::Resource,
            type_name: "Patient".to_string(),
            base_definition: Some("http://hl7.org/fhir/StructureDefinition/Patient".to_string()),
            derivation: Some(conform_models::TypeDerivationRule::Constraint),
            snapshot,
            differential: None,
            extensions: HashMap::new(),
        }
    }

    #[test]
    fn fails_without_snapshot() {
        let definition = sd(None);
        assert!(matches!(
            build_canonical_profile(&definition),
            Err(Error::NoSnapshot(_))
        ));
    }

    #[test]
    fn fails_with_empty_snapshot() {
        let definition = sd(Some(Snapshot { element: vec![] }));
        assert!(build_canonical_profile(&definition).is_err());
    }

    #[test]
    fn preserves_insertion_order_and_fills_defaults() {
        let definition = sd(Some(Snapshot {
            element: vec![
                elem("Patient"),
                elem("Patient.name"),
                elem("Patient.name.family"),
            ],
        }));

        let profile = build_canonical_profile(&definition).unwrap();

        let paths: Vec<&str> = profile.elements.keys().map(String::as_str).collect();
        assert_eq!(paths, vec!["Patient", "Patient.name", "Patient.name.family"]);

        let root = profile.root_element().unwrap();
        assert_eq!(root.path, "Patient");
        assert_eq!(root.max, MaxCardinality::Number(1));
        assert!(!root.must_support);
        assert!(!root.is_modifier);
        assert!(!root.is_summary);
    }

    #[test]
    fn parses_unbounded_max() {
        let mut name = elem("Patient.name");
        name.max = Some("*".to_string());
        let definition = sd(Some(Snapshot {
            element: vec![elem("Patient"), name],
        }));

        let profile = build_canonical_profile(&definition).unwrap();
        assert_eq!(profile.get("Patient.name").unwrap().max, MaxCardinality::Unbounded);
    }

    #[test]
    fn every_child_path_has_a_parent_in_the_map() {
        let definition = sd(Some(Snapshot {
            element: vec![
                elem("Patient"),
                elem("Patient.name"),
                elem("Patient.name.family"),
            ],
        }));

        let profile = build_canonical_profile(&definition).unwrap();
        for path in profile.elements.keys() {
            if let Some(parent) = path.rfind('.').map(|i| &path[..i]) {
                assert!(profile.elements.contains_key(parent), "missing parent for {path}");
            }
        }
    }

    #[test]
    fn normalizes_fhirpath_system_type_uri() {
        let mut value = elem("Patient.name.family");
        value.types = Some(vec![ElementDefinitionType {
            code: "http://hl7.org/fhirpath/System.String".to_string(),
            profile: None,
            target_profile: None,
            aggregation: None,
            versioning: None,
        }]);
        let definition = sd(Some(Snapshot {
            element: vec![elem("Patient"), value],
        }));

        let profile = build_canonical_profile(&definition).unwrap();
        let element = profile.get("Patient.name.family").unwrap();
        assert_eq!(element.types[0].code, "String");
    }
}

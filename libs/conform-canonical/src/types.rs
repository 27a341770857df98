//! The normalized output shape the builder produces (§3, §4.4): every default
//! spelled out, every list present (possibly empty), `max` a real
//! discriminated union instead of FHIR's "number or '*'" string convention.

use conform_models::{BindingStrength, ConstraintSeverity, DiscriminatorType, SlicingRules};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A normalized element cardinality upper bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MaxCardinality {
    Number(u32),
    Unbounded,
}

impl MaxCardinality {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            None => MaxCardinality::Number(1),
            Some("*") => MaxCardinality::Unbounded,
            Some(n) => n
                .parse::<u32>()
                .map(MaxCardinality::Number)
                .unwrap_or(MaxCardinality::Unbounded),
        }
    }

    pub fn is_repeating(&self) -> bool {
        matches!(self, MaxCardinality::Unbounded) || matches!(self, MaxCardinality::Number(n) if *n > 1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeConstraint {
    pub code: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub profiles: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub target_profiles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingConstraint {
    pub strength: BindingStrength,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_set_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invariant {
    pub key: String,
    pub severity: ConstraintSeverity,
    pub human: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlicingDiscriminator {
    #[serde(rename = "type")]
    pub discriminator_type: DiscriminatorType,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlicingDefinition {
    #[serde(default)]
    pub discriminator: Vec<SlicingDiscriminator>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub ordered: bool,
    pub rules: SlicingRules,
}

/// The builder's per-path output, with every FHIR default made explicit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalElement {
    pub path: String,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slice_name: Option<String>,
    pub min: u32,
    pub max: MaxCardinality,
    #[serde(default)]
    pub types: Vec<TypeConstraint>,
    #[serde(default)]
    pub constraints: Vec<Invariant>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binding: Option<BindingConstraint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slicing: Option<SlicingDefinition>,
    pub must_support: bool,
    pub is_modifier: bool,
    pub is_summary: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
}

/// The builder's top-level output: profile metadata plus an
/// insertion-ordered `path -> CanonicalElement` map whose order matches the
/// source snapshot's element order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalProfile {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub name: String,
    pub kind: conform_models::StructureDefinitionKind,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_profile: Option<String>,
    pub is_abstract: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub derivation: Option<conform_models::TypeDerivationRule>,
    pub elements: IndexMap<String, CanonicalElement>,
}

impl CanonicalProfile {
    pub fn root_element(&self) -> Option<&CanonicalElement> {
        self.elements.values().next()
    }

    pub fn get(&self, path: &str) -> Option<&CanonicalElement> {
        self.elements.get(path)
    }

    pub fn children_of<'a>(&'a self, parent_path: &'a str) -> impl Iterator<Item = &'a CanonicalElement> {
        let expected_depth = parent_path.matches('.').count() + 1;
        self.elements.values().filter(move |e| {
            e.path.starts_with(parent_path)
                && e.path.len() > parent_path.len()
                && e.path.as_bytes().get(parent_path.len()) == Some(&b'.')
                && e.path.matches('.').count() == expected_depth
        })
    }
}

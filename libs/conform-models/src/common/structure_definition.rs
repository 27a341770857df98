//! FHIR StructureDefinition model
//!
//! Version-agnostic model for the conformance resource that carries a type's
//! (or profile's) snapshot and differential element lists.

use super::element_definition::{Differential, Snapshot};
use super::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Classification of what a StructureDefinition describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StructureDefinitionKind {
    PrimitiveType,
    ComplexType,
    Resource,
    Logical,
}

/// How a StructureDefinition relates to its `baseDefinition`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeDerivationRule {
    Specialization,
    Constraint,
}

/// FHIR StructureDefinition — the meta-resource defining a type, data type,
/// extension, or profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StructureDefinition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Canonical URL identifying this StructureDefinition
    pub url: String,

    /// Business version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Computer-friendly name
    pub name: String,

    /// Human-friendly name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Publication status (draft | active | retired | unknown)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// Whether this definition describes an abstract type
    #[serde(rename = "abstract")]
    pub is_abstract: bool,

    /// primitive-type | complex-type | resource | logical
    pub kind: StructureDefinitionKind,

    /// FHIR type this StructureDefinition describes or constrains (e.g. "Patient")
    #[serde(rename = "type")]
    pub type_name: String,

    /// Canonical URL of the StructureDefinition this one is based on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_definition: Option<String>,

    /// specialization | constraint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub derivation: Option<TypeDerivationRule>,

    /// Complete, inheritance-resolved element list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<Snapshot>,

    /// Delta from the base profile
    #[serde(skip_serializing_if = "Option::is_none")]
    pub differential: Option<Differential>,

    /// Additional content beyond core fields
    #[serde(flatten)]
    pub extensions: HashMap<String, Value>,
}

impl StructureDefinition {
    /// Parse from a JSON value.
    pub fn from_value(value: &Value) -> Result<Self> {
        serde_json::from_value(value.clone()).map_err(Error::from)
    }

    /// Validate the one cross-field invariant the data model itself can check:
    /// `derivation = constraint` implies `baseDefinition` is present.
    pub fn validate(&self) -> Result<()> {
        if self.derivation == Some(TypeDerivationRule::Constraint) && self.base_definition.is_none()
        {
            return Err(Error::InvalidResource(format!(
                "{}: derivation=constraint requires baseDefinition",
                self.url
            )));
        }
        Ok(())
    }

    /// The key this definition registers under when no explicit version is given.
    pub fn canonical_key(&self) -> String {
        match &self.version {
            Some(version) => format!("{}|{}", self.url, version),
            None => self.url.clone(),
        }
    }

    pub fn has_snapshot(&self) -> bool {
        self.snapshot
            .as_ref()
            .map(|s| !s.element.is_empty())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_sd(url: &str) -> StructureDefinition {
        StructureDefinition {
            id: None,
            url: url.to_string(),
            version: None,
            name: "Test".to_string(),
            title: None,
            status: None,
            is_abstract: false,
            kind: StructureDefinitionKind::Resource,
            type_name: "Patient".to_string(),
            base_definition: None,
            derivation: None,
            snapshot: None,
            differential: None,
            extensions: HashMap::new(),
        }
    }

    #[test]
    fn constraint_without_base_is_invalid() {
        let mut sd = base_sd("http://example.org/fhir/StructureDefinition/my-patient");
        sd.derivation = Some(TypeDerivationRule::Constraint);
        assert!(sd.validate().is_err());
    }

    #[test]
    fn specialization_without_base_is_valid() {
        let mut sd = base_sd("http://hl7.org/fhir/StructureDefinition/Patient");
        sd.derivation = Some(TypeDerivationRule::Specialization);
        assert!(sd.validate().is_ok());
    }

    #[test]
    fn canonical_key_includes_version_when_present() {
        let mut sd = base_sd("http://example.org/sd/a");
        assert_eq!(sd.canonical_key(), "http://example.org/sd/a");
        sd.version = Some("1.2.0".to_string());
        assert_eq!(sd.canonical_key(), "http://example.org/sd/a|1.2.0");
    }
}

//! Shared value types used across the common FHIR model
//!
//! These are the small enums and structs that `element_definition.rs`,
//! `structure_definition.rs`, `code_system.rs` and `value_set.rs` all reference.
//! Kept in one module so the binding/coding vocabulary isn't duplicated per resource.

use serde::{Deserialize, Serialize};

/// Strength of a terminology binding (required | extensible | preferred | example)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingStrength {
    Example,
    Preferred,
    Extensible,
    Required,
}

impl BindingStrength {
    /// Rank used to compare binding strengths: higher is stricter.
    ///
    /// Derive order already matches required > extensible > preferred > example
    /// as long as the enum variants stay declared weakest-first, which the
    /// `#[derive(PartialOrd, Ord)]` above relies on.
    pub fn rank(self) -> u8 {
        match self {
            BindingStrength::Example => 0,
            BindingStrength::Preferred => 1,
            BindingStrength::Extensible => 2,
            BindingStrength::Required => 3,
        }
    }
}

/// A `Coding` — a code from a coding system, optionally with a display string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coding {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_selected: Option<bool>,
}

/// A `CodeableConcept` — text plus a list of equivalent codings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeableConcept {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coding: Option<Vec<Coding>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// A `Quantity` — a measured amount with optional unit and comparator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quantity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binding_strength_orders_weakest_first() {
        assert!(BindingStrength::Example < BindingStrength::Preferred);
        assert!(BindingStrength::Preferred < BindingStrength::Extensible);
        assert!(BindingStrength::Extensible < BindingStrength::Required);
    }

    #[test]
    fn binding_strength_rank_matches_ord() {
        let mut strengths = [
            BindingStrength::Required,
            BindingStrength::Example,
            BindingStrength::Extensible,
            BindingStrength::Preferred,
        ];
        strengths.sort();
        assert_eq!(
            strengths.map(|s| s.rank()),
            [0, 1, 2, 3]
        );
    }
}

//! Choice-type ("value[x]") dispatch.
//!
//! FHIR encodes a polymorphic field `value[x]` as one concrete JSON property
//! per allowed type (`valueBoolean`, `valueString`, `valueQuantity`, ...). This
//! module resolves, for a given host resource/datatype name and logical base
//! (`"value"`, `"fixed"`, ...), which concrete property is present on a raw
//! JSON object, and carries along its sibling `_propertyName` extension data.

use phf::phf_map;
use serde_json::{Map, Value};

/// The full set of types FHIR allows for an unconstrained `value[x]`
/// (Extension.value, UsageContext is a restricted subset handled separately).
static FULL_CHOICE_TYPES: &[&str] = &[
    "Base64Binary",
    "Boolean",
    "Canonical",
    "Code",
    "Date",
    "DateTime",
    "Decimal",
    "Id",
    "Instant",
    "Integer",
    "Markdown",
    "Oid",
    "PositiveInt",
    "String",
    "Time",
    "UnsignedInt",
    "Uri",
    "Url",
    "Uuid",
    "Address",
    "Age",
    "Annotation",
    "Attachment",
    "CodeableConcept",
    "Coding",
    "ContactPoint",
    "Count",
    "Distance",
    "Duration",
    "HumanName",
    "Identifier",
    "Money",
    "Period",
    "Quantity",
    "Range",
    "Ratio",
    "Reference",
    "SampledData",
    "Signature",
    "Timing",
    "ContactDetail",
    "Contributor",
    "DataRequirement",
    "Expression",
    "ParameterDefinition",
    "RelatedArtifact",
    "TriggerDefinition",
    "UsageContext",
    "Dosage",
    "Meta",
];

/// `ElementDefinition.{minValue,maxValue}` only allow orderable types.
static ORDERABLE_TYPES: &[&str] = &[
    "Date", "DateTime", "Instant", "Time", "Decimal", "Integer", "PositiveInt", "UnsignedInt",
    "Quantity",
];

/// `UsageContext.value` allows exactly four types.
static USAGE_CONTEXT_TYPES: &[&str] = &["CodeableConcept", "Quantity", "Range", "Reference"];

/// The fixed registry of choice fields per host type, mapping `"HostType.base"`
/// to the allowed-type list for that field.
static CHOICE_FIELDS: phf::Map<&'static str, &'static [&'static str]> = phf_map! {
    "Extension.value" => FULL_CHOICE_TYPES,
    "UsageContext.value" => USAGE_CONTEXT_TYPES,
    "ElementDefinition.defaultValue" => FULL_CHOICE_TYPES,
    "ElementDefinition.fixed" => FULL_CHOICE_TYPES,
    "ElementDefinition.pattern" => FULL_CHOICE_TYPES,
    "ElementDefinition.minValue" => ORDERABLE_TYPES,
    "ElementDefinition.maxValue" => ORDERABLE_TYPES,
    "ElementDefinitionExample.value" => FULL_CHOICE_TYPES,
};

/// A successfully dispatched choice value.
#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceMatch {
    /// The matched type suffix, e.g. `"Quantity"` for `valueQuantity`.
    pub suffix: String,
    /// The JSON property name that matched, e.g. `"valueQuantity"`.
    pub property_name: String,
    /// The value stored at that property.
    pub value: Value,
    /// The sibling `_propertyName` extension object, if present.
    pub sibling_extension: Option<Value>,
}

/// A non-fatal problem encountered while dispatching a choice field.
#[derive(Debug, Clone, PartialEq)]
pub enum ChoiceIssue {
    /// More than one `{base}{Type}` property was present simultaneously.
    /// The first one encountered (in object iteration order) is still returned.
    MultipleChoiceValues { base: String, matched: Vec<String> },
    /// A property matched the `{base}{Suffix}` shape but `Suffix` is not in
    /// the declared allowed-type list for this host/base pair.
    InvalidChoiceType { base: String, property_name: String },
}

/// Resolve the concrete property for `host_type.{base}[x]` against a raw JSON object.
///
/// Returns the matched value (if any, first-match-wins on ambiguity) plus every
/// issue encountered, so callers can decide whether an `InvalidChoiceType` or
/// `MultipleChoiceValues` should abort parsing or just be logged.
pub fn dispatch_choice(
    host_type: &str,
    base: &str,
    object: &Map<String, Value>,
) -> (Option<ChoiceMatch>, Vec<ChoiceIssue>) {
    let registry_key = format!("{host_type}.{base}");
    let allowed = CHOICE_FIELDS.get(registry_key.as_str()).copied();

    let mut matches = Vec::new();
    let mut issues = Vec::new();

    for (property_name, value) in object.iter() {
        let Some(suffix) = property_name.strip_prefix(base) else {
            continue;
        };
        if suffix.is_empty() || !starts_with_uppercase(suffix) {
            continue;
        }
        if property_name.starts_with('_') {
            continue;
        }

        match allowed {
            Some(allowed_types) if allowed_types.contains(&suffix) => {
                matches.push(ChoiceMatch {
                    suffix: suffix.to_string(),
                    property_name: property_name.clone(),
                    value: value.clone(),
                    sibling_extension: object.get(&format!("_{property_name}")).cloned(),
                });
            }
            Some(_) => {
                issues.push(ChoiceIssue::InvalidChoiceType {
                    base: base.to_string(),
                    property_name: property_name.clone(),
                });
            }
            None => {
                // Unknown base for this host type entirely: still try to report it
                // as an invalid choice type rather than silently ignoring it.
                issues.push(ChoiceIssue::InvalidChoiceType {
                    base: base.to_string(),
                    property_name: property_name.clone(),
                });
            }
        }
    }

    if matches.len() > 1 {
        issues.push(ChoiceIssue::MultipleChoiceValues {
            base: base.to_string(),
            matched: matches.iter().map(|m| m.property_name.clone()).collect(),
        });
    }

    (matches.into_iter().next(), issues)
}

fn starts_with_uppercase(s: &str) -> bool {
    s.chars().next().map(|c| c.is_ascii_uppercase()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn dispatches_single_choice_value() {
        let object = obj(json!({ "valueQuantity": { "value": 5 } }));
        let (matched, issues) = dispatch_choice("Extension", "value", &object);
        let matched = matched.unwrap();
        assert_eq!(matched.suffix, "Quantity");
        assert_eq!(matched.property_name, "valueQuantity");
        assert!(issues.is_empty());
    }

    #[test]
    fn captures_sibling_extension() {
        let object = obj(json!({
            "valueString": "hi",
            "_valueString": { "extension": [] }
        }));
        let (matched, _issues) = dispatch_choice("Extension", "value", &object);
        let matched = matched.unwrap();
        assert!(matched.sibling_extension.is_some());
    }

    #[test]
    fn rejects_lowercase_suffix_as_unrelated_property() {
        // "valueset" is not "value" + uppercase suffix, must not be mistaken for value[x].
        let object = obj(json!({ "valueset": "http://example.org/vs" }));
        let (matched, issues) = dispatch_choice("Extension", "value", &object);
        assert!(matched.is_none());
        assert!(issues.is_empty());
    }

    #[test]
    fn flags_multiple_simultaneous_matches_but_returns_first() {
        let object = obj(json!({ "valueString": "a", "valueBoolean": true }));
        let (matched, issues) = dispatch_choice("Extension", "value", &object);
        assert!(matched.is_some());
        assert!(issues
            .iter()
            .any(|i| matches!(i, ChoiceIssue::MultipleChoiceValues { .. })));
    }

    #[test]
    fn flags_invalid_choice_type_without_aborting() {
        let object = obj(json!({ "valueXyz": "nope" }));
        let (matched, issues) = dispatch_choice("Extension", "value", &object);
        assert!(matched.is_none());
        assert!(issues
            .iter()
            .any(|i| matches!(i, ChoiceIssue::InvalidChoiceType { .. })));
    }

    #[test]
    fn restricts_min_max_value_to_orderable_types() {
        let object = obj(json!({ "minValueString": "nope" }));
        let (matched, issues) = dispatch_choice("ElementDefinition", "minValue", &object);
        assert!(matched.is_none());
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn usage_context_restricts_to_four_types() {
        let object = obj(json!({ "valueQuantity": { "value": 1 } }));
        let (matched, issues) = dispatch_choice("UsageContext", "value", &object);
        assert!(matched.is_some());
        assert!(issues.is_empty());
    }
}

//! HL7-style expression/expected-result table tests for the FHIRPath engine.
//!
//! Each case is `(expression, resource, expected)`, evaluated against a fresh
//! `FhirPathEngine` and compared by rendering the result collection to JSON
//! via `serde_json::Value` so collections, singletons, and empties all
//! compare uniformly.

use std::num::NonZeroUsize;

use conform_fhirpath::{FhirPathEngine, TypedValue};
use serde_json::{json, Value as Json};

fn engine() -> FhirPathEngine {
    FhirPathEngine::new(NonZeroUsize::new(64).unwrap())
}

fn to_json(values: Vec<TypedValue>) -> Vec<Json> {
    values
        .into_iter()
        .map(|v| match v {
            TypedValue::Null => Json::Null,
            TypedValue::Boolean(b) => Json::Bool(b),
            TypedValue::Integer(i) => json!(i),
            TypedValue::Decimal(d) => json!(d.to_string()),
            TypedValue::String(s) => Json::String(s),
            TypedValue::Date(d) => Json::String(d.raw),
            TypedValue::DateTime(dt) => Json::String(dt.raw),
            TypedValue::Time(t) => Json::String(t.raw),
            TypedValue::Quantity { value, unit } => json!({"value": value.to_string(), "unit": unit}),
            TypedValue::Resource { fields, .. } => Json::Object(fields),
            TypedValue::BackboneElement(fields) => Json::Object(fields),
        })
        .collect()
}

fn check(expr: &str, resource: &Json, expected: Vec<Json>) {
    let result = engine().eval(expr, resource).unwrap_or_else(|e| panic!("'{expr}' failed: {e}"));
    assert_eq!(to_json(result), expected, "expression: {expr}");
}

#[test]
fn literal_arithmetic() {
    check("1 + 2", &json!({}), vec![json!(3)]);
    check("'a' + 'b'", &json!({}), vec![json!("ab")]);
    check("6 / 3", &json!({}), vec![json!("2")]);
    check("10 div 3", &json!({}), vec![json!(3)]);
    check("10 mod 3", &json!({}), vec![json!(1)]);
    check("1 / 0", &json!({}), vec![]);
}

#[test]
fn three_valued_boolean_logic() {
    check("true and {}", &json!({}), vec![]);
    check("false and {}", &json!({}), vec![json!(false)]);
    check("true or {}", &json!({}), vec![json!(true)]);
    check("false or {}", &json!({}), vec![]);
    check("true implies {}", &json!({}), vec![]);
    check("false implies {}", &json!({}), vec![json!(true)]);
}

fn patient_with_two_names() -> Json {
    json!({
        "resourceType": "Patient",
        "name": [
            {"family": "Smith", "use": "official"},
            {"family": "Jones"},
        ],
    })
}

#[test]
fn where_filters_a_collection() {
    let patient = patient_with_two_names();
    check("name.where(use = 'official').family", &patient, vec![json!("Smith")]);
}

#[test]
fn of_type_filters_by_choice_type() {
    let obs = json!({
        "resourceType": "Observation",
        "valueQuantity": {"value": 5, "unit": "mg"},
    });
    let result = engine().eval("Observation.value.ofType(Quantity).value", &obs).unwrap();
    assert_eq!(to_json(result), vec![json!("5")]);
}

#[test]
fn distinct_and_count() {
    let bag = json!({"n": [1, 1, 2]});
    check("n.distinct()", &bag, vec![json!(1), json!(2)]);
    check("{}.count()", &json!({}), vec![json!(0)]);
}

#[test]
fn exists_and_empty() {
    let patient = patient_with_two_names();
    check("name.exists()", &patient, vec![json!(true)]);
    check("{}.empty()", &json!({}), vec![json!(true)]);

    let no_name = json!({"resourceType": "Patient"});
    check("name.exists()", &no_name, vec![json!(false)]);
}

#[test]
fn arithmetic_on_non_singleton_or_empty_is_empty() {
    let bag = json!({"n": [1, 2, 3]});
    check("n + 1", &bag, vec![]);
    check("{} + 1", &json!({}), vec![]);
}

#[test]
fn expression_cache_reuses_the_parsed_ast() {
    let engine = engine();
    let first = engine.parse("name.given").unwrap();
    let second = engine.parse("name.given").unwrap();
    assert!(std::sync::Arc::ptr_eq(&first, &second));

    let patient = json!({"name": [{"given": ["Alice"]}]});
    assert_eq!(engine.eval("name.given", &patient).unwrap(), engine.eval("name.given", &patient).unwrap());
}

#[test]
fn equality_and_equivalence() {
    check("1 = 1", &json!({}), vec![json!(true)]);
    check("1 = {}", &json!({}), vec![]);
    check("(1 | 2) = (1 | 2)", &json!({}), vec![json!(true)]);
    check("{} ~ {}", &json!({}), vec![json!(true)]);
    check("1.0 ~ 1", &json!({}), vec![json!(true)]);
}

#[test]
fn union_deduplicates_and_combine_does_not() {
    check("(1 | 2 | 1).count()", &json!({}), vec![json!(2)]);
    check("(1 | 2).combine(1 | 2).count()", &json!({}), vec![json!(4)]);
}

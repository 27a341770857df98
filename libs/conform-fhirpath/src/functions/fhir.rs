//! FHIR-specific functions: `resolve`, `extension`, `hasValue`, `htmlChecks`.

use serde_json::Value as Json;

use crate::ast::AstNode;
use crate::context::EvalContext;
use crate::error::{Error, Result};
use crate::eval::eval_node;
use crate::value::TypedValue;

fn reference_string(value: &TypedValue) -> Option<String> {
    match value {
        TypedValue::String(s) => Some(s.clone()),
        _ => value.as_object().and_then(|fields| fields.get("reference")).and_then(Json::as_str).map(str::to_string),
    }
}

/// Resolve a `Reference` to its target. Only contained resources (`#id`) can
/// be resolved without an external loader, so that's the only case handled
/// here; anything else is a synthetic `{resourceType, id}` stub built from
/// the reference string itself, per the resolved open question on how far
/// resolution goes without a fetched bundle.
pub(crate) fn resolve(ctx: &EvalContext, input: &[TypedValue], _args: &[AstNode]) -> Result<Vec<TypedValue>> {
    let mut out = Vec::new();
    for item in input {
        let Some(reference) = reference_string(item) else { continue };

        if let Some(local_id) = reference.strip_prefix('#') {
            if let Some(contained) = ctx.resource.as_object().and_then(|fields| fields.get("contained")).and_then(Json::as_array) {
                if let Some(found) = contained.iter().find(|res| res.get("id").and_then(Json::as_str) == Some(local_id)) {
                    out.push(TypedValue::from_json(found));
                    continue;
                }
            }
            continue;
        }

        let mut segments = reference.rsplit('/');
        let (id, type_name) = match (segments.next(), segments.next()) {
            (Some(id), Some(t)) if !id.is_empty() && !t.is_empty() => (id.to_string(), t.to_string()),
            _ => continue,
        };
        let mut fields = serde_json::Map::new();
        fields.insert("resourceType".to_string(), Json::String(type_name.clone()));
        fields.insert("id".to_string(), Json::String(id));
        out.push(TypedValue::Resource { type_name: Some(type_name), fields });
    }
    Ok(out)
}

/// `extension(url)` is sugar for `.extension.where(url = <url>)`.
pub(crate) fn extension(ctx: &EvalContext, input: &[TypedValue], args: &[AstNode]) -> Result<Vec<TypedValue>> {
    let url_vals = eval_node(&args[0], ctx, input)?;
    let [TypedValue::String(url)] = url_vals.as_slice() else {
        return Err(Error::InvalidArgument("extension() requires a string url".into()));
    };
    let extensions = crate::eval::navigate(input, "extension", false)?;
    Ok(extensions
        .into_iter()
        .filter(|ext| ext.as_object().and_then(|fields| fields.get("url")).and_then(Json::as_str) == Some(url.as_str()))
        .collect())
}

pub(crate) fn has_value(_ctx: &EvalContext, input: &[TypedValue], _args: &[AstNode]) -> Result<Vec<TypedValue>> {
    let has_value = match input {
        [TypedValue::Null] | [] => false,
        [TypedValue::String(s)] => !s.is_empty(),
        [TypedValue::Resource { .. }] | [TypedValue::BackboneElement(_)] => false,
        [_single] => true,
        _ => false,
    };
    Ok(vec![TypedValue::Boolean(has_value)])
}

/// A lightweight well-formedness check for FHIR narrative XHTML: rejects
/// unbalanced tags and disallowed `<script>`/`<style>`/event-handler content.
/// Not a full XHTML schema validation.
pub(crate) fn html_checks(_ctx: &EvalContext, input: &[TypedValue], _args: &[AstNode]) -> Result<Vec<TypedValue>> {
    let [TypedValue::String(html)] = input else { return Ok(vec![]) };
    let lower = html.to_lowercase();
    if lower.contains("<script") || lower.contains("<style") || lower.contains("javascript:") {
        return Ok(vec![TypedValue::Boolean(false)]);
    }
    let mut depth = 0i32;
    for tag in lower.match_indices('<').map(|(i, _)| i) {
        let rest = &lower[tag..];
        if rest.starts_with("</") {
            depth -= 1;
        } else if let Some(end) = rest.find('>') {
            if !rest[..end].ends_with('/') {
                depth += 1;
            }
        }
        if depth < 0 {
            return Ok(vec![TypedValue::Boolean(false)]);
        }
    }
    Ok(vec![TypedValue::Boolean(depth == 0)])
}

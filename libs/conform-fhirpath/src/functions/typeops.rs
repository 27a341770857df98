//! Type functions (FHIRPath §6.3): `type()`, `conformsTo()`. `is`/`as` are
//! operators, not functions — see [`crate::eval::eval_type_op`].

use crate::ast::{AstNode, Symbol};
use crate::context::EvalContext;
use crate::error::{Error, Result};
use crate::value::TypedValue;

use super::require_singleton;

/// Render a dotted type-specifier argument (`FHIR.Patient`, `System.String`)
/// back to its string form — these arguments parse as an ordinary `Dot`
/// chain of bare symbols, not through the `is`/`as` type-name grammar.
pub(crate) fn type_name_from_arg(node: &AstNode) -> Result<String> {
    match node {
        AstNode::Symbol(Symbol::Name(name)) => Ok(name.clone()),
        AstNode::Dot(lhs, rhs) => Ok(format!("{}.{}", type_name_from_arg(lhs)?, type_name_from_arg(rhs)?)),
        _ => Err(Error::InvalidArgument("expected a type specifier".into())),
    }
}

pub(crate) fn type_fn(_ctx: &EvalContext, input: &[TypedValue], _args: &[AstNode]) -> Result<Vec<TypedValue>> {
    let Some(value) = require_singleton(input, "type")? else { return Ok(vec![]) };
    let name = match value {
        TypedValue::Resource { type_name: Some(name), .. } => format!("FHIR.{name}"),
        TypedValue::Resource { type_name: None, .. } | TypedValue::BackboneElement(_) => "FHIR.BackboneElement".to_string(),
        other => format!("System.{}", other.type_name()),
    };
    Ok(vec![TypedValue::String(name)])
}

pub(crate) fn conforms_to(ctx: &EvalContext, input: &[TypedValue], args: &[AstNode]) -> Result<Vec<TypedValue>> {
    let Some(value) = require_singleton(input, "conformsTo")? else { return Ok(vec![]) };
    let TypedValue::Resource { type_name: Some(resource_type), .. } = value else {
        return Ok(vec![TypedValue::Boolean(false)]);
    };
    let url_vals = crate::eval::eval_node(&args[0], ctx, input)?;
    let [TypedValue::String(url)] = url_vals.as_slice() else {
        return Err(Error::InvalidArgument("conformsTo() requires a string profile URL".into()));
    };

    if let Some(fhir_context) = &ctx.fhir_context {
        if let Ok(Some(definition)) = fhir_context.get_structure_definition(url) {
            return Ok(vec![TypedValue::Boolean(definition.type_name == *resource_type)]);
        }
        return Ok(vec![TypedValue::Boolean(false)]);
    }

    // No registry wired up: fall back to comparing the resource type against
    // the profile URL's final path segment.
    let last_segment = url.rsplit('/').next().unwrap_or(url);
    Ok(vec![TypedValue::Boolean(last_segment == resource_type)])
}

//! Utility functions (FHIRPath §6.5): `trace`, `now`, `today`, `timeOfDay`.

use chrono::Utc;

use crate::ast::AstNode;
use crate::context::EvalContext;
use crate::error::Result;
use crate::eval::eval_node;
use crate::temporal;
use crate::value::TypedValue;

/// Logs the traced collection and returns the input unchanged — `trace()` is
/// a debugging aid, never a projection.
pub(crate) fn trace(ctx: &EvalContext, input: &[TypedValue], args: &[AstNode]) -> Result<Vec<TypedValue>> {
    let name = match args.first() {
        Some(arg) => match eval_node(arg, ctx, input)?.as_slice() {
            [TypedValue::String(s)] => s.clone(),
            _ => "trace".to_string(),
        },
        None => "trace".to_string(),
    };
    let traced = match args.get(1) {
        Some(projection) => eval_node(projection, ctx, input)?,
        None => input.to_vec(),
    };
    tracing::debug!(name = %name, count = traced.len(), "fhirpath trace()");
    Ok(input.to_vec())
}

pub(crate) fn now(_ctx: &EvalContext, _input: &[TypedValue], _args: &[AstNode]) -> Result<Vec<TypedValue>> {
    let raw = Utc::now().to_rfc3339();
    Ok(temporal::parse_datetime(&raw).map(TypedValue::DateTime).into_iter().collect())
}

pub(crate) fn today(_ctx: &EvalContext, _input: &[TypedValue], _args: &[AstNode]) -> Result<Vec<TypedValue>> {
    let raw = Utc::now().format("%Y-%m-%d").to_string();
    Ok(temporal::parse_date(&raw).map(TypedValue::Date).into_iter().collect())
}

pub(crate) fn time_of_day(_ctx: &EvalContext, _input: &[TypedValue], _args: &[AstNode]) -> Result<Vec<TypedValue>> {
    let raw = Utc::now().format("%H:%M:%S%.3f").to_string();
    Ok(temporal::parse_time(&raw).map(TypedValue::Time).into_iter().collect())
}

//! Math functions (FHIRPath §5.8): `abs`, `ceiling`, `floor`, `exp`, `ln`,
//! `log`, `power`, `round`, `sqrt`, `truncate`. Each preserves the input's
//! Integer/Decimal tag where FHIRPath defines that, and is a singleton-or-empty
//! operation like the rest of the math family.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::ast::AstNode;
use crate::context::EvalContext;
use crate::error::{Error, Result};
use crate::eval::eval_node;
use crate::value::TypedValue;

use super::require_singleton;

fn as_f64(value: &TypedValue) -> Result<f64> {
    value.as_decimal().and_then(|d| d.to_f64()).ok_or_else(|| Error::TypeError(format!("expected a numeric input, got {}", value.type_name())))
}

pub(crate) fn abs(_ctx: &EvalContext, input: &[TypedValue], _args: &[AstNode]) -> Result<Vec<TypedValue>> {
    let Some(value) = require_singleton(input, "abs")? else { return Ok(vec![]) };
    Ok(match value {
        TypedValue::Integer(i) => vec![TypedValue::Integer(i.abs())],
        TypedValue::Decimal(d) => vec![TypedValue::Decimal(d.abs())],
        TypedValue::Quantity { value, unit } => vec![TypedValue::Quantity { value: value.abs(), unit: unit.clone() }],
        other => return Err(Error::TypeError(format!("abs() requires a numeric input, got {}", other.type_name()))),
    })
}

pub(crate) fn ceiling(_ctx: &EvalContext, input: &[TypedValue], _args: &[AstNode]) -> Result<Vec<TypedValue>> {
    let Some(value) = require_singleton(input, "ceiling")? else { return Ok(vec![]) };
    let Some(d) = value.as_decimal() else { return Err(Error::TypeError("ceiling() requires a numeric input".into())) };
    Ok(vec![TypedValue::Integer(d.ceil().to_i64().ok_or_else(|| Error::TypeError("ceiling() overflowed i64".into()))?)])
}

pub(crate) fn floor(_ctx: &EvalContext, input: &[TypedValue], _args: &[AstNode]) -> Result<Vec<TypedValue>> {
    let Some(value) = require_singleton(input, "floor")? else { return Ok(vec![]) };
    let Some(d) = value.as_decimal() else { return Err(Error::TypeError("floor() requires a numeric input".into())) };
    Ok(vec![TypedValue::Integer(d.floor().to_i64().ok_or_else(|| Error::TypeError("floor() overflowed i64".into()))?)])
}

pub(crate) fn truncate(_ctx: &EvalContext, input: &[TypedValue], _args: &[AstNode]) -> Result<Vec<TypedValue>> {
    let Some(value) = require_singleton(input, "truncate")? else { return Ok(vec![]) };
    let Some(d) = value.as_decimal() else { return Err(Error::TypeError("truncate() requires a numeric input".into())) };
    Ok(vec![TypedValue::Integer(d.trunc().to_i64().ok_or_else(|| Error::TypeError("truncate() overflowed i64".into()))?)])
}

pub(crate) fn exp(_ctx: &EvalContext, input: &[TypedValue], _args: &[AstNode]) -> Result<Vec<TypedValue>> {
    let Some(value) = require_singleton(input, "exp")? else { return Ok(vec![]) };
    let d = Decimal::from_f64_retain(as_f64(value)?.exp()).ok_or_else(|| Error::TypeError("exp() produced a non-finite result".into()))?;
    Ok(vec![TypedValue::Decimal(d)])
}

pub(crate) fn ln(_ctx: &EvalContext, input: &[TypedValue], _args: &[AstNode]) -> Result<Vec<TypedValue>> {
    let Some(value) = require_singleton(input, "ln")? else { return Ok(vec![]) };
    let result = as_f64(value)?.ln();
    if !result.is_finite() {
        return Ok(vec![]);
    }
    Ok(vec![TypedValue::Decimal(Decimal::from_f64_retain(result).ok_or_else(|| Error::TypeError("ln() produced a non-finite result".into()))?)])
}

pub(crate) fn log(ctx: &EvalContext, input: &[TypedValue], args: &[AstNode]) -> Result<Vec<TypedValue>> {
    let Some(value) = require_singleton(input, "log")? else { return Ok(vec![]) };
    let base_vals = eval_node(&args[0], ctx, input)?;
    let Some(base) = require_singleton(&base_vals, "log")? else { return Ok(vec![]) };
    let result = as_f64(value)?.log(as_f64(base)?);
    if !result.is_finite() {
        return Ok(vec![]);
    }
    Ok(vec![TypedValue::Decimal(Decimal::from_f64_retain(result).ok_or_else(|| Error::TypeError("log() produced a non-finite result".into()))?)])
}

pub(crate) fn power(ctx: &EvalContext, input: &[TypedValue], args: &[AstNode]) -> Result<Vec<TypedValue>> {
    let Some(value) = require_singleton(input, "power")? else { return Ok(vec![]) };
    let exponent_vals = eval_node(&args[0], ctx, input)?;
    let Some(exponent) = require_singleton(&exponent_vals, "power")? else { return Ok(vec![]) };
    let result = as_f64(value)?.powf(as_f64(exponent)?);
    if !result.is_finite() {
        return Ok(vec![]);
    }
    let as_decimal = Decimal::from_f64_retain(result).ok_or_else(|| Error::TypeError("power() produced a non-finite result".into()))?;
    if matches!((value, exponent), (TypedValue::Integer(_), TypedValue::Integer(_))) && as_decimal.fract() == Decimal::ZERO {
        return Ok(vec![TypedValue::Integer(as_decimal.to_i64().ok_or_else(|| Error::TypeError("power() overflowed i64".into()))?)]);
    }
    Ok(vec![TypedValue::Decimal(as_decimal)])
}

pub(crate) fn sqrt(_ctx: &EvalContext, input: &[TypedValue], _args: &[AstNode]) -> Result<Vec<TypedValue>> {
    let Some(value) = require_singleton(input, "sqrt")? else { return Ok(vec![]) };
    let n = as_f64(value)?;
    if n < 0.0 {
        return Ok(vec![]);
    }
    Ok(vec![TypedValue::Decimal(Decimal::from_f64_retain(n.sqrt()).ok_or_else(|| Error::TypeError("sqrt() produced a non-finite result".into()))?)])
}

pub(crate) fn round(ctx: &EvalContext, input: &[TypedValue], args: &[AstNode]) -> Result<Vec<TypedValue>> {
    let Some(value) = require_singleton(input, "round")? else { return Ok(vec![]) };
    let Some(d) = value.as_decimal() else { return Err(Error::TypeError("round() requires a numeric input".into())) };
    let precision: u32 = match args.first() {
        Some(arg) => {
            let vals = eval_node(arg, ctx, input)?;
            match vals.as_slice() {
                [TypedValue::Integer(i)] if *i >= 0 => *i as u32,
                _ => 0,
            }
        }
        None => 0,
    };
    Ok(vec![TypedValue::Decimal(d.round_dp(precision))])
}

//! Existence functions (FHIRPath §5.1): `empty`, `exists`, `all[True|False]`,
//! `any[True|False]`, `count`, `distinct`, `subsetOf`, `supersetOf`, `isDistinct`.

use crate::ast::AstNode;
use crate::context::EvalContext;
use crate::error::Result;
use crate::eval::eval_node;
use crate::value::{equals, TypedValue};

pub(crate) fn not(_ctx: &EvalContext, input: &[TypedValue], _args: &[AstNode]) -> Result<Vec<TypedValue>> {
    match input {
        [TypedValue::Boolean(b)] => Ok(vec![TypedValue::Boolean(!b)]),
        [] => Ok(vec![]),
        _ => Ok(vec![]),
    }
}

pub(crate) fn empty(_ctx: &EvalContext, input: &[TypedValue], _args: &[AstNode]) -> Result<Vec<TypedValue>> {
    Ok(vec![TypedValue::Boolean(input.is_empty())])
}

/// `exists()` with no criteria is `!empty()`; `exists(criteria)` is
/// `where(criteria).exists()`, evaluated directly without materializing
/// the intermediate `where` result.
pub(crate) fn exists(ctx: &EvalContext, input: &[TypedValue], args: &[AstNode]) -> Result<Vec<TypedValue>> {
    if args.is_empty() {
        return Ok(vec![TypedValue::Boolean(!input.is_empty())]);
    }
    for (index, element) in input.iter().enumerate() {
        let element_ctx = ctx.push_iteration(element.clone(), index);
        let matched = eval_node(&args[0], &element_ctx, std::slice::from_ref(element))?;
        if matched.first().and_then(TypedValue::as_bool) == Some(true) {
            return Ok(vec![TypedValue::Boolean(true)]);
        }
    }
    Ok(vec![TypedValue::Boolean(false)])
}

pub(crate) fn all_true(_ctx: &EvalContext, input: &[TypedValue], _args: &[AstNode]) -> Result<Vec<TypedValue>> {
    Ok(vec![TypedValue::Boolean(input.iter().all(|v| v.as_bool() == Some(true)))])
}

pub(crate) fn any_true(_ctx: &EvalContext, input: &[TypedValue], _args: &[AstNode]) -> Result<Vec<TypedValue>> {
    Ok(vec![TypedValue::Boolean(input.iter().any(|v| v.as_bool() == Some(true)))])
}

pub(crate) fn all_false(_ctx: &EvalContext, input: &[TypedValue], _args: &[AstNode]) -> Result<Vec<TypedValue>> {
    Ok(vec![TypedValue::Boolean(input.iter().all(|v| v.as_bool() == Some(false)))])
}

pub(crate) fn any_false(_ctx: &EvalContext, input: &[TypedValue], _args: &[AstNode]) -> Result<Vec<TypedValue>> {
    Ok(vec![TypedValue::Boolean(input.iter().any(|v| v.as_bool() == Some(false)))])
}

fn is_subset(smaller: &[TypedValue], larger: &[TypedValue]) -> bool {
    smaller.iter().all(|item| larger.iter().any(|other| equals(item, other) == Some(true)))
}

pub(crate) fn subset_of(ctx: &EvalContext, input: &[TypedValue], args: &[AstNode]) -> Result<Vec<TypedValue>> {
    let other = eval_node(&args[0], ctx, input)?;
    Ok(vec![TypedValue::Boolean(is_subset(input, &other))])
}

pub(crate) fn superset_of(ctx: &EvalContext, input: &[TypedValue], args: &[AstNode]) -> Result<Vec<TypedValue>> {
    let other = eval_node(&args[0], ctx, input)?;
    Ok(vec![TypedValue::Boolean(is_subset(&other, input))])
}

pub(crate) fn count(_ctx: &EvalContext, input: &[TypedValue], _args: &[AstNode]) -> Result<Vec<TypedValue>> {
    Ok(vec![TypedValue::Integer(input.len() as i64)])
}

/// First-occurrence order is preserved, per the general set-producing-function rule.
pub(crate) fn distinct(_ctx: &EvalContext, input: &[TypedValue], _args: &[AstNode]) -> Result<Vec<TypedValue>> {
    let mut out: Vec<TypedValue> = Vec::new();
    for item in input {
        if !out.iter().any(|existing| equals(existing, item) == Some(true)) {
            out.push(item.clone());
        }
    }
    Ok(out)
}

pub(crate) fn is_distinct(ctx: &EvalContext, input: &[TypedValue], args: &[AstNode]) -> Result<Vec<TypedValue>> {
    let deduped = distinct(ctx, input, args)?;
    Ok(vec![TypedValue::Boolean(deduped.len() == input.len())])
}

//! Filtering functions (FHIRPath §5.2): `where`, `select`, `all`, `repeat`,
//! `ofType`. These are the functions whose argument is a lambda evaluated
//! once per input element with `$this` rebound, so they take the raw
//! [`AstNode`] argument rather than a pre-evaluated collection.

use crate::ast::AstNode;
use crate::context::EvalContext;
use crate::error::{Error, Result};
use crate::eval::{eval_node, matches_type};
use crate::value::{equals, TypedValue};

pub(crate) fn where_fn(ctx: &EvalContext, input: &[TypedValue], args: &[AstNode]) -> Result<Vec<TypedValue>> {
    let mut out = Vec::new();
    for (index, element) in input.iter().enumerate() {
        let element_ctx = ctx.push_iteration(element.clone(), index);
        let criteria = eval_node(&args[0], &element_ctx, std::slice::from_ref(element))?;
        match criteria.as_slice() {
            [] => {}
            [TypedValue::Boolean(true)] => out.push(element.clone()),
            [TypedValue::Boolean(false)] => {}
            _ => return Err(Error::TypeError("where() criteria must evaluate to a boolean".into())),
        }
    }
    Ok(out)
}

pub(crate) fn select_fn(ctx: &EvalContext, input: &[TypedValue], args: &[AstNode]) -> Result<Vec<TypedValue>> {
    let mut out = Vec::new();
    for (index, element) in input.iter().enumerate() {
        let element_ctx = ctx.push_iteration(element.clone(), index);
        out.extend(eval_node(&args[0], &element_ctx, std::slice::from_ref(element))?);
    }
    Ok(out)
}

pub(crate) fn all_fn(ctx: &EvalContext, input: &[TypedValue], args: &[AstNode]) -> Result<Vec<TypedValue>> {
    for (index, element) in input.iter().enumerate() {
        let element_ctx = ctx.push_iteration(element.clone(), index);
        let criteria = eval_node(&args[0], &element_ctx, std::slice::from_ref(element))?;
        if criteria.first().and_then(TypedValue::as_bool) != Some(true) {
            return Ok(vec![TypedValue::Boolean(false)]);
        }
    }
    Ok(vec![TypedValue::Boolean(true)])
}

/// Breadth-first fixpoint: repeatedly apply the projection to newly
/// discovered items until nothing new appears. Bounded to guard against a
/// projection that never converges.
const MAX_REPEAT_ITERATIONS: usize = 10_000;

pub(crate) fn repeat_fn(ctx: &EvalContext, input: &[TypedValue], args: &[AstNode]) -> Result<Vec<TypedValue>> {
    let mut seen: Vec<TypedValue> = Vec::new();
    let mut queue: Vec<TypedValue> = input.to_vec();
    let mut iterations = 0usize;

    while let Some(current) = queue.pop() {
        iterations += 1;
        if iterations > MAX_REPEAT_ITERATIONS {
            return Err(Error::EvalError {
                source: String::new(),
                message: format!("repeat() exceeded {MAX_REPEAT_ITERATIONS} iterations"),
            });
        }
        let element_ctx = ctx.push_this(current.clone());
        let projected = eval_node(&args[0], &element_ctx, std::slice::from_ref(&current))?;
        for item in projected {
            if !seen.iter().any(|existing| equals(existing, &item) == Some(true)) {
                seen.push(item.clone());
                queue.push(item);
            }
        }
    }
    Ok(seen)
}

pub(crate) fn of_type(ctx: &EvalContext, input: &[TypedValue], args: &[AstNode]) -> Result<Vec<TypedValue>> {
    let type_name = super::typeops::type_name_from_arg(&args[0])?;
    let _ = ctx;
    Ok(input.iter().filter(|v| matches_type(v, &type_name)).cloned().collect())
}

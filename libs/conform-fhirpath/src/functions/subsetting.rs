//! Subsetting functions (FHIRPath §5.3): `single`, `first`, `last`, `tail`,
//! `skip`, `take`, `intersect`, `exclude`.

use crate::ast::AstNode;
use crate::context::EvalContext;
use crate::error::{Error, Result};
use crate::eval::eval_node;
use crate::value::{equals, TypedValue};

pub(crate) fn single(_ctx: &EvalContext, input: &[TypedValue], _args: &[AstNode]) -> Result<Vec<TypedValue>> {
    match input {
        [] => Ok(vec![]),
        [v] => Ok(vec![v.clone()]),
        _ => Err(Error::InvalidArgument("single() requires zero or one items, got more than one".into())),
    }
}

pub(crate) fn first(_ctx: &EvalContext, input: &[TypedValue], _args: &[AstNode]) -> Result<Vec<TypedValue>> {
    Ok(input.first().cloned().into_iter().collect())
}

pub(crate) fn last(_ctx: &EvalContext, input: &[TypedValue], _args: &[AstNode]) -> Result<Vec<TypedValue>> {
    Ok(input.last().cloned().into_iter().collect())
}

pub(crate) fn tail(_ctx: &EvalContext, input: &[TypedValue], _args: &[AstNode]) -> Result<Vec<TypedValue>> {
    Ok(input.iter().skip(1).cloned().collect())
}

fn count_arg(ctx: &EvalContext, input: &[TypedValue], args: &[AstNode]) -> Result<usize> {
    let vals = eval_node(&args[0], ctx, input)?;
    match vals.as_slice() {
        [TypedValue::Integer(i)] if *i >= 0 => Ok(*i as usize),
        [TypedValue::Integer(_)] => Ok(0),
        _ => Err(Error::InvalidArgument("expected a non-negative integer argument".into())),
    }
}

pub(crate) fn skip(ctx: &EvalContext, input: &[TypedValue], args: &[AstNode]) -> Result<Vec<TypedValue>> {
    let n = count_arg(ctx, input, args)?;
    Ok(input.iter().skip(n).cloned().collect())
}

pub(crate) fn take(ctx: &EvalContext, input: &[TypedValue], args: &[AstNode]) -> Result<Vec<TypedValue>> {
    let n = count_arg(ctx, input, args)?;
    Ok(input.iter().take(n).cloned().collect())
}

pub(crate) fn intersect(ctx: &EvalContext, input: &[TypedValue], args: &[AstNode]) -> Result<Vec<TypedValue>> {
    let other = eval_node(&args[0], ctx, input)?;
    let mut out = Vec::new();
    for item in input {
        if other.iter().any(|o| equals(o, item) == Some(true)) && !out.iter().any(|o| equals(o, item) == Some(true)) {
            out.push(item.clone());
        }
    }
    Ok(out)
}

pub(crate) fn exclude(ctx: &EvalContext, input: &[TypedValue], args: &[AstNode]) -> Result<Vec<TypedValue>> {
    let other = eval_node(&args[0], ctx, input)?;
    Ok(input.iter().filter(|item| !other.iter().any(|o| equals(o, item) == Some(true))).cloned().collect())
}

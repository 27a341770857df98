//! Combining functions (FHIRPath §5.4): `union` (a function-call alias for
//! the `|` operator) and `combine` (concatenation without deduplication).

use crate::ast::AstNode;
use crate::context::EvalContext;
use crate::error::Result;
use crate::eval::eval_node;
use crate::value::{equals, TypedValue};

pub(crate) fn union_fn(ctx: &EvalContext, input: &[TypedValue], args: &[AstNode]) -> Result<Vec<TypedValue>> {
    let other = eval_node(&args[0], ctx, input)?;
    let mut out = input.to_vec();
    for item in other {
        if !out.iter().any(|existing| equals(existing, &item) == Some(true)) {
            out.push(item);
        }
    }
    Ok(out)
}

pub(crate) fn combine(ctx: &EvalContext, input: &[TypedValue], args: &[AstNode]) -> Result<Vec<TypedValue>> {
    let other = eval_node(&args[0], ctx, input)?;
    let mut out = input.to_vec();
    out.extend(other);
    Ok(out)
}

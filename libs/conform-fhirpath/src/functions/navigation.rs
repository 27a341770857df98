//! Tree navigation (FHIRPath §5.5/§6.4): `children`, `descendants`.

use crate::ast::AstNode;
use crate::context::EvalContext;
use crate::error::Result;
use crate::eval::eval_node;
use crate::value::{equals, TypedValue};

fn all_children(value: &TypedValue) -> Vec<TypedValue> {
    let Some(fields) = value.as_object() else { return vec![] };
    let mut out = Vec::new();
    for (key, json) in fields.iter() {
        if key.starts_with('_') {
            continue;
        }
        match json {
            serde_json::Value::Array(items) => {
                out.extend(items.iter().filter(|i| !i.is_null()).map(TypedValue::from_json));
            }
            serde_json::Value::Null => {}
            other => out.push(TypedValue::from_json(other)),
        }
    }
    out
}

pub(crate) fn children(ctx: &EvalContext, input: &[TypedValue], args: &[AstNode]) -> Result<Vec<TypedValue>> {
    if let Some(name_arg) = args.first() {
        let name_vals = eval_node(name_arg, ctx, input)?;
        let [TypedValue::String(name)] = name_vals.as_slice() else { return Ok(vec![]) };
        return Ok(crate::eval::navigate(input, name, false)?);
    }
    Ok(input.iter().flat_map(all_children).collect())
}

/// `descendants()` is `repeat(children())`: a breadth-first fixpoint over the
/// whole subtree, deduplicated by first occurrence.
pub(crate) fn descendants(_ctx: &EvalContext, input: &[TypedValue], _args: &[AstNode]) -> Result<Vec<TypedValue>> {
    let mut seen: Vec<TypedValue> = Vec::new();
    let mut queue: Vec<TypedValue> = input.to_vec();
    while let Some(current) = queue.pop() {
        for child in all_children(&current) {
            if !seen.iter().any(|existing| equals(existing, &child) == Some(true)) {
                seen.push(child.clone());
                queue.push(child);
            }
        }
    }
    Ok(seen)
}

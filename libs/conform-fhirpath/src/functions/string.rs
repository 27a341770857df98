//! String functions (FHIRPath §5.7). Every function here requires a
//! singleton string (or empty) input; the index/length/substring family
//! counts by Unicode scalar value, not byte offset.

use regex::Regex;

use crate::ast::AstNode;
use crate::context::EvalContext;
use crate::error::{Error, Result};
use crate::eval::eval_node;
use crate::value::TypedValue;

use super::require_singleton;

fn input_string(input: &[TypedValue]) -> Result<Option<String>> {
    match require_singleton(input, "string function")? {
        None => Ok(None),
        Some(v) => v.to_fhirpath_string().map(Some).ok_or_else(|| Error::TypeError("expected a string-convertible input".into())),
    }
}

fn arg_string(ctx: &EvalContext, input: &[TypedValue], args: &[AstNode], i: usize) -> Result<Option<String>> {
    let vals = eval_node(&args[i], ctx, input)?;
    match vals.as_slice() {
        [] => Ok(None),
        [TypedValue::String(s)] => Ok(Some(s.clone())),
        [other] => other.to_fhirpath_string().map(Some).ok_or_else(|| Error::TypeError(format!("expected a string argument, got {}", other.type_name()))),
        _ => Err(Error::InvalidArgument("expected a singleton string argument".into())),
    }
}

pub(crate) fn index_of(ctx: &EvalContext, input: &[TypedValue], args: &[AstNode]) -> Result<Vec<TypedValue>> {
    let Some(s) = input_string(input)? else { return Ok(vec![]) };
    let Some(search) = arg_string(ctx, input, args, 0)? else { return Ok(vec![]) };
    let idx = s.find(&search).map(|byte_idx| s[..byte_idx].chars().count() as i64).unwrap_or(-1);
    Ok(vec![TypedValue::Integer(idx)])
}

pub(crate) fn substring(ctx: &EvalContext, input: &[TypedValue], args: &[AstNode]) -> Result<Vec<TypedValue>> {
    let Some(s) = input_string(input)? else { return Ok(vec![]) };
    let start_vals = eval_node(&args[0], ctx, input)?;
    let [TypedValue::Integer(start)] = start_vals.as_slice() else { return Ok(vec![]) };
    if *start < 0 {
        return Ok(vec![]);
    }
    let chars: Vec<char> = s.chars().collect();
    let start = *start as usize;
    if start >= chars.len() {
        return Ok(vec![]);
    }
    let end = match args.get(1) {
        Some(len_arg) => {
            let len_vals = eval_node(len_arg, ctx, input)?;
            match len_vals.as_slice() {
                [TypedValue::Integer(len)] if *len >= 0 => (start + *len as usize).min(chars.len()),
                _ => chars.len(),
            }
        }
        None => chars.len(),
    };
    Ok(vec![TypedValue::String(chars[start..end].iter().collect())])
}

pub(crate) fn starts_with(ctx: &EvalContext, input: &[TypedValue], args: &[AstNode]) -> Result<Vec<TypedValue>> {
    let Some(s) = input_string(input)? else { return Ok(vec![]) };
    let Some(prefix) = arg_string(ctx, input, args, 0)? else { return Ok(vec![]) };
    Ok(vec![TypedValue::Boolean(s.starts_with(&prefix))])
}

pub(crate) fn ends_with(ctx: &EvalContext, input: &[TypedValue], args: &[AstNode]) -> Result<Vec<TypedValue>> {
    let Some(s) = input_string(input)? else { return Ok(vec![]) };
    let Some(suffix) = arg_string(ctx, input, args, 0)? else { return Ok(vec![]) };
    Ok(vec![TypedValue::Boolean(s.ends_with(&suffix))])
}

pub(crate) fn contains_fn(ctx: &EvalContext, input: &[TypedValue], args: &[AstNode]) -> Result<Vec<TypedValue>> {
    let Some(s) = input_string(input)? else { return Ok(vec![]) };
    let Some(needle) = arg_string(ctx, input, args, 0)? else { return Ok(vec![]) };
    Ok(vec![TypedValue::Boolean(s.contains(&needle))])
}

pub(crate) fn upper(_ctx: &EvalContext, input: &[TypedValue], _args: &[AstNode]) -> Result<Vec<TypedValue>> {
    let Some(s) = input_string(input)? else { return Ok(vec![]) };
    Ok(vec![TypedValue::String(s.to_uppercase())])
}

pub(crate) fn lower(_ctx: &EvalContext, input: &[TypedValue], _args: &[AstNode]) -> Result<Vec<TypedValue>> {
    let Some(s) = input_string(input)? else { return Ok(vec![]) };
    Ok(vec![TypedValue::String(s.to_lowercase())])
}

pub(crate) fn replace(ctx: &EvalContext, input: &[TypedValue], args: &[AstNode]) -> Result<Vec<TypedValue>> {
    let Some(s) = input_string(input)? else { return Ok(vec![]) };
    let Some(pattern) = arg_string(ctx, input, args, 0)? else { return Ok(vec![]) };
    let Some(replacement) = arg_string(ctx, input, args, 1)? else { return Ok(vec![]) };
    if pattern.is_empty() {
        // Inserting the replacement between every character, FHIRPath's defined behavior for an empty search string.
        let mut out = replacement.clone();
        for c in s.chars() {
            out.push(c);
            out.push_str(&replacement);
        }
        return Ok(vec![TypedValue::String(out)]);
    }
    Ok(vec![TypedValue::String(s.replace(&pattern, &replacement))])
}

pub(crate) fn matches(ctx: &EvalContext, input: &[TypedValue], args: &[AstNode]) -> Result<Vec<TypedValue>> {
    let Some(s) = input_string(input)? else { return Ok(vec![]) };
    let Some(pattern) = arg_string(ctx, input, args, 0)? else { return Ok(vec![]) };
    let re = Regex::new(&pattern).map_err(|e| Error::InvalidArgument(format!("invalid regex in matches(): {e}")))?;
    Ok(vec![TypedValue::Boolean(re.is_match(&s))])
}

pub(crate) fn replace_matches(ctx: &EvalContext, input: &[TypedValue], args: &[AstNode]) -> Result<Vec<TypedValue>> {
    let Some(s) = input_string(input)? else { return Ok(vec![]) };
    let Some(pattern) = arg_string(ctx, input, args, 0)? else { return Ok(vec![]) };
    let Some(replacement) = arg_string(ctx, input, args, 1)? else { return Ok(vec![]) };
    let re = Regex::new(&pattern).map_err(|e| Error::InvalidArgument(format!("invalid regex in replaceMatches(): {e}")))?;
    // FHIRPath uses `$1`-style group references, same as Rust's regex crate.
    Ok(vec![TypedValue::String(re.replace_all(&s, replacement.as_str()).into_owned())])
}

pub(crate) fn length(_ctx: &EvalContext, input: &[TypedValue], _args: &[AstNode]) -> Result<Vec<TypedValue>> {
    let Some(s) = input_string(input)? else { return Ok(vec![]) };
    Ok(vec![TypedValue::Integer(s.chars().count() as i64)])
}

pub(crate) fn to_chars(_ctx: &EvalContext, input: &[TypedValue], _args: &[AstNode]) -> Result<Vec<TypedValue>> {
    let Some(s) = input_string(input)? else { return Ok(vec![]) };
    Ok(s.chars().map(|c| TypedValue::String(c.to_string())).collect())
}

pub(crate) fn join(ctx: &EvalContext, input: &[TypedValue], args: &[AstNode]) -> Result<Vec<TypedValue>> {
    let separator = match args.first() {
        Some(arg) => arg_string(ctx, input, std::slice::from_ref(arg), 0)?.unwrap_or_default(),
        None => String::new(),
    };
    let parts: Result<Vec<String>> = input
        .iter()
        .map(|v| v.to_fhirpath_string().ok_or_else(|| Error::TypeError("join() requires string-convertible elements".into())))
        .collect();
    Ok(vec![TypedValue::String(parts?.join(&separator))])
}

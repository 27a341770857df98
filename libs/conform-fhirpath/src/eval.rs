//! The tree-walking evaluator: `eval_node` maps `(AstNode, Context, input)`
//! to an output collection. There is no separate IR; every variant of
//! [`AstNode`] is a direct `match` arm here.

use std::cmp::Ordering;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::Value as Json;

use crate::ast::{
    ArithmeticOp, AstNode, BooleanOp, ComparisonOp, EqualityOp, Literal, MembershipOp, Symbol,
    TypeOp, UnaryOp,
};
use crate::context::EvalContext;
use crate::error::{Error, Result};
use crate::value::{compare, equals, equivalent, TypedValue};
use crate::{functions, temporal};

/// Drives the "root atom" rule: non-empty input is visited once per
/// element with `$this` bound, results flattened; empty input is visited
/// once with no element bound.
pub fn eval_root(node: &AstNode, ctx: &EvalContext, input: &[TypedValue]) -> Result<Vec<TypedValue>> {
    if input.is_empty() {
        return eval_node(node, ctx, &[]);
    }
    let mut out = Vec::new();
    for (index, element) in input.iter().enumerate() {
        let element_ctx = ctx.push_iteration(element.clone(), index);
        out.extend(eval_node(node, &element_ctx, std::slice::from_ref(element))?);
    }
    Ok(out)
}

pub fn eval_node(node: &AstNode, ctx: &EvalContext, input: &[TypedValue]) -> Result<Vec<TypedValue>> {
    match node {
        AstNode::Literal(literal) => eval_literal(literal).map(|v| vec![v]),
        AstNode::EmptySet => Ok(vec![]),
        AstNode::Symbol(symbol) => eval_symbol(symbol, ctx, input),
        AstNode::Dot(lhs, rhs) => {
            let left = eval_node(lhs, ctx, input)?;
            eval_node(rhs, ctx, &left)
        }
        AstNode::FunctionCall { name, args } => functions::dispatch(name, ctx, input, args),
        AstNode::Indexer { target, index } => eval_indexer(target, index, ctx, input),
        AstNode::Unary { op, operand } => eval_unary(*op, operand, ctx, input),
        AstNode::Arithmetic { op, lhs, rhs } => eval_arithmetic(*op, lhs, rhs, ctx, input),
        AstNode::Union(lhs, rhs) => eval_union(lhs, rhs, ctx, input),
        AstNode::Equality { op, lhs, rhs } => eval_equality(*op, lhs, rhs, ctx, input),
        AstNode::Comparison { op, lhs, rhs } => eval_comparison(*op, lhs, rhs, ctx, input),
        AstNode::TypeOp { op, operand, type_name } => eval_type_op(*op, operand, type_name, ctx, input),
        AstNode::Membership { op, lhs, rhs } => eval_membership(*op, lhs, rhs, ctx, input),
        AstNode::Boolean { op, lhs, rhs } => eval_boolean(*op, lhs, rhs, ctx, input),
    }
}

fn eval_literal(literal: &Literal) -> Result<TypedValue> {
    Ok(match literal {
        Literal::Boolean(b) => TypedValue::Boolean(*b),
        Literal::Integer(i) => TypedValue::Integer(*i),
        Literal::Decimal(d) => TypedValue::Decimal(*d),
        Literal::String(s) => TypedValue::String(s.clone()),
        Literal::Quantity { value, unit } => TypedValue::Quantity { value: *value, unit: unit.clone() },
        Literal::DateTime(raw) => {
            if let Some(rest) = raw.strip_prefix('T') {
                let time = temporal::parse_time(rest)
                    .ok_or_else(|| Error::TypeError(format!("invalid time literal @{raw}")))?;
                TypedValue::Time(time)
            } else if raw.contains('T') {
                let dt = temporal::parse_datetime(raw)
                    .ok_or_else(|| Error::TypeError(format!("invalid datetime literal @{raw}")))?;
                TypedValue::DateTime(dt)
            } else {
                let date = temporal::parse_date(raw)
                    .ok_or_else(|| Error::TypeError(format!("invalid date literal @{raw}")))?;
                TypedValue::Date(date)
            }
        }
    })
}

fn eval_symbol(symbol: &Symbol, ctx: &EvalContext, input: &[TypedValue]) -> Result<Vec<TypedValue>> {
    match symbol {
        Symbol::This => Ok(match &ctx.this {
            Some(this) => vec![(**this).clone()],
            None => input.to_vec(),
        }),
        Symbol::Index => Ok(ctx.index.map(|i| vec![TypedValue::Integer(i as i64)]).unwrap_or_default()),
        Symbol::Total => Ok(ctx.total.as_ref().map(|v| vec![(**v).clone()]).unwrap_or_default()),
        Symbol::Variable(name) => ctx
            .get_variable(name)
            .map(|v| vec![(*v).clone()])
            .ok_or_else(|| Error::UndefinedVariable(name.clone())),
        Symbol::Name(name) => navigate(input, name, ctx.strict),
    }
}

pub(crate) fn navigate(input: &[TypedValue], name: &str, strict: bool) -> Result<Vec<TypedValue>> {
    let mut out = Vec::new();
    for element in input {
        if let TypedValue::Quantity { value, unit } = element {
            match name {
                "value" => out.push(TypedValue::Decimal(*value)),
                "unit" | "code" => out.extend(unit.clone().map(TypedValue::String)),
                _ => {}
            }
            continue;
        }
        let Some(fields) = element.as_object() else {
            if strict {
                return Err(Error::TypeError(format!("cannot navigate '{name}' on a {}", element.type_name())));
            }
            continue;
        };
        if let Some(value) = fields.get(name) {
            push_json_flattened(value, None, &mut out);
            continue;
        }
        for (key, value) in fields.iter() {
            if key.starts_with('_') {
                continue;
            }
            if let Some(suffix) = key.strip_prefix(name) {
                if !suffix.is_empty() && suffix.chars().next().is_some_and(|c| c.is_ascii_uppercase()) {
                    push_json_flattened(value, Some(suffix), &mut out);
                    break;
                }
            }
        }
    }
    Ok(out)
}

/// FHIR's `Quantity`-family complex types (`Age`, `Count`, `Distance`,
/// `Duration`, `Money`, `SimpleQuantity`) share Quantity's `{value, unit}`
/// shape and are represented the same way here.
const QUANTITY_LIKE_TYPES: &[&str] = &["Quantity", "Age", "Count", "Distance", "Duration", "Money", "SimpleQuantity"];

fn quantity_from_json(obj: &serde_json::Map<String, Json>) -> Option<TypedValue> {
    let value = obj.get("value").and_then(Json::as_f64).and_then(Decimal::from_f64_retain)?;
    let unit = obj.get("unit").or_else(|| obj.get("code")).and_then(Json::as_str).map(str::to_string);
    Some(TypedValue::Quantity { value, unit })
}

/// Converts a JSON value to a `TypedValue`, flattening arrays. When `type_hint`
/// names a choice-type suffix (the part of `valueQuantity` after `value`) that
/// is one of FHIR's Quantity-shaped types, the object is tagged as a proper
/// `TypedValue::Quantity` rather than a generic `BackboneElement`.
fn push_json_flattened(value: &Json, type_hint: Option<&str>, out: &mut Vec<TypedValue>) {
    let convert = |item: &Json| -> Option<TypedValue> {
        if let (Some(hint), Json::Object(obj)) = (type_hint, item) {
            if QUANTITY_LIKE_TYPES.iter().any(|t| t.eq_ignore_ascii_case(hint)) {
                if let Some(quantity) = quantity_from_json(obj) {
                    return Some(quantity);
                }
            }
        }
        Some(TypedValue::from_json(item))
    };
    match value {
        Json::Array(items) => {
            for item in items {
                if !item.is_null() {
                    if let Some(v) = convert(item) {
                        out.push(v);
                    }
                }
            }
        }
        Json::Null => {}
        other => {
            if let Some(v) = convert(other) {
                out.push(v);
            }
        }
    }
}

fn eval_indexer(target: &AstNode, index: &AstNode, ctx: &EvalContext, input: &[TypedValue]) -> Result<Vec<TypedValue>> {
    let target_vals = eval_node(target, ctx, input)?;
    let index_vals = eval_node(index, ctx, input)?;
    let [TypedValue::Integer(i)] = index_vals.as_slice() else {
        return Ok(vec![]);
    };
    match usize::try_from(*i).ok().and_then(|i| target_vals.get(i).cloned()) {
        Some(v) => Ok(vec![v]),
        None => Ok(vec![]),
    }
}

fn eval_unary(op: UnaryOp, operand: &AstNode, ctx: &EvalContext, input: &[TypedValue]) -> Result<Vec<TypedValue>> {
    let vals = eval_node(operand, ctx, input)?;
    let [value] = vals.as_slice() else { return Ok(vec![]) };
    let negated = match (op, value) {
        (UnaryOp::Plus, v) => v.clone(),
        (UnaryOp::Minus, TypedValue::Integer(i)) => TypedValue::Integer(-i),
        (UnaryOp::Minus, TypedValue::Decimal(d)) => TypedValue::Decimal(-d),
        (UnaryOp::Minus, TypedValue::Quantity { value, unit }) => {
            TypedValue::Quantity { value: -value, unit: unit.clone() }
        }
        _ => return Err(Error::TypeError("unary +/- requires a numeric operand".into())),
    };
    Ok(vec![negated])
}

fn eval_arithmetic(
    op: ArithmeticOp,
    lhs: &AstNode,
    rhs: &AstNode,
    ctx: &EvalContext,
    input: &[TypedValue],
) -> Result<Vec<TypedValue>> {
    let lhs_vals = eval_node(lhs, ctx, input)?;
    let rhs_vals = eval_node(rhs, ctx, input)?;

    if op == ArithmeticOp::Concat {
        if lhs_vals.len() > 1 || rhs_vals.len() > 1 {
            return Ok(vec![]);
        }
        let l = lhs_vals.first().and_then(TypedValue::to_fhirpath_string).unwrap_or_default();
        let r = rhs_vals.first().and_then(TypedValue::to_fhirpath_string).unwrap_or_default();
        return Ok(vec![TypedValue::String(l + &r)]);
    }

    let ([l], [r]) = (lhs_vals.as_slice(), rhs_vals.as_slice()) else {
        return Ok(vec![]);
    };

    if op == ArithmeticOp::Add {
        if let (TypedValue::String(a), TypedValue::String(b)) = (l, r) {
            return Ok(vec![TypedValue::String(format!("{a}{b}"))]);
        }
    }

    if let (TypedValue::Quantity { value: v1, unit: u1 }, TypedValue::Quantity { value: v2, unit: u2 }) = (l, r) {
        if u1 != u2 && matches!(op, ArithmeticOp::Add | ArithmeticOp::Sub) {
            return Err(Error::TypeError("quantity units must match for + and -".into()));
        }
        let value = apply_numeric_op(op, *v1, *v2)?;
        return Ok(match value {
            Some(v) => vec![TypedValue::Quantity { value: v, unit: u1.clone() }],
            None => vec![],
        });
    }
    if let TypedValue::Quantity { value: v1, unit } = l {
        if let Some(v2) = r.as_decimal() {
            let value = apply_numeric_op(op, *v1, v2)?;
            return Ok(match value {
                Some(v) => vec![TypedValue::Quantity { value: v, unit: unit.clone() }],
                None => vec![],
            });
        }
    }

    let (Some(a), Some(b)) = (l.as_decimal(), r.as_decimal()) else {
        return Err(Error::TypeError(format!("arithmetic requires numeric operands, got {} and {}", l.type_name(), r.type_name())));
    };
    let both_integer = matches!((l, r), (TypedValue::Integer(_), TypedValue::Integer(_)));
    let Some(result) = apply_numeric_op(op, a, b)? else {
        return Ok(vec![]);
    };
    if both_integer && matches!(op, ArithmeticOp::Add | ArithmeticOp::Sub | ArithmeticOp::Mul | ArithmeticOp::IntDiv | ArithmeticOp::Mod) {
        let as_int = result.to_i64().ok_or_else(|| Error::TypeError("integer overflow".into()))?;
        Ok(vec![TypedValue::Integer(as_int)])
    } else {
        Ok(vec![TypedValue::Decimal(result)])
    }
}

/// Returns `None` for division/modulo by zero, which FHIRPath treats as an
/// empty result rather than an error.
fn apply_numeric_op(op: ArithmeticOp, a: Decimal, b: Decimal) -> Result<Option<Decimal>> {
    Ok(match op {
        ArithmeticOp::Add => Some(a + b),
        ArithmeticOp::Sub => Some(a - b),
        ArithmeticOp::Mul => Some(a * b),
        ArithmeticOp::Div => {
            if b.is_zero() {
                None
            } else {
                Some(a / b)
            }
        }
        ArithmeticOp::IntDiv => {
            if b.is_zero() {
                None
            } else {
                Some((a / b).trunc())
            }
        }
        ArithmeticOp::Mod => {
            if b.is_zero() {
                None
            } else {
                Some(a % b)
            }
        }
        ArithmeticOp::Concat => unreachable!("handled by caller"),
    })
}

fn eval_union(lhs: &AstNode, rhs: &AstNode, ctx: &EvalContext, input: &[TypedValue]) -> Result<Vec<TypedValue>> {
    let mut result = eval_node(lhs, ctx, input)?;
    for candidate in eval_node(rhs, ctx, input)? {
        if !result.iter().any(|existing| equals(existing, &candidate) == Some(true)) {
            result.push(candidate);
        }
    }
    Ok(result)
}

fn eval_equality(
    op: EqualityOp,
    lhs: &AstNode,
    rhs: &AstNode,
    ctx: &EvalContext,
    input: &[TypedValue],
) -> Result<Vec<TypedValue>> {
    let lhs_vals = eval_node(lhs, ctx, input)?;
    let rhs_vals = eval_node(rhs, ctx, input)?;

    match op {
        EqualityOp::Equivalent | EqualityOp::NotEquivalent => {
            let eq = lhs_vals.len() == rhs_vals.len()
                && lhs_vals.iter().zip(&rhs_vals).all(|(a, b)| equivalent(a, b));
            let result = if op == EqualityOp::Equivalent { eq } else { !eq };
            Ok(vec![TypedValue::Boolean(result)])
        }
        EqualityOp::Equal | EqualityOp::NotEqual => {
            if lhs_vals.is_empty() || rhs_vals.is_empty() {
                return Ok(vec![]);
            }
            if lhs_vals.len() != rhs_vals.len() {
                let unequal = op == EqualityOp::NotEqual;
                return Ok(vec![TypedValue::Boolean(unequal)]);
            }
            let mut all_equal = true;
            for (a, b) in lhs_vals.iter().zip(&rhs_vals) {
                match equals(a, b) {
                    Some(true) => {}
                    Some(false) => {
                        all_equal = false;
                        break;
                    }
                    None => return Ok(vec![]),
                }
            }
            let result = if op == EqualityOp::Equal { all_equal } else { !all_equal };
            Ok(vec![TypedValue::Boolean(result)])
        }
    }
}

fn eval_comparison(
    op: ComparisonOp,
    lhs: &AstNode,
    rhs: &AstNode,
    ctx: &EvalContext,
    input: &[TypedValue],
) -> Result<Vec<TypedValue>> {
    let lhs_vals = eval_node(lhs, ctx, input)?;
    let rhs_vals = eval_node(rhs, ctx, input)?;
    let ([l], [r]) = (lhs_vals.as_slice(), rhs_vals.as_slice()) else {
        return Ok(vec![]);
    };
    let Some(ordering) = compare(l, r) else {
        return Ok(vec![]);
    };
    let result = match op {
        ComparisonOp::Lt => ordering == Ordering::Less,
        ComparisonOp::LtEq => ordering != Ordering::Greater,
        ComparisonOp::Gt => ordering == Ordering::Greater,
        ComparisonOp::GtEq => ordering != Ordering::Less,
    };
    Ok(vec![TypedValue::Boolean(result)])
}

fn eval_type_op(
    op: TypeOp,
    operand: &AstNode,
    type_name: &str,
    ctx: &EvalContext,
    input: &[TypedValue],
) -> Result<Vec<TypedValue>> {
    let vals = eval_node(operand, ctx, input)?;
    if vals.is_empty() {
        return Ok(vec![]);
    }
    if vals.len() > 1 {
        return Err(Error::TypeError(format!("'{}' requires a singleton input", if op == TypeOp::Is { "is" } else { "as" })));
    }
    let value = &vals[0];
    let matches = matches_type(value, type_name);
    Ok(match op {
        TypeOp::Is => vec![TypedValue::Boolean(matches)],
        TypeOp::As => {
            if matches {
                vec![value.clone()]
            } else {
                vec![]
            }
        }
    })
}

/// Strip a `System.`/`FHIR.` namespace prefix and compare case-insensitively
/// against the value's tag, with a value-shape fallback for temporal types.
pub(crate) fn matches_type(value: &TypedValue, type_name: &str) -> bool {
    let bare = type_name.strip_prefix("System.").or_else(|| type_name.strip_prefix("FHIR.")).unwrap_or(type_name);
    if let TypedValue::Resource { type_name: Some(rt), .. } = value {
        if rt.eq_ignore_ascii_case(bare) {
            return true;
        }
    }
    if value.type_name().eq_ignore_ascii_case(bare) {
        return true;
    }
    if let TypedValue::String(s) = value {
        return match bare {
            "Date" => temporal::parse_date(s).is_some() && !s.contains(['T', ':']),
            "DateTime" => temporal::parse_datetime(s).is_some(),
            "Time" => temporal::parse_time(s).is_some(),
            _ => false,
        };
    }
    false
}

fn eval_membership(
    op: MembershipOp,
    lhs: &AstNode,
    rhs: &AstNode,
    ctx: &EvalContext,
    input: &[TypedValue],
) -> Result<Vec<TypedValue>> {
    let lhs_vals = eval_node(lhs, ctx, input)?;
    let rhs_vals = eval_node(rhs, ctx, input)?;
    let (needle, haystack) = match op {
        MembershipOp::In => (&lhs_vals, &rhs_vals),
        MembershipOp::Contains => (&rhs_vals, &lhs_vals),
    };
    if needle.is_empty() {
        return Ok(vec![]);
    }
    if needle.len() > 1 {
        return Err(Error::TypeError("'in'/'contains' requires a singleton operand".into()));
    }
    let found = haystack.iter().any(|item| equals(item, &needle[0]) == Some(true));
    Ok(vec![TypedValue::Boolean(found)])
}

fn single_bool(vals: &[TypedValue]) -> Result<Option<bool>> {
    match vals {
        [] => Ok(None),
        [TypedValue::Boolean(b)] => Ok(Some(*b)),
        [other] => Err(Error::TypeError(format!("expected a boolean, got {}", other.type_name()))),
        _ => Err(Error::TypeError("boolean operators require a singleton operand".into())),
    }
}

fn eval_boolean(
    op: BooleanOp,
    lhs: &AstNode,
    rhs: &AstNode,
    ctx: &EvalContext,
    input: &[TypedValue],
) -> Result<Vec<TypedValue>> {
    let l = single_bool(&eval_node(lhs, ctx, input)?)?;
    let r = single_bool(&eval_node(rhs, ctx, input)?)?;
    let result = match op {
        BooleanOp::And => match (l, r) {
            (Some(false), _) | (_, Some(false)) => Some(false),
            (Some(true), Some(true)) => Some(true),
            _ => None,
        },
        BooleanOp::Or => match (l, r) {
            (Some(true), _) | (_, Some(true)) => Some(true),
            (Some(false), Some(false)) => Some(false),
            _ => None,
        },
        BooleanOp::Xor => match (l, r) {
            (Some(a), Some(b)) => Some(a != b),
            _ => None,
        },
        BooleanOp::Implies => match (l, r) {
            (Some(false), _) => Some(true),
            (_, Some(true)) => Some(true),
            (Some(true), Some(false)) => Some(false),
            _ => None,
        },
    };
    Ok(result.map(|b| vec![TypedValue::Boolean(b)]).unwrap_or_default())
}

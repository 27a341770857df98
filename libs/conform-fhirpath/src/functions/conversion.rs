//! Conversion functions (FHIRPath §5.6): the `toX`/`convertsToX` family plus
//! `iif`. Each `toX` shares its conversion logic with the matching
//! `convertsToX`, which just asks whether that conversion would succeed.

use rust_decimal::Decimal;

use crate::ast::AstNode;
use crate::context::EvalContext;
use crate::error::{Error, Result};
use crate::eval::eval_node;
use crate::temporal;
use crate::value::TypedValue;

use super::require_singleton;

pub(crate) fn iif(ctx: &EvalContext, input: &[TypedValue], args: &[AstNode]) -> Result<Vec<TypedValue>> {
    let criterion = eval_node(&args[0], ctx, input)?;
    let truth = match criterion.as_slice() {
        [] => None,
        [TypedValue::Boolean(b)] => Some(*b),
        _ => return Err(Error::TypeError("iif() criterion must be a boolean or empty".into())),
    };
    match truth {
        Some(true) => eval_node(&args[1], ctx, input),
        _ => match args.get(2) {
            Some(otherwise) => eval_node(otherwise, ctx, input),
            None => Ok(vec![]),
        },
    }
}

fn try_boolean(value: &TypedValue) -> Option<bool> {
    match value {
        TypedValue::Boolean(b) => Some(*b),
        TypedValue::Integer(0) => Some(false),
        TypedValue::Integer(1) => Some(true),
        TypedValue::Decimal(d) if *d == Decimal::ZERO => Some(false),
        TypedValue::Decimal(d) if *d == Decimal::ONE => Some(true),
        TypedValue::String(s) => match s.to_lowercase().trim() {
            "true" | "yes" | "1" | "t" => Some(true),
            "false" | "no" | "0" | "f" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn try_integer(value: &TypedValue) -> Option<i64> {
    use rust_decimal::prelude::ToPrimitive;
    match value {
        TypedValue::Integer(i) => Some(*i),
        TypedValue::Boolean(b) => Some(if *b { 1 } else { 0 }),
        TypedValue::Decimal(d) if d.fract() == Decimal::ZERO => d.to_i64(),
        TypedValue::String(s) => {
            let s = s.trim();
            let digits = s.strip_prefix('-').unwrap_or(s);
            (!digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())).then(|| s.parse().ok()).flatten()
        }
        _ => None,
    }
}

fn try_decimal(value: &TypedValue) -> Option<Decimal> {
    match value {
        TypedValue::Decimal(d) => Some(*d),
        TypedValue::Integer(i) => Some(Decimal::from(*i)),
        TypedValue::Boolean(b) => Some(if *b { Decimal::ONE } else { Decimal::ZERO }),
        TypedValue::String(s) => Decimal::from_str_exact(s.trim()).ok(),
        _ => None,
    }
}

fn try_string(value: &TypedValue) -> Option<String> {
    value.to_fhirpath_string()
}

fn try_date(value: &TypedValue) -> Option<TypedValue> {
    match value {
        TypedValue::Date(_) => Some(value.clone()),
        TypedValue::DateTime(dt) => temporal::parse_date(&dt.raw[..dt.raw.find('T').unwrap_or(dt.raw.len())]),
        TypedValue::String(s) => temporal::parse_date(s),
        _ => None,
    }
    .map(TypedValue::Date)
}

fn try_datetime(value: &TypedValue) -> Option<TypedValue> {
    match value {
        TypedValue::DateTime(_) => Some(value.clone()),
        TypedValue::Date(d) => temporal::parse_datetime(&d.raw).map(TypedValue::DateTime),
        TypedValue::String(s) => temporal::parse_datetime(s).map(TypedValue::DateTime),
        _ => None,
    }
}

fn try_time(value: &TypedValue) -> Option<TypedValue> {
    match value {
        TypedValue::Time(_) => Some(value.clone()),
        TypedValue::String(s) => temporal::parse_time(s).map(TypedValue::Time),
        _ => None,
    }
}

fn try_quantity(value: &TypedValue) -> Option<TypedValue> {
    match value {
        TypedValue::Quantity { .. } => Some(value.clone()),
        TypedValue::Integer(_) | TypedValue::Decimal(_) => {
            try_decimal(value).map(|v| TypedValue::Quantity { value: v, unit: None })
        }
        TypedValue::String(s) => {
            let s = s.trim();
            let (number, unit) = match s.split_once('\'') {
                Some((n, rest)) => (n.trim(), Some(rest.trim_end_matches('\'').to_string())),
                None => {
                    let split_at = s.find(|c: char| c.is_whitespace()).unwrap_or(s.len());
                    let (n, u) = s.split_at(split_at);
                    (n, if u.trim().is_empty() { None } else { Some(u.trim().to_string()) })
                }
            };
            Decimal::from_str_exact(number).ok().map(|value| TypedValue::Quantity { value, unit })
        }
        _ => None,
    }
}

macro_rules! to_fn {
    ($name:ident, $converter:expr, $result:expr) => {
        pub(crate) fn $name(_ctx: &EvalContext, input: &[TypedValue], _args: &[AstNode]) -> Result<Vec<TypedValue>> {
            let Some(value) = require_singleton(input, stringify!($name))? else {
                return Ok(vec![]);
            };
            Ok($converter(value).map($result).into_iter().collect())
        }
    };
}

macro_rules! converts_fn {
    ($name:ident, $converter:expr) => {
        pub(crate) fn $name(_ctx: &EvalContext, input: &[TypedValue], _args: &[AstNode]) -> Result<Vec<TypedValue>> {
            let Some(value) = require_singleton(input, stringify!($name))? else {
                return Ok(vec![]);
            };
            Ok(vec![TypedValue::Boolean($converter(value).is_some())])
        }
    };
}

to_fn!(to_boolean, try_boolean, TypedValue::Boolean);
converts_fn!(converts_to_boolean, try_boolean);
to_fn!(to_integer, try_integer, TypedValue::Integer);
converts_fn!(converts_to_integer, try_integer);
to_fn!(to_decimal, try_decimal, TypedValue::Decimal);
converts_fn!(converts_to_decimal, try_decimal);
to_fn!(to_string_fn, try_string, TypedValue::String);
converts_fn!(converts_to_string, try_string);
to_fn!(to_date, try_date, std::convert::identity);
converts_fn!(converts_to_date, try_date);
to_fn!(to_datetime, try_datetime, std::convert::identity);
converts_fn!(converts_to_datetime, try_datetime);
to_fn!(to_time, try_time, std::convert::identity);
converts_fn!(converts_to_time, try_time);
to_fn!(to_quantity, try_quantity, std::convert::identity);
converts_fn!(converts_to_quantity, try_quantity);

//! The standard function library. Every function takes the unevaluated
//! argument [`AstNode`]s rather than pre-evaluated collections, so criteria
//! functions (`where`, `select`, `repeat`, `all`, `any`) can bind `$this` to
//! each input element themselves before evaluating their lambda argument.
//!
//! Dispatch is a name-keyed [`phf::Map`] built at compile time: no mutable
//! global registry, no numeric function IDs.

mod combining;
mod conversion;
mod existence;
mod fhir;
mod filtering;
mod math;
mod navigation;
mod string;
mod subsetting;
mod typeops;
mod utility;

use phf::phf_map;

use crate::ast::AstNode;
use crate::context::EvalContext;
use crate::error::{Error, Result};
use crate::eval::eval_node;
use crate::value::TypedValue;

pub(crate) type FunctionImpl = fn(&EvalContext, &[TypedValue], &[AstNode]) -> Result<Vec<TypedValue>>;

/// Evaluate the `i`th argument atom against the *current* input and context,
/// so it sees the outer `$this` rather than the collection produced so far.
pub(crate) fn eval_arg(ctx: &EvalContext, input: &[TypedValue], args: &[AstNode], i: usize) -> Result<Vec<TypedValue>> {
    eval_node(&args[i], ctx, input)
}

pub(crate) fn require_singleton(values: &[TypedValue], what: &str) -> Result<Option<&TypedValue>> {
    match values {
        [] => Ok(None),
        [v] => Ok(Some(v)),
        _ => Err(Error::InvalidArgument(format!("{what} requires a singleton collection"))),
    }
}

static FUNCTIONS: phf::Map<&'static str, FunctionImpl> = phf_map! {
    // Negation / boolean logic
    "not" => existence::not,

    // Existence (§5.1)
    "empty" => existence::empty,
    "exists" => existence::exists,
    "allTrue" => existence::all_true,
    "anyTrue" => existence::any_true,
    "allFalse" => existence::all_false,
    "anyFalse" => existence::any_false,
    "subsetOf" => existence::subset_of,
    "supersetOf" => existence::superset_of,
    "count" => existence::count,
    "distinct" => existence::distinct,
    "isDistinct" => existence::is_distinct,

    // Filtering (§5.2)
    "where" => filtering::where_fn,
    "select" => filtering::select_fn,
    "all" => filtering::all_fn,
    "repeat" => filtering::repeat_fn,
    "ofType" => filtering::of_type,

    // Subsetting (§5.3)
    "single" => subsetting::single,
    "first" => subsetting::first,
    "last" => subsetting::last,
    "tail" => subsetting::tail,
    "skip" => subsetting::skip,
    "take" => subsetting::take,
    "intersect" => subsetting::intersect,
    "exclude" => subsetting::exclude,

    // Combining (§5.4)
    "union" => combining::union_fn,
    "combine" => combining::combine,

    // Conversion (§5.6)
    "iif" => conversion::iif,
    "toBoolean" => conversion::to_boolean,
    "convertsToBoolean" => conversion::converts_to_boolean,
    "toInteger" => conversion::to_integer,
    "convertsToInteger" => conversion::converts_to_integer,
    "toDecimal" => conversion::to_decimal,
    "convertsToDecimal" => conversion::converts_to_decimal,
    "toString" => conversion::to_string_fn,
    "convertsToString" => conversion::converts_to_string,
    "toDate" => conversion::to_date,
    "convertsToDate" => conversion::converts_to_date,
    "toDateTime" => conversion::to_datetime,
    "convertsToDateTime" => conversion::converts_to_datetime,
    "toTime" => conversion::to_time,
    "convertsToTime" => conversion::converts_to_time,
    "toQuantity" => conversion::to_quantity,
    "convertsToQuantity" => conversion::converts_to_quantity,

    // String (§5.7)
    "indexOf" => string::index_of,
    "substring" => string::substring,
    "startsWith" => string::starts_with,
    "endsWith" => string::ends_with,
    "contains" => string::contains_fn,
    "upper" => string::upper,
    "lower" => string::lower,
    "replace" => string::replace,
    "matches" => string::matches,
    "replaceMatches" => string::replace_matches,
    "length" => string::length,
    "toChars" => string::to_chars,
    "join" => string::join,

    // Math (§5.8)
    "abs" => math::abs,
    "ceiling" => math::ceiling,
    "floor" => math::floor,
    "exp" => math::exp,
    "ln" => math::ln,
    "log" => math::log,
    "power" => math::power,
    "round" => math::round,
    "sqrt" => math::sqrt,
    "truncate" => math::truncate,

    // Tree navigation (§5.5 / §6.4)
    "children" => navigation::children,
    "descendants" => navigation::descendants,

    // Utility (§6.5)
    "trace" => utility::trace,
    "now" => utility::now,
    "today" => utility::today,
    "timeOfDay" => utility::time_of_day,

    // Types (§6.3) and FHIR-specific (§6)
    "type" => typeops::type_fn,
    "conformsTo" => typeops::conforms_to,
    "resolve" => fhir::resolve,
    "extension" => fhir::extension,
    "hasValue" => fhir::has_value,
    "htmlChecks" => fhir::html_checks,
};

pub fn dispatch(name: &str, ctx: &EvalContext, input: &[TypedValue], args: &[AstNode]) -> Result<Vec<TypedValue>> {
    match FUNCTIONS.get(name) {
        Some(f) => f(ctx, input, args),
        None => Err(Error::FunctionNotFound(name.to_string())),
    }
}

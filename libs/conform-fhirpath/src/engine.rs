//! The public entry point: parses (through the expression cache) and
//! evaluates FHIRPath expressions against a JSON resource.

use std::num::NonZeroUsize;
use std::sync::Arc;

use conform_context::FhirContext;
use serde_json::Value as Json;

use crate::ast::AstNode;
use crate::cache::ExpressionCache;
use crate::context::EvalContext;
use crate::error::{Error, Result};
use crate::eval::eval_root;
use crate::value::TypedValue;

pub struct FhirPathEngine {
    cache: ExpressionCache,
    fhir_context: Option<Arc<dyn FhirContext>>,
}

impl FhirPathEngine {
    pub fn new(cache_capacity: NonZeroUsize) -> Self {
        Self { cache: ExpressionCache::new(cache_capacity), fhir_context: None }
    }

    pub fn with_fhir_context(mut self, fhir_context: Arc<dyn FhirContext>) -> Self {
        self.fhir_context = Some(fhir_context);
        self
    }

    /// Parse `source` (served from the expression cache) without evaluating it.
    pub fn parse(&self, source: &str) -> Result<Arc<AstNode>> {
        self.cache.get_or_parse(source).map_err(|e| e.with_source(source))
    }

    fn base_context(&self, resource: &Json) -> EvalContext {
        let mut ctx = EvalContext::new(TypedValue::from_json(resource));
        if let Some(fhir_context) = &self.fhir_context {
            ctx = ctx.with_fhir_context(fhir_context.clone());
        }
        ctx
    }

    /// Evaluate `source` against `resource`, returning the raw result collection.
    pub fn eval(&self, source: &str, resource: &Json) -> Result<Vec<TypedValue>> {
        let ast = self.parse(source)?;
        let ctx = self.base_context(resource);
        let root = vec![(*ctx.resource).clone()];
        eval_root(&ast, &ctx, &root).map_err(|e| e.with_source(source))
    }

    /// Evaluate `source`, seeding additional `%variable` bindings beyond the
    /// standard `%resource`/`%context`/`%rootResource`.
    pub fn eval_with_variables(&self, source: &str, resource: &Json, variables: &[(&str, TypedValue)]) -> Result<Vec<TypedValue>> {
        let ast = self.parse(source)?;
        let mut ctx = self.base_context(resource);
        for (name, value) in variables {
            ctx.set_variable(*name, value.clone());
        }
        let root = vec![(*ctx.resource).clone()];
        eval_root(&ast, &ctx, &root).map_err(|e| e.with_source(source))
    }

    /// Evaluate `source` and require a single boolean result — the common
    /// shape for invariant/constraint expressions.
    pub fn eval_boolean(&self, source: &str, resource: &Json) -> Result<bool> {
        let result = self.eval(source, resource)?;
        match result.as_slice() {
            [TypedValue::Boolean(b)] => Ok(*b),
            [] => Ok(false),
            _ => Err(Error::TypeError(format!("expected '{source}' to evaluate to a single boolean"))),
        }
    }

    /// Evaluate `source` and render the single result (if any) as a string.
    pub fn eval_string(&self, source: &str, resource: &Json) -> Result<Option<String>> {
        let result = self.eval(source, resource)?;
        match result.as_slice() {
            [] => Ok(None),
            [single] => Ok(single.to_fhirpath_string()),
            _ => Err(Error::TypeError(format!("expected '{source}' to evaluate to a single value"))),
        }
    }
}

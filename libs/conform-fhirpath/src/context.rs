//! Evaluation context: `$this`, `$index`, external constants (`%resource`,
//! `%context`, `%var`), and the strict-navigation toggle.

use std::collections::HashMap;
use std::sync::Arc;

use conform_context::FhirContext;

use crate::value::TypedValue;

#[derive(Clone)]
pub struct EvalContext {
    pub this: Option<Arc<TypedValue>>,
    pub index: Option<usize>,
    pub total: Option<Arc<TypedValue>>,
    pub strict: bool,
    pub variables: Arc<HashMap<Arc<str>, Arc<TypedValue>>>,
    pub resource: Arc<TypedValue>,
    pub root: Arc<TypedValue>,
    /// The conformance registry backing `conformsTo()` and `resolve()`, when one is wired up.
    pub fhir_context: Option<Arc<dyn FhirContext>>,
}

impl EvalContext {
    pub fn new(resource: TypedValue) -> Self {
        let resource = Arc::new(resource);
        Self::with_root(resource.clone(), resource)
    }

    pub fn with_root(resource: Arc<TypedValue>, root: Arc<TypedValue>) -> Self {
        let mut variables: HashMap<Arc<str>, Arc<TypedValue>> = HashMap::new();
        variables.insert(Arc::from("resource"), resource.clone());
        variables.insert(Arc::from("context"), resource.clone());
        variables.insert(Arc::from("rootResource"), root.clone());
        Self {
            this: None,
            index: None,
            total: None,
            strict: false,
            variables: Arc::new(variables),
            resource,
            root,
            fhir_context: None,
        }
    }

    pub fn with_fhir_context(mut self, fhir_context: Arc<dyn FhirContext>) -> Self {
        self.fhir_context = Some(fhir_context);
        self
    }

    pub fn with_strict_semantics(mut self) -> Self {
        self.strict = true;
        self
    }

    pub fn push_this(&self, this: TypedValue) -> Self {
        let mut ctx = self.clone();
        ctx.this = Some(Arc::new(this));
        ctx
    }

    pub fn push_iteration(&self, this: TypedValue, index: usize) -> Self {
        let mut ctx = self.push_this(this);
        ctx.index = Some(index);
        ctx
    }

    pub fn get_variable(&self, name: &str) -> Option<Arc<TypedValue>> {
        self.variables.get(name).cloned()
    }

    pub fn set_variable(&mut self, name: impl Into<Arc<str>>, value: TypedValue) {
        Arc::make_mut(&mut self.variables).insert(name.into(), Arc::new(value));
    }
}

//! Template-callable helpers shared by every render.
//!
//! The registry is the union of a core set, usable by any template, and the
//! helper sets of implemented backends. It is built once, never mutated
//! afterwards, and installed into a fresh [`Tera`] instance per render, so
//! concurrent renders only ever read it.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use once_cell::sync::Lazy;
use tera::{Tera, Value};

use crate::generation::backend::octopus;
use crate::generation::utils::{
    lower_first, sanitize_ident, to_camel_case, to_pascal_case, to_snake_case, upper_first,
};

/// Filter signature as seen by templates: `{{ value | name(arg=...) }}`
pub type FilterFn = Arc<dyn Fn(&Value, &HashMap<String, Value>) -> tera::Result<Value> + Send + Sync>;

/// Function signature as seen by templates: `{{ name(arg=...) }}`
pub type FunctionFn = Arc<dyn Fn(&HashMap<String, Value>) -> tera::Result<Value> + Send + Sync>;

/// A named group of filters and functions
#[derive(Clone, Default)]
pub struct FunctionSet {
    filters: BTreeMap<&'static str, FilterFn>,
    functions: BTreeMap<&'static str, FunctionFn>,
}

impl FunctionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter<F>(mut self, name: &'static str, f: F) -> Self
    where
        F: Fn(&Value, &HashMap<String, Value>) -> tera::Result<Value> + Send + Sync + 'static,
    {
        self.filters.insert(name, Arc::new(f));
        self
    }

    pub fn function<F>(mut self, name: &'static str, f: F) -> Self
    where
        F: Fn(&HashMap<String, Value>) -> tera::Result<Value> + Send + Sync + 'static,
    {
        self.functions.insert(name, Arc::new(f));
        self
    }

    fn merge(&mut self, other: FunctionSet) {
        self.filters.extend(other.filters);
        self.functions.extend(other.functions);
    }
}

/// Read-only set of every helper available to templates
pub struct FunctionRegistry {
    helpers: FunctionSet,
}

static STANDARD: Lazy<FunctionRegistry> = Lazy::new(|| {
    FunctionRegistry::from_sets([core_functions(), octopus::template_functions()])
});

impl FunctionRegistry {
    /// The process-wide registry: core helpers plus every backend's helpers.
    pub fn standard() -> &'static FunctionRegistry {
        &STANDARD
    }

    /// Build a registry from several sets. Later sets win on name clashes.
    pub fn from_sets(sets: impl IntoIterator<Item = FunctionSet>) -> Self {
        let mut helpers = FunctionSet::new();
        for set in sets {
            helpers.merge(set);
        }
        Self { helpers }
    }

    pub fn has_filter(&self, name: &str) -> bool {
        self.helpers.filters.contains_key(name)
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.helpers.functions.contains_key(name)
    }

    pub fn filter_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.helpers.filters.keys().copied()
    }

    pub fn function_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.helpers.functions.keys().copied()
    }

    /// Register every helper on a Tera instance.
    pub fn install(&self, tera: &mut Tera) {
        for (name, filter) in &self.helpers.filters {
            let filter = Arc::clone(filter);
            tera.register_filter(
                name,
                move |value: &Value, args: &HashMap<String, Value>| filter(value, args),
            );
        }
        for (name, function) in &self.helpers.functions {
            let function = Arc::clone(function);
            tera.register_function(name, move |args: &HashMap<String, Value>| function(args));
        }
    }
}

/// Helpers every template may use regardless of backend
pub fn core_functions() -> FunctionSet {
    FunctionSet::new()
        .filter("snake_case", string_filter("snake_case", to_snake_case))
        .filter("pascal_case", string_filter("pascal_case", to_pascal_case))
        .filter("camel_case", string_filter("camel_case", to_camel_case))
        .filter("lower_first", string_filter("lower_first", lower_first))
        .filter("upper_first", string_filter("upper_first", upper_first))
        .filter("ident", string_filter("ident", sanitize_ident))
        .filter("quote", string_filter("quote", |s| format!("{s:?}")))
        .function("package_path", |args| {
            let name = str_arg(args, "name", "package_path")?;
            Ok(Value::String(format!("crate::{}", sanitize_ident(name))))
        })
}

/// Wrap a string transformation as a filter over string values.
pub fn string_filter(
    filter_name: &'static str,
    f: impl Fn(&str) -> String + Send + Sync + 'static,
) -> impl Fn(&Value, &HashMap<String, Value>) -> tera::Result<Value> + Send + Sync + 'static {
    move |value: &Value, _args: &HashMap<String, Value>| {
        let s = value
            .as_str()
            .ok_or_else(|| tera::Error::msg(format!("filter `{filter_name}` expects a string")))?;
        Ok(Value::String(f(s)))
    }
}

/// Fetch a required string argument of a template function.
pub fn str_arg<'a>(
    args: &'a HashMap<String, Value>,
    key: &str,
    function_name: &str,
) -> tera::Result<&'a str> {
    match args.get(key) {
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(tera::Error::msg(format!(
            "function `{function_name}`: argument `{key}` must be a string"
        ))),
        None => Err(tera::Error::msg(format!(
            "function `{function_name}`: missing argument `{key}`"
        ))),
    }
}

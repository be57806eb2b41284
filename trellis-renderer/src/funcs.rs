//! Function table shared by every template in a composition.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use tera::{Tera, Value};

/// A callable exposed to templates as `{{ name(arg=value) }}`.
pub type HelperFn = Arc<dyn Fn(&HashMap<String, Value>) -> tera::Result<Value> + Send + Sync>;

/// A callable exposed to templates as `{{ value | name(arg=value) }}`.
pub type FilterFn =
    Arc<dyn Fn(&Value, &HashMap<String, Value>) -> tera::Result<Value> + Send + Sync>;

/// Named helpers registered on every parsed template. Registering a name
/// twice replaces the earlier callable.
#[derive(Clone, Default)]
pub struct FuncSet {
    functions: BTreeMap<String, HelperFn>,
    filters: BTreeMap<String, FilterFn>,
}

impl FuncSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_function<F>(&mut self, name: impl Into<String>, function: F)
    where
        F: Fn(&HashMap<String, Value>) -> tera::Result<Value> + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Arc::new(function));
    }

    pub fn add_filter<F>(&mut self, name: impl Into<String>, filter: F)
    where
        F: Fn(&Value, &HashMap<String, Value>) -> tera::Result<Value> + Send + Sync + 'static,
    {
        self.filters.insert(name.into(), Arc::new(filter));
    }

    /// Fold `other` in; its entries win on name collisions.
    pub fn merge(&mut self, other: &FuncSet) {
        for (name, f) in &other.functions {
            self.functions.insert(name.clone(), Arc::clone(f));
        }
        for (name, f) in &other.filters {
            self.filters.insert(name.clone(), Arc::clone(f));
        }
    }

    pub fn function_names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    pub fn filter_names(&self) -> impl Iterator<Item = &str> {
        self.filters.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty() && self.filters.is_empty()
    }

    pub(crate) fn register(&self, tera: &mut Tera) {
        for (name, f) in &self.functions {
            let f = Arc::clone(f);
            tera.register_function(name, move |args: &HashMap<String, Value>| f(args));
        }
        for (name, f) in &self.filters {
            let f = Arc::clone(f);
            tera.register_filter(name, move |value: &Value, args: &HashMap<String, Value>| {
                f(value, args)
            });
        }
    }
}

impl fmt::Debug for FuncSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FuncSet")
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .field("filters", &self.filters.keys().collect::<Vec<_>>())
            .finish()
    }
}

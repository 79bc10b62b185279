use std::collections::HashMap;

use crate::runtime::value::Value;

/// The shared mutable namespace that `e` and `x` command payloads run in.
///
/// Pre-populated by the session with the builtins the marshaler and the
/// callback machinery need to be reachable from evaluated text.
#[derive(Debug, Default)]
pub struct Env {
    bindings: HashMap<String, Value>,
}

impl Env {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.bindings.get(name).cloned()
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }

    pub fn delete(&mut self, name: &str) -> bool {
        self.bindings.remove(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }
}

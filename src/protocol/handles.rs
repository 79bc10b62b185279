use std::collections::HashMap;

use crate::runtime::value::Value;

/// Opaque reference to a guest value held on behalf of the host.
pub type Handle = u64;

/// Store for guest values the host can only name by handle.
///
/// Handles come from a monotonically increasing counter and are never
/// reused, so a stale handle can only miss, not alias a newer value.
#[derive(Debug, Default)]
pub struct HandleTable {
    next: Handle,
    entries: HashMap<Handle, Value>,
}

impl HandleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value and return its freshly allocated handle.
    pub fn allocate(&mut self, value: Value) -> Handle {
        let handle = self.next;
        self.next += 1;
        self.entries.insert(handle, value);
        handle
    }

    /// Release an entry. Releasing an unknown handle is an error the
    /// caller reports to the host; it must never tear the loop down.
    pub fn release(&mut self, handle: Handle) -> Result<(), String> {
        match self.entries.remove(&handle) {
            Some(_) => Ok(()),
            None => Err(format!("no object with handle {}", handle)),
        }
    }

    pub fn lookup(&self, handle: Handle) -> Option<&Value> {
        self.entries.get(&handle)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

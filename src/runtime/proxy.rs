use std::fmt;

use crate::protocol::channel::{self, SharedWriter};
use crate::runtime::value::Value;

/// Guest-side stand-in for a host callable, identified by a host handle.
///
/// Dropping the last clone writes the `d` delete message through the
/// shared outbound writer, so the host can release its table entry as
/// soon as the guest stops referencing the callable.
pub struct CallbackObject {
    pub handle: u64,
    pub writer: SharedWriter,
}

impl CallbackObject {
    pub fn new(handle: u64, writer: SharedWriter) -> Self {
        Self { handle, writer }
    }
}

impl Drop for CallbackObject {
    fn drop(&mut self) {
        channel::send_delete(&self.writer, self.handle);
    }
}

impl fmt::Debug for CallbackObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CallbackObject(handle={})", self.handle)
    }
}

impl PartialEq for CallbackObject {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

/// Guest-side stand-in for a host value that could not be decoded.
///
/// `type_label` is display-only; every operation goes through the handle.
pub struct ForeignObject {
    pub type_label: String,
    pub handle: u64,
    pub writer: SharedWriter,
}

impl ForeignObject {
    pub fn new(type_label: impl Into<String>, handle: u64, writer: SharedWriter) -> Self {
        Self {
            type_label: type_label.into(),
            handle,
            writer,
        }
    }
}

impl Drop for ForeignObject {
    fn drop(&mut self) {
        channel::send_delete(&self.writer, self.handle);
    }
}

impl fmt::Debug for ForeignObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ForeignObject(type={:?}, handle={})",
            self.type_label, self.handle
        )
    }
}

impl PartialEq for ForeignObject {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

/// A callable plus a stop sentinel. `next(g)` keeps calling `func` until
/// it yields a value equal to `stop`.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorState {
    pub func: Value,
    pub stop: Value,
}

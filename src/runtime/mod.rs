//! Guest value model, shared environment, and the proxy objects that
//! stand in for host-side values.

pub mod env;
pub mod proxy;
pub mod value;

pub use env::Env;
pub use proxy::{CallbackObject, ForeignObject, GeneratorState};
pub use value::{ArrayData, BuiltinFunction, HashKey, NdArray, Value};

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::runtime::proxy::{CallbackObject, ForeignObject, GeneratorState};
use crate::session::{EvalError, Session};

/// Native function signature for environment builtins. Builtins receive
/// the whole session because some of them drive the wire (callback and
/// foreign-object constructors, handle release, array pickling).
pub type NativeFn = fn(&mut Session, Vec<Value>) -> Result<Value, EvalError>;

/// A named builtin bound into the shared evaluation environment.
#[derive(Clone, Copy)]
pub struct BuiltinFunction {
    pub name: &'static str,
    pub func: NativeFn,
}

impl fmt::Debug for BuiltinFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BuiltinFunction({})", self.name)
    }
}

impl PartialEq for BuiltinFunction {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// Guest runtime value.
///
/// Heap-allocated payloads sit behind `Rc` so cloning is O(1); values are
/// semantically immutable after construction. The enum is closed: the
/// marshaler has an encoding for every variant, with the opaque-handle
/// reference as the universal fallback, so encoding is total.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absence of value.
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Complex { re: f64, im: f64 },
    /// Exact rational, normalized with a positive denominator.
    Fraction { num: i64, den: i64 },
    Str(Rc<str>),
    /// Bare host-side token, sent to the wire without quoting.
    Symbol(Rc<str>),
    List(Rc<Vec<Value>>),
    Tuple(Rc<Vec<Value>>),
    /// Insertion-ordered unique-key mapping.
    Map(Rc<Vec<(HashKey, Value)>>),
    /// Multidimensional numeric array.
    Array(Rc<NdArray>),
    /// Host-side callable, invoked through the wire.
    Callback(Rc<CallbackObject>),
    /// Host-side value with no guest representation.
    Foreign(Rc<ForeignObject>),
    Generator(Rc<GeneratorState>),
    Builtin(BuiltinFunction),
    /// Marker bound to `_tether_objects`: indexing it reads the handle table.
    ObjectStore,
    /// Error text; encodes as raw message text, never as a handle.
    Error(Rc<str>),
}

impl Value {
    pub fn str(text: impl Into<String>) -> Self {
        Value::Str(Rc::from(text.into().into_boxed_str()))
    }

    pub fn symbol(text: impl Into<String>) -> Self {
        Value::Symbol(Rc::from(text.into().into_boxed_str()))
    }

    pub fn error(text: impl Into<String>) -> Self {
        Value::Error(Rc::from(text.into().into_boxed_str()))
    }

    /// Normalize and build a fraction. A zero denominator is a caller error.
    pub fn fraction(num: i64, den: i64) -> Result<Self, String> {
        if den == 0 {
            return Err("fraction denominator is zero".to_string());
        }
        let g = gcd(num.unsigned_abs(), den.unsigned_abs()) as i64;
        let sign = if den < 0 { -1 } else { 1 };
        Ok(Value::Fraction {
            num: sign * num / g,
            den: sign * den / g,
        })
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Complex { .. } => "complex",
            Value::Fraction { .. } => "fraction",
            Value::Str(_) => "str",
            Value::Symbol(_) => "symbol",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Map(_) => "map",
            Value::Array(_) => "array",
            Value::Callback(_) => "callback",
            Value::Foreign(_) => "foreign",
            Value::Generator(_) => "generator",
            Value::Builtin(_) => "builtin",
            Value::ObjectStore => "object-store",
            Value::Error(_) => "error",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Tuple(items) => !items.is_empty(),
            Value::Map(pairs) => !pairs.is_empty(),
            _ => true,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{:?}", v),
            Value::Complex { re, im } => write!(f, "({:?}+{:?}j)", re, im),
            Value::Fraction { num, den } => write!(f, "{}/{}", num, den),
            Value::Str(s) => write!(f, "{}", s),
            Value::Symbol(s) => write!(f, "{}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Tuple(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                if items.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            Value::Map(pairs) => {
                write!(f, "{{")?;
                for (i, (key, value)) in pairs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
            Value::Array(array) => write!(f, "array(shape={:?})", array.shape),
            Value::Callback(cb) => write!(f, "callback({})", cb.handle),
            Value::Foreign(obj) => {
                write!(f, "foreign(\"{}\", {})", obj.type_label, obj.handle)
            }
            Value::Generator(_) => write!(f, "generator"),
            Value::Builtin(b) => write!(f, "builtin {}", b.name),
            Value::ObjectStore => write!(f, "object-store"),
            Value::Error(text) => write!(f, "error: {}", text),
        }
    }
}

/// Map key with string-equality semantics, per the wire contract for
/// mappings. Unhashable values are rejected when the map is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashKey {
    Int(i64),
    Bool(bool),
    Str(Rc<str>),
}

impl HashKey {
    pub fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Int(i) => Ok(HashKey::Int(*i)),
            Value::Bool(b) => Ok(HashKey::Bool(*b)),
            Value::Str(s) => Ok(HashKey::Str(Rc::clone(s))),
            other => Err(format!("unhashable map key: {}", other.type_name())),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            HashKey::Int(i) => Value::Int(*i),
            HashKey::Bool(b) => Value::Bool(*b),
            HashKey::Str(s) => Value::Str(Rc::clone(s)),
        }
    }
}

impl fmt::Display for HashKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashKey::Int(i) => write!(f, "{}", i),
            HashKey::Bool(true) => write!(f, "True"),
            HashKey::Bool(false) => write!(f, "False"),
            HashKey::Str(s) => write!(f, "'{}'", s),
        }
    }
}

/// Insert into an ordered pair list, replacing the value on a key match.
pub fn map_insert(pairs: &mut Vec<(HashKey, Value)>, key: HashKey, value: Value) {
    if let Some(entry) = pairs.iter_mut().find(|(k, _)| *k == key) {
        entry.1 = value;
    } else {
        pairs.push((key, value));
    }
}

/// Element storage for a multidimensional numeric array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArrayData {
    Int(Vec<i64>),
    Float(Vec<f64>),
}

impl ArrayData {
    pub fn len(&self) -> usize {
        match self {
            ArrayData::Int(v) => v.len(),
            ArrayData::Float(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at a flat offset, as a scalar value.
    pub fn scalar(&self, offset: usize) -> Value {
        match self {
            ArrayData::Int(v) => Value::Int(v[offset]),
            ArrayData::Float(v) => Value::Float(v[offset]),
        }
    }
}

/// Row-major multidimensional numeric array. A zero-length shape is a
/// scalar holding exactly one element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NdArray {
    pub shape: Vec<usize>,
    pub data: ArrayData,
}

impl NdArray {
    pub fn new(shape: Vec<usize>, data: ArrayData) -> Result<Self, String> {
        // Checked product: the shape comes from the host and may not fit.
        let expected = shape
            .iter()
            .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
            .ok_or_else(|| format!("array shape {:?} is too large", shape))?;
        if data.len() != expected {
            return Err(format!(
                "array data has {} elements, shape {:?} needs {}",
                data.len(),
                shape,
                expected
            ));
        }
        Ok(Self { shape, data })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a.max(1)
}

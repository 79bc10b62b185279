use std::path::Path;

use crate::runtime::value::{NdArray, Value};
use crate::session::Session;

/// Extension point: predicates tried in order before the opaque-handle
/// fallback, mirroring the open-ended encoder registration the wire
/// format grew up with.
pub type EncodePredicate = fn(&Value) -> bool;
pub type EncodeFn = fn(&mut Session, &Value) -> Result<String, String>;

pub(crate) fn default_registry() -> Vec<(EncodePredicate, EncodeFn)> {
    vec![(
        |value| matches!(value, Value::Array(_)),
        encode_array,
    )]
}

impl Session {
    /// Turn a guest value into text the host's reader can parse.
    ///
    /// Total by construction: errors become raw message text, a positive
    /// return-mode counter forces a handle, registered encoders run
    /// next, and anything left over falls back to an opaque handle.
    pub(crate) fn encode(&mut self, value: &Value) -> Result<String, String> {
        // Errors must stay inspectable as text on the host side, so
        // they bypass the forced-handle mode.
        if let Value::Error(text) = value {
            return Ok(text.to_string());
        }
        if self.return_mode > 0 {
            return Ok(self.encode_handle(value));
        }
        if let Some(text) = self.encode_variant(value)? {
            return Ok(text);
        }
        let registry = self.registry.clone();
        for (predicate, encoder) in registry {
            if predicate(value) {
                return encoder(self, value);
            }
        }
        Ok(self.encode_handle(value))
    }

    /// Encoders for the closed set of directly representable variants.
    /// `None` means "not mine": the registry and the handle fallback
    /// take over.
    fn encode_variant(&mut self, value: &Value) -> Result<Option<String>, String> {
        let text = match value {
            Value::Bool(true) => "T".to_string(),
            Value::Bool(false) => "NIL".to_string(),
            // The host represents the guest's null as the string "None".
            Value::None => "\"None\"".to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => format_float(*f),
            Value::Complex { re, im } => {
                format!("#C({} {})", format_float(*re), format_float(*im))
            }
            Value::Fraction { num, den } => format!("{}/{}", num, den),
            Value::Str(s) => quote_string(s),
            Value::Symbol(s) => s.to_string(),
            Value::List(items) => {
                let mut parts = Vec::with_capacity(items.len());
                for item in items.iter() {
                    parts.push(self.encode(item)?);
                }
                format!("#({})", parts.join(" "))
            }
            Value::Tuple(items) => {
                if items.is_empty() {
                    // Distinct empty marker: the host reader would
                    // otherwise read `()` as its null.
                    "\"()\"".to_string()
                } else {
                    let mut parts = Vec::with_capacity(items.len());
                    for item in items.iter() {
                        parts.push(self.encode(item)?);
                    }
                    format!("({})", parts.join(" "))
                }
            }
            Value::Map(pairs) => {
                let mut text = String::from(
                    "#.(let ((table (make-hash-table :test (quote equal))))",
                );
                for (key, value) in pairs.iter() {
                    let key_text = self.encode(&key.to_value())?;
                    let value_text = self.encode(value)?;
                    text.push_str(&format!(
                        " (setf (gethash {} table) {})",
                        key_text, value_text
                    ));
                }
                text.push_str(" table)");
                text
            }
            // Reconstruction call: hand the host back its own object.
            Value::Foreign(obj) => format!("#.(tether:host-object {})", obj.handle),
            Value::Array(_)
            | Value::Callback(_)
            | Value::Generator(_)
            | Value::Builtin(_)
            | Value::ObjectStore
            | Value::Error(_) => return Ok(None),
        };
        Ok(Some(text))
    }

    /// Park the value in the handle table and emit a reconstruction call
    /// the host turns into a finalizable proxy object.
    pub(crate) fn encode_handle(&mut self, value: &Value) -> String {
        let type_label = value.type_name();
        let handle = self.handles.allocate(value.clone());
        format!(
            "#.(tether:remote-object :type \"{}\" :handle {})",
            type_label, handle
        )
    }
}

/// Inline rows for small arrays; the file-exchange codec for big ones.
fn encode_array(session: &mut Session, value: &Value) -> Result<String, String> {
    let Value::Array(array) = value else {
        return Err(format!("array encoder got {}", value.type_name()));
    };

    if let (Some(bound), Some(location)) = (
        session.config.array_pickle_lower_bound(),
        session.config.array_pickle_location(),
    ) {
        if array.len() as u64 > bound {
            session
                .codec
                .save(array, Path::new(&location))
                .map_err(|e| format!("array save to {} failed: {}", location, e))?;
            return Ok(format!(
                "#.(tether:load-array-file {})",
                quote_string(&location)
            ));
        }
    }

    // A zero-dimensional array is its scalar contents.
    if array.ndim() == 0 {
        return session.encode(&array.data.scalar(0));
    }

    let mut text = format!("#{}A", array.ndim());
    encode_rows(session, array, 0, 0, &mut text)?;
    Ok(text)
}

fn encode_rows(
    session: &mut Session,
    array: &NdArray,
    dim: usize,
    offset: usize,
    out: &mut String,
) -> Result<(), String> {
    let stride: usize = array.shape[dim + 1..].iter().product();
    out.push('(');
    for i in 0..array.shape[dim] {
        if i > 0 {
            out.push(' ');
        }
        let element = offset + i * stride;
        if dim + 1 == array.ndim() {
            out.push_str(&session.encode(&array.data.scalar(element))?);
        } else {
            encode_rows(session, array, dim + 1, element, out)?;
        }
    }
    out.push(')');
    Ok(())
}

/// Double-quoted string with backslash and quote escaped, the only two
/// characters the host's string syntax treats specially.
fn quote_string(text: &str) -> String {
    let escaped = text.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}

/// Canonical float text. Always keeps a decimal point or exponent so the
/// host reads it back as a float, never an integer.
fn format_float(value: f64) -> String {
    let text = format!("{:?}", value);
    if text.contains('.') || text.contains('e') || text.contains('E') {
        text
    } else {
        format!("{}.0", text)
    }
}

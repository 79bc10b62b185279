use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use serde_json::Value as JsonValue;

use crate::runtime::value::{HashKey, Value, map_insert};

pub const PICKLE_LOWER_BOUND_KEY: &str = "numericArrayPickleLowerBound";
pub const PICKLE_LOCATION_KEY: &str = "numericArrayPickleLocation";

/// Key-value configuration loaded once at startup from
/// `<session-name>.config` (a JSON object). A missing or unreadable file
/// is not fatal and yields an empty mapping.
#[derive(Debug, Clone, Default)]
pub struct Config {
    path: Option<PathBuf>,
    values: serde_json::Map<String, JsonValue>,
}

impl Config {
    /// Load from `<base>.config` next to wherever the host started us.
    pub fn load(base: &str) -> Self {
        let path = PathBuf::from(format!("{}.config", base));
        let mut config = Self {
            path: Some(path),
            values: serde_json::Map::new(),
        };
        config.reload();
        config
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Re-read the config file. Keeps the old values on a parse failure.
    pub fn reload(&mut self) {
        let Some(path) = &self.path else {
            return;
        };
        match fs::read_to_string(path) {
            Ok(text) => match serde_json::from_str::<JsonValue>(&text) {
                Ok(JsonValue::Object(map)) => self.values = map,
                Ok(_) => eprintln!("config file {} is not a JSON object", path.display()),
                Err(e) => eprintln!("config file {}: {}", path.display(), e),
            },
            Err(_) => eprintln!(".config file not found!"),
        }
    }

    pub fn array_pickle_lower_bound(&self) -> Option<u64> {
        self.values.get(PICKLE_LOWER_BOUND_KEY)?.as_u64()
    }

    pub fn array_pickle_location(&self) -> Option<String> {
        Some(self.values.get(PICKLE_LOCATION_KEY)?.as_str()?.to_string())
    }

    /// The whole mapping as a guest value, for the `_tether_config`
    /// binding in the evaluation environment.
    pub fn to_value(&self) -> Value {
        let mut pairs = Vec::new();
        for (key, value) in &self.values {
            map_insert(
                &mut pairs,
                HashKey::Str(Rc::from(key.as_str())),
                json_to_value(value),
            );
        }
        Value::Map(Rc::new(pairs))
    }
}

fn json_to_value(json: &JsonValue) -> Value {
    match json {
        JsonValue::Null => Value::None,
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else {
                Value::Float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        JsonValue::String(s) => Value::str(s.clone()),
        JsonValue::Array(items) => {
            Value::List(Rc::new(items.iter().map(json_to_value).collect()))
        }
        JsonValue::Object(map) => {
            let mut pairs = Vec::new();
            for (key, value) in map {
                map_insert(
                    &mut pairs,
                    HashKey::Str(Rc::from(key.as_str())),
                    json_to_value(value),
                );
            }
            Value::Map(Rc::new(pairs))
        }
    }
}

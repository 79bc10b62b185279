use std::path::Path;
use std::rc::Rc;

use crate::runtime::proxy::{CallbackObject, ForeignObject, GeneratorState};
use crate::runtime::value::{ArrayData, BuiltinFunction, NdArray, Value};
use crate::session::{EvalError, Session};

/// Names the host relies on being resolvable in evaluated text, plus a
/// few conveniences for guest code. Installed once per session.
static BUILTINS: &[BuiltinFunction] = &[
    BuiltinFunction {
        name: "_tether_callback",
        func: builtin_callback,
    },
    BuiltinFunction {
        name: "_tether_foreign",
        func: builtin_foreign,
    },
    BuiltinFunction {
        name: "_tether_symbol",
        func: builtin_symbol,
    },
    BuiltinFunction {
        name: "_tether_fraction",
        func: builtin_fraction,
    },
    BuiltinFunction {
        name: "_tether_generator",
        func: builtin_generator,
    },
    BuiltinFunction {
        name: "next",
        func: builtin_next,
    },
    BuiltinFunction {
        name: "_tether_free",
        func: builtin_free,
    },
    BuiltinFunction {
        name: "_tether_array",
        func: builtin_array,
    },
    BuiltinFunction {
        name: "_tether_load_array",
        func: builtin_load_array,
    },
    BuiltinFunction {
        name: "_tether_load_config",
        func: builtin_load_config,
    },
    BuiltinFunction {
        name: "complex",
        func: builtin_complex,
    },
    BuiltinFunction {
        name: "print",
        func: builtin_print,
    },
    BuiltinFunction {
        name: "len",
        func: builtin_len,
    },
    BuiltinFunction {
        name: "type_of",
        func: builtin_type_of,
    },
];

pub(crate) fn install(session: &mut Session) {
    for builtin in BUILTINS {
        session.env.set(builtin.name, Value::Builtin(*builtin));
    }
    session.env.set("_tether_objects", Value::ObjectStore);
    let config_value = session.config.to_value();
    session.env.set("_tether_config", config_value);
}

fn arity(name: &str, args: &[Value], expected: usize) -> Result<(), EvalError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(EvalError::msg(format!(
            "{}() takes {} argument(s), got {}",
            name,
            expected,
            args.len()
        )))
    }
}

fn int_arg(name: &str, value: &Value) -> Result<i64, EvalError> {
    match value {
        Value::Int(i) => Ok(*i),
        other => Err(EvalError::msg(format!(
            "{}: expected an integer, got {}",
            name,
            other.type_name()
        ))),
    }
}

fn str_arg(name: &str, value: &Value) -> Result<String, EvalError> {
    match value {
        Value::Str(s) => Ok(s.to_string()),
        other => Err(EvalError::msg(format!(
            "{}: expected a string, got {}",
            name,
            other.type_name()
        ))),
    }
}

fn float_arg(name: &str, value: &Value) -> Result<f64, EvalError> {
    match value {
        Value::Int(i) => Ok(*i as f64),
        Value::Float(f) => Ok(*f),
        other => Err(EvalError::msg(format!(
            "{}: expected a number, got {}",
            name,
            other.type_name()
        ))),
    }
}

/// Wrap a host function handle in an invokable proxy.
fn builtin_callback(session: &mut Session, args: Vec<Value>) -> Result<Value, EvalError> {
    arity("_tether_callback", &args, 1)?;
    let handle = int_arg("_tether_callback", &args[0])?;
    Ok(Value::Callback(Rc::new(CallbackObject::new(
        handle as u64,
        session.writer(),
    ))))
}

/// Wrap an undecodable host value: `(type label, handle)`.
fn builtin_foreign(session: &mut Session, args: Vec<Value>) -> Result<Value, EvalError> {
    arity("_tether_foreign", &args, 2)?;
    let type_label = str_arg("_tether_foreign", &args[0])?;
    let handle = int_arg("_tether_foreign", &args[1])?;
    Ok(Value::Foreign(Rc::new(ForeignObject::new(
        type_label,
        handle as u64,
        session.writer(),
    ))))
}

fn builtin_symbol(_session: &mut Session, args: Vec<Value>) -> Result<Value, EvalError> {
    arity("_tether_symbol", &args, 1)?;
    let name = str_arg("_tether_symbol", &args[0])?;
    Ok(Value::symbol(name))
}

fn builtin_fraction(_session: &mut Session, args: Vec<Value>) -> Result<Value, EvalError> {
    arity("_tether_fraction", &args, 2)?;
    let num = int_arg("_tether_fraction", &args[0])?;
    let den = int_arg("_tether_fraction", &args[1])?;
    Value::fraction(num, den).map_err(EvalError::Message)
}

fn builtin_generator(_session: &mut Session, args: Vec<Value>) -> Result<Value, EvalError> {
    arity("_tether_generator", &args, 2)?;
    let mut args = args;
    let stop = args.pop().expect("arity checked");
    let func = args.pop().expect("arity checked");
    Ok(Value::Generator(Rc::new(GeneratorState { func, stop })))
}

/// Pull the next value out of a generator; reaching the stop sentinel is
/// reported as an error the host maps onto its iteration protocol.
fn builtin_next(session: &mut Session, args: Vec<Value>) -> Result<Value, EvalError> {
    arity("next", &args, 1)?;
    let Value::Generator(generator) = &args[0] else {
        return Err(EvalError::msg(format!(
            "next: expected a generator, got {}",
            args[0].type_name()
        )));
    };
    let value = session.call_value(generator.func.clone(), Vec::new(), Vec::new())?;
    if value == generator.stop {
        return Err(EvalError::msg("stop iteration".to_string()));
    }
    Ok(value)
}

/// Release a handle-table entry. The host calls this when its proxy for
/// a guest value is finalized; a stale handle is an error, not a crash.
fn builtin_free(session: &mut Session, args: Vec<Value>) -> Result<Value, EvalError> {
    arity("_tether_free", &args, 1)?;
    let handle = int_arg("_tether_free", &args[0])?;
    if handle < 0 {
        return Err(EvalError::msg(format!("no object with handle {}", handle)));
    }
    session
        .handles
        .release(handle as u64)
        .map_err(EvalError::Message)?;
    Ok(Value::None)
}

/// Build a multidimensional numeric array from a shape list and flat
/// data list. Integer-only data stays integral.
fn builtin_array(_session: &mut Session, args: Vec<Value>) -> Result<Value, EvalError> {
    arity("_tether_array", &args, 2)?;
    let Value::List(shape_values) = &args[0] else {
        return Err(EvalError::msg("_tether_array: shape must be a list".to_string()));
    };
    let Value::List(data_values) = &args[1] else {
        return Err(EvalError::msg("_tether_array: data must be a list".to_string()));
    };

    let mut shape = Vec::with_capacity(shape_values.len());
    for value in shape_values.iter() {
        let dim = int_arg("_tether_array", value)?;
        if dim < 0 {
            return Err(EvalError::msg("_tether_array: negative dimension".to_string()));
        }
        shape.push(dim as usize);
    }

    let all_ints = data_values.iter().all(|v| matches!(v, Value::Int(_)));
    let data = if all_ints {
        let mut items = Vec::with_capacity(data_values.len());
        for value in data_values.iter() {
            items.push(int_arg("_tether_array", value)?);
        }
        ArrayData::Int(items)
    } else {
        let mut items = Vec::with_capacity(data_values.len());
        for value in data_values.iter() {
            items.push(float_arg("_tether_array", value)?);
        }
        ArrayData::Float(items)
    };

    let array = NdArray::new(shape, data).map_err(EvalError::Message)?;
    Ok(Value::Array(Rc::new(array)))
}

/// Load an array the host parked in external storage, then delete the
/// exchange file.
fn builtin_load_array(session: &mut Session, args: Vec<Value>) -> Result<Value, EvalError> {
    arity("_tether_load_array", &args, 1)?;
    let location = str_arg("_tether_load_array", &args[0])?;
    let array = session
        .codec
        .load(Path::new(&location))
        .map_err(|e| EvalError::msg(format!("array load from {} failed: {}", location, e)))?;
    if let Err(e) = session.codec.delete_file(Path::new(&location)) {
        eprintln!("could not remove exchange file {}: {}", location, e);
    }
    Ok(Value::Array(Rc::new(array)))
}

fn builtin_load_config(session: &mut Session, args: Vec<Value>) -> Result<Value, EvalError> {
    arity("_tether_load_config", &args, 0)?;
    session.config.reload();
    let config_value = session.config.to_value();
    session.env.set("_tether_config", config_value);
    Ok(Value::None)
}

fn builtin_complex(_session: &mut Session, args: Vec<Value>) -> Result<Value, EvalError> {
    arity("complex", &args, 2)?;
    let re = float_arg("complex", &args[0])?;
    let im = float_arg("complex", &args[1])?;
    Ok(Value::Complex { re, im })
}

/// The return stream is reserved for protocol frames, so guest print
/// output goes to stderr.
fn builtin_print(_session: &mut Session, args: Vec<Value>) -> Result<Value, EvalError> {
    let rendered: Vec<String> = args.iter().map(|v| v.to_string()).collect();
    eprintln!("{}", rendered.join(" "));
    Ok(Value::None)
}

fn builtin_len(_session: &mut Session, args: Vec<Value>) -> Result<Value, EvalError> {
    arity("len", &args, 1)?;
    let length = match &args[0] {
        Value::Str(s) => s.chars().count(),
        Value::List(items) => items.len(),
        Value::Tuple(items) => items.len(),
        Value::Map(pairs) => pairs.len(),
        Value::Array(array) => array.len(),
        other => {
            return Err(EvalError::msg(format!(
                "object of type '{}' has no len()",
                other.type_name()
            )));
        }
    };
    Ok(Value::Int(length as i64))
}

fn builtin_type_of(_session: &mut Session, args: Vec<Value>) -> Result<Value, EvalError> {
    arity("type_of", &args, 1)?;
    Ok(Value::str(args[0].type_name()))
}

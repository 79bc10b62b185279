use std::rc::Rc;

use crate::runtime::value::{HashKey, Value, map_insert};
use crate::session::{EvalError, Session, ops};
use crate::syntax::ast::{Expression, Statement};

impl Session {
    pub(crate) fn eval_expression(&mut self, expression: &Expression) -> Result<Value, EvalError> {
        match expression {
            Expression::Int(i) => Ok(Value::Int(*i)),
            Expression::Float(f) => Ok(Value::Float(*f)),
            Expression::Str(s) => Ok(Value::str(s.clone())),
            Expression::Bool(b) => Ok(Value::Bool(*b)),
            Expression::NoneLit => Ok(Value::None),
            Expression::Ident(name) => self
                .env
                .get(name)
                .ok_or_else(|| EvalError::msg(format!("name '{}' is not defined", name))),
            Expression::Prefix { operator, right } => {
                let value = self.eval_expression(right)?;
                ops::unary(operator, &value).map_err(EvalError::Message)
            }
            Expression::Infix {
                left,
                operator,
                right,
            } => {
                let left = self.eval_expression(left)?;
                let right = self.eval_expression(right)?;
                ops::binary(operator, &left, &right).map_err(EvalError::Message)
            }
            Expression::List(elements) => {
                let items = self.eval_expressions(elements)?;
                Ok(Value::List(Rc::new(items)))
            }
            Expression::Tuple(elements) => {
                let items = self.eval_expressions(elements)?;
                Ok(Value::Tuple(Rc::new(items)))
            }
            Expression::Map(entries) => {
                let mut pairs = Vec::with_capacity(entries.len());
                for (key_expr, value_expr) in entries {
                    let key_value = self.eval_expression(key_expr)?;
                    let key = HashKey::from_value(&key_value).map_err(EvalError::Message)?;
                    let value = self.eval_expression(value_expr)?;
                    map_insert(&mut pairs, key, value);
                }
                Ok(Value::Map(Rc::new(pairs)))
            }
            Expression::Attribute { object, name } => {
                let object = self.eval_expression(object)?;
                self.eval_attribute(object, name)
            }
            Expression::Index { object, index } => {
                let object = self.eval_expression(object)?;
                let index = self.eval_expression(index)?;
                self.eval_index(object, index)
            }
            Expression::Call {
                callee,
                args,
                kwargs,
            } => {
                let callee = self.eval_expression(callee)?;
                let args = self.eval_expressions(args)?;
                let mut kwarg_values = Vec::with_capacity(kwargs.len());
                for (key, value_expr) in kwargs {
                    kwarg_values.push((key.clone(), self.eval_expression(value_expr)?));
                }
                self.call_value(callee, args, kwarg_values)
            }
        }
    }

    pub(crate) fn exec_statement(&mut self, statement: &Statement) -> Result<(), EvalError> {
        match statement {
            Statement::Assign { name, value } => {
                let value = self.eval_expression(value)?;
                self.env.set(name.clone(), value);
                Ok(())
            }
            Statement::Delete { name } => {
                if self.env.delete(name) {
                    Ok(())
                } else {
                    Err(EvalError::msg(format!("name '{}' is not defined", name)))
                }
            }
            Statement::Expression(expression) => {
                self.eval_expression(expression)?;
                Ok(())
            }
        }
    }

    fn eval_expressions(&mut self, expressions: &[Expression]) -> Result<Vec<Value>, EvalError> {
        let mut values = Vec::with_capacity(expressions.len());
        for expression in expressions {
            values.push(self.eval_expression(expression)?);
        }
        Ok(values)
    }

    /// Call a callable value. Host callables re-enter the dispatch loop;
    /// builtins run natively and take no keyword arguments.
    pub(crate) fn call_value(
        &mut self,
        callee: Value,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Result<Value, EvalError> {
        self.check_interrupt()?;
        match callee {
            Value::Builtin(builtin) => {
                if !kwargs.is_empty() {
                    return Err(EvalError::msg(format!(
                        "{}() takes no keyword arguments",
                        builtin.name
                    )));
                }
                (builtin.func)(self, args)
            }
            Value::Callback(callback) => self.call_remote(callback.handle, args, kwargs),
            other => Err(EvalError::msg(format!(
                "'{}' object is not callable",
                other.type_name()
            ))),
        }
    }

    /// Attribute access. A handful of attributes resolve locally; any
    /// other attribute of a foreign object round-trips to the host.
    fn eval_attribute(&mut self, object: Value, name: &str) -> Result<Value, EvalError> {
        match (&object, name) {
            (Value::Complex { re, .. }, "real") => Ok(Value::Float(*re)),
            (Value::Complex { im, .. }, "imag") => Ok(Value::Float(*im)),
            (Value::Int(i), "real") => Ok(Value::Int(*i)),
            (Value::Int(_), "imag") => Ok(Value::Int(0)),
            (Value::Float(f), "real") => Ok(Value::Float(*f)),
            (Value::Float(_), "imag") => Ok(Value::Float(0.0)),
            (Value::Fraction { num, .. }, "numerator") => Ok(Value::Int(*num)),
            (Value::Fraction { den, .. }, "denominator") => Ok(Value::Int(*den)),
            (Value::Callback(callback), "handle") => Ok(Value::Int(callback.handle as i64)),
            (Value::Foreign(foreign), "handle") => Ok(Value::Int(foreign.handle as i64)),
            (Value::Foreign(foreign), _) => {
                let handle = foreign.handle;
                self.slot_remote(handle, name)
            }
            (other, _) => Err(EvalError::msg(format!(
                "'{}' object has no attribute '{}'",
                other.type_name(),
                name
            ))),
        }
    }

    fn eval_index(&mut self, object: Value, index: Value) -> Result<Value, EvalError> {
        match &object {
            Value::List(items) => index_sequence(items, &index),
            Value::Tuple(items) => index_sequence(items, &index),
            Value::Str(text) => {
                let chars: Vec<char> = text.chars().collect();
                let position = normalize_index(&index, chars.len())?;
                Ok(Value::str(chars[position].to_string()))
            }
            Value::Map(pairs) => {
                let key = HashKey::from_value(&index).map_err(EvalError::Message)?;
                pairs
                    .iter()
                    .find(|(k, _)| *k == key)
                    .map(|(_, v)| v.clone())
                    .ok_or_else(|| EvalError::msg(format!("key not found: {}", key)))
            }
            Value::ObjectStore => {
                let Value::Int(handle) = index else {
                    return Err(EvalError::msg("object handles are integers".to_string()));
                };
                if handle < 0 {
                    return Err(EvalError::msg(format!("no object with handle {}", handle)));
                }
                self.handles
                    .lookup(handle as u64)
                    .cloned()
                    .ok_or_else(|| EvalError::msg(format!("no object with handle {}", handle)))
            }
            other => Err(EvalError::msg(format!(
                "'{}' object is not subscriptable",
                other.type_name()
            ))),
        }
    }
}

fn index_sequence(items: &[Value], index: &Value) -> Result<Value, EvalError> {
    let position = normalize_index(index, items.len())?;
    Ok(items[position].clone())
}

/// Python-style indexing: negative counts from the end.
fn normalize_index(index: &Value, length: usize) -> Result<usize, EvalError> {
    let Value::Int(i) = index else {
        return Err(EvalError::msg(format!(
            "indices must be integers, not {}",
            index.type_name()
        )));
    };
    let adjusted = if *i < 0 { *i + length as i64 } else { *i };
    if adjusted < 0 || adjusted as usize >= length {
        return Err(EvalError::msg("index out of range".to_string()));
    }
    Ok(adjusted as usize)
}

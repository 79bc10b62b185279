use std::rc::Rc;

use crate::runtime::value::Value;

/// Apply an infix operator. Message-level errors only; the caller wraps
/// them into `EvalError`.
pub(crate) fn binary(operator: &str, left: &Value, right: &Value) -> Result<Value, String> {
    match operator {
        "+" | "-" | "*" | "/" | "%" => arithmetic(operator, left, right),
        "==" => Ok(Value::Bool(loose_eq(left, right))),
        "!=" => Ok(Value::Bool(!loose_eq(left, right))),
        "<" | ">" | "<=" | ">=" => compare(operator, left, right),
        _ => Err(format!("unknown operator: {}", operator)),
    }
}

/// Apply a prefix operator.
pub(crate) fn unary(operator: &str, value: &Value) -> Result<Value, String> {
    match (operator, value) {
        ("-", Value::Int(i)) => Ok(Value::Int(-i)),
        ("-", Value::Float(f)) => Ok(Value::Float(-f)),
        ("-", Value::Complex { re, im }) => Ok(Value::Complex { re: -re, im: -im }),
        ("-", Value::Fraction { num, den }) => Ok(Value::Fraction {
            num: -num,
            den: *den,
        }),
        ("-", other) => Err(format!("bad operand type for unary -: {}", other.type_name())),
        ("not", other) => Ok(Value::Bool(!other.is_truthy())),
        (op, _) => Err(format!("unknown operator: {}", op)),
    }
}

fn arithmetic(operator: &str, left: &Value, right: &Value) -> Result<Value, String> {
    match (left, right) {
        (Value::Int(l), Value::Int(r)) => int_arithmetic(operator, *l, *r),
        // Exact rationals stay exact against integers.
        (Value::Fraction { .. }, Value::Int(_) | Value::Fraction { .. })
        | (Value::Int(_), Value::Fraction { .. }) => {
            let (ln, ld) = as_fraction(left);
            let (rn, rd) = as_fraction(right);
            fraction_arithmetic(operator, ln, ld, rn, rd)
        }
        (Value::Complex { .. }, _) | (_, Value::Complex { .. }) => {
            let (lr, li) = as_complex(left).ok_or_else(|| type_error(operator, left, right))?;
            let (rr, ri) = as_complex(right).ok_or_else(|| type_error(operator, left, right))?;
            complex_arithmetic(operator, lr, li, rr, ri)
        }
        (Value::Str(l), Value::Str(r)) if operator == "+" => {
            Ok(Value::str(format!("{}{}", l, r)))
        }
        (Value::List(l), Value::List(r)) if operator == "+" => {
            let mut items = l.as_ref().clone();
            items.extend(r.iter().cloned());
            Ok(Value::List(Rc::new(items)))
        }
        (Value::Tuple(l), Value::Tuple(r)) if operator == "+" => {
            let mut items = l.as_ref().clone();
            items.extend(r.iter().cloned());
            Ok(Value::Tuple(Rc::new(items)))
        }
        _ => {
            let (l, r) = match (as_float(left), as_float(right)) {
                (Some(l), Some(r)) => (l, r),
                _ => return Err(type_error(operator, left, right)),
            };
            float_arithmetic(operator, l, r)
        }
    }
}

fn int_arithmetic(operator: &str, l: i64, r: i64) -> Result<Value, String> {
    match operator {
        "+" => Ok(Value::Int(l.wrapping_add(r))),
        "-" => Ok(Value::Int(l.wrapping_sub(r))),
        "*" => Ok(Value::Int(l.wrapping_mul(r))),
        // True division: integers divide to a float.
        "/" => {
            if r == 0 {
                Err("division by zero".to_string())
            } else {
                Ok(Value::Float(l as f64 / r as f64))
            }
        }
        "%" => {
            if r == 0 {
                Err("modulo by zero".to_string())
            } else {
                // Result takes the divisor's sign.
                Ok(Value::Int(((l % r) + r) % r))
            }
        }
        _ => unreachable!("arithmetic operator {}", operator),
    }
}

fn float_arithmetic(operator: &str, l: f64, r: f64) -> Result<Value, String> {
    match operator {
        "+" => Ok(Value::Float(l + r)),
        "-" => Ok(Value::Float(l - r)),
        "*" => Ok(Value::Float(l * r)),
        "/" => {
            if r == 0.0 {
                Err("division by zero".to_string())
            } else {
                Ok(Value::Float(l / r))
            }
        }
        "%" => {
            if r == 0.0 {
                Err("modulo by zero".to_string())
            } else {
                Ok(Value::Float(l - r * (l / r).floor()))
            }
        }
        _ => unreachable!("arithmetic operator {}", operator),
    }
}

fn fraction_arithmetic(
    operator: &str,
    ln: i64,
    ld: i64,
    rn: i64,
    rd: i64,
) -> Result<Value, String> {
    if operator == "%" {
        return float_arithmetic("%", ln as f64 / ld as f64, rn as f64 / rd as f64);
    }
    if operator == "/" && rn == 0 {
        return Err("division by zero".to_string());
    }
    // Exactness over wraparound: a cross-multiplication that does not
    // fit is an error, not a wrong rational.
    let pair = match operator {
        "+" => ln
            .checked_mul(rd)
            .and_then(|l| rn.checked_mul(ld).and_then(|r| l.checked_add(r)))
            .zip(ld.checked_mul(rd)),
        "-" => ln
            .checked_mul(rd)
            .and_then(|l| rn.checked_mul(ld).and_then(|r| l.checked_sub(r)))
            .zip(ld.checked_mul(rd)),
        "*" => ln.checked_mul(rn).zip(ld.checked_mul(rd)),
        "/" => ln.checked_mul(rd).zip(ld.checked_mul(rn)),
        _ => unreachable!("arithmetic operator {}", operator),
    };
    let Some((num, den)) = pair else {
        return Err("fraction overflow".to_string());
    };
    let value = Value::fraction(num, den)?;
    // Collapse whole fractions back to integers.
    if let Value::Fraction { num, den: 1 } = value {
        return Ok(Value::Int(num));
    }
    Ok(value)
}

fn complex_arithmetic(
    operator: &str,
    lr: f64,
    li: f64,
    rr: f64,
    ri: f64,
) -> Result<Value, String> {
    let (re, im) = match operator {
        "+" => (lr + rr, li + ri),
        "-" => (lr - rr, li - ri),
        "*" => (lr * rr - li * ri, lr * ri + li * rr),
        "/" => {
            let denom = rr * rr + ri * ri;
            if denom == 0.0 {
                return Err("complex division by zero".to_string());
            }
            ((lr * rr + li * ri) / denom, (li * rr - lr * ri) / denom)
        }
        "%" => return Err("can't mod complex numbers".to_string()),
        _ => unreachable!("arithmetic operator {}", operator),
    };
    Ok(Value::Complex { re, im })
}

fn compare(operator: &str, left: &Value, right: &Value) -> Result<Value, String> {
    let ordering = match (left, right) {
        (Value::Str(l), Value::Str(r)) => l.as_ref().partial_cmp(r.as_ref()),
        _ => match (as_float(left), as_float(right)) {
            (Some(l), Some(r)) => l.partial_cmp(&r),
            _ => {
                return Err(format!(
                    "`{}` not supported between {} and {}",
                    operator,
                    left.type_name(),
                    right.type_name()
                ));
            }
        },
    };
    let Some(ordering) = ordering else {
        return Ok(Value::Bool(false)); // NaN compares false
    };
    let result = match operator {
        "<" => ordering.is_lt(),
        ">" => ordering.is_gt(),
        "<=" => ordering.is_le(),
        ">=" => ordering.is_ge(),
        _ => unreachable!("comparison operator {}", operator),
    };
    Ok(Value::Bool(result))
}

/// Equality with numeric cross-type comparison; everything else falls
/// back to structural equality.
pub(crate) fn loose_eq(left: &Value, right: &Value) -> bool {
    match (as_float(left), as_float(right)) {
        (Some(l), Some(r)) => l == r,
        _ => left == right,
    }
}

fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        Value::Fraction { num, den } => Some(*num as f64 / *den as f64),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn as_fraction(value: &Value) -> (i64, i64) {
    match value {
        Value::Int(i) => (*i, 1),
        Value::Fraction { num, den } => (*num, *den),
        _ => unreachable!("as_fraction on {}", value.type_name()),
    }
}

fn as_complex(value: &Value) -> Option<(f64, f64)> {
    match value {
        Value::Complex { re, im } => Some((*re, *im)),
        other => as_float(other).map(|f| (f, 0.0)),
    }
}

fn type_error(operator: &str, left: &Value, right: &Value) -> String {
    format!(
        "unsupported operand type(s) for {}: {} and {}",
        operator,
        left.type_name(),
        right.type_name()
    )
}

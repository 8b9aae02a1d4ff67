use std::fmt;

use crate::value::Value;

/// Integral numbers print without a fractional part: `3`, not `3.0`.
/// Large magnitudes are written out in full, never in exponent form.
pub fn format_number(numeric_value: f64) -> String {
    if numeric_value.is_finite() && numeric_value.fract() == 0.0 {
        format!("{:.0}", numeric_value)
    } else if numeric_value.is_nan() {
        "NaN".to_string()
    } else if numeric_value.is_infinite() {
        if numeric_value > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else {
        numeric_value.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::String(s) => write!(f, "{}", s),
            Value::Function(function) => write!(f, "<fn {}>", function.name()),
            Value::Native(_) => write!(f, "<native fn>"),
        }
    }
}

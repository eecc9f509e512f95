//! Native-value normalization.
//!
//! Statistical output is riddled with engine-native scalars (polars
//! `AnyValue`s, non-finite floats) that do not survive JSON serialization.
//! Everything destined for an [`AnalysisResults`](crate::AnalysisResults) map
//! or a chart payload passes through here first, so the egress invariant
//! holds: every leaf is a string, number, boolean, or null.
//!
//! Normalization fails open: a shape it does not recognize passes through
//! unchanged (or stringified) instead of aborting the pipeline.

use polars::prelude::AnyValue;
use serde_json::{Number, Value};

/// Convert an f64 into a JSON value, mapping NaN and infinities to null.
#[inline]
pub fn json_f64(value: f64) -> Value {
    Number::from_f64(value).map(Value::Number).unwrap_or(Value::Null)
}

/// Recursively normalize a JSON value.
///
/// Objects and arrays keep their structure; numbers, strings, booleans, and
/// nulls pass through. Idempotent: `normalize(normalize(v)) == normalize(v)`.
pub fn normalize(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter().map(|(k, v)| (k, normalize(v))).collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(normalize).collect()),
        other => other,
    }
}

/// Convert a polars `AnyValue` into a plain JSON value.
///
/// Unwraps every native scalar to the corresponding primitive; any
/// representation of "no value" (including non-finite floats) becomes null.
/// Temporal and other complex values are stringified via their Display form.
pub fn any_value_to_json(value: &AnyValue) -> Value {
    match value {
        AnyValue::Null => Value::Null,

        AnyValue::Boolean(b) => Value::Bool(*b),

        AnyValue::Int8(i) => Value::Number((*i).into()),
        AnyValue::Int16(i) => Value::Number((*i).into()),
        AnyValue::Int32(i) => Value::Number((*i).into()),
        AnyValue::Int64(i) => Value::Number((*i).into()),

        AnyValue::UInt8(u) => Value::Number((*u).into()),
        AnyValue::UInt16(u) => Value::Number((*u).into()),
        AnyValue::UInt32(u) => Value::Number((*u).into()),
        AnyValue::UInt64(u) => Value::Number((*u).into()),

        // NaN/Infinity become null (JSON has no representation for them)
        AnyValue::Float32(f) => json_f64(*f as f64),
        AnyValue::Float64(f) => json_f64(*f),

        AnyValue::String(s) => Value::String((*s).to_string()),
        AnyValue::StringOwned(s) => Value::String(s.to_string()),

        // Date, Datetime, Duration, List, Struct, ...: stringify
        other => Value::String(format!("{}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_f64_finite() {
        assert_eq!(json_f64(1.5), json!(1.5));
        assert_eq!(json_f64(-3.0), json!(-3.0));
    }

    #[test]
    fn test_json_f64_non_finite_is_null() {
        assert_eq!(json_f64(f64::NAN), Value::Null);
        assert_eq!(json_f64(f64::INFINITY), Value::Null);
        assert_eq!(json_f64(f64::NEG_INFINITY), Value::Null);
    }

    #[test]
    fn test_normalize_preserves_structure() {
        let value = json!({"a": [1, 2.5, null], "b": {"c": "x", "d": true}});
        assert_eq!(normalize(value.clone()), value);
    }

    #[test]
    fn test_normalize_idempotent() {
        let value = json!({"stats": {"mean": 1.5, "top": "a"}, "counts": [1, 2]});
        let once = normalize(value);
        let twice = normalize(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_any_value_null() {
        assert_eq!(any_value_to_json(&AnyValue::Null), Value::Null);
    }

    #[test]
    fn test_any_value_numeric() {
        assert_eq!(any_value_to_json(&AnyValue::Int64(7)), json!(7));
        assert_eq!(any_value_to_json(&AnyValue::UInt32(3)), json!(3));
        assert_eq!(any_value_to_json(&AnyValue::Float64(2.5)), json!(2.5));
    }

    #[test]
    fn test_any_value_nan_is_null() {
        assert_eq!(any_value_to_json(&AnyValue::Float64(f64::NAN)), Value::Null);
        assert_eq!(
            any_value_to_json(&AnyValue::Float32(f32::INFINITY)),
            Value::Null
        );
    }

    #[test]
    fn test_any_value_string_and_bool() {
        assert_eq!(any_value_to_json(&AnyValue::String("x")), json!("x"));
        assert_eq!(any_value_to_json(&AnyValue::Boolean(true)), json!(true));
    }
}

//! Missing-value counts and categorical value counts.

use anyhow::Result;
use polars::prelude::*;
use serde_json::{Map, Value, json};

use crate::utils::string_value_counts;

/// Per-column count of null cells, after coercion.
pub(crate) fn missing_values(df: &DataFrame) -> Result<Value> {
    let mut result = Map::new();
    for col in df.get_columns() {
        result.insert(col.name().to_string(), json!(col.null_count()));
    }
    Ok(Value::Object(result))
}

/// Per categorical column, a mapping from observed value to occurrence count.
pub(crate) fn value_counts(df: &DataFrame) -> Result<Value> {
    let mut result = Map::new();

    for col in df.get_columns() {
        let series = col.as_materialized_series();
        if series.dtype() != &DataType::String {
            continue;
        }

        let mut counts = Map::new();
        for (value, count) in string_value_counts(series) {
            counts.insert(value, json!(count));
        }
        result.insert(series.name().to_string(), Value::Object(counts));
    }

    Ok(Value::Object(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_values_counts_nulls() {
        let df = df!(
            "a" => &[Some(1.0f64), None, Some(3.0)],
            "b" => &[Some("x"), Some("y"), Some("z")],
        )
        .unwrap();

        let result = missing_values(&df).unwrap();
        assert_eq!(result["a"], json!(1));
        assert_eq!(result["b"], json!(0));
    }

    #[test]
    fn test_value_counts_categorical_only() {
        let df = df!(
            "city" => &["Oslo", "Lima", "Oslo"],
            "age" => &[30i64, 40, 50],
        )
        .unwrap();

        let result = value_counts(&df).unwrap();
        assert_eq!(result["city"]["Oslo"], json!(2));
        assert_eq!(result["city"]["Lima"], json!(1));
        assert!(result.get("age").is_none());
    }

    #[test]
    fn test_value_counts_skips_nulls() {
        let df = df!("cat" => &[Some("a"), None, Some("a")]).unwrap();
        let result = value_counts(&df).unwrap();
        assert_eq!(result["cat"]["a"], json!(2));
        assert_eq!(result["cat"].as_object().unwrap().len(), 1);
    }
}

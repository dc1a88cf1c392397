//! Request body validation
//!
//! Turns raw JSON bodies into typed [`FeatureRecord`]s. Numbers and numeric
//! strings are accepted; anything else for a required field is rejected.

use crate::error::ValidationError;
use crate::models::FeatureRecord;
use serde_json::{Map, Value};

/// Request key naming the crop of a price prediction
pub const PLANT_TYPE_FIELD: &str = "plantType";

pub const YEAR_RANGE: std::ops::RangeInclusive<f64> = 1900.0..=2100.0;
pub const MONTH_RANGE: std::ops::RangeInclusive<i64> = 1..=12;

pub fn as_object(body: &Value) -> Result<&Map<String, Value>, ValidationError> {
    body.as_object().ok_or(ValidationError::NotAnObject)
}

/// Interpret a JSON value as a finite float
///
/// `null` is treated like an absent key by callers, so it is not accepted
/// here either.
pub fn numeric(value: &Value) -> Option<f64> {
    let v = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    v.is_finite().then_some(v)
}

/// Interpret a JSON value as an integer; floats are truncated toward zero
pub fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
                .map(|f| f.trunc() as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn present<'a>(body: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    body.get(name).filter(|v| !v.is_null())
}

/// Collect `names` as numeric features, failing on the first absent or
/// non-numeric one
pub fn require_features(
    body: &Map<String, Value>,
    names: &[String],
) -> Result<FeatureRecord, ValidationError> {
    let mut record = FeatureRecord::new();
    for name in names {
        let value = present(body, name).ok_or_else(|| ValidationError::MissingFeature(name.clone()))?;
        let number = numeric(value).ok_or_else(|| ValidationError::InvalidFeatureType(name.clone()))?;
        record.insert(name.clone(), number);
    }
    Ok(record)
}

/// Non-blank crop name of a price request
pub fn plant_type(body: &Map<String, Value>) -> Result<String, ValidationError> {
    match present(body, PLANT_TYPE_FIELD) {
        None => Err(ValidationError::MissingParameter(PLANT_TYPE_FIELD.to_string())),
        Some(Value::String(s)) if s.trim().is_empty() => {
            Err(ValidationError::MissingParameter(PLANT_TYPE_FIELD.to_string()))
        }
        Some(Value::String(s)) => Ok(s.trim().to_string()),
        Some(_) => Err(ValidationError::InvalidType {
            name: PLANT_TYPE_FIELD.to_string(),
            expected: "a string",
        }),
    }
}

/// `year` (float), `month` (integer) and `rainfall` (float) of a price request
pub fn price_inputs(body: &Map<String, Value>) -> Result<FeatureRecord, ValidationError> {
    let field = |name: &str| {
        present(body, name).ok_or_else(|| ValidationError::MissingParameter(name.to_string()))
    };
    let invalid = |name: &str, expected: &'static str| ValidationError::InvalidType {
        name: name.to_string(),
        expected,
    };

    let year = numeric(field("year")?).ok_or_else(|| invalid("year", "a number"))?;
    let month = integer(field("month")?).ok_or_else(|| invalid("month", "an integer"))?;
    let rainfall = numeric(field("rainfall")?).ok_or_else(|| invalid("rainfall", "a number"))?;

    if !YEAR_RANGE.contains(&year) {
        return Err(ValidationError::OutOfRange {
            name: "year".to_string(),
            reason: format!("{} is outside 1900-2100", year),
        });
    }
    if !MONTH_RANGE.contains(&month) {
        return Err(ValidationError::OutOfRange {
            name: "month".to_string(),
            reason: format!("{} is outside 1-12", month),
        });
    }
    if rainfall < 0.0 {
        return Err(ValidationError::OutOfRange {
            name: "rainfall".to_string(),
            reason: "rainfall cannot be negative".to_string(),
        });
    }

    Ok([("year", year), ("month", month as f64), ("rainfall", rainfall)]
        .into_iter()
        .collect())
}

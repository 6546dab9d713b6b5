use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::{Map, Value};

use crate::errors::GenerationError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamKind {
    Bool,
    Int,
    Float,
    String,
    Date,
    Timestamp,
    Array,
    Any,
}

#[derive(Clone, Copy, Debug)]
pub struct ParamSpec {
    pub key: &'static str,
    pub kind: ParamKind,
    pub required: bool,
}

impl ParamSpec {
    pub const fn new(key: &'static str, kind: ParamKind, required: bool) -> Self {
        Self {
            key,
            kind,
            required,
        }
    }
}

/// Validated view over a generator's `params` object.
#[derive(Debug, Clone, Copy)]
pub struct ParamMap<'a> {
    map: Option<&'a Map<String, Value>>,
}

pub fn validate_params<'a>(
    params: Option<&'a Value>,
    specs: &[ParamSpec],
    ctx: &str,
) -> Result<ParamMap<'a>, GenerationError> {
    let map = match params {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) => Some(map),
        Some(_) => {
            return Err(GenerationError::InvalidModel(format!(
                "{ctx}: params must be a JSON object"
            )));
        }
    };

    if let Some(map) = map {
        for (key, value) in map {
            let Some(spec) = specs.iter().find(|spec| spec.key == key.as_str()) else {
                return Err(GenerationError::InvalidModel(format!(
                    "{ctx}: unknown param '{key}'"
                )));
            };
            validate_kind(ctx, key, spec.kind, value)?;
        }
    }

    for spec in specs {
        if spec.required && !map.is_some_and(|map| map.contains_key(spec.key)) {
            return Err(GenerationError::InvalidModel(format!(
                "{ctx}: missing required param '{}'",
                spec.key
            )));
        }
    }

    Ok(ParamMap { map })
}

impl<'a> ParamMap<'a> {
    pub fn get_value(&self, key: &str) -> Option<&'a Value> {
        self.map.and_then(|map| map.get(key))
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get_value(key).and_then(Value::as_i64)
    }

    pub fn get_u32(&self, key: &str) -> Option<u32> {
        self.get_value(key)
            .and_then(Value::as_u64)
            .and_then(|value| u32::try_from(value).ok())
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get_value(key).and_then(Value::as_f64)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get_value(key).and_then(Value::as_bool)
    }

    pub fn get_str(&self, key: &str) -> Option<&'a str> {
        self.get_value(key).and_then(Value::as_str)
    }

    pub fn get_array(&self, key: &str) -> Option<&'a Vec<Value>> {
        self.get_value(key).and_then(Value::as_array)
    }
}

fn validate_kind(ctx: &str, key: &str, kind: ParamKind, value: &Value) -> Result<(), GenerationError> {
    let valid = match kind {
        ParamKind::Bool => value.is_boolean(),
        ParamKind::Int => value.as_i64().is_some(),
        ParamKind::Float => value.as_f64().is_some(),
        ParamKind::String => value.is_string(),
        ParamKind::Date => value.as_str().and_then(parse_date_value).is_some(),
        ParamKind::Timestamp => value.as_str().and_then(parse_timestamp_value).is_some(),
        ParamKind::Array => value.is_array(),
        ParamKind::Any => true,
    };

    if valid {
        Ok(())
    } else {
        Err(GenerationError::InvalidModel(format!(
            "{ctx}: invalid value for param '{key}'"
        )))
    }
}

pub fn parse_date_value(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

pub fn parse_timestamp_value(value: &str) -> Option<NaiveDateTime> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.naive_utc())
        .or_else(|| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S").ok())
        .or_else(|| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").ok())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const SPECS: &[ParamSpec] = &[
        ParamSpec::new("min", ParamKind::Int, false),
        ParamSpec::new("field", ParamKind::String, true),
        ParamSpec::new("on", ParamKind::Date, false),
    ];

    #[test]
    fn accepts_known_params() {
        let params = json!({"min": 3, "field": "name", "on": "2024-02-29"});
        let map = validate_params(Some(&params), SPECS, "test").expect("valid");
        assert_eq!(map.get_i64("min"), Some(3));
        assert_eq!(map.get_str("field"), Some("name"));
    }

    #[test]
    fn rejects_unknown_missing_and_mistyped() {
        let unknown = json!({"field": "a", "extra": 1});
        assert!(validate_params(Some(&unknown), SPECS, "test").is_err());

        let missing = json!({"min": 1});
        let err = validate_params(Some(&missing), SPECS, "test").expect_err("missing");
        assert!(err.to_string().contains("missing required param 'field'"));

        let bad_date = json!({"field": "a", "on": "29/02/2024"});
        assert!(validate_params(Some(&bad_date), SPECS, "test").is_err());

        assert!(validate_params(Some(&json!([1])), SPECS, "test").is_err());
    }

    #[test]
    fn timestamps_accept_common_layouts() {
        assert!(parse_timestamp_value("2024-01-01T10:00:00Z").is_some());
        assert!(parse_timestamp_value("2024-01-01T10:00:00").is_some());
        assert!(parse_timestamp_value("2024-01-01 10:00:00").is_some());
        assert!(parse_timestamp_value("yesterday").is_none());
    }
}

use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use rand::Rng;
use rand_regex::Regex as RandRegex;
use serde_json::{Value, json};

use fakeit_core::Capability;

use super::{Generator, GeneratorRegistry, bound};
use crate::errors::GenerationError;
use crate::params::{
    ParamKind, ParamMap, ParamSpec, parse_date_value, parse_timestamp_value, validate_params,
};

const DEFAULT_INT_MIN: i64 = 0;
const DEFAULT_INT_MAX: i64 = 10000;
const DEFAULT_FLOAT_MIN: f64 = 0.0;
const DEFAULT_FLOAT_MAX: f64 = 10000.0;
const DEFAULT_MAX_REPEAT: u32 = 32;
const DATE_FORMAT: &str = "%Y-%m-%d";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const BOOL_PARAMS: &[ParamSpec] = &[ParamSpec::new("probability", ParamKind::Float, false)];
const INT_RANGE_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("min", ParamKind::Int, false),
    ParamSpec::new("max", ParamKind::Int, false),
];
const FLOAT_RANGE_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("min", ParamKind::Float, false),
    ParamSpec::new("max", ParamKind::Float, false),
    ParamSpec::new("scale", ParamKind::Int, false),
];
const SEQUENCE_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("start", ParamKind::Int, false),
    ParamSpec::new("step", ParamKind::Int, false),
];
const CONSTANT_PARAMS: &[ParamSpec] = &[ParamSpec::new("value", ParamKind::Any, true)];
const CHOICE_PARAMS: &[ParamSpec] = &[ParamSpec::new("values", ParamKind::Array, true)];
const TEXT_PATTERN_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("pattern", ParamKind::String, true),
    ParamSpec::new("max_repeat", ParamKind::Int, false),
];
const DATE_RANGE_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("min", ParamKind::Date, false),
    ParamSpec::new("max", ParamKind::Date, false),
];
const TIMESTAMP_RANGE_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("min", ParamKind::Timestamp, false),
    ParamSpec::new("max", ParamKind::Timestamp, false),
];

pub(super) fn register(registry: &mut GeneratorRegistry) {
    registry.register_generator(Box::new(BoolGenerator));
    registry.register_generator(Box::new(IntRangeGenerator));
    registry.register_generator(Box::new(FloatRangeGenerator));
    registry.register_generator(Box::new(UuidGenerator));
    registry.register_generator(Box::new(SequenceGenerator));
    registry.register_generator(Box::new(ConstantGenerator));
    registry.register_generator(Box::new(ChoiceGenerator));
    registry.register_generator(Box::new(TextPatternGenerator));
    registry.register_generator(Box::new(DateRangeGenerator));
    registry.register_generator(Box::new(TimestampRangeGenerator));
}

struct BoolGenerator;

impl Generator for BoolGenerator {
    fn id(&self) -> &'static str {
        "primitive.bool"
    }

    fn bind(&self, params: Option<&Value>) -> Result<Arc<dyn Capability>, GenerationError> {
        let params = validate_params(params, BOOL_PARAMS, self.id())?;
        let probability = params.get_f64("probability").unwrap_or(0.5);
        if !(0.0..=1.0).contains(&probability) {
            return Err(GenerationError::InvalidModel(format!(
                "{} probability must be within [0, 1]",
                self.id()
            )));
        }
        Ok(bound(self.id(), move |ctx| {
            Ok(Value::Bool(ctx.rng().random_bool(probability)))
        }))
    }
}

struct IntRangeGenerator;

impl Generator for IntRangeGenerator {
    fn id(&self) -> &'static str {
        "primitive.int"
    }

    fn bind(&self, params: Option<&Value>) -> Result<Arc<dyn Capability>, GenerationError> {
        let params = validate_params(params, INT_RANGE_PARAMS, self.id())?;
        let min = params.get_i64("min").unwrap_or(DEFAULT_INT_MIN);
        let max = params.get_i64("max").unwrap_or(DEFAULT_INT_MAX);
        check_order(self.id(), min, max)?;
        Ok(bound(self.id(), move |ctx| {
            Ok(json!(ctx.rng().random_range(min..=max)))
        }))
    }
}

struct FloatRangeGenerator;

impl Generator for FloatRangeGenerator {
    fn id(&self) -> &'static str {
        "primitive.float"
    }

    fn bind(&self, params: Option<&Value>) -> Result<Arc<dyn Capability>, GenerationError> {
        let params = validate_params(params, FLOAT_RANGE_PARAMS, self.id())?;
        let min = params.get_f64("min").unwrap_or(DEFAULT_FLOAT_MIN);
        let max = params.get_f64("max").unwrap_or(DEFAULT_FLOAT_MAX);
        if !min.is_finite() || !max.is_finite() {
            return Err(GenerationError::InvalidModel(format!(
                "{} bounds must be finite",
                self.id()
            )));
        }
        check_order(self.id(), min, max)?;
        if !(max - min).is_finite() {
            return Err(GenerationError::InvalidModel(format!(
                "{} range [{min}, {max}] is too wide to sample",
                self.id()
            )));
        }
        let scale = match params.get_i64("scale") {
            None => None,
            Some(scale) if (0..=12).contains(&scale) => Some(scale as i32),
            Some(_) => {
                return Err(GenerationError::InvalidModel(format!(
                    "{} scale must be within [0, 12]",
                    self.id()
                )));
            }
        };
        Ok(bound(self.id(), move |ctx| {
            let value = ctx.rng().random_range(min..=max);
            let value = match scale {
                Some(scale) => {
                    let factor = 10_f64.powi(scale);
                    (value * factor).round() / factor
                }
                None => value,
            };
            Ok(json!(value))
        }))
    }
}

struct UuidGenerator;

impl Generator for UuidGenerator {
    fn id(&self) -> &'static str {
        "primitive.uuid"
    }

    fn bind(&self, params: Option<&Value>) -> Result<Arc<dyn Capability>, GenerationError> {
        validate_params(params, &[], self.id())?;
        Ok(bound(self.id(), |ctx| {
            let mut bytes = [0_u8; 16];
            ctx.rng().fill_bytes(&mut bytes);
            bytes[6] = (bytes[6] & 0x0f) | 0x40;
            bytes[8] = (bytes[8] & 0x3f) | 0x80;
            Ok(Value::String(uuid::Uuid::from_bytes(bytes).to_string()))
        }))
    }
}

struct SequenceGenerator;

impl Generator for SequenceGenerator {
    fn id(&self) -> &'static str {
        "primitive.sequence"
    }

    fn bind(&self, params: Option<&Value>) -> Result<Arc<dyn Capability>, GenerationError> {
        let params = validate_params(params, SEQUENCE_PARAMS, self.id())?;
        let start = params.get_i64("start").unwrap_or(1);
        let step = params.get_i64("step").unwrap_or(1);
        if step == 0 {
            return Err(GenerationError::InvalidModel(format!(
                "{} step must be non-zero",
                self.id()
            )));
        }
        Ok(bound(self.id(), move |ctx| {
            let index = i64::try_from(ctx.index()).unwrap_or(i64::MAX);
            Ok(json!(start.saturating_add(index.saturating_mul(step))))
        }))
    }
}

struct ConstantGenerator;

impl Generator for ConstantGenerator {
    fn id(&self) -> &'static str {
        "primitive.constant"
    }

    fn bind(&self, params: Option<&Value>) -> Result<Arc<dyn Capability>, GenerationError> {
        let params = validate_params(params, CONSTANT_PARAMS, self.id())?;
        let value = params.get_value("value").cloned().unwrap_or(Value::Null);
        Ok(bound(self.id(), move |_| Ok(value.clone())))
    }
}

struct ChoiceGenerator;

impl Generator for ChoiceGenerator {
    fn id(&self) -> &'static str {
        "primitive.choice"
    }

    fn bind(&self, params: Option<&Value>) -> Result<Arc<dyn Capability>, GenerationError> {
        let params = validate_params(params, CHOICE_PARAMS, self.id())?;
        let values = params.get_array("values").cloned().unwrap_or_default();
        if values.is_empty() {
            return Err(GenerationError::InvalidModel(format!(
                "{} values must not be empty",
                self.id()
            )));
        }
        Ok(bound(self.id(), move |ctx| {
            let idx = ctx.rng().random_range(0..values.len());
            Ok(values[idx].clone())
        }))
    }
}

struct TextPatternGenerator;

impl Generator for TextPatternGenerator {
    fn id(&self) -> &'static str {
        "primitive.text.pattern"
    }

    fn bind(&self, params: Option<&Value>) -> Result<Arc<dyn Capability>, GenerationError> {
        let params = validate_params(params, TEXT_PATTERN_PARAMS, self.id())?;
        let pattern = params.get_str("pattern").ok_or_else(|| {
            GenerationError::InvalidModel(format!("{} requires params.pattern", self.id()))
        })?;
        let max_repeat = parse_max_repeat(&params, self.id())?;
        let regex = RandRegex::compile(pattern, max_repeat).map_err(|err| {
            GenerationError::InvalidModel(format!(
                "invalid regex pattern for {}: {}",
                self.id(),
                err
            ))
        })?;
        Ok(bound(self.id(), move |ctx| {
            let value: String = ctx.rng().sample(&regex);
            Ok(Value::String(value))
        }))
    }
}

struct DateRangeGenerator;

impl Generator for DateRangeGenerator {
    fn id(&self) -> &'static str {
        "primitive.date"
    }

    fn bind(&self, params: Option<&Value>) -> Result<Arc<dyn Capability>, GenerationError> {
        let params = validate_params(params, DATE_RANGE_PARAMS, self.id())?;
        let default_min = base_date();
        let min = params
            .get_str("min")
            .and_then(parse_date_value)
            .unwrap_or(default_min);
        let max = params
            .get_str("max")
            .and_then(parse_date_value)
            .unwrap_or(min + Duration::days(365));
        check_order(self.id(), min, max)?;
        let span = (max - min).num_days().max(0);
        Ok(bound(self.id(), move |ctx| {
            let offset = ctx.rng().random_range(0..=span);
            let date = min + Duration::days(offset);
            Ok(Value::String(date.format(DATE_FORMAT).to_string()))
        }))
    }
}

struct TimestampRangeGenerator;

impl Generator for TimestampRangeGenerator {
    fn id(&self) -> &'static str {
        "primitive.timestamp"
    }

    fn bind(&self, params: Option<&Value>) -> Result<Arc<dyn Capability>, GenerationError> {
        let params = validate_params(params, TIMESTAMP_RANGE_PARAMS, self.id())?;
        let default_min = NaiveDateTime::new(base_date(), NaiveTime::default());
        let min = params
            .get_str("min")
            .and_then(parse_timestamp_value)
            .unwrap_or(default_min);
        let max = params
            .get_str("max")
            .and_then(parse_timestamp_value)
            .unwrap_or(min + Duration::days(365));
        check_order(self.id(), min, max)?;
        let span = (max - min).num_seconds().max(0);
        Ok(bound(self.id(), move |ctx| {
            let offset = ctx.rng().random_range(0..=span);
            let timestamp = min + Duration::seconds(offset);
            Ok(Value::String(timestamp.format(TIMESTAMP_FORMAT).to_string()))
        }))
    }
}

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default()
}

fn check_order<T: PartialOrd>(id: &str, min: T, max: T) -> Result<(), GenerationError> {
    if min > max {
        return Err(GenerationError::InvalidModel(format!(
            "{id} min must be <= max"
        )));
    }
    Ok(())
}

fn parse_max_repeat(params: &ParamMap<'_>, ctx: &str) -> Result<u32, GenerationError> {
    match params.get_i64("max_repeat") {
        None => Ok(DEFAULT_MAX_REPEAT),
        Some(value) if value <= 0 => Err(GenerationError::InvalidModel(format!(
            "{ctx}: max_repeat must be > 0"
        ))),
        Some(value) => u32::try_from(value)
            .map_err(|_| GenerationError::InvalidModel(format!("{ctx}: max_repeat must fit u32"))),
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use fakeit_core::GenerationContext;

    use super::*;

    fn sample(id: &str, params: Value, index: u64) -> Value {
        let registry = GeneratorRegistry::new();
        let capability = registry.bind(id, Some(&params)).expect("bind");
        let mut rng = ChaCha8Rng::seed_from_u64(index);
        let mut ctx = GenerationContext::new("m", index, &mut rng);
        capability.generate(&mut ctx).expect("value")
    }

    fn is_plate(value: &str) -> bool {
        value.len() == 7
            && value.starts_with("AB-")
            && value[3..].chars().all(|ch| ch.is_ascii_digit())
    }

    #[test]
    fn ranges_are_inclusive_and_respected() {
        for index in 0..50 {
            let value = sample("primitive.int", json!({"min": -2, "max": 2}), index);
            let value = value.as_i64().expect("int");
            assert!((-2..=2).contains(&value));

            let value = sample("primitive.float", json!({"min": 1.0, "max": 2.0, "scale": 2}), index);
            let value = value.as_f64().expect("float");
            assert!((1.0..=2.0).contains(&value));
            assert_eq!((value * 100.0).round() / 100.0, value);
        }
    }

    #[test]
    fn sequence_follows_index() {
        assert_eq!(sample("primitive.sequence", json!({}), 0), json!(1));
        assert_eq!(
            sample("primitive.sequence", json!({"start": 100, "step": 5}), 4),
            json!(120)
        );
    }

    #[test]
    fn pattern_dates_and_choices() {
        let value = sample("primitive.text.pattern", json!({"pattern": "AB-[0-9]{4}"}), 3);
        assert!(is_plate(value.as_str().expect("text")));

        let value = sample(
            "primitive.date",
            json!({"min": "2024-03-01", "max": "2024-03-01"}),
            1,
        );
        assert_eq!(value, json!("2024-03-01"));

        let value = sample("primitive.choice", json!({"values": ["a", "b"]}), 9);
        assert!(value == json!("a") || value == json!("b"));

        let value = sample("primitive.uuid", json!({}), 2);
        let parsed = uuid::Uuid::parse_str(value.as_str().expect("uuid")).expect("valid uuid");
        assert_eq!(parsed.get_version_num(), 4);
    }

    #[test]
    fn extreme_float_bounds_still_sample() {
        let value = sample("primitive.float", json!({"min": -1e300, "max": 1e300}), 0);
        let value = value.as_f64().expect("float");
        assert!((-1e300..=1e300).contains(&value));
    }

    #[test]
    fn invalid_params_are_rejected() {
        let registry = GeneratorRegistry::new();
        for (id, params) in [
            ("primitive.bool", json!({"probability": 2.0})),
            ("primitive.sequence", json!({"step": 0})),
            ("primitive.choice", json!({"values": []})),
            ("primitive.constant", json!({})),
            ("primitive.text.pattern", json!({"pattern": "("})),
            ("primitive.date", json!({"min": "2024-05-01", "max": "2024-01-01"})),
            ("primitive.float", json!({"min": -1e308, "max": 1e308})),
        ] {
            assert!(registry.bind(id, Some(&params)).is_err(), "{id} accepted {params}");
        }
    }
}

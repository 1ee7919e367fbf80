//! Deterministic value generation keyed by a path string.
//!
//! Every value is a pure function of its path: the path is hashed into a seed for a fresh
//! `ChaCha8Rng`, so the same path always yields the same value and no state is shared.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde_json::{Map, Number, Value};

use seedwright_core::{ColumnKind, DataModel, GeneratedValue, ScalarField};
use seedwright_plan::{Fingerprint, FingerprintField};

use crate::errors::{GenerationError, Result};
use crate::shapes::Shape;

const DEFAULT_MIN_YEAR: i32 = 2020;
const DEFAULT_MAX_YEAR: i32 = 2025;
const DEFAULT_TEXT_WORDS: usize = 3;

/// Everything the generator needs to know about one column, computed once per model.
#[derive(Debug, Clone)]
pub struct ColumnProfile {
    pub field: ScalarField,
    pub kind: ColumnKind,
    pub shape: Option<Shape>,
    pub enum_labels: Vec<String>,
    pub fingerprint: Option<FingerprintField>,
}

impl ColumnProfile {
    pub fn column(&self) -> &str {
        &self.field.column_name
    }

    /// True when the fingerprint pins this column to explicit options or a JSON shape.
    pub fn has_override(&self) -> bool {
        self.fingerprint
            .as_ref()
            .is_some_and(|entry| entry.options.is_some() || entry.schema.is_some())
    }
}

/// Column profiles of one model, in field order.
#[derive(Debug, Clone, Default)]
pub struct ModelProfile {
    pub columns: Vec<ColumnProfile>,
    /// Columns referenced by a foreign key elsewhere; never left to the database default.
    pub referenced: BTreeSet<String>,
}

impl ModelProfile {
    pub fn column(&self, field_name: &str) -> Option<&ColumnProfile> {
        self.columns.iter().find(|profile| profile.field.name == field_name)
    }
}

/// Profiles for every model of the data model.
pub fn build_profiles(
    data_model: &DataModel,
    fingerprint: &Fingerprint,
) -> BTreeMap<String, ModelProfile> {
    let mut referenced: BTreeMap<&str, BTreeSet<String>> = BTreeMap::new();
    for relation in data_model.relations() {
        referenced
            .entry(relation.target)
            .or_default()
            .extend(relation.to_columns.iter().cloned());
    }

    data_model
        .models
        .iter()
        .map(|(id, model)| {
            let columns = model
                .scalar_fields()
                .map(|field| {
                    let kind = ColumnKind::classify(
                        &field.column_type,
                        data_model.dialect,
                        &data_model.enums,
                    );
                    let enum_labels = match &kind {
                        ColumnKind::Enum(name) => data_model
                            .enum_labels(name)
                            .unwrap_or_default()
                            .into_iter()
                            .map(str::to_string)
                            .collect(),
                        _ => Vec::new(),
                    };
                    ColumnProfile {
                        shape: Shape::detect(&field.column_name, &kind),
                        kind,
                        enum_labels,
                        fingerprint: fingerprint.field(id, &field.name).cloned(),
                        field: field.clone(),
                    }
                })
                .collect();
            let profile = ModelProfile {
                columns,
                referenced: referenced.remove(id.as_str()).unwrap_or_default(),
            };
            (id.clone(), profile)
        })
        .collect()
}

pub fn hash_seed(seed: u64, key: &str) -> u64 {
    let mut hash = seed ^ 0xcbf29ce484222325;
    for byte in key.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

/// RNG for a path. Two calls with the same path produce the same stream.
pub fn rng_for(path: &str) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(hash_seed(0, path))
}

/// Integer in `min..=max` for a path.
pub fn int_in_range(path: &str, min: i64, max: i64) -> i64 {
    if max <= min {
        return min;
    }
    rng_for(path).random_range(min..=max)
}

/// Index into a collection of `len` items for a path.
pub fn pick_index(path: &str, len: usize) -> usize {
    if len <= 1 {
        return 0;
    }
    rng_for(path).random_range(0..len)
}

/// Generate a value for `profile` at `path`.
pub fn generate(path: &str, model: &str, profile: &ColumnProfile) -> Result<GeneratedValue> {
    let mut rng = rng_for(path);
    let fingerprint = profile.fingerprint.as_ref();
    let options = fingerprint.and_then(|entry| entry.options.as_ref());

    if let Some(values) = options.and_then(|options| options.values.as_ref())
        && !values.is_empty()
    {
        let choice = &values[rng.random_range(0..values.len())];
        return GeneratedValue::from_json(choice, &profile.kind).map_err(|message| {
            GenerationError::InvalidPlan(format!(
                "fingerprint option for {model}.{}: {message}",
                profile.field.name
            ))
        });
    }

    let min = options.and_then(|options| options.min);
    let max = options.and_then(|options| options.max);
    let years = (
        options.and_then(|options| options.min_year).unwrap_or(DEFAULT_MIN_YEAR),
        options.and_then(|options| options.max_year).unwrap_or(DEFAULT_MAX_YEAR),
    );

    let value = match &profile.kind {
        ColumnKind::Json => {
            let template = fingerprint.and_then(|entry| entry.schema.as_ref());
            GeneratedValue::Json(match template {
                Some(template) => fill_json_shape(template, &mut rng),
                None => default_json(&mut rng),
            })
        }
        ColumnKind::Enum(name) => {
            if profile.enum_labels.is_empty() {
                return Err(unsupported(model, profile, name));
            }
            let idx = rng.random_range(0..profile.enum_labels.len());
            GeneratedValue::Text(profile.enum_labels[idx].clone())
        }
        ColumnKind::Array(inner) => {
            let len = rng.random_range(1..=3);
            let element = ColumnProfile {
                kind: (**inner).clone(),
                shape: None,
                fingerprint: None,
                ..profile.clone()
            };
            let mut items = Vec::with_capacity(len);
            for idx in 0..len {
                items.push(generate(&format!("{path}/{idx}"), model, &element)?);
            }
            GeneratedValue::Array(items)
        }
        kind => scalar_for_kind(kind, profile, &mut rng, (min, max), years)
            .ok_or_else(|| unsupported(model, profile, &profile.field.column_type))?,
    };

    Ok(value)
}

fn unsupported(model: &str, profile: &ColumnProfile, column_type: &str) -> GenerationError {
    GenerationError::UnsupportedFieldShape {
        model: model.to_string(),
        field: profile.field.name.clone(),
        column_type: column_type.to_string(),
    }
}

fn scalar_for_kind(
    kind: &ColumnKind,
    profile: &ColumnProfile,
    rng: &mut ChaCha8Rng,
    (min, max): (Option<f64>, Option<f64>),
    (min_year, max_year): (i32, i32),
) -> Option<GeneratedValue> {
    let value = match kind {
        ColumnKind::SmallInt | ColumnKind::Int | ColumnKind::BigInt => {
            let ceiling = if *kind == ColumnKind::SmallInt { 32_767 } else { 100_000 };
            let low = min.map(|value| value.ceil() as i64).unwrap_or(1);
            let high = max.map(|value| value.floor() as i64).unwrap_or(ceiling);
            GeneratedValue::Int(if high <= low { low } else { rng.random_range(low..=high) })
        }
        ColumnKind::Float => {
            let low = min.unwrap_or(0.0);
            let high = max.unwrap_or(10_000.0);
            GeneratedValue::Float(if high <= low { low } else { rng.random_range(low..=high) })
        }
        ColumnKind::Decimal { scale } => {
            let low = min.unwrap_or(0.0);
            let high = max.unwrap_or(10_000.0);
            let raw = if high <= low { low } else { rng.random_range(low..=high) };
            let factor = 10_f64.powi(scale.unwrap_or(2) as i32);
            GeneratedValue::Float((raw * factor).round() / factor)
        }
        ColumnKind::Bool => GeneratedValue::Bool(rng.random_bool(0.5)),
        ColumnKind::Uuid => GeneratedValue::Uuid(random_uuid(rng)),
        ColumnKind::Date => GeneratedValue::Date(random_date(rng, min_year, max_year)),
        ColumnKind::Time => GeneratedValue::Time(random_time(rng)),
        ColumnKind::Timestamp { .. } => GeneratedValue::Timestamp(NaiveDateTime::new(
            random_date(rng, min_year, max_year),
            random_time(rng),
        )),
        ColumnKind::Text { max_len } => {
            let mut text = match profile.shape {
                Some(shape) => shape.generate(rng),
                None => lorem_text(rng, &profile.field.column_name),
            };
            if let Some(max_len) = max_len {
                truncate_chars(&mut text, *max_len as usize);
            }
            GeneratedValue::Text(text)
        }
        ColumnKind::Bytes => {
            let mut bytes = [0_u8; 16];
            rng.fill_bytes(&mut bytes);
            GeneratedValue::Bytes(bytes.to_vec())
        }
        ColumnKind::Json
        | ColumnKind::Enum(_)
        | ColumnKind::Array(_)
        | ColumnKind::Unknown(_) => return None,
    };
    Some(value)
}

/// Make a retried unique value distinct when its shape allows it.
///
/// Values picked from fingerprint options are returned unchanged so they stay in the list.
pub fn disambiguate(profile: &ColumnProfile, value: GeneratedValue, attempt: u32) -> GeneratedValue {
    if profile.has_override() {
        return value;
    }
    match (profile.shape, value) {
        (Some(shape), GeneratedValue::Text(text)) if attempt > 0 => {
            let mut text = shape.disambiguate(&text, attempt);
            if let ColumnKind::Text { max_len: Some(max_len) } = profile.kind {
                truncate_chars(&mut text, max_len as usize);
            }
            GeneratedValue::Text(text)
        }
        (_, value) => value,
    }
}

pub fn random_uuid(rng: &mut ChaCha8Rng) -> String {
    let mut bytes = [0_u8; 16];
    rng.fill_bytes(&mut bytes);
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;
    uuid::Uuid::from_bytes(bytes).to_string()
}

fn random_date(rng: &mut ChaCha8Rng, min_year: i32, max_year: i32) -> NaiveDate {
    let (low, high) = if max_year < min_year {
        (max_year, min_year)
    } else {
        (min_year, max_year)
    };
    let start = NaiveDate::from_ymd_opt(low, 1, 1).unwrap_or_default();
    let end = NaiveDate::from_ymd_opt(high, 12, 31).unwrap_or(start);
    let span = (end - start).num_days().max(0);
    start + Duration::days(rng.random_range(0..=span))
}

fn random_time(rng: &mut ChaCha8Rng) -> NaiveTime {
    let seconds = rng.random_range(0..86_400);
    NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0).unwrap_or_default()
}

fn lorem_text(rng: &mut ChaCha8Rng, column: &str) -> String {
    use fake::Fake;
    use fake::faker::lorem::en::Words;

    let words: Vec<String> = Words(DEFAULT_TEXT_WORDS..DEFAULT_TEXT_WORDS + 1).fake_with_rng(rng);
    if words.is_empty() {
        format!("{column}_{}", rng.random::<u32>())
    } else {
        words.join(" ")
    }
}

fn truncate_chars(text: &mut String, max_len: usize) {
    if let Some((idx, _)) = text.char_indices().nth(max_len) {
        text.truncate(idx);
    }
}

/// Fill a JSON template: every leaf is replaced by a value of the same JSON type.
fn fill_json_shape(template: &Value, rng: &mut ChaCha8Rng) -> Value {
    match template {
        Value::Null => Value::Null,
        Value::Bool(_) => Value::Bool(rng.random_bool(0.5)),
        Value::Number(number) if number.is_f64() => Number::from_f64(rng.random_range(0.0..1000.0))
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Value::Number(_) => Value::from(rng.random_range(0..1000_i64)),
        Value::String(_) => {
            use fake::Fake;
            use fake::faker::lorem::en::Word;
            Value::String(Word().fake_with_rng(rng))
        }
        Value::Array(items) => match items.first() {
            Some(item) => {
                let len = rng.random_range(1..=3);
                Value::Array((0..len).map(|_| fill_json_shape(item, rng)).collect())
            }
            None => Value::Array(Vec::new()),
        },
        Value::Object(fields) => {
            let mut filled = Map::new();
            for (key, value) in fields {
                filled.insert(key.clone(), fill_json_shape(value, rng));
            }
            Value::Object(filled)
        }
    }
}

fn default_json(rng: &mut ChaCha8Rng) -> Value {
    use fake::Fake;
    use fake::faker::lorem::en::Word;

    let mut object = Map::new();
    let key: String = Word().fake_with_rng(rng);
    object.insert(key, Value::from(rng.random_range(0..1000_i64)));
    Value::Object(object)
}

#![forbid(unsafe_code)]

use crate::error::{EncodeError, EncodeResult};
use std::fmt;
use std::sync::Arc;

/// Largest integer magnitude an `f64` represents exactly (2^53 - 1).
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// A dynamically typed input value.
///
/// `Number` mirrors a double-precision number; integers that need exact 64-bit
/// handling travel as `BigInt`.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Boolean(bool),
    Number(f64),
    BigInt(i128),
    String(Arc<str>),
    List(Vec<Value>),
    Struct(Record),
}

/// Coarse category of a [`Value`], used in diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Boolean,
    Number,
    BigInt,
    String,
    List,
    Struct,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValueKind::Null => "null",
            ValueKind::Boolean => "boolean",
            ValueKind::Number => "number",
            ValueKind::BigInt => "bigint",
            ValueKind::String => "string",
            ValueKind::List => "list",
            ValueKind::Struct => "struct",
        })
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Number(_) => ValueKind::Number,
            Value::BigInt(_) => ValueKind::BigInt,
            Value::String(_) => ValueKind::String,
            Value::List(_) => ValueKind::List,
            Value::Struct(_) => ValueKind::Struct,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Text form used when numbers are stored in a UTF-8 column.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::Null | Value::List(_) | Value::Struct(_) => None,
            Value::Boolean(b) => Some(b.to_string()),
            Value::Number(n) => Some(number_to_string(*n)),
            Value::BigInt(n) => Some(n.to_string()),
            Value::String(s) => Some(s.to_string()),
        }
    }

    /// Convert a JSON document into a value.
    ///
    /// Integers beyond the exactly representable double range become `BigInt`.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    if (i as f64).abs() > MAX_SAFE_INTEGER {
                        return Value::BigInt(i as i128);
                    }
                    return Value::Number(i as f64);
                }
                if let Some(u) = n.as_u64() {
                    if u as f64 > MAX_SAFE_INTEGER {
                        return Value::BigInt(u as i128);
                    }
                    return Value::Number(u as f64);
                }
                Value::Number(n.as_f64().unwrap_or(f64::NAN))
            }
            serde_json::Value::String(s) => Value::String(Arc::from(s.as_str())),
            serde_json::Value::Array(items) => Value::List(items.iter().map(Value::from_json).collect()),
            serde_json::Value::Object(map) => Value::Struct(
                map.iter()
                    .map(|(k, v)| (Arc::<str>::from(k.as_str()), Value::from_json(v)))
                    .collect(),
            ),
        }
    }
}

/// Render a number the way a JavaScript runtime would: `1` rather than `1.0`,
/// `NaN`, `Infinity`, and exponent form (`1e+21`, `1.5e-7`) outside
/// `[1e-6, 1e21)`.
pub(crate) fn number_to_string(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_owned()
    } else if v.is_infinite() {
        let text = if v > 0.0 { "Infinity" } else { "-Infinity" };
        text.to_owned()
    } else if v == 0.0 {
        "0".to_owned()
    } else if v.abs() >= 1e21 || v.abs() < 1e-6 {
        let text = format!("{v:e}");
        match text.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
            _ => text,
        }
    } else {
        format!("{v}")
    }
}

macro_rules! impl_from_number {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Number(v as f64)
            }
        })*
    };
}

macro_rules! impl_from_bigint {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::BigInt(v as i128)
            }
        })*
    };
}

impl_from_number!(i8, i16, i32, u8, u16, u32, f32, f64);
impl_from_bigint!(i64, u64, i128);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(Arc::from(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(Arc::from(v))
    }
}

impl From<Arc<str>> for Value {
    fn from(v: Arc<str>) -> Self {
        Value::String(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl From<Record> for Value {
    fn from(v: Record) -> Self {
        Value::Struct(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// An ordered set of named values: one row of a row array, or a struct value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record {
    fields: Vec<(Arc<str>, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or replace a field, keeping the original key position on replace.
    pub fn insert(&mut self, name: &str, value: impl Into<Value>) {
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| k.as_ref() == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((Arc::from(name), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_ref(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn from_json(json: &serde_json::Value) -> EncodeResult<Record> {
        match Value::from_json(json) {
            Value::Struct(record) => Ok(record),
            other => Err(EncodeError::UnsupportedInputType(format!(
                "expected an object row, found {}",
                other.kind()
            ))),
        }
    }
}

impl<K: AsRef<str>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.insert(k.as_ref(), v);
        }
        record
    }
}

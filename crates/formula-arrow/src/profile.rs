#![forbid(unsafe_code)]

use crate::error::{EncodeError, EncodeResult};
use crate::types::DataType;
use crate::value::{Value, ValueKind};

/// Classification lattice for a value stream.
///
/// Transitions only move "up": integer ranges widen, integers may escalate to
/// floats or 64-bit integers, and any scalar other than a boolean may escalate
/// to UTF-8.
#[derive(Clone, Debug, PartialEq)]
enum Class {
    Empty,
    Boolean,
    /// Integral numbers; min/max are exact because they are integral doubles.
    Integer { min: f64, max: f64 },
    Float,
    /// Exact 64-bit candidate range.
    BigInt { min: i128, max: i128 },
    Utf8,
    Nested,
}

/// Infers the narrowest sufficient [`DataType`] for a stream of values.
///
/// Incompatible combinations are remembered and reported by
/// [`Profiler::data_type`], so `add` never fails mid-scan.
#[derive(Clone, Debug)]
pub struct Profiler {
    class: Class,
    count: usize,
    nulls: usize,
    conflict: Option<(String, ValueKind)>,
}

impl Default for Profiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Profiler {
    pub fn new() -> Self {
        Self {
            class: Class::Empty,
            count: 0,
            nulls: 0,
            conflict: None,
        }
    }

    /// Convenience: profile every value of an iterator.
    pub fn profile<'a>(values: impl IntoIterator<Item = &'a Value>) -> Self {
        let mut p = Self::new();
        for v in values {
            p.add(v);
        }
        p
    }

    pub fn add(&mut self, value: &Value) {
        if value.is_null() {
            self.nulls += 1;
            return;
        }
        self.count += 1;
        if self.conflict.is_some() {
            return;
        }

        let class = std::mem::replace(&mut self.class, Class::Empty);
        self.class = match step(class, value) {
            Ok(next) => next,
            Err((prev, hypothesis)) => {
                self.conflict = Some((hypothesis, value.kind()));
                prev
            }
        };
    }

    /// Count of null values observed.
    pub fn null_count(&self) -> usize {
        self.nulls
    }

    /// Count of non-null values observed.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_nullable(&self) -> bool {
        self.nulls > 0
    }

    /// Resolve the final type for everything observed so far.
    pub fn data_type(&self) -> EncodeResult<DataType> {
        if let Some((expected, found)) = &self.conflict {
            return Err(EncodeError::TypeConflict {
                expected: expected.clone(),
                found: *found,
            });
        }

        match &self.class {
            Class::Empty => Ok(DataType::Null),
            Class::Boolean => Ok(DataType::Boolean),
            Class::Integer { min, max } => Ok(integer_type(*min, *max)),
            Class::Float => Ok(DataType::Float64),
            Class::BigInt { min, max } => bigint_type(*min, *max),
            Class::Utf8 => Ok(DataType::Utf8),
            Class::Nested => Err(EncodeError::NestedTypeRequired),
        }
    }
}

/// One lattice transition. On conflict, hands back the unchanged class and the
/// name of the hypothesis that rejected the value.
fn step(class: Class, value: &Value) -> Result<Class, (Class, String)> {
    let next = match (&class, value) {
        (_, Value::Null) => return Ok(class),
        (Class::Nested, _) | (_, Value::List(_) | Value::Struct(_)) => Class::Nested,

        (Class::Empty | Class::Boolean, Value::Boolean(_)) => Class::Boolean,
        (Class::Boolean, _) => return Err((class, "boolean".to_owned())),
        (_, Value::Boolean(_)) => {
            let name = hypothesis_name(&class);
            return Err((class, name));
        }

        (Class::Empty | Class::Utf8, Value::String(_)) => Class::Utf8,
        (Class::Utf8, _) => Class::Utf8,
        (_, Value::String(_)) => Class::Utf8,

        (Class::Empty, Value::Number(n)) => number_class(*n),
        (Class::Integer { min, max }, Value::Number(n)) => {
            if is_integral(*n) {
                Class::Integer {
                    min: min.min(*n),
                    max: max.max(*n),
                }
            } else {
                Class::Float
            }
        }
        (Class::Float, Value::Number(_)) => Class::Float,
        (Class::BigInt { min, max }, Value::Number(n)) => {
            if !is_integral(*n) {
                return Err((class, "bigint".to_owned()));
            }
            let n = *n as i128;
            Class::BigInt {
                min: (*min).min(n),
                max: (*max).max(n),
            }
        }

        (Class::Empty, Value::BigInt(n)) => Class::BigInt { min: *n, max: *n },
        (Class::Integer { min, max }, Value::BigInt(n)) => Class::BigInt {
            min: (*min as i128).min(*n),
            max: (*max as i128).max(*n),
        },
        (Class::BigInt { min, max }, Value::BigInt(n)) => Class::BigInt {
            min: (*min).min(*n),
            max: (*max).max(*n),
        },
        (Class::Float, Value::BigInt(_)) => return Err((class, "float64".to_owned())),
    };
    Ok(next)
}

fn hypothesis_name(class: &Class) -> String {
    match class {
        Class::Empty => "null",
        Class::Boolean => "boolean",
        Class::Integer { .. } => "integer",
        Class::Float => "float64",
        Class::BigInt { .. } => "bigint",
        Class::Utf8 => "utf8",
        Class::Nested => "nested",
    }
    .to_owned()
}

fn is_integral(n: f64) -> bool {
    n.is_finite() && n.fract() == 0.0
}

fn number_class(n: f64) -> Class {
    if is_integral(n) {
        Class::Integer { min: n, max: n }
    } else {
        Class::Float
    }
}

/// Non-negative ranges prefer unsigned widths, ranges with negatives use
/// signed widths; anything beyond 32 bits becomes a double.
fn integer_type(min: f64, max: f64) -> DataType {
    if min >= 0.0 {
        if max <= u8::MAX as f64 {
            DataType::UInt8
        } else if max <= u16::MAX as f64 {
            DataType::UInt16
        } else if max <= u32::MAX as f64 {
            DataType::UInt32
        } else {
            DataType::Float64
        }
    } else if min >= i8::MIN as f64 && max <= i8::MAX as f64 {
        DataType::Int8
    } else if min >= i16::MIN as f64 && max <= i16::MAX as f64 {
        DataType::Int16
    } else if min >= i32::MIN as f64 && max <= i32::MAX as f64 {
        DataType::Int32
    } else {
        DataType::Float64
    }
}

fn bigint_type(min: i128, max: i128) -> EncodeResult<DataType> {
    if min >= i64::MIN as i128 && max <= i64::MAX as i128 {
        return Ok(DataType::Int64);
    }
    if min >= 0 && max <= u64::MAX as i128 {
        return Ok(DataType::UInt64);
    }
    let value = if max > u64::MAX as i128 || (min < 0 && max > i64::MAX as i128) {
        max
    } else {
        min
    };
    Err(EncodeError::RangeOverflow { value })
}

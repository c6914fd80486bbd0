#![forbid(unsafe_code)]

use crate::error::{EncodeError, EncodeResult};
use std::fmt;
use std::str::FromStr;

/// Integer width used for dictionary codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndexType {
    Int8,
    Int16,
    Int32,
    Int64,
}

impl IndexType {
    /// Number of distinct dictionary entries addressable by non-negative codes.
    pub fn capacity(self) -> u64 {
        match self {
            IndexType::Int8 => i8::MAX as u64 + 1,
            IndexType::Int16 => i16::MAX as u64 + 1,
            IndexType::Int32 => i32::MAX as u64 + 1,
            IndexType::Int64 => i64::MAX as u64,
        }
    }

    /// The narrowest index type able to address `distinct` entries.
    pub fn smallest_for(distinct: usize) -> IndexType {
        let distinct = distinct as u64;
        [IndexType::Int8, IndexType::Int16, IndexType::Int32]
            .into_iter()
            .find(|t| distinct <= t.capacity())
            .unwrap_or(IndexType::Int64)
    }

    pub fn data_type(self) -> DataType {
        match self {
            IndexType::Int8 => DataType::Int8,
            IndexType::Int16 => DataType::Int16,
            IndexType::Int32 => DataType::Int32,
            IndexType::Int64 => DataType::Int64,
        }
    }
}

impl fmt::Display for IndexType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.data_type().fmt(f)
    }
}

/// Logical type of an encoded column.
///
/// Dictionary columns always carry UTF-8 values; only the code width varies.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum DataType {
    Null,
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Utf8,
    Dictionary(IndexType),
    List(Box<Field>),
    Struct(Vec<Field>),
}

impl DataType {
    /// `List<item>` with a nullable child.
    pub fn list(item: DataType) -> DataType {
        DataType::List(Box::new(Field::new("item", item, true)))
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Null => f.write_str("null"),
            DataType::Boolean => f.write_str("bool"),
            DataType::Int8 => f.write_str("int8"),
            DataType::Int16 => f.write_str("int16"),
            DataType::Int32 => f.write_str("int32"),
            DataType::Int64 => f.write_str("int64"),
            DataType::UInt8 => f.write_str("uint8"),
            DataType::UInt16 => f.write_str("uint16"),
            DataType::UInt32 => f.write_str("uint32"),
            DataType::UInt64 => f.write_str("uint64"),
            DataType::Float32 => f.write_str("float32"),
            DataType::Float64 => f.write_str("float64"),
            DataType::Utf8 => f.write_str("utf8"),
            DataType::Dictionary(index) => write!(f, "dictionary<{index}>"),
            DataType::List(item) => write!(f, "list<{}>", item.data_type),
            DataType::Struct(fields) => {
                f.write_str("struct<")?;
                for (idx, field) in fields.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", field.name, field.data_type)?;
                }
                f.write_str(">")
            }
        }
    }
}

impl FromStr for DataType {
    type Err = EncodeError;

    fn from_str(s: &str) -> EncodeResult<Self> {
        parse_type(s.trim()).ok_or_else(|| EncodeError::UnknownTypeName(s.to_owned()))
    }
}

fn parse_type(s: &str) -> Option<DataType> {
    if let Some(inner) = generic_arg(s, "dictionary") {
        let index = match parse_type(inner)? {
            DataType::Int8 => IndexType::Int8,
            DataType::Int16 => IndexType::Int16,
            DataType::Int32 => IndexType::Int32,
            DataType::Int64 => IndexType::Int64,
            _ => return None,
        };
        return Some(DataType::Dictionary(index));
    }
    if let Some(inner) = generic_arg(s, "list") {
        return Some(DataType::list(parse_type(inner)?));
    }
    if let Some(inner) = generic_arg(s, "struct") {
        let mut fields = Vec::new();
        for part in split_top_level(inner) {
            let (name, ty) = part.split_once(':')?;
            fields.push(Field::new(name.trim(), parse_type(ty.trim())?, true));
        }
        return Some(DataType::Struct(fields));
    }

    let ty = match s.to_ascii_lowercase().as_str() {
        "null" => DataType::Null,
        "bool" | "boolean" => DataType::Boolean,
        "int8" | "i8" => DataType::Int8,
        "int16" | "i16" => DataType::Int16,
        "int32" | "i32" | "int" => DataType::Int32,
        "int64" | "i64" | "bigint" => DataType::Int64,
        "uint8" | "u8" => DataType::UInt8,
        "uint16" | "u16" => DataType::UInt16,
        "uint32" | "u32" => DataType::UInt32,
        "uint64" | "u64" => DataType::UInt64,
        "float32" | "f32" | "float" => DataType::Float32,
        "float64" | "f64" | "double" => DataType::Float64,
        "utf8" | "string" | "str" => DataType::Utf8,
        "dictionary" => DataType::Dictionary(IndexType::Int32),
        _ => return None,
    };
    Some(ty)
}

/// `name<inner>` → `inner`, matching the keyword case-insensitively.
fn generic_arg<'a>(s: &'a str, keyword: &str) -> Option<&'a str> {
    let head = s.get(..keyword.len())?;
    if !head.eq_ignore_ascii_case(keyword) {
        return None;
    }
    s[keyword.len()..]
        .trim_start()
        .strip_prefix('<')?
        .strip_suffix('>')
        .map(str::trim)
}

fn split_top_level(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (idx, ch) in s.char_indices() {
        match ch {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(s[start..idx].trim());
                start = idx + 1;
            }
            _ => {}
        }
    }
    let tail = s[start..].trim();
    if !tail.is_empty() {
        parts.push(tail);
    }
    parts
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Field {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, data_type: DataType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable,
        }
    }
}

#![forbid(unsafe_code)]

use crate::error::EncodeResult;
use crate::types::DataType;

/// A caller-requested column type: a concrete [`DataType`] or a type name
/// such as `"int32"` or `"dictionary<int16>"`.
#[derive(Clone, Debug, PartialEq)]
pub enum TypeSpec {
    Type(DataType),
    Name(String),
}

impl From<DataType> for TypeSpec {
    fn from(v: DataType) -> Self {
        TypeSpec::Type(v)
    }
}

impl From<&str> for TypeSpec {
    fn from(v: &str) -> Self {
        TypeSpec::Name(v.to_owned())
    }
}

impl From<String> for TypeSpec {
    fn from(v: String) -> Self {
        TypeSpec::Name(v)
    }
}

/// Normalize a requested type. `None` means "infer".
pub fn resolve_type(requested: Option<&TypeSpec>) -> EncodeResult<Option<DataType>> {
    match requested {
        None => Ok(None),
        Some(TypeSpec::Type(ty)) => Ok(Some(ty.clone())),
        Some(TypeSpec::Name(name)) => name.parse().map(Some),
    }
}

/// Whether data of type `a` can stand in for type `b` without re-encoding.
///
/// An unspecified side is compatible with anything; otherwise width,
/// signedness and encoding family must all match.
pub fn type_compatible(a: Option<&DataType>, b: Option<&DataType>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    }
}

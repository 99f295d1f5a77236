//! Semantic column types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The semantic type of a destination column.
///
/// This is deliberately coarser than a database's native type system: it is
/// what the row materializer checks values against, not what DDL is generated
/// from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticType {
    /// 32-bit signed integer.
    Int,
    /// 64-bit signed integer.
    Long,
    /// 128-bit UUID.
    Guid,
    /// Text.
    String,
    /// Boolean.
    Bool,
    /// Timestamp (UTC, microsecond precision).
    DateTime,
    /// Exact decimal number, carried as its canonical text form.
    Decimal,
    /// Raw bytes.
    Binary,
    /// Anything else; accepts any non-null value.
    Other,
}

impl SemanticType {
    /// Lowercase name used in messages and serialized reports.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            SemanticType::Int => "int",
            SemanticType::Long => "long",
            SemanticType::Guid => "guid",
            SemanticType::String => "string",
            SemanticType::Bool => "bool",
            SemanticType::DateTime => "datetime",
            SemanticType::Decimal => "decimal",
            SemanticType::Binary => "binary",
            SemanticType::Other => "other",
        }
    }

    /// Parse a semantic type name (case-insensitive).
    ///
    /// Accepts the canonical names plus a few common catalog spellings.
    #[must_use]
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "int" | "integer" | "int4" => Some(SemanticType::Int),
            "long" | "bigint" | "int8" => Some(SemanticType::Long),
            "guid" | "uuid" | "uniqueidentifier" => Some(SemanticType::Guid),
            "string" | "text" | "varchar" | "nvarchar" => Some(SemanticType::String),
            "bool" | "boolean" | "bit" => Some(SemanticType::Bool),
            "datetime" | "timestamp" | "timestamptz" | "datetime2" => {
                Some(SemanticType::DateTime)
            }
            "decimal" | "numeric" | "money" => Some(SemanticType::Decimal),
            "binary" | "bytea" | "varbinary" | "blob" => Some(SemanticType::Binary),
            "other" => Some(SemanticType::Other),
            _ => None,
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_aliases() {
        assert_eq!(SemanticType::from_name("BIGINT"), Some(SemanticType::Long));
        assert_eq!(SemanticType::from_name("uuid"), Some(SemanticType::Guid));
        assert_eq!(
            SemanticType::from_name("timestamptz"),
            Some(SemanticType::DateTime)
        );
        assert_eq!(SemanticType::from_name("geometry"), None);
    }

    #[test]
    fn test_name_roundtrip() {
        for ty in [
            SemanticType::Int,
            SemanticType::Long,
            SemanticType::Guid,
            SemanticType::String,
            SemanticType::Bool,
            SemanticType::DateTime,
            SemanticType::Decimal,
            SemanticType::Binary,
            SemanticType::Other,
        ] {
            assert_eq!(SemanticType::from_name(ty.name()), Some(ty));
        }
    }
}

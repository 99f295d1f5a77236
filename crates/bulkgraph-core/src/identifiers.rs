//! Destination table identifiers.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Quote an identifier for PostgreSQL/ANSI SQL, doubling embedded quotes.
#[must_use]
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// A destination table: name plus optional schema qualifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableName {
    /// Schema/namespace qualifier (e.g. `"sales"`).
    pub schema: Option<String>,
    /// Unqualified table name.
    pub name: String,
}

fn table_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r#"^(?:(?P<schema>"(?:[^"]|"")+"|[A-Za-z_][A-Za-z0-9_$]*)\.)?(?P<name>"(?:[^"]|"")+"|[A-Za-z_][A-Za-z0-9_$]*)$"#,
        )
        .expect("table name pattern is valid")
    })
}

fn unquote(part: &str) -> String {
    part.strip_prefix('"')
        .and_then(|p| p.strip_suffix('"'))
        .map_or_else(|| part.to_string(), |inner| inner.replace("\"\"", "\""))
}

impl TableName {
    /// An unqualified table name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
        }
    }

    /// A schema-qualified table name.
    pub fn qualified(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            name: name.into(),
        }
    }

    /// Parse `table`, `schema.table`, or their double-quoted forms.
    ///
    /// Returns `None` when the input is not a valid (optionally qualified)
    /// identifier.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let caps = table_name_pattern().captures(input.trim())?;
        let name = unquote(caps.name("name")?.as_str());
        let schema = caps.name("schema").map(|m| unquote(m.as_str()));
        Some(Self { schema, name })
    }

    /// The quoted, fully qualified form used in SQL (`"schema"."table"`).
    #[must_use]
    pub fn quoted(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", quote_ident(schema), quote_ident(&self.name)),
            None => quote_ident(&self.name),
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => f.write_str(&self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident_escapes_quotes() {
        assert_eq!(quote_ident("order"), "\"order\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_parse_plain_and_qualified() {
        assert_eq!(TableName::parse("orders"), Some(TableName::new("orders")));
        assert_eq!(
            TableName::parse("sales.orders"),
            Some(TableName::qualified("sales", "orders"))
        );
    }

    #[test]
    fn test_parse_quoted_parts() {
        assert_eq!(
            TableName::parse("\"Sales\".\"Order Items\""),
            Some(TableName::qualified("Sales", "Order Items"))
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(TableName::parse(""), None);
        assert_eq!(TableName::parse("1orders"), None);
        assert_eq!(TableName::parse("a.b.c"), None);
        assert_eq!(TableName::parse("orders; drop table x"), None);
    }

    #[test]
    fn test_quoted_and_display() {
        let t = TableName::qualified("sales", "orders");
        assert_eq!(t.quoted(), "\"sales\".\"orders\"");
        assert_eq!(t.to_string(), "sales.orders");
    }
}

//! Error taxonomy for bulkgraph.
//!
//! Every failure aborts the whole load and rolls back its unit of work, so
//! errors carry enough context (entity, table, column) to tell which part of
//! the graph was being processed.

use std::error::Error as StdError;
use std::fmt;

use crate::types::SemanticType;

/// Result alias for synchronous bulkgraph operations.
pub type Result<T> = std::result::Result<T, Error>;

type BoxError = Box<dyn StdError + Send + Sync>;

/// The primary error type for all bulkgraph operations.
#[derive(Debug)]
pub enum Error {
    /// Entity type has no resolvable table/column mapping.
    Schema(SchemaError),
    /// A value could not be coerced to its column's type.
    Materialization(MaterializationError),
    /// The bulk-transfer sink reported a failure.
    Transfer(TransferError),
    /// A navigation accessor failed while walking the graph.
    Traversal(TraversalError),
    /// The load configuration is invalid.
    Config(ConfigError),
    /// Beginning, committing, or rolling back the unit of work failed.
    UnitOfWork(UnitOfWorkError),
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Schema,
    Materialization,
    Transfer,
    Traversal,
    Config,
    UnitOfWork,
}

impl Error {
    /// The taxonomy kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Error::Schema(_) => ErrorKind::Schema,
            Error::Materialization(_) => ErrorKind::Materialization,
            Error::Transfer(_) => ErrorKind::Transfer,
            Error::Traversal(_) => ErrorKind::Traversal,
            Error::Config(_) => ErrorKind::Config,
            Error::UnitOfWork(_) => ErrorKind::UnitOfWork,
        }
    }

    /// The destination table being processed when the error occurred, if known.
    #[must_use]
    pub fn table(&self) -> Option<&str> {
        match self {
            Error::Schema(e) => e.table.as_deref(),
            Error::Materialization(e) => Some(&e.table),
            Error::Transfer(e) => e.table.as_deref(),
            Error::Traversal(_) | Error::Config(_) | Error::UnitOfWork(_) => None,
        }
    }

    /// The entity type being processed when the error occurred, if known.
    #[must_use]
    pub fn entity(&self) -> Option<&str> {
        match self {
            Error::Schema(e) => Some(&e.entity),
            Error::Materialization(e) => Some(&e.entity),
            Error::Traversal(e) => Some(&e.entity),
            Error::Transfer(_) | Error::Config(_) | Error::UnitOfWork(_) => None,
        }
    }

    /// Wrap this error as a transfer failure against `table`.
    ///
    /// Transfer errors keep their kind and only gain the table name when they
    /// did not carry one; any other error becomes the source of a new
    /// [`TransferErrorKind::Transport`] error.
    #[must_use]
    pub fn into_transfer(self, table: &str) -> Self {
        match self {
            Error::Transfer(mut e) => {
                if e.table.is_none() {
                    e.table = Some(table.to_string());
                }
                Error::Transfer(e)
            }
            other => Error::Transfer(
                TransferError::new(TransferErrorKind::Transport, other.to_string())
                    .table(table)
                    .source(other),
            ),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Schema(e) => write!(f, "Schema error: {}", e),
            Error::Materialization(e) => write!(f, "Materialization error: {}", e),
            Error::Transfer(e) => write!(f, "Transfer error: {}", e),
            Error::Traversal(e) => write!(f, "Traversal error: {}", e),
            Error::Config(e) => write!(f, "Configuration error: {}", e),
            Error::UnitOfWork(e) => write!(f, "Unit of work error: {}", e),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Transfer(e) => e
                .source
                .as_ref()
                .map(|s| s.as_ref() as &(dyn StdError + 'static)),
            Error::Traversal(e) => e
                .source
                .as_ref()
                .map(|s| s.as_ref() as &(dyn StdError + 'static)),
            Error::UnitOfWork(e) => e
                .source
                .as_ref()
                .map(|s| s.as_ref() as &(dyn StdError + 'static)),
            _ => None,
        }
    }
}

// ============================================================================
// Schema
// ============================================================================

#[derive(Debug, Clone)]
pub struct SchemaError {
    pub entity: String,
    pub table: Option<String>,
    pub message: String,
}

impl SchemaError {
    pub fn new(entity: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            table: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(table) => write!(f, "{} ({}): {}", self.entity, table, self.message),
            None => write!(f, "{}: {}", self.entity, self.message),
        }
    }
}

impl From<SchemaError> for Error {
    fn from(err: SchemaError) -> Self {
        Error::Schema(err)
    }
}

// ============================================================================
// Materialization
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterializationErrorKind {
    /// A non-nullable column received no value or NULL.
    NullInNonNullable,
    /// The value's type does not match the column type.
    TypeMismatch,
    /// The value has the right shape but does not fit (e.g. i64 into Int).
    OutOfRange,
    /// The instance is not of the entity type the mapping was built for.
    ForeignInstance,
}

#[derive(Debug, Clone)]
pub struct MaterializationError {
    pub kind: MaterializationErrorKind,
    pub entity: String,
    pub table: String,
    pub column: String,
    pub expected: SemanticType,
    pub actual: Option<SemanticType>,
}

impl fmt::Display for MaterializationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let actual = self.actual.map_or("null", SemanticType::name);
        match self.kind {
            MaterializationErrorKind::NullInNonNullable => write!(
                f,
                "{}.{} ({}) is not nullable but received no value",
                self.table, self.column, self.entity
            ),
            MaterializationErrorKind::TypeMismatch => write!(
                f,
                "{}.{} ({}) expects {} but the field holds {}",
                self.table, self.column, self.entity, self.expected, actual
            ),
            MaterializationErrorKind::OutOfRange => write!(
                f,
                "{}.{} ({}) value of type {} is out of range for {}",
                self.table, self.column, self.entity, actual, self.expected
            ),
            MaterializationErrorKind::ForeignInstance => write!(
                f,
                "{}.{}: instance is not a {}",
                self.table, self.column, self.entity
            ),
        }
    }
}

impl From<MaterializationError> for Error {
    fn from(err: MaterializationError) -> Self {
        Error::Materialization(err)
    }
}

// ============================================================================
// Transfer
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferErrorKind {
    /// I/O or connection failure.
    Transport,
    /// The transfer exceeded its timeout.
    Timeout,
    /// The destination rejected rows with a constraint violation.
    Constraint,
    /// The peer spoke an unexpected protocol sequence.
    Protocol,
    /// The destination rejected the transfer for another reason.
    Rejected,
}

impl TransferErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            TransferErrorKind::Transport => "transport",
            TransferErrorKind::Timeout => "timeout",
            TransferErrorKind::Constraint => "constraint",
            TransferErrorKind::Protocol => "protocol",
            TransferErrorKind::Rejected => "rejected",
        }
    }
}

#[derive(Debug)]
pub struct TransferError {
    pub kind: TransferErrorKind,
    pub table: Option<String>,
    pub message: String,
    /// SQLSTATE reported by the server, when there was one.
    pub sqlstate: Option<String>,
    pub source: Option<BoxError>,
}

impl TransferError {
    pub fn new(kind: TransferErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            table: None,
            message: message.into(),
            sqlstate: None,
            source: None,
        }
    }

    #[must_use]
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    #[must_use]
    pub fn sqlstate(mut self, code: impl Into<String>) -> Self {
        self.sqlstate = Some(code.into());
        self
    }

    #[must_use]
    pub fn source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failure", self.kind.as_str())?;
        if let Some(table) = &self.table {
            write!(f, " loading {}", table)?;
        }
        write!(f, ": {}", self.message)?;
        if let Some(code) = &self.sqlstate {
            write!(f, " (SQLSTATE {})", code)?;
        }
        Ok(())
    }
}

impl From<TransferError> for Error {
    fn from(err: TransferError) -> Self {
        Error::Transfer(err)
    }
}

// ============================================================================
// Traversal
// ============================================================================

#[derive(Debug)]
pub struct TraversalError {
    pub entity: String,
    pub edge: String,
    pub message: String,
    pub source: Option<BoxError>,
}

impl TraversalError {
    pub fn new(
        entity: impl Into<String>,
        edge: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            entity: entity.into(),
            edge: edge.into(),
            message: message.into(),
            source: None,
        }
    }

    #[must_use]
    pub fn source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

impl fmt::Display for TraversalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}: {}", self.entity, self.edge, self.message)
    }
}

impl From<TraversalError> for Error {
    fn from(err: TraversalError) -> Self {
        Error::Traversal(err)
    }
}

// ============================================================================
// Config
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

// ============================================================================
// Unit of work
// ============================================================================

#[derive(Debug)]
pub struct UnitOfWorkError {
    /// `"begin"`, `"commit"`, or `"rollback"`.
    pub operation: &'static str,
    pub message: String,
    pub source: Option<BoxError>,
}

impl UnitOfWorkError {
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
            source: None,
        }
    }

    #[must_use]
    pub fn source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

impl fmt::Display for UnitOfWorkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.operation, self.message)
    }
}

impl From<UnitOfWorkError> for Error {
    fn from(err: UnitOfWorkError) -> Self {
        Error::UnitOfWork(err)
    }
}

//! Error taxonomy shared by every dbmap crate.
//!
//! Hard failures propagate as [`Error`]. Routine outcomes such as updating a row
//! whose primary key was never assigned are not errors; the executor reports them
//! as `Ok(false)`.

use crate::value::Value;
use crate::wire::WireType;

/// Result alias used across the workspace.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised while registering, generating, executing or decoding.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid schema, table or serializer registration. Only raised at start-up.
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// A type, property or column was requested that was never registered.
    #[error("lookup error: {message}")]
    Lookup { message: String },

    /// No serializer in the column, table, schema or global lists handles the property.
    #[error("no serializer for property '{owner}.{property}' of type {domain}")]
    SerializerMissing {
        owner: String,
        property: String,
        domain: String,
    },

    /// A value or result column does not fit the serializer chosen for it.
    #[error("serializer mismatch on '{column}': expected {expected}, found {found}")]
    SerializerMismatch {
        column: String,
        expected: WireType,
        found: String,
    },

    /// Misuse of the query builder or of a raw query result.
    #[error("serializer error: {message}")]
    Serializer { message: String },

    /// The driver failed while running a statement.
    #[error("driver error: {source}\n{sql}")]
    Driver {
        sql: String,
        values: Vec<Value>,
        #[source]
        source: DriverError,
    },

    /// A transaction body failed. Rollback was attempted before this was returned.
    #[error("transaction rolled back: {source}")]
    Transaction {
        #[source]
        source: Box<Error>,
        rollback_failure: Option<String>,
    },

    /// The dialect has no syntax for the requested operation.
    #[error("{dialect} does not support {operation}")]
    Unsupported {
        dialect: &'static str,
        operation: &'static str,
    },
}

impl Error {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn lookup(message: impl Into<String>) -> Self {
        Self::Lookup {
            message: message.into(),
        }
    }

    pub fn serializer(message: impl Into<String>) -> Self {
        Self::Serializer {
            message: message.into(),
        }
    }

    /// Attach the failing statement to a driver failure.
    pub fn driver(sql: impl Into<String>, values: Vec<Value>, source: DriverError) -> Self {
        Self::Driver {
            sql: sql.into(),
            values,
            source,
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    pub fn is_lookup(&self) -> bool {
        matches!(self, Self::Lookup { .. })
    }

    pub fn is_driver(&self) -> bool {
        matches!(self, Self::Driver { .. })
    }
}

/// Failure reported by a driver implementation.
///
/// Drivers know nothing about the SQL that produced the failure; the executor
/// wraps it into [`Error::Driver`] together with the statement and its values.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct DriverError {
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl DriverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

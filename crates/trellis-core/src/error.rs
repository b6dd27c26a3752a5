//! Core error types for Trellis
//!
//! All errors are explicit - no silent failures allowed. Expected validation
//! outcomes (unknown collections, bad options) are values, never panics.
//!
//! # Error Code Scheme
//!
//! Codes follow the numbering used by the document database whose traversal
//! semantics this crate implements, so callers can match on stable numbers.
//!
//! | Range | Category |
//! |-------|----------|
//! | 10 | Bad parameter (option validation) |
//! | 12xx | Collection / data-source errors |
//! | 15xx | Query parse, bind and evaluation errors |
//! | 19xx | Named graph errors |
//! | 50xxx | Engine limits and internal errors |

use thiserror::Error;

/// Top-level error type for traversal queries
#[derive(Debug, Error)]
pub enum TraversalError {
    // --- Setup / validation errors ---
    #[error("bad parameter: {message}")]
    BadParameter { message: String },

    #[error("collection or view not found: {name}")]
    DataSourceNotFound { name: String },

    #[error("invalid collection type: '{name}' {message}")]
    CollectionTypeInvalid { name: String, message: String },

    #[error("graph '{name}' not found")]
    GraphNotFound { name: String },

    #[error("vertex collection '{collection}' is not part of graph '{graph}'")]
    GraphVertexCollectionDoesNotExist { graph: String, collection: String },

    #[error("edge collection '{collection}' is not part of graph '{graph}'")]
    GraphEdgeCollectionDoesNotExist { graph: String, collection: String },

    #[error("graph '{name}' has no edge collections")]
    GraphEmpty { name: String },

    #[error("maximum traversal depth exceeded: limit is {limit}, got {actual}")]
    MaxDepthExceeded { limit: u64, actual: u64 },

    // --- Query errors ---
    #[error("syntax error at line {line}, column {column}: {message}")]
    QueryParse {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("unknown variable '{name}'")]
    VariableNameUnknown { name: String },

    #[error("bind parameter '{name}' was not declared in the query")]
    BindParameterMissing { name: String },

    #[error("usage of unknown function '{name}()'")]
    FunctionNameUnknown { name: String },

    #[error("invalid function name '{name}': {message}")]
    FunctionNameInvalid { name: String, message: String },

    #[error("invalid number of arguments for function '{name}()', expected {min}..{max}, got {actual}")]
    FunctionArgumentNumberMismatch {
        name: String,
        min: usize,
        max: usize,
        actual: usize,
    },

    #[error("invalid argument type in call to function '{name}()': {message}")]
    FunctionArgumentTypeMismatch { name: String, message: String },

    // --- Evaluation errors ---
    #[error("invalid arithmetic value: {operation} on {value_type}")]
    InvalidArithmeticValue {
        operation: &'static str,
        value_type: &'static str,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("evaluation error: {message}")]
    Evaluation { message: String },

    #[error("storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),

    /// Internal error - invariant violations inside the engine
    ///
    /// These errors indicate bugs, not user errors.
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl TraversalError {
    /// Stable numeric error code
    pub fn code(&self) -> u32 {
        match self {
            Self::BadParameter { .. } => 10,
            Self::DataSourceNotFound { .. } => 1203,
            Self::CollectionTypeInvalid { .. } => 1218,
            Self::QueryParse { .. } => 1501,
            Self::VariableNameUnknown { .. } => 1512,
            Self::FunctionNameUnknown { .. } => 1540,
            Self::FunctionArgumentNumberMismatch { .. } => 1541,
            Self::FunctionArgumentTypeMismatch { .. } => 1542,
            Self::BindParameterMissing { .. } => 1551,
            Self::InvalidArithmeticValue { .. } => 1561,
            Self::DivisionByZero => 1562,
            Self::FunctionNameInvalid { .. } => 1580,
            Self::GraphNotFound { .. } => 1924,
            Self::GraphVertexCollectionDoesNotExist { .. } => 1926,
            Self::GraphEdgeCollectionDoesNotExist { .. } => 1939,
            Self::GraphEmpty { .. } => 1940,
            Self::MaxDepthExceeded { .. } => 50001,
            Self::Evaluation { .. } => 50002,
            Self::Storage(_) => 50010,
            Self::Internal { .. } => 50099,
        }
    }

    /// Whether this error is raised while setting up a traversal (before any
    /// expansion happens)
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self,
            Self::BadParameter { .. }
                | Self::DataSourceNotFound { .. }
                | Self::CollectionTypeInvalid { .. }
                | Self::GraphNotFound { .. }
                | Self::GraphVertexCollectionDoesNotExist { .. }
                | Self::GraphEdgeCollectionDoesNotExist { .. }
                | Self::GraphEmpty { .. }
                | Self::MaxDepthExceeded { .. }
        )
    }

    /// Create a bad parameter error
    pub fn bad_parameter(message: impl Into<String>) -> Self {
        Self::BadParameter {
            message: message.into(),
        }
    }

    /// Create a data source not found error
    pub fn data_source_not_found(name: impl Into<String>) -> Self {
        Self::DataSourceNotFound { name: name.into() }
    }

    /// Create a collection type error
    pub fn collection_type_invalid(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CollectionTypeInvalid {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a syntax error with location
    pub fn parse(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self::QueryParse {
            line,
            column,
            message: message.into(),
        }
    }

    /// Create an unknown variable error
    pub fn unknown_variable(name: impl Into<String>) -> Self {
        Self::VariableNameUnknown { name: name.into() }
    }

    /// Create a generic evaluation error
    pub fn evaluation(message: impl Into<String>) -> Self {
        Self::Evaluation {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid parameter '{name}': {message}")]
    InvalidParameter { name: &'static str, message: String },
}

/// Convenience type alias for traversal results
pub type TraversalResult<T> = Result<T, TraversalError>;

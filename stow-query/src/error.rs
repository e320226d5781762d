//! Error types for repository operations with actionable messages.
//!
//! Errors carry:
//! - An error code for programmatic handling
//! - Suggestions for fixing the problem
//! - Context about the operation, entity and relation involved
//!
//! # Error Codes
//!
//! Error codes follow a pattern: S{category}{number}
//! - 1xxx: Include errors (invalid or cyclic navigation paths)
//! - 2xxx: Constraint violations reported by the data context
//! - 5xxx: Execution errors (unsupported operations)
//! - 7xxx: Configuration errors
//! - 9xxx: Internal errors
//!
//! ```rust
//! use stow_query::{QueryError, ErrorCode};
//!
//! let err = QueryError::unsupported("delete", "Order");
//! assert_eq!(err.code, ErrorCode::Unsupported);
//! assert_eq!(err.code.code(), "S5002");
//! assert!(err.is_unsupported());
//! ```
//!
//! The repository never translates errors it receives from a data context:
//! whatever the context returns is what the caller sees.

use std::fmt;
use thiserror::Error;

/// Result type for repository operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Include errors (1xxx)
    /// A navigation path is not valid for the queried entity (S1001).
    InvalidInclude = 1001,
    /// Declared navigation paths form a cycle (S1002).
    CyclicInclude = 1002,

    // Constraint errors (2xxx)
    /// Unique constraint violation (S2001).
    UniqueConstraint = 2001,

    // Execution errors (5xxx)
    /// The data context does not support the operation (S5002).
    Unsupported = 5002,

    // Configuration errors (7xxx)
    /// Invalid configuration (S7001).
    InvalidConfiguration = 7001,

    // Internal errors (9xxx)
    /// Internal error (S9001).
    Internal = 9001,
}

impl ErrorCode {
    /// Get the error code string (e.g., "S1001").
    pub fn code(&self) -> String {
        format!("S{}", *self as u16)
    }

    /// Get a short description of the error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::InvalidInclude => "Invalid include",
            Self::CyclicInclude => "Cyclic include declarations",
            Self::UniqueConstraint => "Unique constraint violation",
            Self::Unsupported => "Operation not supported",
            Self::InvalidConfiguration => "Invalid configuration",
            Self::Internal => "Internal error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Suggestion for fixing an error.
#[derive(Debug, Clone)]
pub struct Suggestion {
    /// The suggestion text.
    pub text: String,
}

impl Suggestion {
    /// Create a new suggestion.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Additional context for an error.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The operation that was being performed.
    pub operation: Option<String>,
    /// The entity involved.
    pub entity: Option<String>,
    /// The relation involved.
    pub relation: Option<String>,
    /// Suggestions for fixing the error.
    pub suggestions: Vec<Suggestion>,
    /// Help text.
    pub help: Option<String>,
}

/// Errors that can occur during repository operations.
#[derive(Error, Debug)]
pub struct QueryError {
    /// The error code.
    pub code: ErrorCode,
    /// The error message.
    pub message: String,
    /// Additional context.
    pub context: ErrorContext,
    /// The source error (if any).
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)
    }
}

impl QueryError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
            source: None,
        }
    }

    /// Add context about the operation.
    pub fn with_context(mut self, operation: impl Into<String>) -> Self {
        self.context.operation = Some(operation.into());
        self
    }

    /// Add a suggestion for fixing the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context.suggestions.push(Suggestion::new(suggestion));
        self
    }

    /// Add help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.context.help = Some(help.into());
        self
    }

    /// Set the entity.
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.context.entity = Some(entity.into());
        self
    }

    /// Set the relation.
    pub fn with_relation(mut self, relation: impl Into<String>) -> Self {
        self.context.relation = Some(relation.into());
        self
    }

    /// Set the source error.
    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // ============== Constructor Functions ==============

    /// Create an invalid include error.
    pub fn invalid_include(entity: impl Into<String>, relation: impl Into<String>) -> Self {
        let entity = entity.into();
        let relation = relation.into();
        Self::new(
            ErrorCode::InvalidInclude,
            format!("Relation '{}' cannot be loaded from {}", relation, entity),
        )
        .with_entity(&entity)
        .with_relation(&relation)
        .with_suggestion(format!(
            "Declare '{}' on the entity it starts from, and chain dependent paths after it",
            relation
        ))
    }

    /// Create a cyclic include error for the given chain of relations.
    pub fn cyclic_include(chain: &[impl AsRef<str>]) -> Self {
        let rendered = chain
            .iter()
            .map(|r| r.as_ref())
            .collect::<Vec<_>>()
            .join(" -> ");
        Self::new(
            ErrorCode::CyclicInclude,
            format!("Include declarations form a cycle: {}", rendered),
        )
        .with_suggestion("Remove one of the paths that leads back to an entity already in the chain")
        .with_help("Load self-referencing or mutually-referencing relations in separate reads")
    }

    /// Create an unsupported operation error.
    pub fn unsupported(operation: impl Into<String>, entity: impl Into<String>) -> Self {
        let operation = operation.into();
        let entity = entity.into();
        Self::new(
            ErrorCode::Unsupported,
            format!("Operation '{}' is not supported for {}", operation, entity),
        )
        .with_context(&operation)
        .with_entity(&entity)
    }

    /// Create a unique constraint violation error.
    pub fn unique_violation(entity: impl Into<String>, key: impl fmt::Display) -> Self {
        let entity = entity.into();
        Self::new(
            ErrorCode::UniqueConstraint,
            format!("Unique constraint violated on {} (key {})", entity, key),
        )
        .with_entity(&entity)
        .with_suggestion("A record with this key already exists")
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(ErrorCode::InvalidConfiguration, format!("Invalid configuration: {}", message))
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(ErrorCode::Internal, format!("Internal error: {}", message))
    }

    // ============== Error Checks ==============

    /// Check if this error comes from include declarations.
    pub fn is_include_error(&self) -> bool {
        matches!(self.code, ErrorCode::InvalidInclude | ErrorCode::CyclicInclude)
    }

    /// Check if this is a constraint violation.
    pub fn is_constraint_violation(&self) -> bool {
        self.code == ErrorCode::UniqueConstraint
    }

    /// Check if the data context rejected the operation as unsupported.
    pub fn is_unsupported(&self) -> bool {
        self.code == ErrorCode::Unsupported
    }

    // ============== Display Functions ==============

    /// Display the full error with all context and suggestions.
    pub fn display_full(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("Error [{}]: {}\n", self.code.code(), self.message));

        if let Some(ref op) = self.context.operation {
            output.push_str(&format!("  → While: {}\n", op));
        }
        if let Some(ref entity) = self.context.entity {
            output.push_str(&format!("  → Entity: {}\n", entity));
        }
        if let Some(ref relation) = self.context.relation {
            output.push_str(&format!("  → Relation: {}\n", relation));
        }

        if !self.context.suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for (i, suggestion) in self.context.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion.text));
            }
        }

        if let Some(ref help) = self.context.help {
            output.push_str(&format!("\nHelp: {}\n", help));
        }

        output
    }
}

/// Helper for creating errors with context.
#[macro_export]
macro_rules! query_error {
    ($code:expr, $msg:expr) => {
        $crate::error::QueryError::new($code, $msg)
    };
    ($code:expr, $msg:expr, $($key:ident = $value:expr),+ $(,)?) => {{
        let mut err = $crate::error::QueryError::new($code, $msg);
        $(
            err = err.$key($value);
        )+
        err
    }};
}

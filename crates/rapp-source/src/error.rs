//! Error types for source extraction and rewriting
//!
//! Provides error handling for:
//! - Parsing class source text
//! - Structural rewrites that cannot be applied
//! - File I/O while persisting rewritten sources

use std::path::PathBuf;

/// Errors raised by the extractor, the rewriter and the writer
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Parser could not be initialized with the TypeScript grammar
    #[error("parser initialization failed: {0}")]
    ParserInit(String),

    /// Parser returned no tree
    #[error("parsing produced no syntax tree")]
    ParseFailed,

    /// Named class declaration is absent from the source
    #[error("class '{class_id}' not found")]
    ClassNotFound {
        /// Class that was searched for
        class_id: String,
    },

    /// Named property is absent from the class
    #[error("property '{property_name}' not found in class '{class_id}'")]
    PropertyNotFound {
        /// Owning class
        class_id: String,
        /// Missing property
        property_name: String,
    },

    /// A non-property member already uses the name
    #[error("member '{property_name}' of class '{class_id}' is not a property")]
    MemberConflict {
        /// Owning class
        class_id: String,
        /// Conflicting member
        property_name: String,
    },

    /// Class file already exists
    #[error("class '{0}' already exists")]
    ClassExists(String),

    /// Entry file has no `new Container({...})` registration literal
    #[error("registration literal not found")]
    RegistrationNotFound,

    /// Two edits of one rewrite pass overlap
    #[error("overlapping edits at byte {0}")]
    OverlappingEdits(usize),

    /// Rewrite produced text that no longer parses
    #[error("rewrite produced invalid source: {0}")]
    InvalidRewrite(String),

    /// Formatter rejected the text
    #[error("format failed: {0}")]
    Format(String),

    /// IO error on a source file
    #[error("io error on {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl SourceError {
    /// Create class-not-found error
    pub fn class_not_found(class_id: impl Into<String>) -> Self {
        Self::ClassNotFound {
            class_id: class_id.into(),
        }
    }

    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result alias for source operations
pub type SourceResult<T> = Result<T, SourceError>;

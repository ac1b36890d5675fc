//! Error types for graphclean operations.
//!
//! One error hierarchy with structured error codes, suggestions for
//! resolution, and a transient/fatal classification used by the retry
//! layer and the orchestrator's propagation policy.

use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for graphclean operations.
pub type GraphCleanResult<T> = Result<T, GraphCleanError>;

/// Main error type for all graphclean operations.
#[derive(Error, Debug)]
pub enum GraphCleanError {
    /// The graph store could not be reached.
    #[error("Graph store unavailable: {message}")]
    StoreUnavailable {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A single store operation exceeded its timeout.
    #[error("Store operation '{operation}' timed out after {elapsed_ms}ms")]
    Timeout { operation: String, elapsed_ms: u64 },

    /// A graph store operation was rejected or failed.
    #[error("Graph store error: {message}")]
    GraphStore {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Node not found (deleted out-of-band or never existed).
    #[error("Node not found: {message}")]
    NotFound {
        message: String,
        code: ErrorCode,
        node_id: Option<String>,
    },

    /// A request failed validation before reaching the store.
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        code: ErrorCode,
        details: HashMap<String, String>,
        suggestion: Option<String>,
    },

    /// The bulk-merge accelerator is not installed. Nothing was mutated.
    #[error("Bulk merge accelerator unavailable: {message}")]
    AcceleratorUnavailable { message: String },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Provider not supported.
    #[error("Provider not supported: {provider}")]
    UnsupportedProvider { provider: String },

    /// Pipeline was cancelled between components.
    #[error("Operation cancelled")]
    Cancelled,

    /// Parse error.
    #[error("Parse error: {message}")]
    Parse { message: String, code: ErrorCode },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Validation (VAL_xxx)
    ValInvalidInput,
    ValSelfMerge,
    ValInvalidRelationshipType,
    ValInvalidLabel,

    // Node (NODE_xxx)
    NodeNotFound,
    NodeHasRelationships,

    // Graph (GRP_xxx)
    GrpConnectionFailed,
    GrpOperationFailed,
    GrpAcceleratorFailed,

    // Network (NET_xxx)
    NetTimeout,

    // Parse (PARSE_xxx)
    ParseInvalidJson,
    ParseInvalidFixture,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValInvalidInput => "VAL_001",
            ErrorCode::ValSelfMerge => "VAL_002",
            ErrorCode::ValInvalidRelationshipType => "VAL_003",
            ErrorCode::ValInvalidLabel => "VAL_004",
            ErrorCode::NodeNotFound => "NODE_001",
            ErrorCode::NodeHasRelationships => "NODE_002",
            ErrorCode::GrpConnectionFailed => "GRP_001",
            ErrorCode::GrpOperationFailed => "GRP_002",
            ErrorCode::GrpAcceleratorFailed => "GRP_003",
            ErrorCode::NetTimeout => "NET_001",
            ErrorCode::ParseInvalidJson => "PARSE_001",
            ErrorCode::ParseInvalidFixture => "PARSE_002",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl GraphCleanError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidInput,
            details: HashMap::new(),
            suggestion: None,
        }
    }

    /// Create a validation error with a specific code.
    pub fn validation_with_code(message: impl Into<String>, code: ErrorCode) -> Self {
        Self::Validation {
            message: message.into(),
            code,
            details: HashMap::new(),
            suggestion: None,
        }
    }

    /// Create a validation error with suggestion.
    pub fn validation_with_suggestion(
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidInput,
            details: HashMap::new(),
            suggestion: Some(suggestion.into()),
        }
    }

    /// Create a not found error for a node id.
    pub fn not_found(node_id: impl Into<String>) -> Self {
        let id = node_id.into();
        Self::NotFound {
            message: format!("Node with id '{}' not found", id),
            code: ErrorCode::NodeNotFound,
            node_id: Some(id),
        }
    }

    /// Create a store-unavailable (transient) error.
    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            message: message.into(),
            code: ErrorCode::GrpConnectionFailed,
            source: None,
        }
    }

    /// Create a graph store operation error.
    pub fn graph_store(message: impl Into<String>) -> Self {
        Self::GraphStore {
            message: message.into(),
            code: ErrorCode::GrpOperationFailed,
            source: None,
        }
    }

    /// Create a graph store error with a specific code.
    pub fn graph_store_with_code(message: impl Into<String>, code: ErrorCode) -> Self {
        Self::GraphStore {
            message: message.into(),
            code,
            source: None,
        }
    }

    /// Create an accelerator-unavailable error.
    pub fn accelerator_unavailable(message: impl Into<String>) -> Self {
        Self::AcceleratorUnavailable {
            message: message.into(),
        }
    }

    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            code: ErrorCode::ParseInvalidJson,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::StoreUnavailable { code, .. } => *code,
            Self::Timeout { .. } => ErrorCode::NetTimeout,
            Self::GraphStore { code, .. } => *code,
            Self::NotFound { code, .. } => *code,
            Self::Validation { code, .. } => *code,
            Self::AcceleratorUnavailable { .. } => ErrorCode::GrpAcceleratorFailed,
            Self::Parse { code, .. } => *code,
            _ => ErrorCode::Internal,
        }
    }

    /// Whether the operation may succeed if attempted again.
    ///
    /// Only connectivity failures and timeouts qualify. A missing node or an
    /// invalid request is provably invalid and never retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::StoreUnavailable { .. } | Self::Timeout { .. })
    }

    /// Whether the error aborts a whole pass rather than a single item.
    ///
    /// The retry layer has already spent its budget by the time a transient
    /// error reaches a component, so these are treated as fatal.
    pub fn is_fatal(&self) -> bool {
        self.is_transient() || matches!(self, Self::Cancelled)
    }

    /// Whether the error means the targeted item no longer exists.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Get a user-friendly suggestion for resolving this error.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::StoreUnavailable { .. } => {
                Some("Please check the graph store connection settings and that the store is running")
            }
            Self::Timeout { .. } => Some("Consider raising operation_timeout_ms or reducing max_concurrency"),
            Self::NotFound { .. } => {
                Some("The node was probably removed after detection; re-run detect to refresh candidates")
            }
            Self::Validation { suggestion, .. } => suggestion.as_deref(),
            Self::AcceleratorUnavailable { .. } => {
                Some("Install the APOC plugin to enable atomic bulk merges")
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error() {
        let err = GraphCleanError::validation("Invalid input");
        assert_eq!(err.code(), ErrorCode::ValInvalidInput);
        assert!(err.to_string().contains("Invalid input"));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_not_found_error() {
        let err = GraphCleanError::not_found("node-1");
        assert_eq!(err.code(), ErrorCode::NodeNotFound);
        assert!(err.is_not_found());
        assert!(!err.is_fatal());
        assert!(err.suggestion().is_some());
    }

    #[test]
    fn test_transient_classification() {
        assert!(GraphCleanError::store_unavailable("down").is_transient());
        let timeout = GraphCleanError::Timeout {
            operation: "scan_label".to_string(),
            elapsed_ms: 5000,
        };
        assert!(timeout.is_transient());
        assert!(timeout.is_fatal());
        assert!(!GraphCleanError::graph_store("constraint").is_transient());
        assert!(!GraphCleanError::accelerator_unavailable("no apoc").is_fatal());
    }

    #[test]
    fn test_error_code_as_str() {
        assert_eq!(ErrorCode::ValSelfMerge.as_str(), "VAL_002");
        assert_eq!(ErrorCode::NodeNotFound.as_str(), "NODE_001");
        assert_eq!(ErrorCode::GrpConnectionFailed.as_str(), "GRP_001");
    }
}

//! Error types for CursorKit store operations
//!
//! All store errors are represented by the StoreError enum. Variants mirror
//! the exception names an IndexedDB implementation reports, so callers that
//! bridge to a browser-shaped API can map them one-to-one via
//! [`StoreError::name`].

/// Store error types with detailed context
///
/// Errors are `Clone` because a single failure is stored on the request that
/// produced it and handed to every reader of `Request::error`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    /// A write violated a key or unique-index constraint
    #[error("Constraint violated in store '{store}': {reason}")]
    Constraint {
        /// Object store the write targeted
        store: String,
        /// Which constraint failed
        reason: String,
    },

    /// A key or value could not be used (bad key type, key path mismatch, ...)
    #[error("Invalid data: {reason}")]
    Data {
        /// Description of the rejected data
        reason: String,
    },

    /// The operation is not allowed in the object's current state
    #[error("Invalid state: {reason}")]
    InvalidState {
        /// Description of the offending state
        reason: String,
    },

    /// The operation is not supported by this kind of object
    #[error("Invalid access: {reason}")]
    InvalidAccess {
        /// Description of the unsupported access
        reason: String,
    },

    /// A named object store or index does not exist
    #[error("{kind} '{name}' not found")]
    NotFound {
        /// "object store" or "index"
        kind: &'static str,
        /// The missing name
        name: String,
    },

    /// An argument was outside its accepted domain
    #[error("Invalid argument: {reason}")]
    Type {
        /// Description of the rejected argument
        reason: String,
    },

    /// A queued request was abandoned before it ran
    #[error("Request aborted: {reason}")]
    Aborted {
        /// Why the request never ran
        reason: String,
    },

    /// Record size exceeds the configured maximum
    #[error("Record in store '{store}' too large: {entry_size} bytes exceeds limit of {max_size} bytes")]
    OversizedEntry {
        /// Object store the write targeted
        store: String,
        /// Serialized size of the rejected record
        entry_size: usize,
        /// Maximum allowed size
        max_size: usize,
    },

    /// Configuration failed validation
    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        /// The validation failure
        reason: String,
    },
}

impl StoreError {
    /// IndexedDB exception name for this error.
    pub fn name(&self) -> &'static str {
        match self {
            StoreError::Constraint { .. } => "ConstraintError",
            StoreError::Data { .. } => "DataError",
            StoreError::InvalidState { .. } => "InvalidStateError",
            StoreError::InvalidAccess { .. } => "InvalidAccessError",
            StoreError::NotFound { .. } => "NotFoundError",
            StoreError::Type { .. } | StoreError::InvalidConfig { .. } => "TypeError",
            StoreError::Aborted { .. } => "AbortError",
            StoreError::OversizedEntry { .. } => "DataCloneError",
        }
    }

    pub(crate) fn data(reason: impl Into<String>) -> Self {
        StoreError::Data { reason: reason.into() }
    }

    pub(crate) fn invalid_state(reason: impl Into<String>) -> Self {
        StoreError::InvalidState { reason: reason.into() }
    }

    pub(crate) fn invalid_access(reason: impl Into<String>) -> Self {
        StoreError::InvalidAccess { reason: reason.into() }
    }

    pub(crate) fn closed() -> Self {
        Self::invalid_state("database connection is closed")
    }
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

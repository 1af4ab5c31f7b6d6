//! Service error types

/// Error types for post and CRUD service operations
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// A precondition on the caller's input failed; raised before storage
    /// is touched
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Lookup miss; `key` is the url or id that was searched for
    #[error("{message}")]
    NotFound { message: String, key: String },

    /// Uniqueness violation, such as a url already in use
    #[error("{0}")]
    AlreadyExists(String),

    /// A single-row update affected some other number of rows
    #[error("{message}")]
    BadRequest { message: String, post_id: i64 },

    /// Storage or driver failure
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn invalid(message: impl Into<String>) -> Self {
        ServiceError::InvalidArgument(message.into())
    }

    pub fn not_found(message: impl Into<String>, key: impl ToString) -> Self {
        ServiceError::NotFound {
            message: message.into(),
            key: key.to_string(),
        }
    }
}

/// Result alias used by the service layer
pub type ServiceResult<T> = Result<T, ServiceError>;

//! Typed error handling for the CRM service
//!
//! Every failure the order flow can produce is a variant of [`CrmError`], which
//! knows its HTTP status, a stable error code and the JSON body returned to
//! clients.
//!
//! # Error Categories
//!
//! - [`ValidationError`]: malformed or missing input, raised before any write
//! - [`CrmError::InsufficientInventory`]: a guarded stock decrement matched no row
//! - [`CrmError::NotFound`]: an identifier does not resolve
//! - [`CrmError::InternalConsistency`]: a committed write could not be read back
//! - [`StorageError`]: failures reported by a storage backend
//! - [`RequestError`]: authentication and authorization failures
//!
//! # Example
//!
//! ```rust,ignore
//! match service.create_order(request).await {
//!     Ok(order) => println!("created {}", order.order.id),
//!     Err(CrmError::InsufficientInventory { product_name }) => {
//!         println!("out of stock: {}", product_name);
//!     }
//!     Err(e) => eprintln!("failed: {}", e),
//! }
//! ```

use crate::core::dates::DateError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;

/// The main error type of the service
#[derive(Debug)]
pub enum CrmError {
    /// Caller supplied invalid input; nothing was written
    Validation(ValidationError),

    /// A line item could not be covered by available stock; the order was rolled back
    InsufficientInventory { product_name: String },

    /// The requested entity does not exist
    NotFound { entity: String, id: String },

    /// A write committed but its read-back came back empty
    InternalConsistency { message: String },

    /// Storage backend failure
    Storage(StorageError),

    /// Authentication / authorization failure
    Request(RequestError),
}

impl fmt::Display for CrmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrmError::Validation(e) => write!(f, "{}", e),
            CrmError::InsufficientInventory { product_name } => {
                write!(f, "Insufficient inventory for product {}", product_name)
            }
            CrmError::NotFound { entity, id } => {
                write!(f, "{} with id '{}' not found", entity, id)
            }
            CrmError::InternalConsistency { message } => {
                write!(f, "Internal consistency error: {}", message)
            }
            CrmError::Storage(e) => write!(f, "{}", e),
            CrmError::Request(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CrmError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CrmError::Validation(e) => Some(e),
            CrmError::Storage(e) => Some(e),
            CrmError::Request(e) => Some(e),
            _ => None,
        }
    }
}

/// Error body returned to HTTP clients
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable summary
    pub error: String,
    /// Error code for programmatic handling
    pub code: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl CrmError {
    pub fn not_found(entity: &str, id: &str) -> Self {
        CrmError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            CrmError::Validation(_) => StatusCode::BAD_REQUEST,
            CrmError::InsufficientInventory { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            CrmError::NotFound { .. } => StatusCode::NOT_FOUND,
            CrmError::InternalConsistency { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            CrmError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CrmError::Request(e) => e.status_code(),
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            CrmError::Validation(e) => e.error_code(),
            CrmError::InsufficientInventory { .. } => "INSUFFICIENT_INVENTORY",
            CrmError::NotFound { .. } => "NOT_FOUND",
            CrmError::InternalConsistency { .. } => "INTERNAL_CONSISTENCY_ERROR",
            CrmError::Storage(_) => "STORAGE_ERROR",
            CrmError::Request(e) => e.error_code(),
        }
    }

    /// Convert to an error response
    ///
    /// Server-side failures get a generic summary with the specific cause in
    /// `details`; client errors carry the message itself.
    pub fn to_response(&self) -> ErrorResponse {
        let (error, details) = match self {
            CrmError::Validation(ValidationError::FieldErrors(errors)) => (
                self.to_string(),
                Some(serde_json::json!({ "fields": errors })),
            ),
            CrmError::Validation(_) | CrmError::Request(_) => (self.to_string(), None),
            CrmError::NotFound { entity, .. } => (format!("{} not found", capitalize(entity)), None),
            CrmError::InsufficientInventory { .. } => (
                "Failed to create order".to_string(),
                Some(serde_json::Value::String(self.to_string())),
            ),
            CrmError::InternalConsistency { .. } => (
                "Order was saved but could not be read back".to_string(),
                Some(serde_json::Value::String(self.to_string())),
            ),
            CrmError::Storage(e) => (
                "Storage operation failed".to_string(),
                Some(serde_json::Value::String(e.to_string())),
            ),
        };

        ErrorResponse {
            error,
            code: self.error_code().to_string(),
            details,
        }
    }
}

impl IntoResponse for CrmError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "request failed");
        }
        let body = Json(self.to_response());
        (status, body).into_response()
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Errors related to input validation
#[derive(Debug)]
pub enum ValidationError {
    /// Single field validation error
    FieldError { field: String, message: String },

    /// Multiple field validation errors
    FieldErrors(Vec<FieldValidationError>),

    /// A date field could not be parsed
    InvalidDate { field: String, source: DateError },

    /// Body is not valid JSON or does not match the expected shape
    InvalidJson { message: String },

    /// A partial update named no whitelisted field
    NoValidFields,

    /// Entity name has no whitelist
    UnknownEntity { entity: String },
}

/// A single field validation error
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldValidationError {
    pub field: String,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::FieldError { field, message } => {
                write!(f, "Validation error for field '{}': {}", field, message)
            }
            ValidationError::FieldErrors(errors) => {
                let msgs: Vec<String> = errors
                    .iter()
                    .map(|e| format!("{}: {}", e.field, e.message))
                    .collect();
                write!(f, "Validation errors: {}", msgs.join(", "))
            }
            ValidationError::InvalidDate { field, source } => {
                write!(f, "Invalid date for field '{}': {}", field, source)
            }
            ValidationError::InvalidJson { message } => {
                write!(f, "Invalid JSON: {}", message)
            }
            ValidationError::NoValidFields => write!(f, "No valid fields to update"),
            ValidationError::UnknownEntity { entity } => {
                write!(f, "Unknown entity type: {}", entity)
            }
        }
    }
}

impl std::error::Error for ValidationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ValidationError::InvalidDate { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl ValidationError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ValidationError::InvalidDate {
                source: DateError::Parse(_),
                ..
            } => "DATE_PARSE_ERROR",
            ValidationError::InvalidDate {
                source: DateError::Format(_),
                ..
            } => "DATE_FORMAT_ERROR",
            ValidationError::NoValidFields => "NO_VALID_FIELDS",
            ValidationError::UnknownEntity { .. } => "UNKNOWN_ENTITY_TYPE",
            ValidationError::InvalidJson { .. } => "INVALID_JSON",
            _ => "VALIDATION_ERROR",
        }
    }
}

impl From<ValidationError> for CrmError {
    fn from(err: ValidationError) -> Self {
        CrmError::Validation(err)
    }
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors reported by storage backends
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to connect to {backend}: {message}")]
    Connection { backend: String, message: String },

    #[error("{backend} query error: {message}")]
    Query { backend: String, message: String },

    #[error("Transaction error: {message}")]
    Transaction { message: String },

    #[error("Data integrity error: {message}")]
    Integrity { message: String },
}

impl StorageError {
    pub fn query(backend: &str, message: impl fmt::Display) -> Self {
        StorageError::Query {
            backend: backend.to_string(),
            message: message.to_string(),
        }
    }
}

impl From<StorageError> for CrmError {
    fn from(err: StorageError) -> Self {
        CrmError::Storage(err)
    }
}

#[cfg(feature = "mysql")]
impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StorageError::Connection {
                    backend: "MySQL".to_string(),
                    message: err.to_string(),
                }
            }
            other => StorageError::query("MySQL", other),
        }
    }
}

// =============================================================================
// Request Errors
// =============================================================================

/// Errors related to who is calling
#[derive(Debug)]
pub enum RequestError {
    /// No usable principal on the request
    Unauthorized { message: String },

    /// Principal lacks access to the page guarding this route
    Forbidden { page: String },
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::Unauthorized { message } => write!(f, "Unauthorized: {}", message),
            RequestError::Forbidden { page } => write!(
                f,
                "Access denied to this resource. Your account does not have permission to access the {} page.",
                page
            ),
        }
    }
}

impl std::error::Error for RequestError {}

impl RequestError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RequestError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            RequestError::Forbidden { .. } => StatusCode::FORBIDDEN,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            RequestError::Unauthorized { .. } => "UNAUTHORIZED",
            RequestError::Forbidden { .. } => "FORBIDDEN",
        }
    }
}

impl From<RequestError> for CrmError {
    fn from(err: RequestError) -> Self {
        CrmError::Request(err)
    }
}

// =============================================================================
// Conversions from external errors
// =============================================================================

impl From<serde_json::Error> for CrmError {
    fn from(err: serde_json::Error) -> Self {
        CrmError::Validation(ValidationError::InvalidJson {
            message: err.to_string(),
        })
    }
}

/// A specialized Result type for service operations
pub type CrmResult<T> = Result<T, CrmError>;

/// A specialized Result type for storage backends
pub type StorageResult<T> = Result<T, StorageError>;

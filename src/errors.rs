use axum::{
    extract::multipart::MultipartError,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use utoipa::ToSchema;

/// Result alias used across the core.
pub type ContactResult<T> = Result<T, ContactError>;

/// Rule a field value violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FieldRule {
    Required,
    Length,
    Format,
    Range,
}

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FieldError {
    /// Wire name of the offending field (e.g. `postalCode`).
    #[serde(rename = "fieldName")]
    pub field: String,
    pub rule: FieldRule,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, rule: FieldRule, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            rule,
            message: message.into(),
        }
    }
}

/// How a missing contact was looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactLookup {
    Id(i64),
    Name(String),
}

impl fmt::Display for ContactLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContactLookup::Id(id) => write!(f, "ID: {}", id),
            ContactLookup::Name(name) => write!(f, "name: {}", name),
        }
    }
}

/// Failures of a postal-code resolution.
///
/// A malformed code, a code the directory does not know and an upstream outage
/// are reported separately.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// Blank postal code or wrong digit count; detected before any network call.
    #[error("{0}")]
    InvalidInput(String),
    /// The directory has no usable record for this code.
    #[error("postal code not found: {postal_code}")]
    NotFound { postal_code: String },
    /// Timeout, transport failure or unexpected upstream answer.
    #[error("{message}")]
    ServiceUnavailable {
        message: String,
        status: Option<u16>,
    },
}

/// Coarse classification of a [`ContactError`], used by the HTTP boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ValidationFailed,
    InvalidInput,
    ContactNotFound,
    AddressNotFound,
    AddressServiceUnavailable,
    UnsupportedExportFormat,
    ImportStreamUnreadable,
    Storage,
    Render,
}

impl ErrorKind {
    pub fn status_code(self) -> StatusCode {
        match self {
            ErrorKind::ValidationFailed
            | ErrorKind::InvalidInput
            | ErrorKind::UnsupportedExportFormat
            | ErrorKind::ImportStreamUnreadable => StatusCode::BAD_REQUEST,
            ErrorKind::ContactNotFound | ErrorKind::AddressNotFound => StatusCode::NOT_FOUND,
            ErrorKind::AddressServiceUnavailable => StatusCode::BAD_GATEWAY,
            ErrorKind::Storage | ErrorKind::Render => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ErrorKind::ValidationFailed => "Validation Error",
            ErrorKind::InvalidInput => "Bad Request",
            ErrorKind::ContactNotFound => "Resource Not Found",
            ErrorKind::AddressNotFound => "Address Not Found",
            ErrorKind::AddressServiceUnavailable => "External Service Error",
            ErrorKind::UnsupportedExportFormat => "Unsupported Export Format",
            ErrorKind::ImportStreamUnreadable => "CSV Processing Error",
            ErrorKind::Storage | ErrorKind::Render => "Internal Server Error",
        }
    }
}

/// Core error taxonomy of the contact pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContactError {
    #[error("validation failed for {} field(s)", .0.len())]
    ValidationFailed(Vec<FieldError>),
    #[error("{0}")]
    InvalidInput(String),
    #[error("contact not found with {0}")]
    ContactNotFound(ContactLookup),
    #[error("address not found for postal code: {postal_code}")]
    AddressNotFound { postal_code: String },
    #[error("address service unavailable: {message}")]
    AddressServiceUnavailable {
        message: String,
        status: Option<u16>,
    },
    #[error("unsupported export format: {0}")]
    UnsupportedExportFormat(String),
    #[error("could not read import stream: {0}")]
    ImportStreamUnreadable(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("failed to render {format} export: {message}")]
    Render { format: String, message: String },
}

impl ContactError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ContactError::ValidationFailed(_) => ErrorKind::ValidationFailed,
            ContactError::InvalidInput(_) => ErrorKind::InvalidInput,
            ContactError::ContactNotFound(_) => ErrorKind::ContactNotFound,
            ContactError::AddressNotFound { .. } => ErrorKind::AddressNotFound,
            ContactError::AddressServiceUnavailable { .. } => {
                ErrorKind::AddressServiceUnavailable
            }
            ContactError::UnsupportedExportFormat(_) => ErrorKind::UnsupportedExportFormat,
            ContactError::ImportStreamUnreadable(_) => ErrorKind::ImportStreamUnreadable,
            ContactError::Storage(_) => ErrorKind::Storage,
            ContactError::Render { .. } => ErrorKind::Render,
        }
    }

    /// Field errors carried by a validation failure, empty for every other kind.
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            ContactError::ValidationFailed(errors) => errors,
            _ => &[],
        }
    }

    pub fn not_found_by_id(id: i64) -> Self {
        ContactError::ContactNotFound(ContactLookup::Id(id))
    }

    pub fn not_found_by_name(name: impl Into<String>) -> Self {
        ContactError::ContactNotFound(ContactLookup::Name(name.into()))
    }

    /// Message safe to show to API clients.
    fn client_message(&self) -> String {
        match self {
            ContactError::ValidationFailed(_) => {
                "Validation failed for the provided fields".to_string()
            }
            ContactError::ContactNotFound(lookup) => format!("Contact not found with {}", lookup),
            ContactError::AddressNotFound { postal_code } => {
                format!("Postal code not found: {}", postal_code)
            }
            ContactError::AddressServiceUnavailable { status, .. } => match status {
                Some(code) => format!(
                    "Postal code lookup service error (status: {}). Try again later.",
                    code
                ),
                None => "Postal code lookup service unavailable. Try again later.".to_string(),
            },
            ContactError::Storage(_) | ContactError::Render { .. } => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<AddressError> for ContactError {
    fn from(err: AddressError) -> Self {
        match err {
            AddressError::InvalidInput(message) => ContactError::InvalidInput(message),
            AddressError::NotFound { postal_code } => ContactError::AddressNotFound { postal_code },
            AddressError::ServiceUnavailable { message, status } => {
                ContactError::AddressServiceUnavailable { message, status }
            }
        }
    }
}

impl From<sqlx::Error> for ContactError {
    fn from(err: sqlx::Error) -> Self {
        ContactError::Storage(err.to_string())
    }
}

/// Error type returned by HTTP handlers.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Contact(#[from] ContactError),
    /// Malformed request that never reached the core (bad JSON, broken multipart).
    #[error("bad request: {message}")]
    BadRequest {
        message: String,
        errors: Vec<FieldError>,
    },
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError::BadRequest {
            message: message.into(),
            errors: Vec::new(),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest {
            message: "Malformed request body".to_string(),
            errors: vec![FieldError::new(
                "json",
                FieldRule::Format,
                rejection.body_text(),
            )],
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::bad_request(format!("Invalid multipart upload: {}", err))
    }
}

/// JSON body shared by every error response.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub timestamp: String,
    pub status: u16,
    pub error: String,
    pub message: String,
    pub correlation_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_count: Option<usize>,
}

fn correlation_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

impl IntoResponse for AppError {
    /// Maps each error kind to its status code and logs it by severity.
    fn into_response(self) -> Response {
        let correlation_id = correlation_id();

        let (status, title, message, errors) = match &self {
            AppError::Contact(err) => {
                let kind = err.kind();
                let status = kind.status_code();
                if status.is_server_error() {
                    tracing::error!("{} [{}]: {}", kind.title(), correlation_id, err);
                } else {
                    tracing::warn!("{} [{}]: {}", kind.title(), correlation_id, err);
                }
                let errors = match err {
                    ContactError::ValidationFailed(errors) => Some(errors.clone()),
                    _ => None,
                };
                (status, kind.title(), err.client_message(), errors)
            }
            AppError::BadRequest { message, errors } => {
                tracing::warn!("Bad request [{}]: {}", correlation_id, message);
                let errors = if errors.is_empty() {
                    None
                } else {
                    Some(errors.clone())
                };
                (StatusCode::BAD_REQUEST, "Bad Request", message.clone(), errors)
            }
        };

        let body = ErrorBody {
            timestamp: chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            status: status.as_u16(),
            error: title.to_string(),
            message,
            correlation_id,
            error_count: errors.as_ref().map(Vec::len),
            errors,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping_is_one_class_per_kind() {
        let cases = [
            (ContactError::ValidationFailed(vec![]), StatusCode::BAD_REQUEST),
            (ContactError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (ContactError::not_found_by_id(1), StatusCode::NOT_FOUND),
            (
                ContactError::AddressNotFound {
                    postal_code: "00000000".into(),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                ContactError::AddressServiceUnavailable {
                    message: "down".into(),
                    status: Some(503),
                },
                StatusCode::BAD_GATEWAY,
            ),
            (
                ContactError::UnsupportedExportFormat("doc".into()),
                StatusCode::BAD_REQUEST,
            ),
            (ContactError::Storage("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            assert_eq!(err.kind().status_code(), expected, "{:?}", err);
        }
    }

    #[test]
    fn test_address_error_conversion_keeps_kind() {
        let not_found: ContactError = AddressError::NotFound {
            postal_code: "00000000".into(),
        }
        .into();
        assert_eq!(not_found.kind(), ErrorKind::AddressNotFound);

        let unavailable: ContactError = AddressError::ServiceUnavailable {
            message: "timeout".into(),
            status: None,
        }
        .into();
        assert_eq!(unavailable.kind(), ErrorKind::AddressServiceUnavailable);

        let invalid: ContactError = AddressError::InvalidInput("bad".into()).into();
        assert_eq!(invalid.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_field_errors_only_on_validation() {
        let err = ContactError::ValidationFailed(vec![FieldError::new(
            "name",
            FieldRule::Required,
            "Name cannot be blank",
        )]);
        assert_eq!(err.field_errors().len(), 1);
        assert!(ContactError::not_found_by_name("Ghost").field_errors().is_empty());
    }

    #[test]
    fn test_internal_details_are_not_exposed() {
        let err = ContactError::Storage("connection refused on 10.0.0.3".into());
        assert_eq!(err.client_message(), "Internal server error");
    }

    #[tokio::test]
    async fn test_storage_failure_renders_as_500_without_details() {
        let response =
            AppError::from(ContactError::Storage("relation contacts does not exist".into()))
                .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"], "Internal Server Error");
        assert_eq!(body["message"], "Internal server error");
        assert!(body.get("path").is_none());
        assert_eq!(body["correlationId"].as_str().unwrap().len(), 8);
    }

    #[test]
    fn test_correlation_id_length() {
        assert_eq!(correlation_id().len(), 8);
    }
}

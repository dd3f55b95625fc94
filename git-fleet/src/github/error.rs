//! GitHub API error types.

use crate::github::http::{HttpResponse, TransportError};
use crate::github::models::{ErrorBody, ErrorDetail};
use crate::rate_limit::RateLimitSignal;
use thiserror::Error;

/// Errors returned by GitHub API operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// GitHub answered with a non-success status.
    #[error("GitHub API returned {status}: {message}")]
    Status {
        status: u16,
        message: String,
        documentation_url: Option<String>,
        errors: Vec<ErrorDetail>,
        rate_limit: Option<RateLimitSignal>,
    },

    /// The response body did not match the expected shape.
    #[error("Failed to decode GitHub response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// The API base URL cannot carry path segments.
    #[error("Invalid GitHub API URL '{url}'")]
    InvalidUrl { url: String },
}

impl ApiError {
    /// Builds an error from a non-success response.
    pub(crate) fn from_response(response: &HttpResponse) -> Self {
        let body = ErrorBody::from_bytes(&response.body).unwrap_or_else(|| ErrorBody {
            message: String::from_utf8_lossy(&response.body).trim().to_string(),
            ..ErrorBody::default()
        });

        Self::Status {
            status: response.status.as_u16(),
            message: body.message,
            documentation_url: body.documentation_url,
            errors: body.errors,
            rate_limit: RateLimitSignal::detect(response),
        }
    }

    /// Returns the HTTP status, if GitHub answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Returns the rate-limit classification carried by the error.
    pub fn rate_limit(&self) -> Option<RateLimitSignal> {
        match self {
            Self::Status { rate_limit, .. } => *rate_limit,
            _ => None,
        }
    }

    /// Returns true if the top-level message or any detail message contains `needle`.
    pub fn mentions(&self, needle: &str) -> bool {
        match self {
            Self::Status {
                message, errors, ..
            } => {
                message.contains(needle)
                    || errors
                        .iter()
                        .filter_map(|detail| detail.message.as_deref())
                        .any(|detail| detail.contains(needle))
            }
            _ => false,
        }
    }

    /// Returns true if a validation detail names `field` with error `code`.
    pub fn has_field_error(&self, field: &str, code: &str) -> bool {
        match self {
            Self::Status { errors, .. } => errors.iter().any(|detail| {
                detail.field.as_deref() == Some(field) && detail.code.as_deref() == Some(code)
            }),
            _ => false,
        }
    }
}

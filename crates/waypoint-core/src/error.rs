//! Error types for Waypoint.
//!
//! [`RoutingError`] is the single error type surfaced by route declaration,
//! dispatch, alias resolution and URL generation. Every variant maps to an
//! [`ErrorCategory`], which in turn maps to an HTTP status code, so strategies
//! can render any error as a response without inspecting variants.
//!
//! | Variant | Category | Status |
//! |---|---|---|
//! | `NotFound` | `NotFound` | 404 |
//! | `MethodNotAllowed` | `MethodNotAllowed` | 405 |
//! | `BadRouteDeclaration`, `DuplicateRouteName` | `Declaration` | 500 |
//! | `Unresolvable*` | `Resolution` | 500 |
//! | `InvalidRouteUrl` | `Url` | 500 |
//! | `Dispatch`, `Handler` | `Internal` | 500 |

use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using [`RoutingError`].
pub type RoutingResult<T> = Result<T, RoutingError>;

/// Categories of routing errors for classification and rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// No route matches the request path.
    NotFound,
    /// The path matches but the method does not.
    MethodNotAllowed,
    /// Route setup is invalid (programming error).
    Declaration,
    /// An alias could not be resolved to an instance.
    Resolution,
    /// A URL could not be generated.
    Url,
    /// Dispatch or handler failure.
    Internal,
}

impl ErrorCategory {
    /// Returns the default HTTP status code for this error category.
    #[must_use]
    pub const fn default_status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Declaration | Self::Resolution | Self::Url | Self::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Standard error type for Waypoint.
///
/// # Example
///
/// ```
/// use waypoint_core::{ErrorCategory, RoutingError};
///
/// let err = RoutingError::bad_route("/posts/{id", "unterminated placeholder");
/// assert_eq!(err.category(), ErrorCategory::Declaration);
/// assert!(err.to_string().contains("/posts/{id"));
/// ```
#[derive(Error, Debug)]
pub enum RoutingError {
    /// No route matches the request path.
    #[error("Not Found: no route matches {method} {path}")]
    NotFound {
        /// Request method.
        method: String,
        /// Request path (base prefix already stripped).
        path: String,
    },

    /// The path matches at least one route, but not for this method.
    #[error("Method Not Allowed: {method} {path} (allowed: {})", .allowed.join(", "))]
    MethodNotAllowed {
        /// Request method.
        method: String,
        /// Request path.
        path: String,
        /// Methods that do match the path.
        allowed: Vec<String>,
    },

    /// A route pattern is structurally invalid.
    #[error("Bad route declaration `{pattern}`: {reason}")]
    BadRouteDeclaration {
        /// The offending pattern.
        pattern: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Two routes share the same name.
    #[error("Duplicate route name: {name}")]
    DuplicateRouteName {
        /// The ambiguous name.
        name: String,
    },

    /// A middleware alias resolves to nothing.
    #[error("Could not resolve middleware: {alias}")]
    UnresolvableMiddleware {
        /// The middleware alias.
        alias: String,
    },

    /// The configured fallback resolves to nothing callable.
    #[error("Could not resolve a callable route fallback: {reason}")]
    UnresolvableFallback {
        /// Why resolution failed.
        reason: String,
    },

    /// A handler alias resolves to nothing callable.
    #[error("Could not resolve route handler: {alias}")]
    UnresolvableHandler {
        /// The handler alias.
        alias: String,
    },

    /// A strategy alias resolves to nothing.
    #[error("Could not resolve dispatch strategy: {alias}")]
    UnresolvableStrategy {
        /// The strategy alias.
        alias: String,
    },

    /// A URL cannot be generated from a pattern and arguments.
    #[error("Invalid route url `{pattern}`: {reason}")]
    InvalidRouteUrl {
        /// The path pattern being reversed.
        pattern: String,
        /// The argument or constraint that failed.
        reason: String,
    },

    /// Generic dispatch failure carrying the original message.
    #[error("{message}")]
    Dispatch {
        /// The original failure message.
        message: String,
    },

    /// A handler reported a failure.
    #[error("Handler error: {message}")]
    Handler {
        /// Human-readable error message.
        message: String,
        /// The underlying error (not exposed to clients).
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl RoutingError {
    /// Creates a not found error.
    #[must_use]
    pub fn not_found(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self::NotFound {
            method: method.into(),
            path: path.into(),
        }
    }

    /// Creates a method not allowed error.
    #[must_use]
    pub fn method_not_allowed(
        method: impl Into<String>,
        path: impl Into<String>,
        allowed: Vec<String>,
    ) -> Self {
        Self::MethodNotAllowed {
            method: method.into(),
            path: path.into(),
            allowed,
        }
    }

    /// Creates a bad route declaration error.
    #[must_use]
    pub fn bad_route(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::BadRouteDeclaration {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }

    /// Creates a duplicate route name error.
    #[must_use]
    pub fn duplicate_name(name: impl Into<String>) -> Self {
        Self::DuplicateRouteName { name: name.into() }
    }

    /// Creates an unresolvable middleware error.
    #[must_use]
    pub fn unresolvable_middleware(alias: impl Into<String>) -> Self {
        Self::UnresolvableMiddleware {
            alias: alias.into(),
        }
    }

    /// Creates an unresolvable fallback error.
    #[must_use]
    pub fn unresolvable_fallback(reason: impl Into<String>) -> Self {
        Self::UnresolvableFallback {
            reason: reason.into(),
        }
    }

    /// Creates an unresolvable handler error.
    #[must_use]
    pub fn unresolvable_handler(alias: impl Into<String>) -> Self {
        Self::UnresolvableHandler {
            alias: alias.into(),
        }
    }

    /// Creates an unresolvable strategy error.
    #[must_use]
    pub fn unresolvable_strategy(alias: impl Into<String>) -> Self {
        Self::UnresolvableStrategy {
            alias: alias.into(),
        }
    }

    /// Creates an invalid route url error.
    #[must_use]
    pub fn invalid_url(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRouteUrl {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }

    /// Creates a generic dispatch failure.
    #[must_use]
    pub fn dispatch(message: impl Into<String>) -> Self {
        Self::Dispatch {
            message: message.into(),
        }
    }

    /// Creates a handler failure with a source error.
    pub fn handler(source: impl Into<anyhow::Error>) -> Self {
        let source = source.into();
        Self::Handler {
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::MethodNotAllowed { .. } => ErrorCategory::MethodNotAllowed,
            Self::BadRouteDeclaration { .. } | Self::DuplicateRouteName { .. } => {
                ErrorCategory::Declaration
            }
            Self::UnresolvableMiddleware { .. }
            | Self::UnresolvableFallback { .. }
            | Self::UnresolvableHandler { .. }
            | Self::UnresolvableStrategy { .. } => ErrorCategory::Resolution,
            Self::InvalidRouteUrl { .. } => ErrorCategory::Url,
            Self::Dispatch { .. } | Self::Handler { .. } => ErrorCategory::Internal,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        self.category().default_status_code()
    }

    /// Converts this error to a serializable error envelope.
    #[must_use]
    pub fn to_envelope(&self, request_id: Option<&str>) -> ErrorEnvelope {
        ErrorEnvelope {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message: self.to_string(),
                category: self.category(),
                details: self.error_details(),
            },
            request_id: request_id.map(ToString::to_string),
        }
    }

    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::MethodNotAllowed { .. } => "METHOD_NOT_ALLOWED",
            Self::BadRouteDeclaration { .. } => "BAD_ROUTE_DECLARATION",
            Self::DuplicateRouteName { .. } => "DUPLICATE_ROUTE_NAME",
            Self::UnresolvableMiddleware { .. } => "UNRESOLVABLE_MIDDLEWARE",
            Self::UnresolvableFallback { .. } => "UNRESOLVABLE_FALLBACK",
            Self::UnresolvableHandler { .. } => "UNRESOLVABLE_HANDLER",
            Self::UnresolvableStrategy { .. } => "UNRESOLVABLE_STRATEGY",
            Self::InvalidRouteUrl { .. } => "INVALID_ROUTE_URL",
            Self::Dispatch { .. } => "DISPATCH_ERROR",
            Self::Handler { .. } => "HANDLER_ERROR",
        }
    }

    fn error_details(&self) -> Option<serde_json::Value> {
        match self {
            Self::MethodNotAllowed { allowed, .. } => Some(serde_json::json!({
                "allowed": allowed
            })),
            Self::NotFound { method, path } => Some(serde_json::json!({
                "method": method,
                "path": path
            })),
            _ => None,
        }
    }
}

/// Serializable error envelope for HTTP responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// The error details.
    pub error: ErrorDetail,
    /// The request ID for correlation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Error detail within an envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Error category.
    pub category: ErrorCategory,
    /// Additional error details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let error = RoutingError::not_found("GET", "/missing");
        assert_eq!(error.category(), ErrorCategory::NotFound);
        assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
        assert!(error.to_string().contains("GET /missing"));
    }

    #[test]
    fn test_method_not_allowed_lists_methods() {
        let error = RoutingError::method_not_allowed(
            "DELETE",
            "/x",
            vec!["GET".to_string(), "POST".to_string()],
        );
        assert_eq!(error.status_code(), StatusCode::METHOD_NOT_ALLOWED);
        assert!(error.to_string().contains("allowed: GET, POST"));

        let envelope = error.to_envelope(None);
        let details = envelope.error.details.unwrap();
        assert_eq!(details["allowed"][1], "POST");
    }

    #[test]
    fn test_declaration_errors() {
        let error = RoutingError::duplicate_name("home");
        assert_eq!(error.category(), ErrorCategory::Declaration);
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.to_string(), "Duplicate route name: home");
    }

    #[test]
    fn test_dispatch_keeps_original_message() {
        let original = RoutingError::not_found("GET", "/nowhere");
        let error = RoutingError::dispatch(original.to_string());
        assert_eq!(error.to_string(), original.to_string());
        assert_eq!(error.category(), ErrorCategory::Internal);
    }

    #[test]
    fn test_handler_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let error = RoutingError::handler(io);
        assert!(error.to_string().contains("disk on fire"));
        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    fn test_error_envelope_serialization() {
        let error = RoutingError::invalid_url("/post/{id}", "argument `id` is missing");
        let envelope = error.to_envelope(Some("req-456"));

        let json = serde_json::to_string(&envelope).expect("serialization should work");
        assert!(json.contains("\"code\":\"INVALID_ROUTE_URL\""));
        assert!(json.contains("\"request_id\":\"req-456\""));
        assert!(json.contains("\"category\":\"url\""));
    }
}

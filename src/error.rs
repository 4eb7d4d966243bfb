//! Error taxonomy and the serialized error envelope.
//!
//! Every error a handler can return falls into one of three classes, and the
//! class decides what the caller sees:
//!
//! - **Trusted** — carries an intended status code and a message that is safe
//!   to show the caller: authentication and authorization failures, validation
//!   problems, not-found, deadline overruns, and anything built with
//!   [`Error::trusted`].
//! - **Untrusted** — everything unclassified, including recovered panics and
//!   infrastructure failures. The full detail is logged server-side; the
//!   caller always gets `500` with a fixed generic message. Internal error
//!   strings never leak to the wire.
//! - **Shutdown** — a request to terminate the process. It carries no HTTP
//!   semantics at all: the errors middleware intercepts it before any response
//!   is written and signals the termination conduit instead.
//!
//! The class is a property of the variant, not of some runtime type probe —
//! the errors middleware matches on it exhaustively.

use std::collections::BTreeMap;

use http::StatusCode;
use serde::Serialize;

use crate::auth::Rule;

/// The error type carried through every handler chain.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Token missing, malformed, expired, or failed verification. 401.
    #[error("authenticate: {0}")]
    Authentication(String),

    /// An authenticated caller failed a named rule. 403.
    ///
    /// The rule name and the attempted roles appear in the log line (the
    /// roles are Debug-escaped, so a hostile-but-signed token cannot smuggle
    /// control characters into the log). The response body never echoes them.
    #[error("authorize: not authorized for that action, claims{roles:?} rule[{rule}]")]
    Authorization {
        /// The rule that rejected the caller.
        rule: Rule,
        /// The roles the caller presented.
        roles: Vec<String>,
    },

    /// Malformed input with a user-safe description. 400.
    #[error("{0}")]
    Validation(String),

    /// Per-field validation failures. 400, with a `fields` map in the body.
    #[error("data validation error")]
    Fields(FieldErrors),

    /// The requested resource or route does not exist. 404.
    #[error("{0}")]
    NotFound(String),

    /// The execution context's deadline passed before the work finished. 408.
    #[error("request deadline exceeded")]
    Timeout,

    /// Any other status + safe message pairing a handler wants to surface.
    #[error("{message}")]
    Trusted {
        /// Status code written to the response.
        status: StatusCode,
        /// Message written to the response body. Must be safe for callers.
        message: String,
    },

    /// Fatal: terminate the process. Never produces an HTTP response.
    #[error("shutdown requested: {0}")]
    Shutdown(String),

    /// Unclassified failure. Logged in full, surfaced as a generic 500.
    #[error("{0}")]
    Untrusted(Box<dyn std::error::Error + Send + Sync>),

    /// Transport-level failure: binding a port, accepting a connection.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Builds a trusted error with an explicit status and caller-safe message.
    pub fn trusted(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Trusted { status, message: message.into() }
    }

    /// Wraps an unclassified error. The caller will only ever see a generic 500.
    pub fn untrusted(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Untrusted(err.into())
    }

    /// Builds a shutdown request. The reason is logged, never sent to a caller.
    pub fn shutdown(reason: impl Into<String>) -> Self {
        Self::Shutdown(reason.into())
    }

    /// True for errors that carry an intended status and caller-safe message.
    pub fn is_trusted(&self) -> bool {
        matches!(
            self,
            Self::Authentication(_)
                | Self::Authorization { .. }
                | Self::Validation(_)
                | Self::Fields(_)
                | Self::NotFound(_)
                | Self::Timeout
                | Self::Trusted { .. }
        )
    }

    /// True when this error must terminate the process instead of a response.
    pub fn is_shutdown(&self) -> bool {
        matches!(self, Self::Shutdown(_))
    }

    /// The status code the response writer uses for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Authentication(_) => StatusCode::UNAUTHORIZED,
            Self::Authorization { .. } => StatusCode::FORBIDDEN,
            Self::Validation(_) | Self::Fields(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Timeout => StatusCode::REQUEST_TIMEOUT,
            Self::Trusted { status, .. } => *status,
            Self::Shutdown(_) | Self::Untrusted(_) | Self::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// The message the response writer puts in the body for this error.
    ///
    /// Untrusted detail is replaced with a fixed string here; the full error
    /// only ever reaches the log.
    pub fn safe_message(&self) -> String {
        match self {
            Self::Authentication(_) => "authentication failed".to_owned(),
            Self::Authorization { .. } => "you are not authorized for that action".to_owned(),
            Self::Validation(message) => message.clone(),
            Self::Fields(_) => "data validation error".to_owned(),
            Self::NotFound(message) => message.clone(),
            Self::Timeout => "request deadline exceeded".to_owned(),
            Self::Trusted { message, .. } => message.clone(),
            Self::Shutdown(_) | Self::Untrusted(_) | Self::Io(_) => {
                "internal server error".to_owned()
            }
        }
    }

    pub(crate) fn fields(&self) -> Option<BTreeMap<String, String>> {
        match self {
            Self::Fields(fields) => Some(fields.to_map()),
            _ => None,
        }
    }
}

// ── FieldErrors ───────────────────────────────────────────────────────────────

/// A collection of per-field validation failures.
///
/// ```rust
/// use strut::{Error, FieldErrors};
///
/// let mut fields = FieldErrors::new();
/// fields.add("email", "must be a valid address");
/// fields.add("name", "must not be empty");
/// assert!(!fields.is_empty());
///
/// let err = Error::Fields(fields);
/// ```
#[derive(Debug, Default)]
pub struct FieldErrors(Vec<FieldError>);

#[derive(Debug)]
struct FieldError {
    field: String,
    error: String,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Records one failing field.
    pub fn add(&mut self, field: impl Into<String>, error: impl Into<String>) {
        self.0.push(FieldError { field: field.into(), error: error.into() });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn to_map(&self) -> BTreeMap<String, String> {
        self.0
            .iter()
            .map(|f| (f.field.clone(), f.error.clone()))
            .collect()
    }
}

// ── ErrorResponse ─────────────────────────────────────────────────────────────

/// The wire shape of every error response: `{"error": "..."}`, plus a
/// `fields` map for per-field validation failures.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Caller-safe description of what went wrong.
    pub error: String,

    /// Per-field detail, present only for [`Error::Fields`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<BTreeMap<String, String>>,
}

impl ErrorResponse {
    pub(crate) fn from_error(err: &Error) -> Self {
        Self { error: err.safe_message(), fields: err.fields() }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_is_disjoint() {
        let trusted = Error::NotFound("path not found".to_owned());
        assert!(trusted.is_trusted());
        assert!(!trusted.is_shutdown());

        let shutdown = Error::shutdown("integrity issue");
        assert!(shutdown.is_shutdown());
        assert!(!shutdown.is_trusted());

        let untrusted = Error::untrusted("database exploded with gory detail");
        assert!(!untrusted.is_trusted());
        assert!(!untrusted.is_shutdown());
    }

    #[test]
    fn status_mapping() {
        assert_eq!(Error::Authentication("x".into()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            Error::Authorization { rule: Rule::AdminOnly, roles: vec![] }.status(),
            StatusCode::FORBIDDEN,
        );
        assert_eq!(Error::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(Error::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(Error::Timeout.status(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(
            Error::trusted(StatusCode::CONFLICT, "taken").status(),
            StatusCode::CONFLICT,
        );
        assert_eq!(Error::untrusted("boom").status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn untrusted_detail_never_reaches_the_envelope() {
        let err = Error::untrusted("connection to 10.0.0.3:5432 refused");
        let envelope = ErrorResponse::from_error(&err);
        assert_eq!(envelope.error, "internal server error");

        let body = serde_json::to_string(&envelope).unwrap();
        assert!(!body.contains("10.0.0.3"));
        assert!(!body.contains("fields"));
    }

    #[test]
    fn authorization_envelope_omits_roles() {
        let err = Error::Authorization {
            rule: Rule::AdminOnly,
            roles: vec!["USER".to_owned()],
        };

        // The log line carries the audit detail.
        assert!(err.to_string().contains("rule_admin_only"));
        assert!(err.to_string().contains("USER"));

        // The envelope does not.
        let body = serde_json::to_string(&ErrorResponse::from_error(&err)).unwrap();
        assert!(!body.contains("USER"));
        assert!(!body.contains("rule_admin_only"));
    }

    #[test]
    fn fields_envelope_carries_the_map() {
        let mut fields = FieldErrors::new();
        fields.add("email", "must be a valid address");

        let envelope = ErrorResponse::from_error(&Error::Fields(fields));
        let body = serde_json::to_string(&envelope).unwrap();
        assert!(body.contains(r#""error":"data validation error""#));
        assert!(body.contains(r#""email":"must be a valid address""#));
    }
}

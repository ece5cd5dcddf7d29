use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tether_core::{
    backend::BackendError,
    error::{Error as CoreError, ValidationError},
};
use thiserror::Error as ThisError;

///
/// Error
/// Public error type with a stable class + origin taxonomy.
///
/// `issues` repeats the per-keypath messages of a data error so callers can
/// report every failing field without parsing `message`.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize, ThisError)]
#[error("{message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub origin: ErrorOrigin,
    pub message: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub issues: BTreeMap<String, Vec<String>>,
}

impl Error {
    pub fn new(kind: ErrorKind, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            kind,
            origin,
            message: message.into(),
            issues: BTreeMap::new(),
        }
    }

    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self.kind, ErrorKind::Validation)
    }
}

impl From<ValidationError> for Error {
    fn from(err: ValidationError) -> Self {
        let mut out = Self::new(ErrorKind::Validation, ErrorOrigin::Validate, err.to_string());
        out.issues = err.issues().clone();

        out
    }
}

impl From<BackendError> for Error {
    fn from(err: BackendError) -> Self {
        let kind = match err {
            BackendError::ObjectNotFound { .. } => ErrorKind::NotFound,
            BackendError::UniqueConstraint { .. } => ErrorKind::Conflict,
            BackendError::Other(_) => ErrorKind::Internal,
        };

        Self::new(kind, ErrorOrigin::Backend, err.to_string())
    }
}

impl From<CoreError> for Error {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();

        match err {
            CoreError::Validation(err) => err.into(),
            CoreError::Backend(err) => err.into(),
            CoreError::Definition(_) | CoreError::AbstractSchema(_) => {
                Self::new(ErrorKind::Definition, ErrorOrigin::Schema, message)
            }
            CoreError::Unauthorized { .. } => {
                Self::new(ErrorKind::Unauthorized, ErrorOrigin::Lifecycle, message)
            }
            CoreError::DeleteDenied { .. } => {
                Self::new(ErrorKind::DeleteDenied, ErrorOrigin::Lifecycle, message)
            }
            CoreError::ResetDisabled(_) | CoreError::ResetOnNew(_) => {
                Self::new(ErrorKind::Conflict, ErrorOrigin::Lifecycle, message)
            }
            CoreError::UnknownObject(_) => {
                Self::new(ErrorKind::NotFound, ErrorOrigin::Graph, message)
            }
            CoreError::Hook { .. } => Self::new(ErrorKind::Internal, ErrorOrigin::Lifecycle, message),
        }
    }
}

///
/// ErrorKind
/// Public error taxonomy for callers and service interfaces.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
#[remain::sorted]
pub enum ErrorKind {
    /// Concurrent or state conflict (duplicate unique value, reset on a new
    /// object).
    Conflict,

    /// Schema or chain definition is broken. A programmer error.
    Definition,

    /// A required reference still points at the object.
    DeleteDenied,

    /// The caller cannot remediate this.
    Internal,

    /// Target object does not exist.
    NotFound,

    /// An authorization predicate refused the action.
    Unauthorized,

    /// Input data failed validation; see `issues`.
    Validation,
}

///
/// ErrorOrigin
/// Public origin taxonomy for callers and service interfaces.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
#[remain::sorted]
pub enum ErrorOrigin {
    Backend,
    Graph,
    Lifecycle,
    Schema,
    Validate,
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use tether_core::keypath::Keypath;

    #[test]
    fn validation_keeps_every_keypath() {
        let mut err = ValidationError::at(&Keypath::field("name"), "is required");
        err.add(&Keypath::field("email"), "must be unique");

        let public = Error::from(CoreError::from(err));

        assert_eq!(public.kind, ErrorKind::Validation);
        assert_eq!(
            public.issues.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["email", "name"]
        );
    }

    #[test]
    fn unique_backend_failure_is_a_conflict() {
        let err = CoreError::from(BackendError::UniqueConstraint {
            field: "email".to_string(),
        });

        let public = Error::from(err);

        assert_eq!(public.kind, ErrorKind::Conflict);
        assert_eq!(public.origin, ErrorOrigin::Backend);
    }

    #[test]
    fn serializes_without_empty_issues() {
        let err = Error::new(ErrorKind::NotFound, ErrorOrigin::Graph, "gone");

        let json = serde_json::to_value(&err).expect("serialize");

        assert_eq!(
            json,
            serde_json::json!({ "kind": "NotFound", "origin": "Graph", "message": "gone" })
        );
    }
}

use crate::{backend::BackendError, keypath::Keypath, value::ObjectId};
use derive_more::Display;
use std::collections::BTreeMap;
use thiserror::Error as ThisError;

///
/// DefinitionError
///
/// Schema and chain construction failures.
/// These are programmer errors: raised immediately and never recovered.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum DefinitionError {
    #[error("field '{field}' combines conflicting modifiers {a} and {b}")]
    ConflictingModifiers {
        field: String,
        a: &'static str,
        b: &'static str,
    },

    #[error("invalid argument for modifier {modifier}: {message}")]
    InvalidArgument {
        modifier: &'static str,
        message: String,
    },

    #[error("schema '{name}' is already defined in namespace '{namespace}'")]
    DuplicateSchema { namespace: String, name: String },

    #[error("schema '{schema}' declares field '{field}' more than once")]
    DuplicateField { schema: String, field: String },

    #[error("unknown schema '{0}'")]
    UnknownSchema(String),

    #[error("schema '{schema}' has no field '{field}'")]
    UnknownField { schema: String, field: String },

    #[error("invalid link on '{schema}.{field}': {message}")]
    InvalidLink {
        schema: String,
        field: String,
        message: String,
    },
}

impl DefinitionError {
    pub(crate) fn invalid_argument(modifier: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            modifier,
            message: message.into(),
        }
    }

    pub(crate) fn invalid_link(
        schema: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidLink {
            schema: schema.into(),
            field: field.into(),
            message: message.into(),
        }
    }
}

///
/// ValidationError
///
/// Data error carrying every failing keypath with its messages, plus the
/// root object of the call that produced it.
///

#[derive(Clone, Debug, Default, Eq, PartialEq, ThisError)]
#[error("validation failed: {}", render_issues(.issues))]
pub struct ValidationError {
    issues: BTreeMap<String, Vec<String>>,
    root: Option<ObjectId>,
}

impl ValidationError {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            issues: BTreeMap::new(),
            root: None,
        }
    }

    /// Single-issue error at `keypath`.
    #[must_use]
    pub fn at(keypath: &Keypath, message: impl Into<String>) -> Self {
        let mut err = Self::new();
        err.add(keypath, message);

        err
    }

    pub fn add(&mut self, keypath: &Keypath, message: impl Into<String>) {
        self.issues
            .entry(keypath.render())
            .or_default()
            .push(message.into());
    }

    /// Fold another error's issues into this one.
    pub fn merge(&mut self, other: Self) {
        for (path, messages) in other.issues {
            self.issues.entry(path).or_default().extend(messages);
        }
        if self.root.is_none() {
            self.root = other.root;
        }
    }

    /// Fold `other` in; in fail-fast mode hand the collected error back
    /// so the caller can return it immediately.
    pub fn absorb(&mut self, other: Self, all_fields: bool) -> Result<(), Self> {
        self.merge(other);
        if all_fields {
            Ok(())
        } else {
            Err(std::mem::take(self))
        }
    }

    #[must_use]
    pub fn with_root(mut self, root: Option<ObjectId>) -> Self {
        if self.root.is_none() {
            self.root = root;
        }

        self
    }

    #[must_use]
    pub const fn root(&self) -> Option<ObjectId> {
        self.root
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    #[must_use]
    pub const fn issues(&self) -> &BTreeMap<String, Vec<String>> {
        &self.issues
    }

    /// Messages recorded at a rendered keypath.
    #[must_use]
    pub fn messages(&self, keypath: &str) -> Option<&[String]> {
        self.issues.get(keypath).map(Vec::as_slice)
    }

    pub fn keypaths(&self) -> impl Iterator<Item = &str> {
        self.issues.keys().map(String::as_str)
    }

    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

fn render_issues(issues: &BTreeMap<String, Vec<String>>) -> String {
    issues
        .iter()
        .map(|(path, messages)| {
            let path = if path.is_empty() { "<root>" } else { path };
            format!("{path}: {}", messages.join(", "))
        })
        .collect::<Vec<_>>()
        .join("; ")
}

///
/// Action
///
/// Operation guarded by a schema's authorization predicates.
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum Action {
    #[display("create")]
    Create,
    #[display("update")]
    Update,
    #[display("delete")]
    Delete,
    #[display("read")]
    Read,
}

///
/// Error
///
/// Engine-level error. Data errors, definition errors and business-rule
/// failures stay distinct so callers can map them to different responses.
///

#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Definition(#[from] DefinitionError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("{action} is not permitted on '{schema}' object {object}")]
    Unauthorized {
        action: Action,
        schema: String,
        object: ObjectId,
    },

    #[error("delete denied for '{schema}' object {object}: {reason}")]
    DeleteDenied {
        schema: String,
        object: ObjectId,
        reason: String,
    },

    #[error("schema '{0}' is abstract and cannot be constructed directly")]
    AbstractSchema(String),

    #[error("reset is not enabled for schema '{0}'")]
    ResetDisabled(String),

    #[error("object {0} has not been persisted; nothing to reset")]
    ResetOnNew(ObjectId),

    #[error("object {0} is not part of this graph")]
    UnknownObject(ObjectId),

    #[error("hook {hook} failed: {message}")]
    Hook { hook: &'static str, message: String },
}

impl Error {
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    #[must_use]
    pub const fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }

    pub fn hook(hook: &'static str, message: impl Into<String>) -> Self {
        Self::Hook {
            hook,
            message: message.into(),
        }
    }
}

///
/// TESTS
///

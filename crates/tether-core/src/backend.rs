//! Persistence collaborator boundary.
//!
//! The engine performs no I/O. `Graph::save`/`delete`/`restore` prepare a
//! `SaveRecord` and hand it to a `Backend`; backends report failures using
//! the `BackendError` vocabulary so the engine can surface them uniformly.
use crate::value::{ObjectId, Value};
use std::collections::BTreeMap;
use thiserror::Error as ThisError;

///
/// BackendError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum BackendError {
    #[error("object not found: {schema} {object}")]
    ObjectNotFound { schema: String, object: ObjectId },

    #[error("unique constraint violated on field '{field}'")]
    UniqueConstraint { field: String },

    #[error("backend failure: {0}")]
    Other(String),
}

///
/// SaveRecord
///
/// Everything a persistence collaborator needs to write one object.
/// Keys of `values` are already transcoded when the schema camelizes
/// storage keys.
///

#[derive(Clone, Debug, PartialEq)]
pub struct SaveRecord {
    pub schema: String,
    pub object: ObjectId,
    pub is_new: bool,
    pub values: BTreeMap<String, Value>,
    pub modified: Vec<String>,
    pub unlinked: BTreeMap<String, Vec<ObjectId>>,
    pub unique_fields: Vec<String>,
    pub index_fields: Vec<String>,
}

///
/// DeleteRecord
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DeleteRecord {
    pub schema: String,
    pub object: ObjectId,
    pub soft: bool,
}

///
/// Backend
///
/// Hook points invoked by the object lifecycle.
///

pub trait Backend {
    fn save(&mut self, record: &SaveRecord) -> Result<(), BackendError>;

    fn delete(&mut self, record: &DeleteRecord) -> Result<(), BackendError>;

    fn restore(&mut self, _record: &DeleteRecord) -> Result<(), BackendError> {
        Err(BackendError::Other("restore is not supported".to_string()))
    }
}

///
/// MemoryBackend
///
/// Records every hook invocation; no storage semantics beyond unique
/// constraint checks over the records it has seen.
///

#[derive(Debug, Default)]
pub struct MemoryBackend {
    pub saved: Vec<SaveRecord>,
    pub deleted: Vec<DeleteRecord>,
    pub restored: Vec<DeleteRecord>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest saved record for an object.
    #[must_use]
    pub fn last_saved(&self, object: ObjectId) -> Option<&SaveRecord> {
        self.saved.iter().rev().find(|r| r.object == object)
    }

    // Check unique fields against the latest record of every other object.
    fn check_unique(&self, record: &SaveRecord) -> Result<(), BackendError> {
        for field in &record.unique_fields {
            let Some(value) = record.values.get(field) else {
                continue;
            };
            if value.is_null() {
                continue;
            }

            let mut seen = BTreeMap::new();
            for other in self.saved.iter().filter(|r| r.schema == record.schema) {
                seen.insert(other.object, other);
            }
            if seen.values().any(|other| {
                other.object != record.object && other.values.get(field) == Some(value)
            }) {
                return Err(BackendError::UniqueConstraint {
                    field: field.clone(),
                });
            }
        }

        Ok(())
    }
}

impl Backend for MemoryBackend {
    fn save(&mut self, record: &SaveRecord) -> Result<(), BackendError> {
        self.check_unique(record)?;
        self.saved.push(record.clone());

        Ok(())
    }

    fn delete(&mut self, record: &DeleteRecord) -> Result<(), BackendError> {
        if !self.saved.iter().any(|r| r.object == record.object) {
            return Err(BackendError::ObjectNotFound {
                schema: record.schema.clone(),
                object: record.object,
            });
        }
        self.deleted.push(record.clone());

        Ok(())
    }

    fn restore(&mut self, record: &DeleteRecord) -> Result<(), BackendError> {
        self.restored.push(record.clone());

        Ok(())
    }
}

///
/// TESTS
///

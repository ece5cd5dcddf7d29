//! In-place container mutation.
//!
//! Each operation edits a copy of the field value and re-assigns it, so the
//! field's chain validates the result and relationship fields reconcile
//! their peers exactly as a plain `set` would.
use crate::{
    error::{Error, ValidationError},
    graph::{Graph, Mode, Runtime},
    keypath::Keypath,
    value::{ObjectId, Value},
};
use std::collections::BTreeMap;

impl Graph {
    /// Append to a list field. A null field starts a new list.
    pub fn push(&mut self, id: ObjectId, field: &str, item: impl Into<Value>) -> Result<(), Error> {
        let item = item.into();

        self.mutate(id, field, |value| {
            list_mut(value)?.push(item);
            Ok(())
        })
    }

    /// Remove and return the item at `index`.
    pub fn remove_item(&mut self, id: ObjectId, field: &str, index: usize) -> Result<Value, Error> {
        self.mutate(id, field, |value| {
            let items = list_mut(value)?;
            if index >= items.len() {
                return Err(format!("index {index} out of range"));
            }

            Ok(items.remove(index))
        })
    }

    /// Replace `delete_count` items starting at `start`; returns the removed
    /// items. Out-of-range bounds are clamped to the list length.
    pub fn splice(
        &mut self,
        id: ObjectId,
        field: &str,
        start: usize,
        delete_count: usize,
        insert: Vec<Value>,
    ) -> Result<Vec<Value>, Error> {
        self.mutate(id, field, |value| {
            let items = list_mut(value)?;
            let start = start.min(items.len());
            let end = start.saturating_add(delete_count).min(items.len());

            Ok(items.splice(start..end, insert).collect())
        })
    }

    /// Insert into a dict field; returns the value previously at `key`.
    pub fn insert_key(
        &mut self,
        id: ObjectId,
        field: &str,
        key: impl Into<String>,
        item: impl Into<Value>,
    ) -> Result<Option<Value>, Error> {
        let (key, item) = (key.into(), item.into());

        self.mutate(id, field, |value| Ok(map_mut(value)?.insert(key, item)))
    }

    pub fn remove_key(
        &mut self,
        id: ObjectId,
        field: &str,
        key: &str,
    ) -> Result<Option<Value>, Error> {
        self.mutate(id, field, |value| Ok(map_mut(value)?.remove(key)))
    }

    fn mutate<R>(
        &mut self,
        id: ObjectId,
        field: &str,
        edit: impl FnOnce(&mut Value) -> Result<R, String>,
    ) -> Result<R, Error> {
        let idx = self.field_index(id, field)?;
        let name = self.field_name(id, idx);
        let mut value = self.value_at(id, idx).cloned().unwrap_or_default();

        let out = edit(&mut value).map_err(|message| {
            ValidationError::at(&Keypath::field(name.as_str()), message).with_root(Some(id))
        })?;

        let data = Value::Map(BTreeMap::from([(name, value)]));
        let mut rt = Runtime::new(self).rooted(id);
        let result = rt.assign(id, data, Mode::Mutate, &Keypath::root());
        rt.finish(result)?;

        Ok(out)
    }
}

fn list_mut(value: &mut Value) -> Result<&mut Vec<Value>, String> {
    if value.is_null() {
        *value = Value::List(Vec::new());
    }
    match value {
        Value::List(items) => Ok(items),
        other => Err(format!("expected a list, found {}", other.kind())),
    }
}

fn map_mut(value: &mut Value) -> Result<&mut BTreeMap<String, Value>, String> {
    if value.is_null() {
        *value = Value::Map(BTreeMap::new());
    }
    match value {
        Value::Map(map) => Ok(map),
        other => Err(format!("expected a dict, found {}", other.kind())),
    }
}

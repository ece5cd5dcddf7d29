//! Object graph.
//!
//! Instances live in an arena addressed by `ObjectId`; relationship fields
//! store handles, never the instances themselves. Every public operation
//! builds a `Runtime` for the duration of the call and drives the field
//! chains through it.
mod lifecycle;
mod mutate;
mod object;
mod runtime;

#[cfg(test)]
mod tests;

pub use object::Instance;
pub use runtime::Runtime;

pub(crate) use runtime::Mode;

use crate::{
    error::{DefinitionError, Error},
    keypath::Keypath,
    obs::{Event, EventSink, TracingSink},
    schema::{Schema, SchemaRegistry},
    value::{ObjectId, Value},
};
use serde_json::Value as Json;
use std::{collections::BTreeMap, fmt, sync::Arc};

///
/// JsonOptions
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct JsonOptions {
    /// Emit fields whose chain carries a writeonly marker.
    pub include_writeonly: bool,
    /// Camelize keys even when the schema does not.
    pub camelize: bool,
}

impl JsonOptions {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            include_writeonly: false,
            camelize: false,
        }
    }

    #[must_use]
    pub const fn include_writeonly(mut self, on: bool) -> Self {
        self.include_writeonly = on;
        self
    }

    #[must_use]
    pub const fn camelize(mut self, on: bool) -> Self {
        self.camelize = on;
        self
    }
}

///
/// Graph
///

pub struct Graph {
    registry: Arc<SchemaRegistry>,
    slots: Vec<Option<Instance>>,
    sink: Box<dyn EventSink>,
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("schemas", &self.registry.len())
            .field("objects", &self.len())
            .finish_non_exhaustive()
    }
}

impl Graph {
    #[must_use]
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self {
            registry,
            slots: Vec::new(),
            sink: Box::new(TracingSink),
        }
    }

    /// Replace the default `tracing` sink.
    #[must_use]
    pub fn with_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    #[must_use]
    pub const fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    /// Number of live objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn contains(&self, id: ObjectId) -> bool {
        self.instance(id).is_some()
    }

    pub fn ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.slots.iter().flatten().map(Instance::id)
    }

    #[must_use]
    pub fn instance(&self, id: ObjectId) -> Option<&Instance> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    pub fn try_instance(&self, id: ObjectId) -> Result<&Instance, Error> {
        self.instance(id).ok_or(Error::UnknownObject(id))
    }

    #[must_use]
    pub fn get(&self, id: ObjectId, field: &str) -> Option<&Value> {
        self.instance(id).and_then(|inst| inst.get(field))
    }

    // ---------------------------------------------------------------------
    // Object surface
    // ---------------------------------------------------------------------

    /// Construct a new object from input data.
    pub fn construct(&mut self, schema: &str, data: impl Into<Value>) -> Result<ObjectId, Error> {
        let schema = Arc::clone(self.registry.try_get(schema)?);
        if schema.config().abstract_schema {
            return Err(Error::AbstractSchema(schema.path()));
        }

        let mut rt = Runtime::new(self);
        let result = rt.construct(&schema, data.into(), &Keypath::root(), None, Mode::Construct);
        rt.finish(result)
    }

    /// Build an already-persisted object from stored data, without transforms.
    /// Nested object data is hydrated too; every object built here starts
    /// clean.
    pub fn hydrate(&mut self, schema: &str, data: impl Into<Value>) -> Result<ObjectId, Error> {
        let schema = Arc::clone(self.registry.try_get(schema)?);
        let mark = self.mark();

        let mut rt = Runtime::new(self);
        let result = rt.construct(&schema, data.into(), &Keypath::root(), None, Mode::Hydrate);
        let id = rt.finish(result)?;
        for inst in self.slots.iter_mut().skip(mark).flatten() {
            inst.close_epoch();
        }

        Ok(id)
    }

    /// Validated, transformed write that respects readonly and writeonce.
    pub fn set(&mut self, id: ObjectId, data: impl Into<Value>) -> Result<(), Error> {
        self.assign(id, data.into(), Mode::Set)
    }

    /// Trusted write: no transforms, no access checks.
    pub fn update(&mut self, id: ObjectId, data: impl Into<Value>) -> Result<(), Error> {
        self.assign(id, data.into(), Mode::Update)
    }

    /// Single-field form of `set`.
    pub fn set_field(
        &mut self,
        id: ObjectId,
        field: &str,
        value: impl Into<Value>,
    ) -> Result<(), Error> {
        let data = Value::Map(BTreeMap::from([(field.to_string(), value.into())]));

        self.assign(id, data, Mode::Set)
    }

    fn assign(&mut self, id: ObjectId, data: Value, mode: Mode) -> Result<(), Error> {
        self.try_instance(id)?;

        let mut rt = Runtime::new(self).rooted(id);
        let result = rt.assign(id, data, mode, &Keypath::root());
        rt.finish(result)
    }

    /// Validate every field, aggregating all failures.
    pub fn validate(&mut self, id: ObjectId) -> Result<(), Error> {
        self.validate_with(id, true)
    }

    pub fn validate_with(&mut self, id: ObjectId, all_fields: bool) -> Result<(), Error> {
        self.try_instance(id)?;

        let mut rt = Runtime::new(self).rooted(id);
        let result = rt.validate_object(id, &Keypath::root(), all_fields);
        let out = rt.finish(result);
        if let Err(Error::Validation(err)) = &out {
            self.emit(Event::ValidationFailed {
                object: id,
                issues: err.issues().len(),
            });
        }

        out
    }

    /// Never fails on data errors; other errors still propagate.
    pub fn is_valid(&mut self, id: ObjectId) -> Result<bool, Error> {
        match self.validate(id) {
            Ok(()) => Ok(true),
            Err(Error::Validation(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Render an object; repeated identities become `{"$ref": n}`.
    pub fn to_json(&mut self, id: ObjectId, options: &JsonOptions) -> Result<Json, Error> {
        self.try_instance(id)?;

        let mut rt = Runtime::new(self).rooted(id).with_json(*options);
        let result = rt.render(id, &Keypath::root(), false);
        rt.finish(result)
    }

    /// Run deferred transforms and on-save nodes, writing results back.
    pub fn serialize(&mut self, id: ObjectId) -> Result<(), Error> {
        self.try_instance(id)?;

        let mut rt = Runtime::new(self).rooted(id);
        let result = rt.serialize_object(id, &Keypath::root());
        rt.finish(result)
    }

    // ---------------------------------------------------------------------
    // Arena internals
    // ---------------------------------------------------------------------

    pub(crate) fn instance_mut(&mut self, id: ObjectId) -> Option<&mut Instance> {
        self.slots.get_mut(id.index()).and_then(Option::as_mut)
    }

    pub(crate) fn alloc(&mut self, schema: Arc<Schema>) -> ObjectId {
        let id = ObjectId(self.slots.len());
        self.slots.push(Some(Instance::new(id, schema)));

        id
    }

    pub(crate) fn free(&mut self, id: ObjectId) {
        if let Some(slot) = self.slots.get_mut(id.index()) {
            *slot = None;
        }
    }

    pub(crate) fn emit(&self, event: Event) {
        self.sink.record(event);
    }

    pub(crate) fn value_at(&self, id: ObjectId, idx: usize) -> Option<&Value> {
        self.instance(id).and_then(|inst| inst.values.get(idx))
    }

    pub(crate) fn field_name(&self, id: ObjectId, idx: usize) -> String {
        self.instance(id)
            .and_then(|inst| inst.schema.field_at(idx))
            .map(|f| f.name().to_string())
            .unwrap_or_default()
    }

    pub(crate) fn field_index(&self, id: ObjectId, field: &str) -> Result<usize, Error> {
        let inst = self.try_instance(id)?;
        inst.schema.index_of(field).ok_or_else(|| {
            Error::Definition(DefinitionError::UnknownField {
                schema: inst.schema.path(),
                field: field.to_string(),
            })
        })
    }

    /// Store a value with dirty tracking but without link propagation.
    /// Returns whether the stored value changed.
    pub(crate) fn store(&mut self, id: ObjectId, idx: usize, value: Value) -> bool {
        let Some(inst) = self.slots.get_mut(id.index()).and_then(Option::as_mut) else {
            return false;
        };
        if inst.values[idx] == value {
            return false;
        }

        let old = std::mem::replace(&mut inst.values[idx], value);
        if !inst.is_new {
            let snapshot = inst.schema.config().reset_all_fields;
            if inst.tracker.observe(idx, &old, snapshot) {
                let field = self.field_name(id, idx);
                self.emit(Event::FieldModified {
                    object: id,
                    field,
                    snapshot,
                });
            }
        }

        true
    }

    /// Field write used by every assignment path. Returns the previous value
    /// when a relationship field changed; the caller owns propagation.
    pub(crate) fn write_field(
        &mut self,
        id: ObjectId,
        idx: usize,
        value: Value,
        pending: bool,
    ) -> Option<Value> {
        let inst = self.instance_mut(id)?;
        if pending {
            inst.pending.insert(idx);
        } else {
            inst.pending.remove(&idx);
        }
        let is_link = inst.schema.fields()[idx].descriptor().is_link();
        let old = inst.values[idx].clone();

        if !self.store(id, idx, value) {
            return None;
        }
        self.emit(Event::FieldAssigned {
            object: id,
            field: self.field_name(id, idx),
        });

        is_link.then_some(old)
    }

    /// Number of slots ever allocated; ids at or past a mark are newer.
    pub(crate) const fn mark(&self) -> usize {
        self.slots.len()
    }

    /// Free every object allocated since `mark`.
    pub(crate) fn release_since(&mut self, mark: usize) {
        for slot in self.slots.iter_mut().skip(mark) {
            *slot = None;
        }
    }

    /// Deep copy of an embedded object for a new owner. Linked fields are
    /// not carried over; they would make the copy a second peer.
    pub(crate) fn copy_embedded(&mut self, id: ObjectId, owner: Option<ObjectId>) -> ObjectId {
        self.copy_object(id, owner, &mut BTreeMap::new())
    }

    // `copies` maps originals to their copies so embedded cycles terminate.
    fn copy_object(
        &mut self,
        id: ObjectId,
        owner: Option<ObjectId>,
        copies: &mut BTreeMap<ObjectId, ObjectId>,
    ) -> ObjectId {
        if let Some(copy) = copies.get(&id) {
            return *copy;
        }
        let Some(mut copy) = self.instance(id).cloned() else {
            return id;
        };

        let new_id = ObjectId(self.slots.len());
        self.slots.push(None);
        copies.insert(id, new_id);

        copy.id = new_id;
        copy.embedded_in = owner;
        copy.is_new = true;
        copy.deleted = false;
        copy.tracker.close_epoch();
        copy.unlinked.clear();

        let schema = Arc::clone(&copy.schema);
        for (idx, field) in schema.fields().iter().enumerate() {
            let value = std::mem::take(&mut copy.values[idx]);
            if field.descriptor().is_link() {
                copy.pending.remove(&idx);
            } else {
                copy.values[idx] = self.copy_handles(value, new_id, copies);
            }
        }
        self.slots[new_id.index()] = Some(copy);

        new_id
    }

    fn copy_handles(
        &mut self,
        value: Value,
        owner: ObjectId,
        copies: &mut BTreeMap<ObjectId, ObjectId>,
    ) -> Value {
        match value {
            Value::Object(id) => Value::Object(self.copy_object(id, Some(owner), copies)),
            Value::List(items) => Value::List(
                items
                    .into_iter()
                    .map(|v| self.copy_handles(v, owner, copies))
                    .collect(),
            ),
            Value::Map(map) => Value::Map(
                map.into_iter()
                    .map(|(k, v)| (k, self.copy_handles(v, owner, copies)))
                    .collect(),
            ),
            other => other,
        }
    }
}

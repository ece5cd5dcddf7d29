use crate::{
    schema::Schema,
    track::DirtyTracker,
    value::{ObjectId, Value},
};
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

///
/// Instance
///
/// One object in the graph arena: field values in schema order plus the
/// per-object lifecycle state.
///

#[derive(Clone, Debug)]
pub struct Instance {
    pub(crate) id: ObjectId,
    pub(crate) schema: Arc<Schema>,
    pub(crate) values: Vec<Value>,
    pub(crate) is_new: bool,
    pub(crate) deleted: bool,
    pub(crate) embedded_in: Option<ObjectId>,
    pub(crate) tracker: DirtyTracker,
    pub(crate) unlinked: BTreeMap<usize, Vec<ObjectId>>,
    pub(crate) pending: BTreeSet<usize>,
}

impl Instance {
    pub(crate) fn new(id: ObjectId, schema: Arc<Schema>) -> Self {
        let values = vec![Value::Null; schema.fields().len()];

        Self {
            id,
            schema,
            values,
            is_new: true,
            deleted: false,
            embedded_in: None,
            tracker: DirtyTracker::new(),
            unlinked: BTreeMap::new(),
            pending: BTreeSet::new(),
        }
    }

    #[must_use]
    pub const fn id(&self) -> ObjectId {
        self.id
    }

    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    #[must_use]
    pub const fn is_new(&self) -> bool {
        self.is_new
    }

    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Owner of an embedded copy.
    #[must_use]
    pub const fn embedded_in(&self) -> Option<ObjectId> {
        self.embedded_in
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.schema.index_of(field).map(|idx| &self.values[idx])
    }

    /// Field name and value pairs in schema order.
    pub fn values(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.schema
            .fields()
            .iter()
            .map(|f| f.name())
            .zip(self.values.iter())
    }

    #[must_use]
    pub fn is_modified(&self) -> bool {
        self.tracker.is_dirty()
    }

    #[must_use]
    pub fn is_field_modified(&self, field: &str) -> bool {
        self.schema
            .index_of(field)
            .is_some_and(|idx| self.tracker.is_modified(idx))
    }

    /// Names of fields changed since the last persist.
    #[must_use]
    pub fn modified_fields(&self) -> Vec<&str> {
        self.tracker
            .modified()
            .filter_map(|idx| self.schema.field_at(idx).map(|f| f.name()))
            .collect()
    }

    /// Value of `field` before its first change in this epoch.
    #[must_use]
    pub fn previous(&self, field: &str) -> Option<&Value> {
        self.schema
            .index_of(field)
            .and_then(|idx| self.tracker.previous(idx))
    }

    /// Peers removed from `field` since the last persist.
    #[must_use]
    pub fn unlinked(&self, field: &str) -> &[ObjectId] {
        self.schema
            .index_of(field)
            .and_then(|idx| self.unlinked.get(&idx))
            .map_or(&[], Vec::as_slice)
    }

    /// Whether `field` still has deferred transforms to run before save.
    #[must_use]
    pub fn is_pending(&self, field: &str) -> bool {
        self.schema
            .index_of(field)
            .is_some_and(|idx| self.pending.contains(&idx))
    }

    pub(crate) fn record_unlinked(&mut self, field: usize, peer: ObjectId) {
        let list = self.unlinked.entry(field).or_default();
        if !list.contains(&peer) {
            list.push(peer);
        }
    }

    pub(crate) fn close_epoch(&mut self) {
        self.is_new = false;
        self.tracker.close_epoch();
        self.unlinked.clear();
        self.pending.clear();
    }

    // Handles anywhere inside non-linked fields; those objects are owned copies.
    pub(crate) fn embedded_children(&self) -> Vec<ObjectId> {
        let mut out = Vec::new();
        for (field, value) in self.schema.fields().iter().zip(&self.values) {
            if !field.descriptor().is_link() {
                collect_handles(value, &mut out);
            }
        }

        out
    }
}

fn collect_handles(value: &Value, out: &mut Vec<ObjectId>) {
    match value {
        Value::Object(id) => out.push(*id),
        Value::List(items) => items.iter().for_each(|v| collect_handles(v, out)),
        Value::Map(map) => map.values().for_each(|v| collect_handles(v, out)),
        _ => {}
    }
}

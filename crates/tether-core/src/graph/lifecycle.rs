//! Persistence lifecycle: save, delete, restore and reset.
//!
//! The graph prepares records and runs hooks; all I/O belongs to the
//! `Backend` collaborator.
use crate::{
    backend::{Backend, BackendError, DeleteRecord, SaveRecord},
    error::{Action, Error, ValidationError},
    graph::Graph,
    keypath::Keypath,
    link::LinkManager,
    obs::Event,
    schema::{FieldDescriptor, Schema},
    value::{ObjectId, Value},
};
use std::{collections::BTreeSet, sync::Arc};

impl Graph {
    /// Authorize, validate, serialize, run hooks, then hand the record to
    /// the backend. A successful save closes the modification epoch.
    pub fn save(&mut self, id: ObjectId, backend: &mut dyn Backend) -> Result<(), Error> {
        let inst = self.try_instance(id)?;
        let schema = Arc::clone(&inst.schema);
        let is_new = inst.is_new;
        let hooks = &schema.config().hooks;

        let (action, guard) = if is_new {
            (Action::Create, hooks.can_create.clone())
        } else {
            (Action::Update, hooks.can_update.clone())
        };
        if let Some(guard) = guard
            && !guard(self, id)
        {
            return Err(Error::Unauthorized {
                action,
                schema: schema.path(),
                object: id,
            });
        }

        self.validate_with(id, schema.config().validate_all_fields)?;
        self.serialize(id)?;

        let hook = if is_new {
            hooks.on_create.clone()
        } else {
            hooks.on_save.clone()
        };
        if let Some(hook) = hook {
            hook(self, id)?;
        }

        let record = self.save_record(id)?;
        backend
            .save(&record)
            .map_err(|err| unique_violation(&schema, id, err))?;

        self.close_epoch(id);
        self.emit(Event::Saved {
            schema: schema.path(),
            object: id,
            created: is_new,
        });

        Ok(())
    }

    /// Data handed to `Backend::save`, keyed by storage keys.
    pub fn save_record(&self, id: ObjectId) -> Result<SaveRecord, Error> {
        let inst = self.try_instance(id)?;
        let schema = &inst.schema;
        let key = |idx: usize| schema.db_key(idx).unwrap_or_default().to_string();

        let flagged = |pick: fn(&FieldDescriptor) -> bool| {
            schema
                .fields()
                .iter()
                .enumerate()
                .filter(|(_, f)| pick(f.descriptor()))
                .map(|(idx, _)| key(idx))
                .collect::<Vec<_>>()
        };

        Ok(SaveRecord {
            schema: schema.path(),
            object: id,
            is_new: inst.is_new,
            values: inst
                .values
                .iter()
                .enumerate()
                .map(|(idx, v)| (key(idx), v.clone()))
                .collect(),
            modified: inst.tracker.modified().map(key).collect(),
            unlinked: inst
                .unlinked
                .iter()
                .map(|(idx, peers)| (key(*idx), peers.clone()))
                .collect(),
            unique_fields: flagged(|d| d.unique),
            index_fields: flagged(|d| d.index),
        })
    }

    /// Delete through the backend. Soft-deleting schemas only mark the
    /// object; otherwise its links are detached and the object (with its
    /// embedded children) leaves the graph.
    pub fn delete(&mut self, id: ObjectId, backend: &mut dyn Backend) -> Result<(), Error> {
        let inst = self.try_instance(id)?;
        let schema = Arc::clone(&inst.schema);
        let is_new = inst.is_new;
        let hooks = &schema.config().hooks;

        if let Some(guard) = hooks.can_delete.clone()
            && !guard(self, id)
        {
            return Err(Error::Unauthorized {
                action: Action::Delete,
                schema: schema.path(),
                object: id,
            });
        }
        if let Some(reason) = self.delete_blocker(id) {
            return Err(Error::DeleteDenied {
                schema: schema.path(),
                object: id,
                reason,
            });
        }
        if let Some(hook) = hooks.on_delete.clone() {
            hook(self, id)?;
        }

        let soft = schema.config().soft_delete;
        if !is_new {
            backend.delete(&DeleteRecord {
                schema: schema.path(),
                object: id,
                soft,
            })?;
        }

        if soft {
            if let Some(inst) = self.instance_mut(id) {
                inst.deleted = true;
            }
        } else {
            self.drop_object(id);
        }
        self.emit(Event::Deleted {
            schema: schema.path(),
            object: id,
            soft,
        });

        Ok(())
    }

    /// Undo a soft delete.
    pub fn restore(&mut self, id: ObjectId, backend: &mut dyn Backend) -> Result<(), Error> {
        let inst = self.try_instance(id)?;
        if !inst.deleted {
            return Ok(());
        }

        backend.restore(&DeleteRecord {
            schema: inst.schema.path(),
            object: id,
            soft: true,
        })?;
        if let Some(inst) = self.instance_mut(id) {
            inst.deleted = false;
        }
        self.emit(Event::Restored { object: id });

        Ok(())
    }

    /// Restore every field to its value from before its first change in
    /// this epoch. Relationship fields propagate to their peers.
    pub fn reset(&mut self, id: ObjectId) -> Result<(), Error> {
        let inst = self.try_instance(id)?;
        let schema = Arc::clone(&inst.schema);
        if !schema.config().reset_all_fields {
            return Err(Error::ResetDisabled(schema.path()));
        }
        if inst.is_new {
            return Err(Error::ResetOnNew(id));
        }

        let Some(inst) = self.instance_mut(id) else {
            return Err(Error::UnknownObject(id));
        };
        let previous = inst.tracker.take_previous();
        let fields = previous.len();

        for (idx, value) in previous {
            let Some(inst) = self.instance_mut(id) else {
                break;
            };
            let old = std::mem::replace(&mut inst.values[idx], value.clone());
            if schema.fields()[idx].descriptor().is_link() {
                LinkManager::new(self).reconcile(id, idx, &old, &value);
            }
        }

        let children = match self.instance_mut(id) {
            Some(inst) => {
                inst.tracker.close_epoch();
                inst.unlinked.clear();
                inst.pending.clear();
                inst.embedded_children()
            }
            None => Vec::new(),
        };
        for child in children {
            let resettable = self.instance(child).is_some_and(|c| {
                !c.is_new && c.is_modified() && c.schema.config().reset_all_fields
            });
            if resettable {
                self.reset(child)?;
            }
        }

        self.emit(Event::Reset { object: id, fields });

        Ok(())
    }

    // Close the epoch of `id` and of every embedded child.
    fn close_epoch(&mut self, id: ObjectId) {
        let mut stack = vec![id];
        let mut seen = BTreeSet::new();

        while let Some(next) = stack.pop() {
            if !seen.insert(next) {
                continue;
            }
            if let Some(inst) = self.instance_mut(next) {
                inst.close_epoch();
                stack.extend(inst.embedded_children());
            }
        }
    }

    // A peer whose required single-valued field points here blocks deletion.
    fn delete_blocker(&self, id: ObjectId) -> Option<String> {
        let inst = self.instance(id)?;

        for (field, value) in inst.schema.fields().iter().zip(&inst.values) {
            let Some(peer_field) = field.descriptor().peer_index() else {
                continue;
            };
            for peer in value.object_handles() {
                let Some(peer_inst) = self.instance(peer) else {
                    continue;
                };
                let Some(peer_def) = peer_inst.schema.field_at(peer_field) else {
                    continue;
                };
                let desc = peer_def.descriptor();
                if desc.required && !desc.is_many() && peer_inst.values[peer_field].holds(id) {
                    return Some(format!(
                        "required by '{}.{}' on object {peer}",
                        peer_inst.schema.path(),
                        peer_def.name()
                    ));
                }
            }
        }

        None
    }

    // Detach links, drop embedded children, free the slot.
    fn drop_object(&mut self, id: ObjectId) {
        let Some(inst) = self.instance(id) else {
            return;
        };
        let schema = Arc::clone(&inst.schema);
        let values = inst.values.clone();
        let children = inst.embedded_children();

        for (idx, field) in schema.fields().iter().enumerate() {
            if field.descriptor().is_link() {
                LinkManager::new(self).reconcile(id, idx, &values[idx], &Value::Null);
            }
        }
        for child in children {
            if self.instance(child).and_then(|c| c.embedded_in) == Some(id) {
                self.drop_object(child);
            }
        }

        self.free(id);
    }
}

// A unique-constraint failure becomes a data error at the field.
fn unique_violation(schema: &Schema, id: ObjectId, err: BackendError) -> Error {
    match err {
        BackendError::UniqueConstraint { field } => {
            let name = schema
                .resolve_db_key(&field)
                .and_then(|idx| schema.field_at(idx))
                .map_or(field, |f| f.name().to_string());

            ValidationError::at(&Keypath::field(name), "must be unique")
                .with_root(Some(id))
                .into()
        }
        other => other.into(),
    }
}

//! Link Manager.
//!
//! Keeps both sides of every relationship pair in agreement. Propagation
//! touches only the immediate peer's paired field (and, for single-valued
//! peers, the forward field of the peer's previous occupant), so cyclic
//! graphs cost constant extra work per assignment.
use crate::{
    graph::Graph,
    obs::Event,
    value::{ObjectId, Value},
};

///
/// LinkManager
///

pub(crate) struct LinkManager<'g> {
    graph: &'g mut Graph,
}

impl<'g> LinkManager<'g> {
    pub(crate) const fn new(graph: &'g mut Graph) -> Self {
        Self { graph }
    }

    /// Propagate the change of `owner.field` from `old` to `new`.
    pub(crate) fn reconcile(&mut self, owner: ObjectId, field: usize, old: &Value, new: &Value) {
        let Some(peer_field) = self.peer_field(owner, field) else {
            return;
        };

        let before = old.object_handles();
        let after = new.object_handles();

        for peer in before.iter().filter(|p| !after.contains(p)) {
            self.detach(owner, field, *peer, peer_field);
        }
        for peer in after.iter().filter(|p| !before.contains(p)) {
            self.attach(owner, field, *peer, peer_field);
        }
    }

    fn peer_field(&self, owner: ObjectId, field: usize) -> Option<usize> {
        self.graph
            .instance(owner)?
            .schema()
            .field_at(field)?
            .descriptor()
            .peer_index()
    }

    // Remove the back-reference to `owner` from `peer`.
    fn detach(&mut self, owner: ObjectId, field: usize, peer: ObjectId, peer_field: usize) {
        if let Some(current) = self.graph.value_at(peer, peer_field) {
            let next = without(current, owner);
            self.graph.store(peer, peer_field, next);
        }
        self.record_unlinked(owner, field, peer, peer_field);

        self.graph.emit(Event::LinkDetached {
            object: owner,
            field: self.graph.field_name(owner, field),
            peer,
        });
    }

    // Add the back-reference to `owner` on `peer`. A single-valued peer field
    // first releases its previous occupant.
    fn attach(&mut self, owner: ObjectId, field: usize, peer: ObjectId, peer_field: usize) {
        let Some(inst) = self.graph.instance(peer) else {
            return;
        };
        let many = inst
            .schema()
            .field_at(peer_field)
            .is_some_and(|f| f.descriptor().is_many());
        let current = inst.values[peer_field].clone();

        let next = if many {
            with(&current, owner)
        } else {
            if let Some(prev) = current.as_object()
                && prev != owner
            {
                self.release(prev, field, peer, peer_field);
            }
            Value::Object(owner)
        };
        self.graph.store(peer, peer_field, next);

        self.graph.emit(Event::LinkAttached {
            object: owner,
            field: self.graph.field_name(owner, field),
            peer,
        });
    }

    // `prev` loses its forward reference to `peer`.
    fn release(&mut self, prev: ObjectId, field: usize, peer: ObjectId, peer_field: usize) {
        if let Some(current) = self.graph.value_at(prev, field) {
            let next = without(current, peer);
            self.graph.store(prev, field, next);
        }
        self.record_unlinked(prev, field, peer, peer_field);

        self.graph.emit(Event::LinkDetached {
            object: prev,
            field: self.graph.field_name(prev, field),
            peer,
        });
    }

    fn record_unlinked(&mut self, owner: ObjectId, field: usize, peer: ObjectId, peer_field: usize) {
        if let Some(inst) = self.graph.instance_mut(owner) {
            inst.record_unlinked(field, peer);
        }
        if let Some(inst) = self.graph.instance_mut(peer) {
            inst.record_unlinked(peer_field, owner);
        }
    }
}

fn without(value: &Value, id: ObjectId) -> Value {
    match value {
        Value::Object(current) if *current == id => Value::Null,
        Value::List(items) => Value::List(
            items
                .iter()
                .filter(|item| item.as_object() != Some(id))
                .cloned()
                .collect(),
        ),
        other => other.clone(),
    }
}

fn with(value: &Value, id: ObjectId) -> Value {
    match value {
        Value::List(items) if value.holds(id) => Value::List(items.clone()),
        Value::List(items) => {
            let mut items = items.clone();
            items.push(Value::Object(id));
            Value::List(items)
        }
        _ => Value::List(vec![Value::Object(id)]),
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn without_clears_single_and_filters_lists() {
        let a = ObjectId(1);
        let b = ObjectId(2);

        assert_eq!(without(&Value::Object(a), a), Value::Null);
        assert_eq!(without(&Value::Object(b), a), Value::Object(b));
        assert_eq!(
            without(&Value::List(vec![Value::Object(a), Value::Object(b)]), a),
            Value::List(vec![Value::Object(b)])
        );
    }

    #[test]
    fn with_appends_once() {
        let a = ObjectId(1);
        let once = with(&Value::Null, a);
        let twice = with(&once, a);

        assert_eq!(twice, Value::List(vec![Value::Object(a)]));
    }
}

use crate::{
    JSON_ID_KEY,
    context::Context,
    error::{Action, DefinitionError, Error, ValidationError},
    graph::{Graph, JsonOptions},
    keypath::Keypath,
    link::LinkManager,
    obs::Event,
    schema::{FieldDescriptor, FieldKind, Schema},
    value::{ObjectId, Value, reference_json},
};
use serde_json::{Map as JsonMap, Value as Json};
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

///
/// Mode
/// How input reaches the field values.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Mode {
    Construct,
    Hydrate,
    Mutate,
    Set,
    Update,
}

impl Mode {
    // Raw modes skip chain transforms and access checks.
    const fn is_raw(self) -> bool {
        matches!(self, Self::Hydrate | Self::Update)
    }
}

///
/// Runtime
///
/// Per-call driver handed to every modifier node. Owns the visited set that
/// makes traversal of cyclic graphs terminate and a slot for the first
/// non-data error raised below the chain boundary, which `finish` returns
/// in place of the validation error it was reported as.
///
/// Relationship changes are queued and only reach peers when `finish`
/// commits; a failed call frees every object it allocated instead.
///

pub struct Runtime<'g> {
    graph: &'g mut Graph,
    root: Option<ObjectId>,
    visited: BTreeSet<ObjectId>,
    json: JsonOptions,
    apply_deferred: bool,
    fatal: Option<Error>,
    mark: usize,
    links: Vec<LinkChange>,
}

// Relationship field change awaiting propagation.
struct LinkChange {
    owner: ObjectId,
    field: usize,
    old: Value,
    new: Value,
}

impl<'g> Runtime<'g> {
    pub(crate) fn new(graph: &'g mut Graph) -> Self {
        let mark = graph.mark();

        Self {
            graph,
            root: None,
            visited: BTreeSet::new(),
            json: JsonOptions::default(),
            apply_deferred: false,
            fatal: None,
            mark,
            links: Vec::new(),
        }
    }

    pub(crate) const fn rooted(mut self, root: ObjectId) -> Self {
        self.root = Some(root);
        self
    }

    pub(crate) const fn with_json(mut self, json: JsonOptions) -> Self {
        self.json = json;
        self
    }

    #[must_use]
    pub fn graph(&self) -> &Graph {
        &*self.graph
    }

    #[must_use]
    pub const fn root(&self) -> Option<ObjectId> {
        self.root
    }

    #[must_use]
    pub const fn include_writeonly(&self) -> bool {
        self.json.include_writeonly
    }

    /// Whether the field being serialized still owes its deferred transforms.
    #[must_use]
    pub const fn apply_deferred(&self) -> bool {
        self.apply_deferred
    }

    /// Stash a non-data error and report it at `keypath` so the chain unwinds.
    pub fn fail(&mut self, keypath: &Keypath, err: Error) -> ValidationError {
        let issue = ValidationError::at(keypath, err.to_string()).with_root(self.root);
        if self.fatal.is_none() {
            self.fatal = Some(err);
        }

        issue
    }

    /// Commit queued link changes, or roll back allocations on failure.
    pub(crate) fn finish<T>(self, result: Result<T, ValidationError>) -> Result<T, Error> {
        let Self {
            graph,
            fatal,
            mark,
            links,
            ..
        } = self;

        let result = match (fatal, result) {
            (Some(err), _) => Err(err),
            (None, result) => result.map_err(Error::from),
        };
        if result.is_ok() {
            let mut manager = LinkManager::new(graph);
            for change in links {
                manager.reconcile(change.owner, change.field, &change.old, &change.new);
            }
        } else {
            graph.release_since(mark);
        }

        result
    }

    fn resolve(&mut self, cx: &Context<'_>, target: &str) -> Result<Arc<Schema>, ValidationError> {
        let registry = Arc::clone(self.graph.registry());
        match registry.resolve(target, cx.namespace()) {
            Some(schema) => Ok(Arc::clone(schema)),
            None => Err(self.fail(
                cx.keypath(),
                DefinitionError::UnknownSchema(target.to_string()).into(),
            )),
        }
    }

    // ---------------------------------------------------------------------
    // Construction and assignment
    // ---------------------------------------------------------------------

    /// Allocate and populate an object. A failed object is freed again.
    pub(crate) fn construct(
        &mut self,
        schema: &Arc<Schema>,
        data: Value,
        prefix: &Keypath,
        embedded_in: Option<ObjectId>,
        mode: Mode,
    ) -> Result<ObjectId, ValidationError> {
        let id = self.graph.alloc(Arc::clone(schema));
        if self.root.is_none() {
            self.root = Some(id);
        }
        if let Some(inst) = self.graph.instance_mut(id) {
            inst.embedded_in = embedded_in;
        }

        match self.assign(id, data, mode, prefix) {
            Ok(()) => {
                self.graph.emit(Event::Constructed {
                    schema: schema.path(),
                    object: id,
                });
                Ok(id)
            }
            Err(err) => {
                self.graph.free(id);
                Err(err)
            }
        }
    }

    /// Construct the object for a nested `instance_of` value.
    pub fn construct_nested(
        &mut self,
        cx: &Context<'_>,
        target: &str,
        data: Value,
    ) -> Result<ObjectId, ValidationError> {
        let schema = self.resolve(cx, target)?;
        if schema.config().abstract_schema {
            return Err(self.fail(cx.keypath(), Error::AbstractSchema(schema.path())));
        }
        let embedded_in = if cx.field().is_link() {
            None
        } else {
            cx.owner()
        };

        self.construct(&schema, data, cx.keypath(), embedded_in, Mode::Construct)
    }

    /// Accept an existing object for a nested value; embedded fields take a
    /// copy unless the owner already holds this one.
    pub fn adopt(
        &mut self,
        cx: &Context<'_>,
        target: &str,
        id: ObjectId,
    ) -> Result<ObjectId, ValidationError> {
        let schema = self.resolve(cx, target)?;
        let Some(inst) = self.graph.instance(id) else {
            return Err(cx.issue(format!("unknown object {id}")));
        };
        if inst.schema.path() != schema.path() {
            return Err(cx.issue(format!("expected a {target} object")));
        }
        if cx.field().is_link() {
            return Ok(id);
        }

        match cx.owner() {
            Some(owner) if inst.embedded_in == Some(owner) => Ok(id),
            owner => Ok(self.graph.copy_embedded(id, owner)),
        }
    }

    /// Transform and stage every input field, then write all of them; an
    /// error anywhere leaves the object untouched.
    pub(crate) fn assign(
        &mut self,
        id: ObjectId,
        data: Value,
        mode: Mode,
        prefix: &Keypath,
    ) -> Result<(), ValidationError> {
        let Some(inst) = self.graph.instance(id) else {
            return Err(self.fail(prefix, Error::UnknownObject(id)));
        };
        let schema = Arc::clone(&inst.schema);
        let Value::Map(input) = data else {
            return Err(ValidationError::at(prefix, "expected a dict").with_root(self.root));
        };

        let config = schema.config();
        let all_fields = config.validate_all_fields;
        let mut errors = ValidationError::new();
        let mut staged = Vec::new();
        let mut seen = BTreeSet::new();

        for (key, raw) in input {
            let Some(idx) = schema.resolve_input_key(&key) else {
                if config.strict_input {
                    let err = ValidationError::at(&prefix.child(key.as_str()), "unknown field")
                        .with_root(self.root);
                    errors.absorb(err, all_fields)?;
                }
                continue;
            };
            seen.insert(idx);

            let field = &schema.fields()[idx];
            let keypath = prefix.child(field.name());
            if let Some(message) = self.access_violation(id, idx, field.descriptor(), mode) {
                let err = ValidationError::at(&keypath, message).with_root(self.root);
                errors.absorb(err, all_fields)?;
                continue;
            }
            if mode.is_raw() {
                let desc = field.descriptor();
                let embedded_in = (!desc.is_link()).then_some(id);
                match self.raw_nested(embedded_in, schema.namespace(), desc, raw, &keypath) {
                    Ok(value) => staged.push((idx, value, false)),
                    Err(err) => errors.absorb(err, all_fields)?,
                }
                continue;
            }

            let cx = Context::for_field(
                raw.clone(),
                keypath,
                self.root,
                id,
                schema.namespace(),
                config,
                field.descriptor(),
                all_fields,
            );
            match field.chain().transform(&cx, self, raw) {
                Ok(value) => staged.push((idx, value, field.descriptor().deferred)),
                Err(err) => errors.absorb(err, all_fields)?,
            }
        }

        // Absent fields still run their chain so defaults apply.
        if mode == Mode::Construct {
            for (idx, field) in schema.fields().iter().enumerate() {
                if seen.contains(&idx) {
                    continue;
                }

                let cx = Context::for_field(
                    Value::Null,
                    prefix.child(field.name()),
                    self.root,
                    id,
                    schema.namespace(),
                    config,
                    field.descriptor(),
                    all_fields,
                );
                match field.chain().transform(&cx, self, Value::Null) {
                    Ok(Value::Null) => {}
                    Ok(value) => staged.push((idx, value, field.descriptor().deferred)),
                    Err(err) => errors.absorb(err, all_fields)?,
                }
            }
        }
        errors.into_result()?;

        for (idx, value, pending) in staged {
            if let Some(old) = self.graph.write_field(id, idx, value.clone(), pending) {
                self.links.push(LinkChange {
                    owner: id,
                    field: idx,
                    old,
                    new: value,
                });
            }
        }

        Ok(())
    }

    /// Raw input is stored as given, except that object data under an
    /// `instance_of` field becomes an object.
    fn raw_nested(
        &mut self,
        embedded_in: Option<ObjectId>,
        namespace: &str,
        desc: &FieldDescriptor,
        value: Value,
        keypath: &Keypath,
    ) -> Result<Value, ValidationError> {
        match (desc.kind, value) {
            (FieldKind::Instance, Value::Map(data)) => {
                let Some(target) = desc.target.as_deref() else {
                    return Ok(Value::Map(data));
                };
                let registry = Arc::clone(self.graph.registry());
                let Some(schema) = registry.resolve(target, namespace) else {
                    let err = DefinitionError::UnknownSchema(target.to_string());
                    return Err(self.fail(keypath, err.into()));
                };

                let data = Value::Map(data);
                self.construct(schema, data, keypath, embedded_in, Mode::Hydrate)
                    .map(Value::Object)
            }
            (FieldKind::List, Value::List(items)) => {
                let Some(item) = desc.item.as_deref() else {
                    return Ok(Value::List(items));
                };

                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, v)| {
                        let path = keypath.child(i);
                        self.raw_nested(embedded_in, namespace, &item.descriptor, v, &path)
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::List)
            }
            (FieldKind::Dict | FieldKind::Shape, Value::Map(map)) => {
                let mut out = BTreeMap::new();
                for (key, v) in map {
                    let item = match (&desc.item, &desc.shape) {
                        (Some(item), _) => Some(&item.descriptor),
                        (None, Some(shape)) => shape.get(&key).map(|i| &i.descriptor),
                        (None, None) => None,
                    };
                    let v = match item {
                        Some(item) => {
                            let path = keypath.child(key.as_str());
                            self.raw_nested(embedded_in, namespace, item, v, &path)?
                        }
                        None => v,
                    };
                    out.insert(key, v);
                }

                Ok(Value::Map(out))
            }
            (_, value) => Ok(value),
        }
    }

    fn access_violation(
        &self,
        id: ObjectId,
        idx: usize,
        desc: &FieldDescriptor,
        mode: Mode,
    ) -> Option<&'static str> {
        match mode {
            Mode::Hydrate | Mode::Update => None,
            _ if desc.readonly => Some("is readonly"),
            Mode::Set | Mode::Mutate
                if desc.writeonce
                    && self
                        .graph
                        .value_at(id, idx)
                        .is_some_and(|v| !v.is_null()) =>
            {
                Some("can only be written once")
            }
            _ => None,
        }
    }

    // ---------------------------------------------------------------------
    // Validation
    // ---------------------------------------------------------------------

    pub fn validate_nested(
        &mut self,
        cx: &Context<'_>,
        _target: &str,
        id: ObjectId,
    ) -> Result<(), ValidationError> {
        self.validate_object(id, cx.keypath(), cx.all_fields())
    }

    /// Validate each field of `id`. In fail-fast mode the first failing field
    /// stops the scan, except that fields holding instances are always
    /// checked so broken references are never dropped.
    pub(crate) fn validate_object(
        &mut self,
        id: ObjectId,
        prefix: &Keypath,
        all_fields: bool,
    ) -> Result<(), ValidationError> {
        if !self.visited.insert(id) {
            return Ok(());
        }
        let Some(inst) = self.graph.instance(id) else {
            return Err(self.fail(prefix, Error::UnknownObject(id)));
        };
        let schema = Arc::clone(&inst.schema);
        let values = inst.values.clone();

        let mut errors = ValidationError::new();
        for (field, value) in schema.fields().iter().zip(values) {
            let desc = field.descriptor();
            if !all_fields && !errors.is_empty() && desc.target.is_none() {
                continue;
            }

            let cx = Context::for_field(
                value,
                prefix.child(field.name()),
                self.root,
                id,
                schema.namespace(),
                schema.config(),
                desc,
                all_fields,
            );
            if let Err(err) = field.chain().validate(&cx, self) {
                errors.merge(err);
            }
        }

        errors.into_result()
    }

    // ---------------------------------------------------------------------
    // JSON
    // ---------------------------------------------------------------------

    pub fn object_json(&mut self, cx: &Context<'_>, id: ObjectId) -> Result<Json, ValidationError> {
        self.render(id, cx.keypath(), true)
    }

    /// Render `id`; a denied read renders nested objects as null and fails
    /// at the top level.
    pub(crate) fn render(
        &mut self,
        id: ObjectId,
        prefix: &Keypath,
        nested: bool,
    ) -> Result<Json, ValidationError> {
        if self.visited.contains(&id) {
            return Ok(reference_json(id));
        }
        let Some(inst) = self.graph.instance(id) else {
            return Err(self.fail(prefix, Error::UnknownObject(id)));
        };
        let schema = Arc::clone(&inst.schema);
        let values = inst.values.clone();

        if let Some(guard) = schema.config().hooks.can_read.clone()
            && !guard(&*self.graph, id)
        {
            if nested {
                return Ok(Json::Null);
            }
            let err = Error::Unauthorized {
                action: Action::Read,
                schema: schema.path(),
                object: id,
            };
            return Err(self.fail(prefix, err));
        }
        self.visited.insert(id);

        let camelize = self.json.camelize || schema.config().camelize_json_keys;
        let include_writeonly = self.json.include_writeonly;
        let mut map = JsonMap::new();
        map.insert(JSON_ID_KEY.to_string(), Json::from(id.index()));

        for (field, value) in schema.fields().iter().zip(values) {
            let cx = Context::for_field(
                value,
                prefix.child(field.name()),
                self.root,
                id,
                schema.namespace(),
                schema.config(),
                field.descriptor(),
                true,
            );
            if let Some(json) = field.chain().to_json(&cx, self, include_writeonly)? {
                map.insert(field.json_key(camelize).to_string(), json);
            }
        }

        Ok(Json::Object(map))
    }

    // ---------------------------------------------------------------------
    // Serialization
    // ---------------------------------------------------------------------

    pub fn serialize_nested(&mut self, cx: &Context<'_>, id: ObjectId) -> Result<(), ValidationError> {
        self.serialize_object(id, cx.keypath())
    }

    /// Run the pre-persistence pass over every field and write the results
    /// back. Pending deferred transforms run exactly once.
    pub(crate) fn serialize_object(
        &mut self,
        id: ObjectId,
        prefix: &Keypath,
    ) -> Result<(), ValidationError> {
        if !self.visited.insert(id) {
            return Ok(());
        }
        let Some(inst) = self.graph.instance(id) else {
            return Err(self.fail(prefix, Error::UnknownObject(id)));
        };
        let schema = Arc::clone(&inst.schema);
        let values = inst.values.clone();
        let pending = inst.pending.clone();
        let all_fields = schema.config().validate_all_fields;

        let outer = self.apply_deferred;
        let mut errors = ValidationError::new();
        let mut out = BTreeMap::new();

        for (idx, (field, value)) in schema.fields().iter().zip(values).enumerate() {
            self.apply_deferred = pending.contains(&idx);
            let cx = Context::for_field(
                value.clone(),
                prefix.child(field.name()),
                self.root,
                id,
                schema.namespace(),
                schema.config(),
                field.descriptor(),
                all_fields,
            );
            match field.chain().serialize(&cx, self, value) {
                Ok(v) => {
                    out.insert(idx, v);
                }
                Err(err) => {
                    errors.merge(err);
                    if !all_fields {
                        break;
                    }
                }
            }
        }
        self.apply_deferred = outer;
        errors.into_result()?;

        for (idx, value) in out {
            self.graph.store(id, idx, value);
        }
        if let Some(inst) = self.graph.instance_mut(id) {
            inst.pending.clear();
        }

        Ok(())
    }
}

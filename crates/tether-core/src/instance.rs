//! Nested object fields.
//!
//! `InstanceOf` holds a handle to another object in the same graph. Map
//! input constructs a new object; handle input is type-checked and, for
//! embedded fields, copied unless this owner already holds it.
use crate::{
    context::Context,
    error::ValidationError,
    graph::Runtime,
    modifier::Modifier,
    schema::{FieldDescriptor, FieldKind, LinkSpec},
    value::Value,
};
use serde_json::Value as Json;

///
/// InstanceOf
///

#[derive(Clone, Debug)]
pub struct InstanceOf {
    target: String,
}

impl InstanceOf {
    #[must_use]
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }

    fn mismatch(&self, cx: &Context<'_>) -> ValidationError {
        cx.issue(format!("expected a {} object", self.target))
    }
}

impl Modifier for InstanceOf {
    fn name(&self) -> &'static str {
        "instance_of"
    }

    fn describe(&self, desc: &mut FieldDescriptor) {
        desc.kind = FieldKind::Instance;
        desc.target = Some(self.target.clone());
    }

    fn validate(&self, cx: &Context<'_>, rt: &mut Runtime<'_>) -> Result<(), ValidationError> {
        match cx.value() {
            Value::Object(id) => rt.validate_nested(cx, &self.target, *id),
            _ => Err(self.mismatch(cx)),
        }
    }

    fn transform(
        &self,
        cx: &Context<'_>,
        rt: &mut Runtime<'_>,
        value: Value,
    ) -> Result<Value, ValidationError> {
        match value {
            Value::Map(_) => rt.construct_nested(cx, &self.target, value).map(Value::Object),
            Value::Object(id) => rt.adopt(cx, &self.target, id).map(Value::Object),
            _ => Err(self.mismatch(cx)),
        }
    }

    fn to_json(
        &self,
        cx: &Context<'_>,
        rt: &mut Runtime<'_>,
        json: Json,
    ) -> Result<Json, ValidationError> {
        match cx.value() {
            Value::Object(id) => rt.object_json(cx, *id),
            _ => Ok(json),
        }
    }

    fn serialize(
        &self,
        cx: &Context<'_>,
        rt: &mut Runtime<'_>,
        value: Value,
    ) -> Result<Value, ValidationError> {
        if let Value::Object(id) = value
            && !cx.field().is_link()
        {
            rt.serialize_nested(cx, id)?;
        }

        Ok(value)
    }
}

///
/// Linked
/// Declares the relationship role of the field it is chained onto.
///

#[derive(Clone, Debug)]
pub struct Linked {
    spec: LinkSpec,
}

impl Linked {
    #[must_use]
    pub const fn new(spec: LinkSpec) -> Self {
        Self { spec }
    }
}

impl Modifier for Linked {
    fn name(&self) -> &'static str {
        "linked"
    }

    fn describe(&self, desc: &mut FieldDescriptor) {
        desc.storage = self.spec.storage;
        desc.link = Some(self.spec.clone());
    }
}

//! Collection handlers.
//!
//! Structural modifiers that drive an item chain over every element of a
//! list, dict or shape, composing keypaths (`parent.3`, `parent.email`) and
//! collecting per-item errors by the active mode.
use crate::{
    context::Context,
    error::ValidationError,
    graph::Runtime,
    keypath::PathSegment,
    modifier::Modifier,
    schema::{FieldDescriptor, FieldKind, ItemSchema, ShapeSchema},
    value::Value,
};
use serde_json::{Map as JsonMap, Value as Json};
use std::{collections::BTreeMap, sync::Arc};

const EXPECTED_LIST: &str = "expected a list";
const EXPECTED_DICT: &str = "expected a dict";

// List and dict items are implicitly required unless marked nullable.
fn validate_item(
    item: &ItemSchema,
    cx: &Context<'_>,
    rt: &mut Runtime<'_>,
) -> Result<(), ValidationError> {
    if cx.value().is_null() && !item.descriptor.nullable {
        return Err(cx.issue("is required"));
    }

    item.chain.validate(cx, rt)
}

fn transform_item(
    item: &ItemSchema,
    cx: &Context<'_>,
    rt: &mut Runtime<'_>,
    value: Value,
) -> Result<Value, ValidationError> {
    let value = item.chain.transform(cx, rt, value)?;
    if value.is_null() && !item.descriptor.nullable {
        return Err(cx.issue("is required"));
    }

    Ok(value)
}

fn item_json(
    item: &ItemSchema,
    cx: &Context<'_>,
    rt: &mut Runtime<'_>,
) -> Result<Option<Json>, ValidationError> {
    if cx.value().is_null() {
        return Ok(Some(Json::Null));
    }

    let include_writeonly = rt.include_writeonly();
    item.chain.to_json(cx, rt, include_writeonly)
}

///
/// ListOf
///

#[derive(Clone, Debug)]
pub struct ListOf {
    item: Arc<ItemSchema>,
}

impl ListOf {
    #[must_use]
    pub fn new(item: ItemSchema) -> Self {
        Self {
            item: Arc::new(item),
        }
    }
}

impl Modifier for ListOf {
    fn name(&self) -> &'static str {
        "list_of"
    }

    fn describe(&self, desc: &mut FieldDescriptor) {
        desc.kind = FieldKind::List;
        desc.target.clone_from(&self.item.descriptor.target);
        desc.item = Some(Arc::clone(&self.item));
    }

    fn validate(&self, cx: &Context<'_>, rt: &mut Runtime<'_>) -> Result<(), ValidationError> {
        let Some(items) = cx.value().as_list() else {
            return Err(cx.issue(EXPECTED_LIST));
        };

        let mut errors = ValidationError::new();
        for (i, item) in items.iter().enumerate() {
            let child = cx.child(cx.value(), i, item.clone(), &self.item.descriptor);
            if let Err(err) = validate_item(&self.item, &child, rt) {
                errors.absorb(err, cx.all_fields())?;
            }
        }

        errors.into_result()
    }

    fn transform(
        &self,
        cx: &Context<'_>,
        rt: &mut Runtime<'_>,
        value: Value,
    ) -> Result<Value, ValidationError> {
        let Value::List(items) = &value else {
            return Err(cx.issue(EXPECTED_LIST));
        };

        let mut errors = ValidationError::new();
        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let child = cx.child(&value, i, item.clone(), &self.item.descriptor);
            match transform_item(&self.item, &child, rt, item.clone()) {
                Ok(v) => out.push(v),
                Err(err) => errors.absorb(err, cx.all_fields())?,
            }
        }
        errors.into_result()?;

        Ok(Value::List(out))
    }

    fn to_json(
        &self,
        cx: &Context<'_>,
        rt: &mut Runtime<'_>,
        json: Json,
    ) -> Result<Json, ValidationError> {
        let Some(items) = cx.value().as_list() else {
            return Ok(json);
        };

        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let child = cx.child(cx.value(), i, item.clone(), &self.item.descriptor);
            if let Some(j) = item_json(&self.item, &child, rt)? {
                out.push(j);
            }
        }

        Ok(Json::Array(out))
    }

    fn serialize(
        &self,
        cx: &Context<'_>,
        rt: &mut Runtime<'_>,
        value: Value,
    ) -> Result<Value, ValidationError> {
        let Value::List(items) = &value else {
            return Err(cx.issue(EXPECTED_LIST));
        };

        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let child = cx.child(&value, i, item.clone(), &self.item.descriptor);
            out.push(self.item.chain.serialize(&child, rt, item.clone())?);
        }

        Ok(Value::List(out))
    }
}

///
/// DictOf
/// String-keyed map whose values share one item chain.
///

#[derive(Clone, Debug)]
pub struct DictOf {
    item: Arc<ItemSchema>,
}

impl DictOf {
    #[must_use]
    pub fn new(item: ItemSchema) -> Self {
        Self {
            item: Arc::new(item),
        }
    }
}

impl Modifier for DictOf {
    fn name(&self) -> &'static str {
        "dict_of"
    }

    fn describe(&self, desc: &mut FieldDescriptor) {
        desc.kind = FieldKind::Dict;
        desc.item = Some(Arc::clone(&self.item));
    }

    fn validate(&self, cx: &Context<'_>, rt: &mut Runtime<'_>) -> Result<(), ValidationError> {
        let Some(map) = cx.value().as_map() else {
            return Err(cx.issue(EXPECTED_DICT));
        };

        let mut errors = ValidationError::new();
        for (key, item) in map {
            let child = cx.child(
                cx.value(),
                PathSegment::Key(key.clone()),
                item.clone(),
                &self.item.descriptor,
            );
            if let Err(err) = validate_item(&self.item, &child, rt) {
                errors.absorb(err, cx.all_fields())?;
            }
        }

        errors.into_result()
    }

    fn transform(
        &self,
        cx: &Context<'_>,
        rt: &mut Runtime<'_>,
        value: Value,
    ) -> Result<Value, ValidationError> {
        let Value::Map(map) = &value else {
            return Err(cx.issue(EXPECTED_DICT));
        };

        let mut errors = ValidationError::new();
        let mut out = BTreeMap::new();
        for (key, item) in map {
            let child = cx.child(
                &value,
                PathSegment::Key(key.clone()),
                item.clone(),
                &self.item.descriptor,
            );
            match transform_item(&self.item, &child, rt, item.clone()) {
                Ok(v) => {
                    out.insert(key.clone(), v);
                }
                Err(err) => errors.absorb(err, cx.all_fields())?,
            }
        }
        errors.into_result()?;

        Ok(Value::Map(out))
    }

    fn to_json(
        &self,
        cx: &Context<'_>,
        rt: &mut Runtime<'_>,
        json: Json,
    ) -> Result<Json, ValidationError> {
        let Some(map) = cx.value().as_map() else {
            return Ok(json);
        };

        let mut out = JsonMap::new();
        for (key, item) in map {
            let child = cx.child(
                cx.value(),
                PathSegment::Key(key.clone()),
                item.clone(),
                &self.item.descriptor,
            );
            if let Some(j) = item_json(&self.item, &child, rt)? {
                out.insert(key.clone(), j);
            }
        }

        Ok(Json::Object(out))
    }

    fn serialize(
        &self,
        cx: &Context<'_>,
        rt: &mut Runtime<'_>,
        value: Value,
    ) -> Result<Value, ValidationError> {
        let Value::Map(map) = &value else {
            return Err(cx.issue(EXPECTED_DICT));
        };

        let mut out = BTreeMap::new();
        for (key, item) in map {
            let child = cx.child(
                &value,
                PathSegment::Key(key.clone()),
                item.clone(),
                &self.item.descriptor,
            );
            out.insert(key.clone(), self.item.chain.serialize(&child, rt, item.clone())?);
        }

        Ok(Value::Map(out))
    }
}

///
/// ShapeOf
///
/// Fixed-key dict. Output always carries every declared key: absent keys
/// are filled with null or the key's default. Unknown keys follow the
/// schema's strict-input policy (rejected when strict, dropped otherwise).
///

#[derive(Clone, Debug)]
pub struct ShapeOf {
    shape: Arc<ShapeSchema>,
}

impl ShapeOf {
    #[must_use]
    pub fn new(keys: Vec<(String, ItemSchema)>) -> Self {
        Self {
            shape: Arc::new(ShapeSchema { keys }),
        }
    }

    fn unknown_keys(
        &self,
        cx: &Context<'_>,
        map: &BTreeMap<String, Value>,
    ) -> Result<(), ValidationError> {
        if !cx.config().strict_input {
            return Ok(());
        }

        let mut errors = ValidationError::new();
        for key in map.keys().filter(|k| self.shape.get(k).is_none()) {
            let err = ValidationError::at(&cx.keypath().child(key.as_str()), "unknown key")
                .with_root(cx.root());
            errors.absorb(err, cx.all_fields())?;
        }

        errors.into_result()
    }
}

impl Modifier for ShapeOf {
    fn name(&self) -> &'static str {
        "shape"
    }

    fn describe(&self, desc: &mut FieldDescriptor) {
        desc.kind = FieldKind::Shape;
        desc.shape = Some(Arc::clone(&self.shape));
    }

    fn validate(&self, cx: &Context<'_>, rt: &mut Runtime<'_>) -> Result<(), ValidationError> {
        let Some(map) = cx.value().as_map() else {
            return Err(cx.issue(EXPECTED_DICT));
        };

        let mut errors = ValidationError::new();
        if let Err(err) = self.unknown_keys(cx, map) {
            errors.absorb(err, cx.all_fields())?;
        }
        for (key, item) in &self.shape.keys {
            let value = map.get(key).cloned().unwrap_or_default();
            let child = cx.child(cx.value(), key.as_str(), value, &item.descriptor);
            if let Err(err) = item.chain.validate(&child, rt) {
                errors.absorb(err, cx.all_fields())?;
            }
        }

        errors.into_result()
    }

    fn transform(
        &self,
        cx: &Context<'_>,
        rt: &mut Runtime<'_>,
        value: Value,
    ) -> Result<Value, ValidationError> {
        let Value::Map(map) = &value else {
            return Err(cx.issue(EXPECTED_DICT));
        };

        let mut errors = ValidationError::new();
        if let Err(err) = self.unknown_keys(cx, map) {
            errors.absorb(err, cx.all_fields())?;
        }

        let mut out = BTreeMap::new();
        for (key, item) in &self.shape.keys {
            let raw = map.get(key).cloned().unwrap_or_default();
            let child = cx.child(&value, key.as_str(), raw.clone(), &item.descriptor);
            match item.chain.transform(&child, rt, raw) {
                Ok(v) => {
                    out.insert(key.clone(), v);
                }
                Err(err) => errors.absorb(err, cx.all_fields())?,
            }
        }
        errors.into_result()?;

        Ok(Value::Map(out))
    }

    fn to_json(
        &self,
        cx: &Context<'_>,
        rt: &mut Runtime<'_>,
        json: Json,
    ) -> Result<Json, ValidationError> {
        let Some(map) = cx.value().as_map() else {
            return Ok(json);
        };

        let mut out = JsonMap::new();
        for (key, item) in &self.shape.keys {
            let value = map.get(key).cloned().unwrap_or_default();
            let child = cx.child(cx.value(), key.as_str(), value, &item.descriptor);
            if let Some(j) = item_json(item, &child, rt)? {
                out.insert(key.clone(), j);
            }
        }

        Ok(Json::Object(out))
    }

    fn serialize(
        &self,
        cx: &Context<'_>,
        rt: &mut Runtime<'_>,
        value: Value,
    ) -> Result<Value, ValidationError> {
        let Value::Map(map) = &value else {
            return Err(cx.issue(EXPECTED_DICT));
        };

        let mut out = BTreeMap::new();
        for (key, item) in &self.shape.keys {
            let raw = map.get(key).cloned().unwrap_or_default();
            let child = cx.child(&value, key.as_str(), raw.clone(), &item.descriptor);
            out.insert(key.clone(), item.chain.serialize(&child, rt, raw)?);
        }

        Ok(Value::Map(out))
    }
}

///
/// TESTS
///

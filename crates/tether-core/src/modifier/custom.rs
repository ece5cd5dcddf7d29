//! Closure-backed nodes for behavior that has no built-in modifier.
use crate::{
    context::Context, error::ValidationError, graph::Runtime, modifier::Modifier, value::Value,
};
use serde_json::Value as Json;
use std::{fmt, sync::Arc};

type ValidateFn = dyn Fn(&Value, &Context<'_>) -> Result<(), String> + Send + Sync;
type TransformFn = dyn Fn(Value) -> Value + Send + Sync;
type JsonFn = dyn Fn(Json) -> Json + Send + Sync;
type SaveFn = dyn Fn(&Value) -> Value + Send + Sync;

macro_rules! opaque_debug {
    ($($ty:ident),*) => {
        $(
            impl fmt::Debug for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(concat!(stringify!($ty), "(<fn>)"))
                }
            }
        )*
    };
}

opaque_debug!(ValidateWith, TransformWith, ToJsonWith, SetOnSave);

///
/// ValidateWith
/// A returned message becomes an issue at the current keypath.
///

#[derive(Clone)]
pub struct ValidateWith(Arc<ValidateFn>);

impl ValidateWith {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Value, &Context<'_>) -> Result<(), String> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }
}

impl Modifier for ValidateWith {
    fn name(&self) -> &'static str {
        "validate_with"
    }

    fn validate(&self, cx: &Context<'_>, _rt: &mut Runtime<'_>) -> Result<(), ValidationError> {
        (self.0)(cx.value(), cx).map_err(|message| cx.issue(message))
    }
}

///
/// TransformWith
///

#[derive(Clone)]
pub struct TransformWith(Arc<TransformFn>);

impl TransformWith {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }
}

impl Modifier for TransformWith {
    fn name(&self) -> &'static str {
        "transform_with"
    }

    fn transform(
        &self,
        _cx: &Context<'_>,
        _rt: &mut Runtime<'_>,
        value: Value,
    ) -> Result<Value, ValidationError> {
        Ok((self.0)(value))
    }
}

///
/// ToJsonWith
///

#[derive(Clone)]
pub struct ToJsonWith(Arc<JsonFn>);

impl ToJsonWith {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Json) -> Json + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }
}

impl Modifier for ToJsonWith {
    fn name(&self) -> &'static str {
        "to_json_with"
    }

    fn to_json(
        &self,
        _cx: &Context<'_>,
        _rt: &mut Runtime<'_>,
        json: Json,
    ) -> Result<Json, ValidationError> {
        Ok((self.0)(json))
    }
}

///
/// SetOnSave
/// Server-computed value applied at the pre-persistence checkpoint.
///

#[derive(Clone)]
pub struct SetOnSave(Arc<SaveFn>);

impl SetOnSave {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }
}

impl Modifier for SetOnSave {
    fn name(&self) -> &'static str {
        "set_on_save"
    }

    fn accepts_null(&self) -> bool {
        true
    }

    fn serialize(
        &self,
        _cx: &Context<'_>,
        _rt: &mut Runtime<'_>,
        value: Value,
    ) -> Result<Value, ValidationError> {
        Ok((self.0)(&value))
    }
}

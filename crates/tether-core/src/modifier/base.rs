use crate::{
    context::Context,
    error::ValidationError,
    graph::Runtime,
    modifier::{Marker, Modifier},
    schema::{FieldDescriptor, ScalarType},
    value::Value,
};
use std::{fmt, sync::Arc};

///
/// Typed
///
/// Scalar type node. Coercion is limited to lossless numeric widening so
/// that repeated transforms are stable.
///

#[derive(Clone, Copy, Debug)]
pub struct Typed {
    ty: ScalarType,
}

impl Typed {
    #[must_use]
    pub const fn new(ty: ScalarType) -> Self {
        Self { ty }
    }

    fn accepts(self, value: &Value) -> bool {
        match (self.ty, value) {
            (ScalarType::Any, _)
            | (ScalarType::Bool, Value::Bool(_))
            | (ScalarType::Text, Value::Text(_))
            | (ScalarType::Int, Value::Int(_))
            | (ScalarType::Float | ScalarType::Number, Value::Int(_) | Value::Float(_)) => true,
            (ScalarType::Int, Value::Float(f)) => integral(*f).is_some(),
            _ => false,
        }
    }
}

// Integral floats inside the i64 range convert without loss.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn integral(f: f64) -> Option<i64> {
    (f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
}

impl Modifier for Typed {
    fn name(&self) -> &'static str {
        match self.ty {
            ScalarType::Any => "any",
            ScalarType::Bool => "boolean",
            ScalarType::Float => "float",
            ScalarType::Int => "int",
            ScalarType::Number => "number",
            ScalarType::Text => "text",
        }
    }

    fn describe(&self, desc: &mut FieldDescriptor) {
        desc.scalar = Some(self.ty);
    }

    fn validate(&self, cx: &Context<'_>, _rt: &mut Runtime<'_>) -> Result<(), ValidationError> {
        if self.accepts(cx.value()) {
            Ok(())
        } else {
            Err(cx.issue(format!(
                "expected {}, found {}",
                self.ty,
                cx.value().kind()
            )))
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn transform(
        &self,
        _cx: &Context<'_>,
        _rt: &mut Runtime<'_>,
        value: Value,
    ) -> Result<Value, ValidationError> {
        Ok(match (self.ty, value) {
            (ScalarType::Int, Value::Float(f)) => integral(f).map_or(Value::Float(f), Value::Int),
            (ScalarType::Float, Value::Int(i)) => Value::Float(i as f64),
            (_, value) => value,
        })
    }
}

///
/// Required
///

#[derive(Clone, Copy, Debug)]
pub struct Required;

impl Modifier for Required {
    fn name(&self) -> &'static str {
        "required"
    }

    fn marker(&self) -> Option<Marker> {
        Some(Marker::Required)
    }

    fn accepts_null(&self) -> bool {
        true
    }

    fn validate(&self, cx: &Context<'_>, _rt: &mut Runtime<'_>) -> Result<(), ValidationError> {
        if cx.value().is_null() {
            Err(cx.issue("is required"))
        } else {
            Ok(())
        }
    }
}

///
/// Flag
/// Pure marker node; its meaning lives in the field descriptor.
///

#[derive(Clone, Copy, Debug)]
pub struct Flag(pub Marker);

impl Modifier for Flag {
    fn name(&self) -> &'static str {
        match self.0 {
            Marker::Eager => "eager",
            Marker::Index => "index",
            Marker::Nullable => "nullable",
            Marker::Readonly => "readonly",
            Marker::Required => "required",
            Marker::Unique => "unique",
            Marker::Writeonce => "writeonce",
            Marker::Writeonly => "writeonly",
        }
    }

    fn marker(&self) -> Option<Marker> {
        Some(self.0)
    }
}

///
/// DefaultValue
///

#[derive(Clone)]
pub enum DefaultValue {
    Value(Value),
    With(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl DefaultValue {
    #[must_use]
    pub const fn value(value: Value) -> Self {
        Self::Value(value)
    }

    pub fn with<F>(f: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        Self::With(Arc::new(f))
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => f.debug_tuple("DefaultValue").field(v).finish(),
            Self::With(_) => f.write_str("DefaultValue(<fn>)"),
        }
    }
}

impl Modifier for DefaultValue {
    fn name(&self) -> &'static str {
        "default"
    }

    fn describe(&self, desc: &mut FieldDescriptor) {
        desc.has_default = true;
    }

    fn accepts_null(&self) -> bool {
        true
    }

    fn transform(
        &self,
        _cx: &Context<'_>,
        _rt: &mut Runtime<'_>,
        value: Value,
    ) -> Result<Value, ValidationError> {
        if !value.is_null() {
            return Ok(value);
        }

        Ok(match self {
            Self::Value(v) => v.clone(),
            Self::With(f) => f(),
        })
    }
}

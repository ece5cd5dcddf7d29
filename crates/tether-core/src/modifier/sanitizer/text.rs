use crate::{
    context::Context, error::ValidationError, graph::Runtime, modifier::Modifier, value::Value,
};

///
/// Trim
///

#[derive(Clone, Copy, Debug)]
pub struct Trim;

impl Modifier for Trim {
    fn name(&self) -> &'static str {
        "trim"
    }

    fn transform(
        &self,
        _cx: &Context<'_>,
        _rt: &mut Runtime<'_>,
        value: Value,
    ) -> Result<Value, ValidationError> {
        Ok(match value {
            Value::Text(s) => Value::Text(s.trim().to_string()),
            other => other,
        })
    }
}

///
/// Case
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Case {
    Lower,
    Upper,
}

///
/// TextCase
///

#[derive(Clone, Copy, Debug)]
pub struct TextCase(pub Case);

impl Modifier for TextCase {
    fn name(&self) -> &'static str {
        match self.0 {
            Case::Lower => "lowercase",
            Case::Upper => "uppercase",
        }
    }

    fn transform(
        &self,
        _cx: &Context<'_>,
        _rt: &mut Runtime<'_>,
        value: Value,
    ) -> Result<Value, ValidationError> {
        Ok(match (self.0, value) {
            (Case::Lower, Value::Text(s)) => Value::Text(s.to_lowercase()),
            (Case::Upper, Value::Text(s)) => Value::Text(s.to_uppercase()),
            (_, other) => other,
        })
    }
}

///
/// TESTS
///

//! Modifier nodes and the chain executor.
//!
//! A field's behavior is an ordered `Chain` of `Modifier` nodes. Each node
//! may take part in any of the four pipeline operations; the executor in
//! `exec` composes them, including the eager checkpoint split.
mod base;
mod chain;
mod custom;
mod exec;
pub mod sanitizer;
pub mod validator;

pub use base::*;
pub use chain::*;
pub use custom::*;

use crate::{
    context::Context, error::ValidationError, graph::Runtime, schema::FieldDescriptor,
    value::Value,
};
use derive_more::Display;
use serde_json::Value as Json;
use std::fmt::Debug;

///
/// Marker
/// Flags a node contributes to the field descriptor.
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
#[remain::sorted]
pub enum Marker {
    #[display("eager")]
    Eager,
    #[display("index")]
    Index,
    #[display("nullable")]
    Nullable,
    #[display("readonly")]
    Readonly,
    #[display("required")]
    Required,
    #[display("unique")]
    Unique,
    #[display("writeonce")]
    Writeonce,
    #[display("writeonly")]
    Writeonly,
}

///
/// Modifier
///
/// One step of a chain. Every pipeline method has a pass-through default,
/// so a node only implements the operations it takes part in.
///
/// Nodes are skipped on null values unless `accepts_null` says otherwise.
///

pub trait Modifier: Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn marker(&self) -> Option<Marker> {
        None
    }

    /// Contribute static metadata when the schema is defined.
    fn describe(&self, _desc: &mut FieldDescriptor) {}

    fn accepts_null(&self) -> bool {
        false
    }

    fn validate(&self, _cx: &Context<'_>, _rt: &mut Runtime<'_>) -> Result<(), ValidationError> {
        Ok(())
    }

    fn transform(
        &self,
        _cx: &Context<'_>,
        _rt: &mut Runtime<'_>,
        value: Value,
    ) -> Result<Value, ValidationError> {
        Ok(value)
    }

    fn to_json(
        &self,
        _cx: &Context<'_>,
        _rt: &mut Runtime<'_>,
        json: Json,
    ) -> Result<Json, ValidationError> {
        Ok(json)
    }

    /// Pre-persistence hook; same shape as `transform`.
    fn serialize(
        &self,
        _cx: &Context<'_>,
        _rt: &mut Runtime<'_>,
        value: Value,
    ) -> Result<Value, ValidationError> {
        Ok(value)
    }
}

/// Empty chain; the entry point of the fluent builder.
#[must_use]
pub fn chain() -> Chain {
    Chain::new()
}

//! Chain executor.
//!
//! Composes node operations into the four pipeline calls. A value that is
//! null skips every node that does not accept null.
//!
//! With an eager marker at position `k`, `transform` validates and then
//! transforms `nodes[..=k]` only; the remainder runs in `serialize` when the
//! runtime marks the field as pending.
use crate::{
    context::Context,
    error::ValidationError,
    graph::Runtime,
    modifier::{Chain, Marker, Modifier},
    value::Value,
};
use serde_json::Value as Json;
use std::sync::Arc;

type Nodes = [Arc<dyn Modifier>];

fn runs_on(node: &Arc<dyn Modifier>, value: &Value) -> bool {
    !value.is_null() || node.accepts_null()
}

fn validate_nodes(
    nodes: &Nodes,
    cx: &Context<'_>,
    rt: &mut Runtime<'_>,
) -> Result<(), ValidationError> {
    let mut errors = ValidationError::new();

    for node in nodes.iter().filter(|n| runs_on(n, cx.value())) {
        if let Err(err) = node.validate(cx, rt) {
            errors.absorb(err, cx.all_fields())?;
        }
    }

    errors.into_result()
}

fn transform_nodes(
    nodes: &Nodes,
    cx: &Context<'_>,
    rt: &mut Runtime<'_>,
    mut value: Value,
) -> Result<Value, ValidationError> {
    for node in nodes {
        if runs_on(node, &value) {
            value = node.transform(cx, rt, value)?;
        }
    }

    Ok(value)
}

impl Chain {
    pub fn validate(&self, cx: &Context<'_>, rt: &mut Runtime<'_>) -> Result<(), ValidationError> {
        validate_nodes(&self.nodes(), cx, rt)
    }

    /// Transform `value`; with an eager marker only the eager segment runs.
    pub fn transform(
        &self,
        cx: &Context<'_>,
        rt: &mut Runtime<'_>,
        value: Value,
    ) -> Result<Value, ValidationError> {
        let nodes = self.nodes();

        match self.eager_index() {
            Some(k) => {
                let head = &nodes[..=k];
                validate_nodes(head, &cx.with_value(value.clone()), rt)?;
                transform_nodes(head, cx, rt, value)
            }
            None => transform_nodes(&nodes, cx, rt, value),
        }
    }

    /// JSON rendering of `cx.value()`; `None` suppresses the field.
    pub fn to_json(
        &self,
        cx: &Context<'_>,
        rt: &mut Runtime<'_>,
        include_writeonly: bool,
    ) -> Result<Option<Json>, ValidationError> {
        let nodes = self.nodes();
        if !include_writeonly && nodes.iter().any(|n| n.marker() == Some(Marker::Writeonly)) {
            return Ok(None);
        }

        let mut json = cx.value().to_json();
        for node in nodes.iter().filter(|n| runs_on(n, cx.value())) {
            json = node.to_json(cx, rt, json)?;
        }

        Ok(Some(json))
    }

    /// Pre-persistence pass: deferred remainder first, then every node's
    /// `serialize`.
    pub fn serialize(
        &self,
        cx: &Context<'_>,
        rt: &mut Runtime<'_>,
        value: Value,
    ) -> Result<Value, ValidationError> {
        let nodes = self.nodes();
        let mut value = value;

        if rt.apply_deferred()
            && let Some(k) = self.eager_index()
        {
            value = transform_nodes(&nodes[k + 1..], cx, rt, value)?;
        }
        for node in &nodes {
            if runs_on(node, &value) {
                value = node.serialize(cx, rt, value)?;
            }
        }

        Ok(value)
    }
}

///
/// TESTS
///

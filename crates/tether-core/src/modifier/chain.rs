use crate::{
    collection::{DictOf, ListOf, ShapeOf},
    context::Context,
    error::DefinitionError,
    instance::{InstanceOf, Linked},
    modifier::{
        DefaultValue, Flag, Marker, Modifier, Required, SetOnSave, ToJsonWith, TransformWith,
        Typed, ValidateWith,
        sanitizer::{Case, TextCase, Trim},
        validator::{Bound, Length, OneOf, Pattern},
    },
    schema::{FieldDescriptor, ItemSchema, LinkSpec, ScalarType, Storage},
    value::Value,
};
use serde_json::Value as Json;
use std::{fmt, sync::Arc};

///
/// Link
///

#[derive(Debug)]
struct Link {
    node: Arc<dyn Modifier>,
    prev: Option<Arc<Link>>,
}

///
/// Chain
///
/// Persistent sequence of modifier nodes. Appending never mutates: every
/// builder call returns a new chain sharing the existing nodes.
///

#[derive(Clone, Default)]
pub struct Chain {
    tail: Option<Arc<Link>>,
    len: usize,
    eager: Option<usize>,
}

impl Chain {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            tail: None,
            len: 0,
            eager: None,
        }
    }

    /// Append a node.
    #[must_use]
    pub fn then(&self, node: impl Modifier + 'static) -> Self {
        self.push(Arc::new(node))
    }

    fn push(&self, node: Arc<dyn Modifier>) -> Self {
        let eager = if node.marker() == Some(Marker::Eager) {
            Some(self.len)
        } else {
            self.eager
        };

        Self {
            tail: Some(Arc::new(Link {
                node,
                prev: self.tail.clone(),
            })),
            len: self.len + 1,
            eager,
        }
    }

    /// Nodes in declaration order.
    #[must_use]
    pub fn nodes(&self) -> Vec<Arc<dyn Modifier>> {
        let mut out = Vec::with_capacity(self.len);
        let mut cursor = self.tail.as_deref();
        while let Some(link) = cursor {
            out.push(Arc::clone(&link.node));
            cursor = link.prev.as_deref();
        }
        out.reverse();

        out
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Position of the last eager marker.
    #[must_use]
    pub const fn eager_index(&self) -> Option<usize> {
        self.eager
    }

    /// Whether nodes follow the last eager marker.
    #[must_use]
    pub const fn has_deferred(&self) -> bool {
        match self.eager {
            Some(k) => k + 1 < self.len,
            None => false,
        }
    }

    #[must_use]
    pub fn descriptor(&self) -> FieldDescriptor {
        FieldDescriptor::from_chain(self)
    }

    // ---------------------------------------------------------------------
    // Types
    // ---------------------------------------------------------------------

    #[must_use]
    pub fn text(&self) -> Self {
        self.then(Typed::new(ScalarType::Text))
    }

    #[must_use]
    pub fn int(&self) -> Self {
        self.then(Typed::new(ScalarType::Int))
    }

    #[must_use]
    pub fn float(&self) -> Self {
        self.then(Typed::new(ScalarType::Float))
    }

    #[must_use]
    pub fn number(&self) -> Self {
        self.then(Typed::new(ScalarType::Number))
    }

    #[must_use]
    pub fn boolean(&self) -> Self {
        self.then(Typed::new(ScalarType::Bool))
    }

    #[must_use]
    pub fn any(&self) -> Self {
        self.then(Typed::new(ScalarType::Any))
    }

    // ---------------------------------------------------------------------
    // Presence and access markers
    // ---------------------------------------------------------------------

    #[must_use]
    pub fn required(&self) -> Self {
        self.then(Required)
    }

    #[must_use]
    pub fn nullable(&self) -> Self {
        self.then(Flag(Marker::Nullable))
    }

    #[must_use]
    pub fn default_value(&self, value: impl Into<Value>) -> Self {
        self.then(DefaultValue::value(value.into()))
    }

    #[must_use]
    pub fn default_with<F>(&self, f: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.then(DefaultValue::with(f))
    }

    #[must_use]
    pub fn readonly(&self) -> Self {
        self.then(Flag(Marker::Readonly))
    }

    #[must_use]
    pub fn writeonce(&self) -> Self {
        self.then(Flag(Marker::Writeonce))
    }

    #[must_use]
    pub fn writeonly(&self) -> Self {
        self.then(Flag(Marker::Writeonly))
    }

    #[must_use]
    pub fn eager(&self) -> Self {
        self.then(Flag(Marker::Eager))
    }

    #[must_use]
    pub fn unique(&self) -> Self {
        self.then(Flag(Marker::Unique))
    }

    #[must_use]
    pub fn index(&self) -> Self {
        self.then(Flag(Marker::Index))
    }

    // ---------------------------------------------------------------------
    // Validators
    // ---------------------------------------------------------------------

    #[must_use]
    pub fn min(&self, min: impl Into<f64>) -> Self {
        self.then(Bound::min(min.into()))
    }

    #[must_use]
    pub fn max(&self, max: impl Into<f64>) -> Self {
        self.then(Bound::max(max.into()))
    }

    pub fn range(&self, min: impl Into<f64>, max: impl Into<f64>) -> Result<Self, DefinitionError> {
        Ok(self.then(Bound::range(min.into(), max.into())?))
    }

    #[must_use]
    pub fn min_length(&self, min: usize) -> Self {
        self.then(Length::min(min))
    }

    #[must_use]
    pub fn max_length(&self, max: usize) -> Self {
        self.then(Length::max(max))
    }

    #[must_use]
    pub fn length(&self, len: usize) -> Self {
        self.then(Length::exact(len))
    }

    pub fn length_between(&self, min: usize, max: usize) -> Result<Self, DefinitionError> {
        Ok(self.then(Length::between(min, max)?))
    }

    pub fn one_of<I, V>(&self, values: I) -> Result<Self, DefinitionError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Ok(self.then(OneOf::new(values.into_iter().map(Into::into).collect())?))
    }

    pub fn pattern(&self, pattern: &str) -> Result<Self, DefinitionError> {
        Ok(self.then(Pattern::new(pattern)?))
    }

    // ---------------------------------------------------------------------
    // Sanitizers
    // ---------------------------------------------------------------------

    #[must_use]
    pub fn trim(&self) -> Self {
        self.then(Trim)
    }

    #[must_use]
    pub fn lowercase(&self) -> Self {
        self.then(TextCase(Case::Lower))
    }

    #[must_use]
    pub fn uppercase(&self) -> Self {
        self.then(TextCase(Case::Upper))
    }

    // ---------------------------------------------------------------------
    // Custom closures
    // ---------------------------------------------------------------------

    #[must_use]
    pub fn validate_with<F>(&self, f: F) -> Self
    where
        F: Fn(&Value, &Context<'_>) -> Result<(), String> + Send + Sync + 'static,
    {
        self.then(ValidateWith::new(f))
    }

    #[must_use]
    pub fn transform_with<F>(&self, f: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.then(TransformWith::new(f))
    }

    #[must_use]
    pub fn to_json_with<F>(&self, f: F) -> Self
    where
        F: Fn(Json) -> Json + Send + Sync + 'static,
    {
        self.then(ToJsonWith::new(f))
    }

    #[must_use]
    pub fn set_on_save<F>(&self, f: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        self.then(SetOnSave::new(f))
    }

    // ---------------------------------------------------------------------
    // Structure
    // ---------------------------------------------------------------------

    #[must_use]
    pub fn list_of(&self, item: impl Into<Self>) -> Self {
        self.then(ListOf::new(ItemSchema::new(item.into())))
    }

    #[must_use]
    pub fn dict_of(&self, item: impl Into<Self>) -> Self {
        self.then(DictOf::new(ItemSchema::new(item.into())))
    }

    /// Fixed key set, in declaration order.
    #[must_use]
    pub fn shape<I, K>(&self, keys: I) -> Self
    where
        I: IntoIterator<Item = (K, Self)>,
        K: Into<String>,
    {
        self.then(ShapeOf::new(
            keys.into_iter()
                .map(|(key, chain)| (key.into(), ItemSchema::new(chain)))
                .collect(),
        ))
    }

    #[must_use]
    pub fn instance_of(&self, target: impl Into<String>) -> Self {
        self.then(InstanceOf::new(target))
    }

    /// Pair this field with `peer` on the target schema.
    #[must_use]
    pub fn linked(&self, peer: impl Into<String>, storage: Storage) -> Self {
        self.then(Linked::new(LinkSpec::new(peer, storage)))
    }

    /// Many-to-many pairing through a join table.
    #[must_use]
    pub fn linked_via(
        &self,
        peer: impl Into<String>,
        storage: Storage,
        join_table: impl Into<String>,
    ) -> Self {
        self.then(Linked::new(LinkSpec::new(peer, storage).via(join_table)))
    }

    #[must_use]
    pub fn with(&self, node: impl Modifier + 'static) -> Self {
        self.then(node)
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.nodes().iter().map(|node| node.name()))
            .finish()
    }
}

impl From<ScalarType> for Chain {
    fn from(ty: ScalarType) -> Self {
        Self::new().then(Typed::new(ty))
    }
}

///
/// TESTS
///

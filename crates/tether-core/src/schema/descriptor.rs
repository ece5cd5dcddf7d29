use crate::{
    error::DefinitionError,
    modifier::{Chain, Marker},
};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

///
/// FieldKind
///

#[derive(Clone, Copy, Debug, Default, Display, Eq, PartialEq)]
pub enum FieldKind {
    #[default]
    Scalar,
    List,
    Dict,
    Shape,
    Instance,
}

///
/// ScalarType
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
#[remain::sorted]
pub enum ScalarType {
    #[display("any")]
    Any,
    #[display("boolean")]
    Bool,
    #[display("float")]
    Float,
    #[display("integer")]
    Int,
    #[display("number")]
    Number,
    #[display("text")]
    Text,
}

///
/// Storage
///
/// Which side of a relationship holds the pointer.
/// `Embedded` fields own a copy and have no back-reference.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum Storage {
    #[default]
    Embedded,
    LocalKey,
    ForeignKey,
}

///
/// LinkSpec
///
/// Relationship declaration on one side of a field pair.
/// `peer_index` is resolved by the registry during load.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LinkSpec {
    pub peer: String,
    pub storage: Storage,
    pub join_table: Option<String>,
    pub peer_index: Option<usize>,
}

impl LinkSpec {
    #[must_use]
    pub fn new(peer: impl Into<String>, storage: Storage) -> Self {
        Self {
            peer: peer.into(),
            storage,
            join_table: None,
            peer_index: None,
        }
    }

    #[must_use]
    pub fn via(mut self, join_table: impl Into<String>) -> Self {
        self.join_table = Some(join_table.into());
        self
    }
}

///
/// ItemSchema
/// Chain plus synthesized descriptor for list/dict items and shape keys.
///

#[derive(Clone, Debug)]
pub struct ItemSchema {
    pub chain: Chain,
    pub descriptor: FieldDescriptor,
}

impl ItemSchema {
    #[must_use]
    pub fn new(chain: Chain) -> Self {
        let descriptor = FieldDescriptor::from_chain(&chain);

        Self { chain, descriptor }
    }
}

///
/// ShapeSchema
/// Fixed key set, in declaration order.
///

#[derive(Clone, Debug, Default)]
pub struct ShapeSchema {
    pub keys: Vec<(String, ItemSchema)>,
}

impl ShapeSchema {
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ItemSchema> {
        self.keys.iter().find(|(k, _)| k == key).map(|(_, item)| item)
    }
}

///
/// FieldDescriptor
///
/// Static per-field metadata synthesized once from a chain at schema
/// definition time and shared by every instance of the owning schema.
///

#[derive(Clone, Debug, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct FieldDescriptor {
    pub kind: FieldKind,
    pub scalar: Option<ScalarType>,
    pub storage: Storage,
    pub required: bool,
    pub nullable: bool,
    pub unique: bool,
    pub index: bool,
    pub readonly: bool,
    pub writeonce: bool,
    pub writeonly: bool,
    pub has_default: bool,
    pub eager_checkpoint: Option<usize>,
    /// Transforms wait for `serialize`, here or in an item or shape key chain.
    pub deferred: bool,
    pub item: Option<Arc<ItemSchema>>,
    pub shape: Option<Arc<ShapeSchema>>,
    pub target: Option<String>,
    pub link: Option<LinkSpec>,
}

impl FieldDescriptor {
    /// Synthesize a descriptor from a chain's markers and structural nodes.
    #[must_use]
    pub fn from_chain(chain: &Chain) -> Self {
        let mut desc = Self::default();

        for (pos, node) in chain.nodes().iter().enumerate() {
            if let Some(marker) = node.marker() {
                match marker {
                    Marker::Eager => desc.eager_checkpoint = Some(pos),
                    Marker::Index => desc.index = true,
                    Marker::Nullable => desc.nullable = true,
                    Marker::Readonly => desc.readonly = true,
                    Marker::Required => desc.required = true,
                    Marker::Unique => desc.unique = true,
                    Marker::Writeonce => desc.writeonce = true,
                    Marker::Writeonly => desc.writeonly = true,
                }
            }
            node.describe(&mut desc);
        }
        desc.deferred = chain.has_deferred()
            || desc.item.as_ref().is_some_and(|i| i.descriptor.deferred)
            || desc
                .shape
                .as_ref()
                .is_some_and(|s| s.keys.iter().any(|(_, i)| i.descriptor.deferred));

        desc
    }

    /// Reject definition-time conflicts, recursing into item and shape schemas.
    pub fn check(&self, field: &str) -> Result<(), DefinitionError> {
        if self.readonly && self.writeonce {
            return Err(DefinitionError::ConflictingModifiers {
                field: field.to_string(),
                a: "readonly",
                b: "writeonce",
            });
        }
        if let Some(item) = &self.item {
            item.descriptor.check(&format!("{field}.*"))?;
        }
        if let Some(shape) = &self.shape {
            for (key, item) in &shape.keys {
                item.descriptor.check(&format!("{field}.{key}"))?;
            }
        }

        Ok(())
    }

    #[must_use]
    pub const fn is_many(&self) -> bool {
        matches!(self.kind, FieldKind::List)
    }

    #[must_use]
    pub const fn is_link(&self) -> bool {
        self.link.is_some()
    }

    #[must_use]
    pub fn uses_join_table(&self) -> bool {
        self.link.as_ref().is_some_and(|l| l.join_table.is_some())
    }

    /// Name of the paired field on the target schema, for linked fields.
    #[must_use]
    pub fn foreign_key(&self) -> Option<&str> {
        self.link.as_ref().map(|l| l.peer.as_str())
    }

    /// Index of the paired field on the target schema, once loaded.
    #[must_use]
    pub fn peer_index(&self) -> Option<usize> {
        self.link.as_ref().and_then(|l| l.peer_index)
    }
}

///
/// TESTS
///

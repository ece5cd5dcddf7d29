//! Schema description values.
//!
//! Schemas are built explicitly with `Schema::builder`, registered into a
//! `SchemaRegistry`, and immutable once the registry is loaded.
mod config;
mod descriptor;
mod registry;

pub use config::*;
pub use descriptor::*;
pub use registry::*;

use crate::{error::DefinitionError, modifier::Chain};
use convert_case::{Case, Casing};
use std::collections::HashMap;

///
/// Field
///

#[derive(Clone, Debug)]
pub struct Field {
    name: String,
    camel: String,
    chain: Chain,
    descriptor: FieldDescriptor,
}

impl Field {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn chain(&self) -> &Chain {
        &self.chain
    }

    #[must_use]
    pub const fn descriptor(&self) -> &FieldDescriptor {
        &self.descriptor
    }

    /// Key used in emitted JSON documents.
    #[must_use]
    pub fn json_key(&self, camelize: bool) -> &str {
        if camelize { &self.camel } else { &self.name }
    }
}

///
/// Schema
///

#[derive(Clone, Debug)]
pub struct Schema {
    name: String,
    namespace: String,
    fields: Vec<Field>,
    by_name: HashMap<String, usize>,
    by_camel: HashMap<String, usize>,
    config: SchemaConfig,
}

impl Schema {
    #[must_use]
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(name)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Registry key: `namespace::name`, or the bare name in the root namespace.
    #[must_use]
    pub fn path(&self) -> String {
        qualify(&self.namespace, &self.name)
    }

    #[must_use]
    pub const fn config(&self) -> &SchemaConfig {
        &self.config
    }

    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.index_of(name).map(|idx| &self.fields[idx])
    }

    #[must_use]
    pub fn field_at(&self, idx: usize) -> Option<&Field> {
        self.fields.get(idx)
    }

    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Resolve an input key; camelCase keys are accepted when the schema
    /// camelizes its JSON keys.
    #[must_use]
    pub fn resolve_input_key(&self, key: &str) -> Option<usize> {
        self.index_of(key).or_else(|| {
            self.config
                .camelize_json_keys
                .then(|| self.by_camel.get(key).copied())
                .flatten()
        })
    }

    /// Resolve a storage key back to a field index.
    #[must_use]
    pub fn resolve_db_key(&self, key: &str) -> Option<usize> {
        if self.config.camelize_db_keys {
            self.by_camel.get(key).copied()
        } else {
            self.index_of(key)
        }
    }

    #[must_use]
    pub fn db_key(&self, idx: usize) -> Option<&str> {
        self.fields
            .get(idx)
            .map(|f| f.json_key(self.config.camelize_db_keys))
    }

    pub(crate) fn field_at_mut(&mut self, idx: usize) -> Option<&mut Field> {
        self.fields.get_mut(idx)
    }
}

pub(crate) fn qualify(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{namespace}::{name}")
    }
}

///
/// SchemaBuilder
///

#[derive(Debug)]
pub struct SchemaBuilder {
    name: String,
    namespace: String,
    fields: Vec<(String, Chain)>,
    config: SchemaConfig,
}

impl SchemaBuilder {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: String::new(),
            fields: Vec::new(),
            config: SchemaConfig::default(),
        }
    }

    #[must_use]
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    #[must_use]
    pub fn field(mut self, name: impl Into<String>, chain: impl Into<Chain>) -> Self {
        self.fields.push((name.into(), chain.into()));
        self
    }

    #[must_use]
    pub fn config(mut self, config: SchemaConfig) -> Self {
        self.config = config;
        self
    }

    /// Synthesize field descriptors and reject definition-time conflicts.
    pub fn build(self) -> Result<Schema, DefinitionError> {
        let mut fields = Vec::with_capacity(self.fields.len());
        let mut by_name = HashMap::new();
        let mut by_camel = HashMap::new();

        for (idx, (name, chain)) in self.fields.into_iter().enumerate() {
            if by_name.insert(name.clone(), idx).is_some() {
                return Err(DefinitionError::DuplicateField {
                    schema: self.name,
                    field: name,
                });
            }

            let descriptor = FieldDescriptor::from_chain(&chain);
            descriptor.check(&name)?;

            let camel = name.to_case(Case::Camel);
            by_camel.insert(camel.clone(), idx);

            fields.push(Field {
                name,
                camel,
                chain,
                descriptor,
            });
        }

        Ok(Schema {
            name: self.name,
            namespace: self.namespace,
            fields,
            by_name,
            by_camel,
            config: self.config,
        })
    }
}

///
/// TESTS
///

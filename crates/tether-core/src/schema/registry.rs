use crate::{
    error::DefinitionError,
    schema::{Field, FieldKind, Schema, Storage, qualify},
};
use std::{collections::BTreeMap, sync::Arc};

///
/// SchemaRegistry
///
/// Every schema known to a graph, keyed by qualified path.
/// Constructed once through `RegistryBuilder::load` and immutable thereafter.
///

#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, Arc<Schema>>,
}

impl SchemaRegistry {
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Arc<Schema>> {
        self.schemas.get(path)
    }

    pub fn try_get(&self, path: &str) -> Result<&Arc<Schema>, DefinitionError> {
        self.get(path)
            .ok_or_else(|| DefinitionError::UnknownSchema(path.to_string()))
    }

    /// Resolve a type reference as written inside `namespace`.
    #[must_use]
    pub fn resolve(&self, target: &str, namespace: &str) -> Option<&Arc<Schema>> {
        self.get(target)
            .or_else(|| self.get(&qualify(namespace, target)))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Schema>> {
        self.schemas.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

///
/// RegistryBuilder
/// Load phase: collect schemas, then resolve and validate cross-type references.
///

#[derive(Debug, Default)]
pub struct RegistryBuilder {
    schemas: BTreeMap<String, Schema>,
}

impl RegistryBuilder {
    pub fn register(mut self, schema: Schema) -> Result<Self, DefinitionError> {
        let path = schema.path();
        if self.schemas.contains_key(&path) {
            return Err(DefinitionError::DuplicateSchema {
                namespace: schema.namespace().to_string(),
                name: schema.name().to_string(),
            });
        }
        self.schemas.insert(path, schema);

        Ok(self)
    }

    /// Finish the load phase.
    pub fn load(mut self) -> Result<Arc<SchemaRegistry>, DefinitionError> {
        // Phase 1: validate every reference and collect resolved link peers.
        let mut peers = Vec::new();
        for (path, schema) in &self.schemas {
            for (idx, field) in schema.fields().iter().enumerate() {
                check_targets(&self.schemas, schema, field)?;

                if field.descriptor.link.is_some() {
                    let peer_idx = validate_link(&self.schemas, schema, field)?;
                    peers.push((path.clone(), idx, peer_idx));
                }
            }
        }

        // Phase 2: record resolved peer indexes.
        for (path, idx, peer_idx) in peers {
            if let Some(link) = self
                .schemas
                .get_mut(&path)
                .and_then(|s| s.field_at_mut(idx))
                .and_then(|f| f.descriptor.link.as_mut())
            {
                link.peer_index = Some(peer_idx);
            }
        }

        let schemas = self
            .schemas
            .into_iter()
            .map(|(path, schema)| (path, Arc::new(schema)))
            .collect();

        Ok(Arc::new(SchemaRegistry { schemas }))
    }
}

fn resolve<'a>(
    schemas: &'a BTreeMap<String, Schema>,
    target: &str,
    namespace: &str,
) -> Option<&'a Schema> {
    schemas
        .get(target)
        .or_else(|| schemas.get(&qualify(namespace, target)))
}

// Every instance reference, including those nested in items and shapes, must name a loaded schema.
fn check_targets(
    schemas: &BTreeMap<String, Schema>,
    owner: &Schema,
    field: &Field,
) -> Result<(), DefinitionError> {
    let mut pending = vec![&field.descriptor];

    while let Some(desc) = pending.pop() {
        if let Some(target) = &desc.target
            && resolve(schemas, target, owner.namespace()).is_none()
        {
            return Err(DefinitionError::UnknownSchema(target.clone()));
        }
        if let Some(item) = &desc.item {
            pending.push(&item.descriptor);
        }
        if let Some(shape) = &desc.shape {
            pending.extend(shape.keys.iter().map(|(_, item)| &item.descriptor));
        }
    }

    Ok(())
}

// Validate one side of a link pair and return the peer field index.
fn validate_link(
    schemas: &BTreeMap<String, Schema>,
    owner: &Schema,
    field: &Field,
) -> Result<usize, DefinitionError> {
    let desc = &field.descriptor;
    let invalid = |message: String| {
        DefinitionError::invalid_link(owner.path(), field.name(), message)
    };
    let Some(link) = &desc.link else {
        return Err(invalid("field is not linked".to_string()));
    };

    if !matches!(desc.kind, FieldKind::Instance | FieldKind::List) {
        return Err(invalid(
            "linked fields must hold an instance or a list of instances".to_string(),
        ));
    }
    let Some(target) = &desc.target else {
        return Err(invalid("linked fields must hold instances".to_string()));
    };
    if link.storage == Storage::Embedded {
        return Err(invalid(
            "linked fields need LocalKey or ForeignKey storage".to_string(),
        ));
    }

    let target_schema = resolve(schemas, target, owner.namespace())
        .ok_or_else(|| DefinitionError::UnknownSchema(target.clone()))?;
    let peer_idx = target_schema.index_of(&link.peer).ok_or_else(|| {
        invalid(format!(
            "peer field '{}' not found on '{}'",
            link.peer,
            target_schema.path()
        ))
    })?;
    let peer = &target_schema.fields()[peer_idx];
    let Some(peer_link) = &peer.descriptor.link else {
        return Err(invalid(format!("peer field '{}' is not linked", link.peer)));
    };

    let peer_target = peer
        .descriptor
        .target
        .as_deref()
        .and_then(|t| resolve(schemas, t, target_schema.namespace()))
        .map(Schema::path);
    if peer_link.peer != field.name() || peer_target.as_deref() != Some(owner.path().as_str()) {
        return Err(invalid(format!(
            "peer field '{}' does not link back to this field",
            link.peer
        )));
    }

    let self_pair = owner.path() == target_schema.path() && link.peer == field.name();
    match (desc.is_many(), peer.descriptor.is_many()) {
        (false, false) => {
            if self_pair {
                return Err(invalid(
                    "one-to-one links need two distinct fields".to_string(),
                ));
            }
            if link.storage == peer_link.storage {
                return Err(invalid(
                    "one-to-one links pair a LocalKey with a ForeignKey".to_string(),
                ));
            }
        }
        (false, true) => {
            if link.storage != Storage::LocalKey || peer_link.storage != Storage::ForeignKey {
                return Err(invalid(
                    "one-to-many links keep the LocalKey on the single side".to_string(),
                ));
            }
        }
        (true, false) => {
            if link.storage != Storage::ForeignKey || peer_link.storage != Storage::LocalKey {
                return Err(invalid(
                    "one-to-many links use ForeignKey storage on the list side".to_string(),
                ));
            }
        }
        (true, true) => {
            let shared = link.join_table.is_some() && link.join_table == peer_link.join_table;
            if link.storage != Storage::ForeignKey
                || peer_link.storage != Storage::ForeignKey
                || !shared
            {
                return Err(invalid(
                    "many-to-many links need ForeignKey storage and a shared join table"
                        .to_string(),
                ));
            }
        }
    }

    let many_to_many = desc.is_many() && peer.descriptor.is_many();
    if !many_to_many && link.join_table.is_some() {
        return Err(invalid(
            "join tables are only used by many-to-many links".to_string(),
        ));
    }

    Ok(peer_idx)
}

///
/// TESTS
///

use crate::{error::Error, graph::Graph, value::ObjectId};
use serde::Deserialize;
use std::{fmt, sync::Arc};

/// Lifecycle callback; runs with full graph access.
pub type Hook = Arc<dyn Fn(&mut Graph, ObjectId) -> Result<(), Error> + Send + Sync>;

/// Authorization predicate; `false` denies the action.
pub type Guard = Arc<dyn Fn(&Graph, ObjectId) -> bool + Send + Sync>;

///
/// Hooks
///

#[derive(Clone, Default)]
pub struct Hooks {
    pub on_create: Option<Hook>,
    pub on_save: Option<Hook>,
    pub on_delete: Option<Hook>,
    pub can_create: Option<Guard>,
    pub can_update: Option<Guard>,
    pub can_delete: Option<Guard>,
    pub can_read: Option<Guard>,
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let set = [
            ("on_create", self.on_create.is_some()),
            ("on_save", self.on_save.is_some()),
            ("on_delete", self.on_delete.is_some()),
            ("can_create", self.can_create.is_some()),
            ("can_update", self.can_update.is_some()),
            ("can_delete", self.can_delete.is_some()),
            ("can_read", self.can_read.is_some()),
        ];

        f.debug_list()
            .entries(set.iter().filter(|(_, on)| *on).map(|(name, _)| name))
            .finish()
    }
}

///
/// SchemaConfig
///
/// Schema-wide options. Plain flags deserialize from JSON/TOML-like
/// sources; callbacks are attached with the builder methods.
///

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct SchemaConfig {
    pub camelize_json_keys: bool,
    pub camelize_db_keys: bool,
    /// Reject unknown input keys instead of dropping them.
    pub strict_input: bool,
    /// Aggregate every failure (`true`) or stop at the first (`false`).
    pub validate_all_fields: bool,
    pub soft_delete: bool,
    #[serde(rename = "abstract")]
    pub abstract_schema: bool,
    /// Snapshot previous values so `reset` can restore them.
    pub reset_all_fields: bool,

    #[serde(skip)]
    pub hooks: Hooks,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            camelize_json_keys: false,
            camelize_db_keys: false,
            strict_input: false,
            validate_all_fields: true,
            soft_delete: false,
            abstract_schema: false,
            reset_all_fields: false,
            hooks: Hooks::default(),
        }
    }
}

impl SchemaConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn camelize_json_keys(mut self, on: bool) -> Self {
        self.camelize_json_keys = on;
        self
    }

    #[must_use]
    pub const fn camelize_db_keys(mut self, on: bool) -> Self {
        self.camelize_db_keys = on;
        self
    }

    #[must_use]
    pub const fn strict_input(mut self, on: bool) -> Self {
        self.strict_input = on;
        self
    }

    #[must_use]
    pub const fn validate_all_fields(mut self, on: bool) -> Self {
        self.validate_all_fields = on;
        self
    }

    #[must_use]
    pub const fn soft_delete(mut self, on: bool) -> Self {
        self.soft_delete = on;
        self
    }

    #[must_use]
    pub const fn abstract_schema(mut self, on: bool) -> Self {
        self.abstract_schema = on;
        self
    }

    #[must_use]
    pub const fn reset_all_fields(mut self, on: bool) -> Self {
        self.reset_all_fields = on;
        self
    }

    #[must_use]
    pub fn on_create<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Graph, ObjectId) -> Result<(), Error> + Send + Sync + 'static,
    {
        self.hooks.on_create = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn on_save<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Graph, ObjectId) -> Result<(), Error> + Send + Sync + 'static,
    {
        self.hooks.on_save = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn on_delete<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Graph, ObjectId) -> Result<(), Error> + Send + Sync + 'static,
    {
        self.hooks.on_delete = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn can_create<F>(mut self, f: F) -> Self
    where
        F: Fn(&Graph, ObjectId) -> bool + Send + Sync + 'static,
    {
        self.hooks.can_create = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn can_update<F>(mut self, f: F) -> Self
    where
        F: Fn(&Graph, ObjectId) -> bool + Send + Sync + 'static,
    {
        self.hooks.can_update = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn can_delete<F>(mut self, f: F) -> Self
    where
        F: Fn(&Graph, ObjectId) -> bool + Send + Sync + 'static,
    {
        self.hooks.can_delete = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn can_read<F>(mut self, f: F) -> Self
    where
        F: Fn(&Graph, ObjectId) -> bool + Send + Sync + 'static,
    {
        self.hooks.can_read = Some(Arc::new(f));
        self
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_deserialize_with_defaults() {
        let cfg: SchemaConfig =
            serde_json::from_str(r#"{ "strict_input": true, "abstract": true }"#)
                .expect("config should parse");

        assert!(cfg.strict_input);
        assert!(cfg.abstract_schema);
        assert!(cfg.validate_all_fields);
        assert!(!cfg.reset_all_fields);
    }

    #[test]
    fn debug_lists_only_attached_hooks() {
        let cfg = SchemaConfig::new().can_read(|_, _| true);

        assert_eq!(format!("{:?}", cfg.hooks), r#"["can_read"]"#);
    }
}

use crate::{
    error::ValidationError,
    keypath::{Keypath, PathSegment},
    schema::{FieldDescriptor, SchemaConfig},
    value::{ObjectId, Value},
};

///
/// Parent
/// Immediate container of the value under inspection.
///

#[derive(Clone, Copy, Debug)]
pub enum Parent<'a> {
    Root,
    Object(ObjectId),
    Container(&'a Value),
}

///
/// Context
///
/// Per-step traversal state threaded through every pipeline call.
/// Contexts are never stored; overrides return a new context and nested
/// traversal derives child contexts with an extended keypath.
///
/// `root` is constant for a whole top-level call; `keypath` is absolute
/// from that root.
///

#[derive(Clone, Debug)]
pub struct Context<'a> {
    value: Value,
    keypath: Keypath,
    root: Option<ObjectId>,
    owner: Option<ObjectId>,
    parent: Parent<'a>,
    namespace: &'a str,
    config: &'a SchemaConfig,
    descriptor: &'a FieldDescriptor,
    field: &'a FieldDescriptor,
    all_fields: bool,
}

impl<'a> Context<'a> {
    /// Detached context, used when a chain runs outside any object.
    #[must_use]
    pub fn new(config: &'a SchemaConfig, descriptor: &'a FieldDescriptor, value: Value) -> Self {
        Self {
            value,
            keypath: Keypath::root(),
            root: None,
            owner: None,
            parent: Parent::Root,
            namespace: "",
            config,
            descriptor,
            field: descriptor,
            all_fields: config.validate_all_fields,
        }
    }

    /// Context for a top-level field of `owner`.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn for_field(
        value: Value,
        keypath: Keypath,
        root: Option<ObjectId>,
        owner: ObjectId,
        namespace: &'a str,
        config: &'a SchemaConfig,
        descriptor: &'a FieldDescriptor,
        all_fields: bool,
    ) -> Self {
        Self {
            value,
            keypath,
            root,
            owner: Some(owner),
            parent: Parent::Object(owner),
            namespace,
            config,
            descriptor,
            field: descriptor,
            all_fields,
        }
    }

    /// Derive the context of one item inside `container`.
    #[must_use]
    pub fn child<'b>(
        &'b self,
        container: &'b Value,
        seg: impl Into<PathSegment>,
        value: Value,
        descriptor: &'b FieldDescriptor,
    ) -> Context<'b> {
        Context {
            value,
            keypath: self.keypath.child(seg),
            root: self.root,
            owner: self.owner,
            parent: Parent::Container(container),
            namespace: self.namespace,
            config: self.config,
            descriptor,
            field: self.field,
            all_fields: self.all_fields,
        }
    }

    #[must_use]
    pub fn with_value(&self, value: Value) -> Self {
        Self {
            value,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_all_fields(&self, all_fields: bool) -> Self {
        Self {
            all_fields,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_keypath(&self, keypath: Keypath) -> Self {
        Self {
            keypath,
            ..self.clone()
        }
    }

    #[must_use]
    pub const fn value(&self) -> &Value {
        &self.value
    }

    #[must_use]
    pub const fn keypath(&self) -> &Keypath {
        &self.keypath
    }

    #[must_use]
    pub const fn root(&self) -> Option<ObjectId> {
        self.root
    }

    #[must_use]
    pub const fn owner(&self) -> Option<ObjectId> {
        self.owner
    }

    #[must_use]
    pub const fn parent(&self) -> Parent<'a> {
        self.parent
    }

    /// Namespace used to resolve type references.
    #[must_use]
    pub const fn namespace(&self) -> &'a str {
        self.namespace
    }

    #[must_use]
    pub const fn config(&self) -> &'a SchemaConfig {
        self.config
    }

    /// Descriptor of the immediate value (item descriptor inside collections).
    #[must_use]
    pub const fn descriptor(&self) -> &'a FieldDescriptor {
        self.descriptor
    }

    /// Descriptor of the top-level field this traversal started from.
    #[must_use]
    pub const fn field(&self) -> &'a FieldDescriptor {
        self.field
    }

    #[must_use]
    pub const fn all_fields(&self) -> bool {
        self.all_fields
    }

    /// Single-issue error at this context's keypath.
    #[must_use]
    pub fn issue(&self, message: impl Into<String>) -> ValidationError {
        ValidationError::at(&self.keypath, message).with_root(self.root)
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_extends_keypath_and_keeps_root() {
        let config = SchemaConfig::default();
        let desc = FieldDescriptor::default();
        let list = Value::from(vec![1_i64, 2]);
        let cx = Context::for_field(
            list.clone(),
            Keypath::field("numbers"),
            Some(ObjectId(7)),
            ObjectId(7),
            "",
            &config,
            &desc,
            true,
        );

        let child = cx.child(&list, 1, Value::Int(2), &desc);

        assert_eq!(child.keypath().render(), "numbers.1");
        assert_eq!(child.root(), Some(ObjectId(7)));
        assert!(matches!(child.parent(), Parent::Container(Value::List(_))));
    }

    #[test]
    fn issue_carries_keypath_and_root() {
        let config = SchemaConfig::default();
        let desc = FieldDescriptor::default();
        let cx = Context::new(&config, &desc, Value::Null)
            .with_keypath(Keypath::field("email"));

        let err = cx.issue("is required");

        assert_eq!(err.messages("email"), Some(&["is required".to_string()][..]));
    }
}

//! Shared fixtures for unit tests.
use crate::{
    context::Context,
    error::ValidationError,
    graph::{Graph, Runtime},
    keypath::Keypath,
    modifier::{Chain, chain},
    obs::MemorySink,
    schema::{RegistryBuilder, Schema, SchemaConfig, SchemaRegistry, Storage},
    value::Value,
};
use std::sync::Arc;

///
/// Detached chain runners
///

fn empty_graph() -> Graph {
    Graph::new(SchemaRegistry::builder().load().expect("empty registry"))
}

fn run<T>(
    chain: &Chain,
    config: &SchemaConfig,
    keypath: Keypath,
    value: Value,
    all_fields: bool,
    op: impl FnOnce(&Chain, &Context<'_>, &mut Runtime<'_>, Value) -> Result<T, ValidationError>,
) -> Result<T, ValidationError> {
    let mut graph = empty_graph();
    let descriptor = chain.descriptor();
    let cx = Context::new(config, &descriptor, value.clone())
        .with_keypath(keypath)
        .with_all_fields(all_fields);
    let mut rt = Runtime::new(&mut graph);

    op(chain, &cx, &mut rt, value)
}

pub(crate) fn run_validate(chain: &Chain, value: Value) -> Result<(), ValidationError> {
    run_field_validate_at(chain, Keypath::root(), value, true)
}

pub(crate) fn run_validate_fail_fast(chain: &Chain, value: Value) -> Result<(), ValidationError> {
    run_field_validate_at(chain, Keypath::root(), value, false)
}

pub(crate) fn run_field_validate(
    chain: &Chain,
    field: &str,
    value: Value,
    all_fields: bool,
) -> Result<(), ValidationError> {
    run_field_validate_at(chain, Keypath::field(field), value, all_fields)
}

fn run_field_validate_at(
    chain: &Chain,
    keypath: Keypath,
    value: Value,
    all_fields: bool,
) -> Result<(), ValidationError> {
    let config = SchemaConfig::default();

    run(chain, &config, keypath, value, all_fields, |c, cx, rt, _| {
        c.validate(cx, rt)
    })
}

pub(crate) fn run_transform(chain: &Chain, value: Value) -> Result<Value, ValidationError> {
    run_transform_with(chain, &SchemaConfig::default(), value)
}

pub(crate) fn run_transform_with(
    chain: &Chain,
    config: &SchemaConfig,
    value: Value,
) -> Result<Value, ValidationError> {
    run(chain, config, Keypath::root(), value, true, |c, cx, rt, v| {
        c.transform(cx, rt, v)
    })
}

///
/// Blog fixture
///
/// User 1–n Post 1–n Comment, and User 1–n Comment through `commenter`.
/// User carries an embedded Profile.
///

pub(crate) fn blog_registry() -> Arc<SchemaRegistry> {
    let user = Schema::builder("User")
        .field("name", chain().text().required())
        .field("email", chain().text().trim().lowercase().unique())
        .field("password", chain().text().writeonly())
        .field("profile", chain().instance_of("Profile"))
        .field(
            "posts",
            chain()
                .list_of(chain().instance_of("Post"))
                .linked("author", Storage::ForeignKey),
        )
        .field(
            "comments",
            chain()
                .list_of(chain().instance_of("Comment"))
                .linked("commenter", Storage::ForeignKey),
        )
        .config(SchemaConfig::new().reset_all_fields(true))
        .build()
        .expect("user schema");

    let profile = Schema::builder("Profile")
        .field("bio", chain().text())
        .config(SchemaConfig::new().reset_all_fields(true))
        .build()
        .expect("profile schema");

    let post = Schema::builder("Post")
        .field("title", chain().text().required())
        .field(
            "author",
            chain()
                .instance_of("User")
                .linked("posts", Storage::LocalKey),
        )
        .field(
            "comments",
            chain()
                .list_of(chain().instance_of("Comment"))
                .linked("post", Storage::ForeignKey),
        )
        .config(SchemaConfig::new().reset_all_fields(true))
        .build()
        .expect("post schema");

    let comment = Schema::builder("Comment")
        .field("body", chain().text())
        .field(
            "post",
            chain()
                .instance_of("Post")
                .required()
                .linked("comments", Storage::LocalKey),
        )
        .field(
            "commenter",
            chain()
                .instance_of("User")
                .linked("comments", Storage::LocalKey),
        )
        .build()
        .expect("comment schema");

    SchemaRegistry::builder()
        .register(user)
        .and_then(|b| b.register(profile))
        .and_then(|b| b.register(post))
        .and_then(|b| b.register(comment))
        .and_then(RegistryBuilder::load)
        .expect("blog registry")
}

/// Blog graph with a capturing sink.
pub(crate) fn blog_graph() -> (Graph, MemorySink) {
    let sink = MemorySink::new();
    let graph = Graph::new(blog_registry()).with_sink(sink.clone());

    (graph, sink)
}

/// Map input holding object handles, which `json!` cannot express.
pub(crate) fn record<const N: usize>(pairs: [(&str, Value); N]) -> Value {
    Value::Map(pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
}

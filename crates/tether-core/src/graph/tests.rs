use crate::{
    backend::MemoryBackend,
    error::{Action, Error},
    graph::{Graph, JsonOptions},
    modifier::chain,
    obs::{Event, MemorySink},
    schema::{RegistryBuilder, Schema, SchemaConfig, SchemaRegistry, Storage},
    test_support::{blog_graph, record},
    value::{ObjectId, Value},
};
use serde_json::json;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

fn account_graph(config: SchemaConfig) -> (Graph, MemorySink) {
    let account = Schema::builder("Account")
        .field("handle", chain().text().writeonce())
        .field("created", chain().int().readonly().default_value(1))
        .field(
            "secret",
            chain()
                .text()
                .min_length(8)
                .eager()
                .transform_with(|v| match v {
                    Value::Text(s) => Value::Text(format!("hashed:{s}")),
                    other => other,
                }),
        )
        .field("slug", chain().text())
        .config(config)
        .build()
        .expect("account schema");
    let registry = SchemaRegistry::builder()
        .register(account)
        .and_then(RegistryBuilder::load)
        .expect("registry");
    let sink = MemorySink::new();

    (Graph::new(registry).with_sink(sink.clone()), sink)
}

fn graph_of(schemas: Vec<Schema>) -> Graph {
    let registry = schemas
        .into_iter()
        .try_fold(SchemaRegistry::builder(), RegistryBuilder::register)
        .and_then(RegistryBuilder::load)
        .expect("registry");

    Graph::new(registry)
}

// Person 1–1 Passport; the person side holds the key.
fn passport_graph() -> Graph {
    let person = Schema::builder("Person")
        .field("name", chain().text())
        .field(
            "passport",
            chain()
                .instance_of("Passport")
                .linked("holder", Storage::LocalKey),
        )
        .build()
        .expect("person schema");
    let passport = Schema::builder("Passport")
        .field("number", chain().text())
        .field(
            "holder",
            chain()
                .instance_of("Person")
                .linked("passport", Storage::ForeignKey),
        )
        .build()
        .expect("passport schema");

    graph_of(vec![person, passport])
}

// Article n–n Tag through a shared join table.
fn tag_graph() -> Graph {
    let article = Schema::builder("Article")
        .field("title", chain().text())
        .field(
            "tags",
            chain()
                .list_of(chain().instance_of("Tag"))
                .linked_via("articles", Storage::ForeignKey, "article_tags"),
        )
        .build()
        .expect("article schema");
    let tag = Schema::builder("Tag")
        .field("label", chain().text())
        .field(
            "articles",
            chain()
                .list_of(chain().instance_of("Article"))
                .linked_via("tags", Storage::ForeignKey, "article_tags"),
        )
        .build()
        .expect("tag schema");

    graph_of(vec![article, tag])
}

fn handles(graph: &Graph, id: ObjectId, field: &str) -> Vec<ObjectId> {
    graph
        .get(id, field)
        .map(Value::object_handles)
        .unwrap_or_default()
}

fn posts_of(graph: &Graph, user: ObjectId) -> Vec<ObjectId> {
    graph
        .get(user, "posts")
        .map(Value::object_handles)
        .unwrap_or_default()
}

fn saved(graph: &mut Graph, backend: &mut MemoryBackend, ids: &[ObjectId]) {
    for id in ids {
        graph.save(*id, backend).expect("save");
    }
}

//
// construction
//

#[test]
fn construct_transforms_and_embeds_nested_objects() {
    let (mut g, _) = blog_graph();

    let user = g
        .construct(
            "User",
            json!({ "name": "Ada", "email": "  ADA@X.io ", "profile": { "bio": "hi" } }),
        )
        .expect("user");

    assert_eq!(g.get(user, "email"), Some(&Value::from("ada@x.io")));
    let profile = g
        .get(user, "profile")
        .and_then(Value::as_object)
        .expect("profile handle");
    assert_eq!(g.instance(profile).and_then(|p| p.embedded_in()), Some(user));
    assert!(g.instance(user).is_some_and(|u| u.is_new()));
}

#[test]
fn construct_of_unknown_schema_is_a_definition_error() {
    let (mut g, _) = blog_graph();

    let err = g.construct("Ghost", json!({})).expect_err("unknown schema");

    assert!(matches!(err, Error::Definition(_)));
}

#[test]
fn readonly_input_is_rejected_but_defaults_apply() {
    let (mut g, _) = account_graph(SchemaConfig::new());

    let err = g
        .construct("Account", json!({ "created": 5 }))
        .expect_err("readonly");
    let Error::Validation(err) = err else {
        panic!("expected validation error");
    };
    assert_eq!(err.messages("created"), Some(&["is readonly".to_string()][..]));

    let id = g.construct("Account", json!({})).expect("account");
    assert_eq!(g.get(id, "created"), Some(&Value::Int(1)));
}

#[test]
fn writeonce_allows_a_single_non_null_write() {
    let (mut g, _) = account_graph(SchemaConfig::new());
    let id = g.construct("Account", json!({ "handle": "ada" })).expect("account");

    let err = g.set_field(id, "handle", "bob").expect_err("second write");

    assert!(err.to_string().contains("can only be written once"));
    assert!(g.update(id, json!({ "handle": "bob" })).is_ok());
    assert_eq!(g.get(id, "handle"), Some(&Value::from("bob")));
}

#[test]
fn strict_input_rejects_unknown_fields() {
    let (mut g, _) = account_graph(SchemaConfig::new().strict_input(true));

    let err = g
        .construct("Account", json!({ "nope": 1 }))
        .expect_err("unknown field");

    assert!(err.to_string().contains("nope: unknown field"));
}

#[test]
fn failed_set_leaves_object_untouched() {
    let (mut g, _) = account_graph(SchemaConfig::new());
    let id = g.construct("Account", json!({ "slug": "a" })).expect("account");

    let result = g.set(id, json!({ "slug": "b", "secret": "short" }));

    assert!(result.is_err());
    assert_eq!(g.get(id, "slug"), Some(&Value::from("a")));
}

#[test]
fn failed_construct_leaves_existing_peers_untouched() {
    let (mut g, _) = blog_graph();
    let mut backend = MemoryBackend::new();
    let ada = g.construct("User", json!({ "name": "Ada" })).expect("ada");
    saved(&mut g, &mut backend, &[ada]);
    let before = g.len();

    let comment = record([("body", "hi".into()), ("commenter", ada.into())]);
    let result = g.construct(
        "Post",
        record([
            ("title", "T".into()),
            ("author", "nobody".into()),
            ("comments", vec![comment].into()),
        ]),
    );

    assert!(result.is_err());
    assert!(handles(&g, ada, "comments").is_empty());
    assert!(g.instance(ada).is_some_and(|u| !u.is_modified()));
    assert_eq!(g.len(), before);
}

#[test]
fn failed_set_leaves_existing_peers_untouched() {
    let (mut g, _) = blog_graph();
    let ada = g.construct("User", json!({ "name": "Ada" })).expect("ada");
    let bob = g.construct("User", json!({ "name": "Bob" })).expect("bob");
    let before = g.len();

    let comment = record([("body", "hi".into()), ("commenter", bob.into())]);
    let post = record([("title", "T".into()), ("comments", vec![comment].into())]);
    let result = g.set(
        ada,
        record([("posts", vec![post].into()), ("profile", "none".into())]),
    );

    assert!(result.is_err());
    assert!(posts_of(&g, ada).is_empty());
    assert!(handles(&g, bob, "comments").is_empty());
    assert_eq!(g.len(), before);
}

//
// eager and deferred transforms
//

#[test]
fn deferred_transform_runs_once_on_save() {
    let (mut g, _) = account_graph(SchemaConfig::new());
    let mut backend = MemoryBackend::new();
    let id = g
        .construct("Account", json!({ "secret": "correct horse" }))
        .expect("account");

    assert!(g.instance(id).is_some_and(|a| a.is_pending("secret")));
    assert_eq!(g.get(id, "secret"), Some(&Value::from("correct horse")));

    g.save(id, &mut backend).expect("save");
    g.save(id, &mut backend).expect("second save");

    assert_eq!(g.get(id, "secret"), Some(&Value::from("hashed:correct horse")));
    assert!(g.instance(id).is_some_and(|a| !a.is_pending("secret")));
}

#[test]
fn deferred_item_transform_runs_once_on_save() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let tagged = Schema::builder("Tagged")
        .field(
            "tags",
            chain().list_of(chain().text().eager().transform_with(move |v| {
                seen.fetch_add(1, Ordering::SeqCst);
                match v {
                    Value::Text(s) => Value::Text(format!("x:{s}")),
                    other => other,
                }
            })),
        )
        .build()
        .expect("tagged schema");
    let mut g = graph_of(vec![tagged]);
    let mut backend = MemoryBackend::new();

    let id = g.construct("Tagged", json!({ "tags": ["a"] })).expect("tagged");
    assert!(g.instance(id).is_some_and(|t| t.is_pending("tags")));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    g.save(id, &mut backend).expect("save");
    g.save(id, &mut backend).expect("second save");

    assert_eq!(g.get(id, "tags"), Some(&Value::from(vec!["x:a"])));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

//
// validation
//

#[test]
fn validation_reports_nested_keypaths() {
    let (mut g, _) = blog_graph();
    let user = g
        .construct("User", json!({ "name": "Ada", "posts": [{ "title": "ok" }, {}] }))
        .expect("user");

    let err = g.validate(user).expect_err("second post has no title");
    let Error::Validation(err) = err else {
        panic!("expected validation error");
    };

    assert_eq!(err.keypaths().collect::<Vec<_>>(), vec!["posts.1.title"]);
    assert_eq!(err.root(), Some(user));
    assert_eq!(g.is_valid(user).ok(), Some(false));
}

#[test]
fn validation_failure_is_reported_to_the_sink() {
    let (mut g, sink) = blog_graph();
    let post = g.construct("Post", json!({})).expect("post");

    assert!(g.validate(post).is_err());

    assert!(sink.events().contains(&Event::ValidationFailed {
        object: post,
        issues: 1,
    }));
}

//
// links
//

#[test]
fn assigning_a_single_side_updates_the_list_side() {
    let (mut g, _) = blog_graph();
    let ada = g.construct("User", json!({ "name": "Ada" })).expect("ada");
    let bob = g.construct("User", json!({ "name": "Bob" })).expect("bob");
    let post = g.construct("Post", json!({ "title": "T" })).expect("post");

    g.set_field(post, "author", ada).expect("author");
    assert_eq!(posts_of(&g, ada), vec![post]);

    g.set_field(post, "author", bob).expect("reassign");
    assert!(posts_of(&g, ada).is_empty());
    assert_eq!(posts_of(&g, bob), vec![post]);
    assert_eq!(g.instance(ada).map(|u| u.unlinked("posts").to_vec()), Some(vec![post]));
}

#[test]
fn pushing_onto_a_list_side_steals_from_previous_owner() {
    let (mut g, _) = blog_graph();
    let ada = g.construct("User", json!({ "name": "Ada" })).expect("ada");
    let bob = g.construct("User", json!({ "name": "Bob" })).expect("bob");
    let post = g.construct("Post", json!({ "title": "T" })).expect("post");

    g.push(ada, "posts", post).expect("push");
    assert_eq!(g.get(post, "author"), Some(&Value::Object(ada)));

    g.push(bob, "posts", post).expect("push");
    assert_eq!(g.get(post, "author"), Some(&Value::Object(bob)));
    assert!(posts_of(&g, ada).is_empty());
}

#[test]
fn removing_from_a_list_side_clears_the_peer() {
    let (mut g, sink) = blog_graph();
    let ada = g.construct("User", json!({ "name": "Ada" })).expect("ada");
    let post = g.construct("Post", json!({ "title": "T" })).expect("post");
    g.push(ada, "posts", post).expect("push");
    sink.clear();

    let removed = g.remove_item(ada, "posts", 0).expect("remove");

    assert_eq!(removed, Value::Object(post));
    assert_eq!(g.get(post, "author"), Some(&Value::Null));
    assert!(sink.events().iter().any(|e| matches!(e, Event::LinkDetached { .. })));
}

#[test]
fn remove_item_out_of_range_is_a_data_error() {
    let (mut g, _) = blog_graph();
    let ada = g.construct("User", json!({ "name": "Ada" })).expect("ada");

    let err = g.remove_item(ada, "posts", 3).expect_err("empty list");

    assert!(err.to_string().contains("index 3 out of range"));
}

#[test]
fn linked_object_of_wrong_schema_is_rejected() {
    let (mut g, _) = blog_graph();
    let post = g.construct("Post", json!({ "title": "T" })).expect("post");
    let other = g.construct("Post", json!({ "title": "U" })).expect("other");

    let err = g.set_field(post, "author", other).expect_err("not a user");

    assert!(err.to_string().contains("expected a User object"));
}

#[test]
fn one_to_one_reassignment_releases_the_previous_holder() {
    let mut g = passport_graph();
    let a1 = g.construct("Person", json!({ "name": "A1" })).expect("a1");
    let a2 = g.construct("Person", json!({ "name": "A2" })).expect("a2");
    let b1 = g.construct("Passport", json!({ "number": "1" })).expect("b1");

    g.set_field(a1, "passport", b1).expect("issue");
    assert_eq!(g.get(b1, "holder"), Some(&Value::Object(a1)));

    g.set_field(a2, "passport", b1).expect("transfer");

    assert_eq!(g.get(a1, "passport"), Some(&Value::Null));
    assert_eq!(g.get(b1, "holder"), Some(&Value::Object(a2)));
    assert_eq!(g.instance(a1).map(|p| p.unlinked("passport").to_vec()), Some(vec![b1]));
}

#[test]
fn one_to_one_assignment_from_the_foreign_key_side() {
    let mut g = passport_graph();
    let a = g.construct("Person", json!({ "name": "A" })).expect("a");
    let b1 = g.construct("Passport", json!({ "number": "1" })).expect("b1");
    let b2 = g.construct("Passport", json!({ "number": "2" })).expect("b2");
    g.set_field(b1, "holder", a).expect("first");

    g.set_field(b2, "holder", a).expect("renewal");

    assert_eq!(g.get(a, "passport"), Some(&Value::Object(b2)));
    assert_eq!(g.get(b1, "holder"), Some(&Value::Null));
}

#[test]
fn many_to_many_reassignment_applies_the_set_difference() {
    let mut g = tag_graph();
    let p1 = g.construct("Article", json!({ "title": "P1" })).expect("p1");
    let p2 = g.construct("Article", json!({ "title": "P2" })).expect("p2");
    let t1 = g.construct("Tag", json!({ "label": "rust" })).expect("t1");
    let t2 = g.construct("Tag", json!({ "label": "db" })).expect("t2");

    g.set_field(p1, "tags", vec![t1, t2]).expect("tag p1");
    g.set_field(p2, "tags", vec![t1]).expect("tag p2");
    assert_eq!(handles(&g, t1, "articles"), vec![p1, p2]);
    assert_eq!(handles(&g, t2, "articles"), vec![p1]);

    g.set_field(p1, "tags", vec![t2]).expect("retag p1");
    assert_eq!(handles(&g, t1, "articles"), vec![p2]);
    assert_eq!(handles(&g, t2, "articles"), vec![p1]);
    assert_eq!(g.instance(p1).map(|a| a.unlinked("tags").to_vec()), Some(vec![t1]));

    g.set_field(t2, "articles", Vec::<ObjectId>::new()).expect("clear t2");
    assert!(handles(&g, p1, "tags").is_empty());
    assert_eq!(handles(&g, p2, "tags"), vec![t1]);
}

//
// json
//

#[test]
fn cyclic_graph_renders_each_identity_once() {
    let (mut g, _) = blog_graph();
    let ada = g.construct("User", json!({ "name": "Ada", "password": "pw" })).expect("ada");
    let post = g.construct("Post", json!({ "title": "T" })).expect("post");
    g.set_field(post, "author", ada).expect("author");
    let comment = g
        .construct("Comment", record([("body", "hi".into()), ("post", post.into()), ("commenter", ada.into())]))
        .expect("comment");

    let out = g.to_json(ada, &JsonOptions::new()).expect("json");

    assert_eq!(out["$id"], json!(ada.index()));
    assert!(out.get("password").is_none());
    assert_eq!(out["posts"][0]["author"], json!({ "$ref": ada.index() }));
    assert_eq!(out["posts"][0]["comments"][0]["$id"], json!(comment.index()));
    assert_eq!(out["comments"][0], json!({ "$ref": comment.index() }));

    let with_secret = g
        .to_json(ada, &JsonOptions::new().include_writeonly(true))
        .expect("json");
    assert_eq!(with_secret["password"], json!("pw"));
}

#[test]
fn nested_cycle_validates_and_renders_once_per_identity() {
    let (mut g, _) = blog_graph();
    let ada = g.construct("User", json!({ "name": "Ada" })).expect("ada");

    let comment = record([("body", "hi".into()), ("commenter", ada.into())]);
    let post = record([("title", "T".into()), ("comments", vec![comment].into())]);
    g.set(ada, record([("posts", vec![post].into())]))
        .expect("nested posts");

    assert!(g.validate(ada).is_ok());
    let out = g.to_json(ada, &JsonOptions::new()).expect("json");
    let post = &out["posts"][0];
    let comment = &post["comments"][0];
    assert_eq!(post["author"], json!({ "$ref": ada.index() }));
    assert_eq!(comment["commenter"], json!({ "$ref": ada.index() }));
    assert_eq!(comment["post"], json!({ "$ref": post["$id"] }));
    assert_eq!(out["comments"][0], json!({ "$ref": comment["$id"] }));
}

#[test]
fn denied_read_fails_at_top_level_only() {
    let (mut g, _) = account_graph(SchemaConfig::new().can_read(|_, _| false));
    let id = g.construct("Account", json!({})).expect("account");

    let err = g.to_json(id, &JsonOptions::new()).expect_err("denied");

    assert!(matches!(
        err,
        Error::Unauthorized {
            action: Action::Read,
            ..
        }
    ));
}

#[test]
fn camelize_option_renames_keys() {
    let schema = Schema::builder("Tag")
        .field("display_name", chain().text())
        .build()
        .expect("schema");
    let registry = SchemaRegistry::builder()
        .register(schema)
        .and_then(RegistryBuilder::load)
        .expect("registry");
    let mut g = Graph::new(registry);
    let id = g.construct("Tag", json!({ "display_name": "x" })).expect("tag");

    let out = g
        .to_json(id, &JsonOptions::new().camelize(true))
        .expect("json");

    assert_eq!(out["displayName"], json!("x"));
}

//
// lifecycle
//

#[test]
fn save_hands_a_record_to_the_backend_and_closes_the_epoch() {
    let (mut g, sink) = blog_graph();
    let mut backend = MemoryBackend::new();
    let ada = g
        .construct("User", json!({ "name": "Ada", "email": "a@x" }))
        .expect("ada");

    g.save(ada, &mut backend).expect("save");

    let record = backend.last_saved(ada).expect("record");
    assert!(record.is_new);
    assert_eq!(record.values.get("email"), Some(&Value::from("a@x")));
    assert_eq!(record.unique_fields, vec!["email".to_string()]);
    assert!(g.instance(ada).is_some_and(|u| !u.is_new() && !u.is_modified()));
    assert!(sink.events().contains(&Event::Saved {
        schema: "User".to_string(),
        object: ada,
        created: true,
    }));
}

#[test]
fn invalid_object_is_not_saved() {
    let (mut g, _) = blog_graph();
    let mut backend = MemoryBackend::new();
    let post = g.construct("Post", json!({})).expect("post");

    assert!(matches!(g.save(post, &mut backend), Err(Error::Validation(_))));
    assert!(backend.saved.is_empty());
}

#[test]
fn unique_conflict_surfaces_at_the_field() {
    let (mut g, _) = blog_graph();
    let mut backend = MemoryBackend::new();
    let ada = g.construct("User", json!({ "name": "Ada", "email": "a@x" })).expect("ada");
    let bob = g.construct("User", json!({ "name": "Bob", "email": "A@X" })).expect("bob");
    g.save(ada, &mut backend).expect("save");

    let err = g.save(bob, &mut backend).expect_err("duplicate email");

    let Error::Validation(err) = err else {
        panic!("expected validation error");
    };
    assert_eq!(err.messages("email"), Some(&["must be unique".to_string()][..]));
    assert_eq!(err.root(), Some(bob));
}

#[test]
fn modified_fields_are_tracked_after_save() {
    let (mut g, _) = blog_graph();
    let mut backend = MemoryBackend::new();
    let ada = g.construct("User", json!({ "name": "Ada" })).expect("ada");
    saved(&mut g, &mut backend, &[ada]);

    g.set_field(ada, "name", "Ada L").expect("rename");
    g.save(ada, &mut backend).expect("save");

    let record = backend.last_saved(ada).expect("record");
    assert!(!record.is_new);
    assert_eq!(record.modified, vec!["name".to_string()]);
}

#[test]
fn hooks_run_around_save() {
    let config = SchemaConfig::new()
        .on_create(|g, id| g.update(id, json!({ "slug": "created" })))
        .on_save(|g, id| g.update(id, json!({ "slug": "saved" })));
    let (mut g, _) = account_graph(config);
    let mut backend = MemoryBackend::new();
    let id = g.construct("Account", json!({})).expect("account");

    g.save(id, &mut backend).expect("create");
    assert_eq!(
        backend.last_saved(id).and_then(|r| r.values.get("slug")),
        Some(&Value::from("created"))
    );

    g.save(id, &mut backend).expect("update");
    assert_eq!(
        backend.last_saved(id).and_then(|r| r.values.get("slug")),
        Some(&Value::from("saved"))
    );
}

#[test]
fn guard_denial_is_unauthorized() {
    let (mut g, _) = account_graph(SchemaConfig::new().can_create(|_, _| false));
    let mut backend = MemoryBackend::new();
    let id = g.construct("Account", json!({})).expect("account");

    let err = g.save(id, &mut backend).expect_err("denied");

    assert!(matches!(
        err,
        Error::Unauthorized {
            action: Action::Create,
            ..
        }
    ));
    assert!(backend.saved.is_empty());
}

#[test]
fn delete_detaches_links_and_drops_embedded_children() {
    let (mut g, _) = blog_graph();
    let mut backend = MemoryBackend::new();
    let ada = g
        .construct("User", json!({ "name": "Ada", "profile": { "bio": "hi" } }))
        .expect("ada");
    let post = g.construct("Post", json!({ "title": "T" })).expect("post");
    g.set_field(post, "author", ada).expect("author");
    let profile = g.get(ada, "profile").and_then(Value::as_object).expect("profile");
    saved(&mut g, &mut backend, &[ada, post]);

    g.delete(ada, &mut backend).expect("delete");

    assert!(!g.contains(ada));
    assert!(!g.contains(profile));
    assert_eq!(g.get(post, "author"), Some(&Value::Null));
    assert_eq!(backend.deleted.len(), 1);
}

#[test]
fn delete_is_denied_while_a_required_reference_points_here() {
    let (mut g, _) = blog_graph();
    let post = g.construct("Post", json!({ "title": "T" })).expect("post");
    g.construct("Comment", record([("body", "hi".into()), ("post", post.into())]))
        .expect("comment");

    let err = g
        .delete(post, &mut MemoryBackend::new())
        .expect_err("comment requires post");

    assert!(matches!(err, Error::DeleteDenied { .. }));
    assert!(g.contains(post));
}

#[test]
fn soft_delete_marks_and_restore_unmarks() {
    let (mut g, sink) = account_graph(SchemaConfig::new().soft_delete(true));
    let mut backend = MemoryBackend::new();
    let id = g.construct("Account", json!({})).expect("account");
    g.save(id, &mut backend).expect("save");

    g.delete(id, &mut backend).expect("delete");
    assert!(g.instance(id).is_some_and(|a| a.is_deleted()));
    assert!(backend.deleted.iter().all(|r| r.soft));

    g.restore(id, &mut backend).expect("restore");
    assert!(g.instance(id).is_some_and(|a| !a.is_deleted()));
    assert!(sink.events().contains(&Event::Restored { object: id }));
}

#[test]
fn reset_restores_values_and_links() {
    let (mut g, _) = blog_graph();
    let mut backend = MemoryBackend::new();
    let ada = g.construct("User", json!({ "name": "Ada" })).expect("ada");
    let bob = g.construct("User", json!({ "name": "Bob" })).expect("bob");
    let post = g.construct("Post", json!({ "title": "T" })).expect("post");
    g.set_field(post, "author", ada).expect("author");
    saved(&mut g, &mut backend, &[ada, bob, post]);

    g.set(post, record([("title", "U".into()), ("author", bob.into())])).expect("edit");
    assert_eq!(posts_of(&g, bob), vec![post]);
    assert_eq!(
        g.instance(post).and_then(|p| p.previous("title")),
        Some(&Value::from("T"))
    );

    g.reset(post).expect("reset");

    assert_eq!(g.get(post, "title"), Some(&Value::from("T")));
    assert_eq!(g.get(post, "author"), Some(&Value::Object(ada)));
    assert_eq!(posts_of(&g, ada), vec![post]);
    assert!(posts_of(&g, bob).is_empty());
    assert!(g.instance(post).is_some_and(|p| !p.is_modified()));
}

#[test]
fn reset_preconditions_are_checked() {
    let (mut g, _) = blog_graph();
    let post = g.construct("Post", json!({ "title": "T" })).expect("post");
    let comment = g.hydrate("Comment", record([("post", post.into())])).expect("comment");

    assert!(matches!(g.reset(post), Err(Error::ResetOnNew(_))));
    assert!(matches!(g.reset(comment), Err(Error::ResetDisabled(_))));
}

//
// raw writes
//

#[test]
fn hydrate_builds_nested_objects_from_stored_data() {
    let (mut g, _) = blog_graph();

    let user = g
        .hydrate("User", json!({ "name": "Ada", "profile": { "bio": "hi" } }))
        .expect("user");
    let post = g
        .hydrate("Post", json!({ "title": "T", "comments": [{ "body": "first" }] }))
        .expect("post");

    let profile = g.get(user, "profile").and_then(Value::as_object).expect("profile");
    assert_eq!(g.instance(profile).and_then(|p| p.embedded_in()), Some(user));
    assert!(g.instance(profile).is_some_and(|p| !p.is_new()));

    let comment = handles(&g, post, "comments")[0];
    assert_eq!(g.get(comment, "post"), Some(&Value::Object(post)));
    assert!(g.instance(comment).is_some_and(|c| !c.is_new() && !c.is_modified()));

    assert!(g.validate(user).is_ok());
    assert!(g.validate(post).is_ok());
}

#[test]
fn copying_an_embedded_self_cycle_terminates() {
    let node = Schema::builder("Node")
        .field("label", chain().text())
        .field("child", chain().instance_of("Node"))
        .build()
        .expect("node schema");
    let mut g = graph_of(vec![node]);
    let a = g.construct("Node", json!({ "label": "a" })).expect("a");
    let b = g.construct("Node", json!({ "label": "b" })).expect("b");
    g.update(a, record([("child", a.into())])).expect("trusted self reference");

    g.set_field(b, "child", a).expect("adopt copy");

    let copy = g.get(b, "child").and_then(Value::as_object).expect("copy");
    assert_ne!(copy, a);
    assert_eq!(g.get(copy, "label"), Some(&Value::from("a")));
    assert_eq!(g.get(copy, "child"), Some(&Value::Object(copy)));

    let out = g.to_json(b, &JsonOptions::new()).expect("json");
    assert_eq!(out["child"]["child"], json!({ "$ref": copy.index() }));
}

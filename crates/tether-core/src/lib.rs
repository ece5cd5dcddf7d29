//! Core runtime for Tether: field modifier chains, collection handlers, the
//! object graph with its link manager and dirty tracker, and the persistence
//! hook contract exported for backend collaborators.
#![warn(unreachable_pub)]

pub mod backend;
pub mod collection;
pub mod context;
pub mod error;
pub mod graph;
pub mod instance;
pub mod keypath;
pub mod link;
pub mod modifier;
pub mod obs;
pub mod schema;
pub mod track;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_support;

///
/// CONSTANTS
///

/// JSON key carrying an object's identity in emitted documents.
pub const JSON_ID_KEY: &str = "$id";

/// JSON key used for repeated object identities (cycles and shared peers).
pub const JSON_REF_KEY: &str = "$ref";

///
/// Prelude
///
/// Prelude contains only domain vocabulary and the builder entry points.
///

pub mod prelude {
    pub use crate::{
        graph::{Graph, JsonOptions},
        keypath::Keypath,
        modifier::{Chain, chain},
        schema::{Schema, SchemaConfig, SchemaRegistry, Storage},
        value::{ObjectId, Value},
    };
}

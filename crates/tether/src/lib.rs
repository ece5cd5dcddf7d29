//! ## Crate layout
//! - `core`: the engine (modifier chains, collection handlers, object graph,
//!   link manager, dirty tracker, observability and backend contract).
//! - `error`: caller-facing error with a stable kind + origin taxonomy.
//!
//! The `prelude` module carries the schema-definition vocabulary and the
//! graph surface used by application code.

pub use tether_core as core;

pub mod error;

pub use error::{Error, ErrorKind, ErrorOrigin};

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        Error, ErrorKind,
        core::{
            backend::{Backend, BackendError, DeleteRecord, SaveRecord},
            prelude::*,
        },
    };
    pub use serde_json::json;
}

//! # Fabricator - Fixture Factories
//!
//! Fabricator builds mock objects for tests from per-type factories. Each
//! field is either a literal or a deferred computation that is resolved on
//! demand, may read other fields of the same object, and runs at most once
//! per build.
//!
//! ## Features
//!
//! - **Deferred fields**: async or sync closures with access to `seq` and `get`
//! - **Undefined vs null**: a field can be explicitly left undefined
//! - **Traits**: named overlays of default fields, chainable
//! - **Transient fields**: inputs readable by other fields but never output
//! - **Sequences**: per-factory counters shared by trait variants, resettable
//! - **Connections**: Relay-style pagination over built lists
//! - **Declarative catalogs**: factories defined in TOML/YAML/JSON with
//!   template, faker and nested-factory field strategies
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fabricator::{dynamic, define_factory, FactoryOptions, FieldMap};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let book_factory = define_factory(
//!         "Book",
//!         ["id", "title"],
//!         FactoryOptions::new(
//!             FieldMap::new()
//!                 .with(
//!                     "id",
//!                     dynamic(|ctx| async move { Ok(json!(format!("Book-{}", ctx.seq()))) }),
//!                 )
//!                 .with("title", "Yuyushiki"),
//!         ),
//!     );
//!
//!     let book = book_factory.build().await?;
//!     assert_eq!(book.to_json(), json!({ "id": "Book-0", "title": "Yuyushiki" }));
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **Domain**: field specs, resolved objects, connection types and errors
//! - **Adapters**: resolution engine, factories, sequences, pagination, catalog
//! - **Config**: declarative factory definitions and their validation

pub mod adapters;
pub mod cli;
pub mod config;
pub mod domain;

pub use adapters::catalog::FactoryCatalog;
pub use adapters::factory::{define_factory, Factory, FactoryBuilder, FactoryOptions, Trait};
pub use adapters::pagination::{connection_from_list, cursor_to_offset, offset_to_cursor};
pub use adapters::sequence_registry::{reset_all_sequence, SequenceId, SequenceRegistry};
pub use config::Settings;
pub use domain::connection::{Connection, ConnectionArgs, Edge, PageInfo};
pub use domain::error::{FactoryError, FactoryResult};
pub use domain::field::{
    dynamic, dynamic_optional, dynamic_sync, Dynamic, FieldContext, FieldLookup, FieldMap,
    FieldResolver, FieldSpec, FieldValue,
};
pub use domain::resolved::ResolvedObject;

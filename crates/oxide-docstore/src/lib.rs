//! # oxide-docstore
//!
//! A narrow document-store interface for controllers.
//!
//! This crate provides:
//! - `DocumentStore` with `find`, `find_one`, `save`, `remove`, `count`
//!   and `distinct` over field-equality queries
//! - `ObjectId` document identifiers
//! - `Schema` and `Model` for schema-checked documents with typed accessors
//! - `Collection` binding a schema to a store
//! - `MemoryStore`, an in-process implementation
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use oxide_docstore::{Collection, DocumentStore, FieldKind, MemoryStore, Schema};
//!
//! let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
//! let widgets = Collection::new(
//!     "widgets",
//!     Schema::new().required("name", FieldKind::String),
//!     store,
//! );
//!
//! let mut gear = widgets.create();
//! gear.set("name", "gear").unwrap();
//! let id = widgets.save(&mut gear).unwrap();
//!
//! assert_eq!(widgets.get(id).unwrap().get_str("name"), Some("gear"));
//! ```

pub mod error;
pub mod memory;
pub mod model;
pub mod object_id;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use model::{Document, Field, FieldKind, Model, Schema, ID_FIELD};
pub use object_id::ObjectId;
pub use store::{id_query, matches_query, Collection, DocumentStore};

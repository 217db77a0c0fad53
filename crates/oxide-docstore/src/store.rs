//! The document store interface.
//!
//! Queries are field-equality documents: `{"status": "active"}` matches
//! every document whose `status` equals `"active"`, or whose `status` is
//! an array containing it. An empty query matches everything.

use std::sync::Arc;

use serde_json::Value;

use crate::error::{Result, StoreError};
use crate::model::{Document, Model, Schema, ID_FIELD};
use crate::object_id::ObjectId;

/// A collection-oriented document store.
pub trait DocumentStore: Send + Sync {
    /// Returns every matching document in insertion order.
    fn find(&self, collection: &str, query: &Document) -> Result<Vec<Document>>;

    /// Inserts or replaces a document. A document without `_id` gets a fresh
    /// one, written back into `doc`.
    fn save(&self, collection: &str, doc: &mut Document) -> Result<ObjectId>;

    /// Removes every matching document and returns how many were removed.
    fn remove(&self, collection: &str, query: &Document) -> Result<usize>;

    /// Returns the first matching document.
    fn find_one(&self, collection: &str, query: &Document) -> Result<Option<Document>> {
        Ok(self.find(collection, query)?.into_iter().next())
    }

    fn find_by_id(&self, collection: &str, id: ObjectId) -> Result<Option<Document>> {
        self.find_one(collection, &id_query(id))
    }

    fn remove_by_id(&self, collection: &str, id: ObjectId) -> Result<bool> {
        Ok(self.remove(collection, &id_query(id))? > 0)
    }

    fn count(&self, collection: &str, query: &Document) -> Result<usize> {
        Ok(self.find(collection, query)?.len())
    }

    /// Distinct values of `field` among matching documents, first-seen order.
    /// Array values contribute each element.
    fn distinct(&self, collection: &str, field: &str, query: &Document) -> Result<Vec<Value>> {
        let mut values: Vec<Value> = Vec::new();
        for doc in self.find(collection, query)? {
            let items = match doc.get(field) {
                Some(Value::Array(items)) => items.clone(),
                Some(value) => vec![value.clone()],
                None => continue,
            };
            for item in items {
                if !values.contains(&item) {
                    values.push(item);
                }
            }
        }
        Ok(values)
    }
}

/// Builds a `{"_id": id}` query.
pub fn id_query(id: ObjectId) -> Document {
    let mut query = Document::new();
    query.insert(ID_FIELD.to_string(), Value::String(id.to_hex()));
    query
}

/// Returns whether a document satisfies a field-equality query.
pub fn matches_query(doc: &Document, query: &Document) -> bool {
    query.iter().all(|(field, expected)| match doc.get(field) {
        Some(Value::Array(items)) if !expected.is_array() => items.contains(expected),
        Some(actual) => actual == expected,
        None => expected.is_null(),
    })
}

/// Typed access to one collection through a store.
#[derive(Clone)]
pub struct Collection {
    name: String,
    schema: Arc<Schema>,
    store: Arc<dyn DocumentStore>,
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

impl Collection {
    /// Binds `schema` to the `name` collection of `store`.
    pub fn new(name: impl Into<String>, schema: Schema, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            name: name.into(),
            schema: Arc::new(schema),
            store,
        }
    }

    /// Collection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// A new unsaved model for this collection.
    pub fn create(&self) -> Model {
        Model::new(Arc::clone(&self.schema))
    }

    /// Every document matching `query`, as models.
    pub fn find(&self, query: &Document) -> Result<Vec<Model>> {
        self.store
            .find(&self.name, query)?
            .into_iter()
            .map(|doc| Model::from_document(Arc::clone(&self.schema), doc))
            .collect()
    }

    /// The first document matching `query`.
    pub fn find_one(&self, query: &Document) -> Result<Option<Model>> {
        self.store
            .find_one(&self.name, query)?
            .map(|doc| Model::from_document(Arc::clone(&self.schema), doc))
            .transpose()
    }

    /// Loads a model by id, failing with `NotFound`.
    pub fn get(&self, id: ObjectId) -> Result<Model> {
        let doc = self
            .store
            .find_by_id(&self.name, id)?
            .ok_or(StoreError::NotFound)?;
        Model::from_document(Arc::clone(&self.schema), doc)
    }

    /// Validates and saves a model, assigning `_id` on first save.
    pub fn save(&self, model: &mut Model) -> Result<ObjectId> {
        self.schema.validate(model.document())?;
        let id = self.store.save(&self.name, model.document_mut())?;
        tracing::debug!(collection = %self.name, id = %id, "saved document");
        Ok(id)
    }

    /// Removes a saved model.
    pub fn remove(&self, model: &Model) -> Result<bool> {
        match model.id() {
            Some(id) => self.store.remove_by_id(&self.name, id),
            None => Ok(false),
        }
    }

    /// Number of documents matching `query`.
    pub fn count(&self, query: &Document) -> Result<usize> {
        self.store.count(&self.name, query)
    }

    /// Distinct values of `field` across matching documents.
    pub fn distinct(&self, field: &str, query: &Document) -> Result<Vec<Value>> {
        self.store.distinct(&self.name, field, query)
    }
}

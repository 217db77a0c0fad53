//! In-process store for tests and demos.

use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value;

use crate::error::{Result, StoreError};
use crate::model::{Document, ID_FIELD};
use crate::object_id::ObjectId;
use crate::store::{matches_query, DocumentStore};

/// A [`DocumentStore`] holding collections in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of collections that hold at least one document.
    pub fn collection_names(&self) -> Vec<String> {
        let Ok(collections) = self.collections.read() else {
            return Vec::new();
        };
        let mut names: Vec<String> = collections
            .iter()
            .filter(|(_, docs)| !docs.is_empty())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }
}

fn poisoned() -> StoreError {
    StoreError::InvalidQuery("store lock poisoned".to_string())
}

impl DocumentStore for MemoryStore {
    fn find(&self, collection: &str, query: &Document) -> Result<Vec<Document>> {
        let collections = self.collections.read().map_err(|_| poisoned())?;
        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| matches_query(doc, query))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn save(&self, collection: &str, doc: &mut Document) -> Result<ObjectId> {
        let id = match doc.get(ID_FIELD) {
            Some(Value::String(s)) => ObjectId::parse(s)?,
            Some(other) => return Err(StoreError::InvalidObjectId(other.to_string())),
            None => {
                let id = ObjectId::new();
                doc.insert(ID_FIELD.to_string(), Value::String(id.to_hex()));
                id
            }
        };

        let mut collections = self.collections.write().map_err(|_| poisoned())?;
        let docs = collections.entry(collection.to_string()).or_default();
        let hex = id.to_hex();
        match docs
            .iter_mut()
            .find(|d| d.get(ID_FIELD).and_then(Value::as_str) == Some(hex.as_str()))
        {
            Some(existing) => *existing = doc.clone(),
            None => docs.push(doc.clone()),
        }
        Ok(id)
    }

    fn remove(&self, collection: &str, query: &Document) -> Result<usize> {
        let mut collections = self.collections.write().map_err(|_| poisoned())?;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|doc| !matches_query(doc, query));
        Ok(before - docs.len())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::model::{FieldKind, Schema};
    use crate::store::Collection;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_save_assigns_id_and_replaces() {
        let store = MemoryStore::new();
        let mut widget = doc(json!({"name": "gear"}));
        let id = store.save("widgets", &mut widget).unwrap();
        assert_eq!(widget.get("_id"), Some(&json!(id.to_hex())));

        widget.insert("name".into(), json!("cog"));
        assert_eq!(store.save("widgets", &mut widget).unwrap(), id);
        assert_eq!(store.count("widgets", &Document::new()).unwrap(), 1);
        assert_eq!(
            store.find_by_id("widgets", id).unwrap().unwrap().get("name"),
            Some(&json!("cog"))
        );
    }

    #[test]
    fn test_find_and_remove_by_query() {
        let store = MemoryStore::new();
        for (name, color) in [("a", "red"), ("b", "blue"), ("c", "red")] {
            store
                .save("widgets", &mut doc(json!({"name": name, "color": color})))
                .unwrap();
        }

        let red = store.find("widgets", &doc(json!({"color": "red"}))).unwrap();
        let names: Vec<_> = red.iter().map(|d| d["name"].clone()).collect();
        assert_eq!(names, vec![json!("a"), json!("c")]);

        let first = store.find_one("widgets", &doc(json!({"color": "blue"}))).unwrap();
        assert_eq!(first.unwrap()["name"], json!("b"));

        assert_eq!(store.remove("widgets", &doc(json!({"color": "red"}))).unwrap(), 2);
        assert_eq!(store.count("widgets", &Document::new()).unwrap(), 1);
        assert_eq!(store.remove("missing", &Document::new()).unwrap(), 0);
    }

    #[test]
    fn test_array_fields_match_and_distinct() {
        let store = MemoryStore::new();
        store
            .save("posts", &mut doc(json!({"tags": ["rust", "web"]})))
            .unwrap();
        store
            .save("posts", &mut doc(json!({"tags": ["rust", "db"]})))
            .unwrap();

        assert_eq!(store.count("posts", &doc(json!({"tags": "web"}))).unwrap(), 1);
        assert_eq!(
            store.distinct("posts", "tags", &Document::new()).unwrap(),
            vec![json!("rust"), json!("web"), json!("db")]
        );
    }

    #[test]
    fn test_collection_round_trip() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let users = Collection::new(
            "users",
            Schema::new().required("email", FieldKind::String),
            Arc::clone(&store),
        );

        let mut user = users.create();
        assert!(users.save(&mut user).is_err());

        user.set("email", "jo@example.com").unwrap();
        let id = users.save(&mut user).unwrap();
        assert_eq!(users.get(id).unwrap().get_str("email"), Some("jo@example.com"));
        assert!(users.remove(&user).unwrap());
        assert_eq!(users.get(id).unwrap_err(), StoreError::NotFound);
    }
}

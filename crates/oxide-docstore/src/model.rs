//! Schema-checked documents.
//!
//! A [`Model`] wraps a [`Document`] together with its [`Schema`]. Field
//! access goes through a fixed set of typed accessors; in strict mode
//! writes to undeclared fields are rejected and required fields cannot be
//! removed.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::{Result, StoreError};
use crate::object_id::ObjectId;

/// A raw stored document.
pub type Document = Map<String, Value>;

/// Name of the identifier field every document carries once saved.
pub const ID_FIELD: &str = "_id";

/// The declared kind of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Int,
    Float,
    Bool,
    Id,
    Array,
    Object,
    /// Any JSON value.
    Any,
}

impl FieldKind {
    fn name(self) -> &'static str {
        match self {
            Self::String => "a string",
            Self::Int => "an integer",
            Self::Float => "a number",
            Self::Bool => "a boolean",
            Self::Id => "an object id",
            Self::Array => "an array",
            Self::Object => "an object",
            Self::Any => "a value",
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Int => value.is_i64() || value.is_u64(),
            Self::Float => value.is_number(),
            Self::Bool => value.is_boolean(),
            Self::Id => value.as_str().is_some_and(ObjectId::is_valid),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
            Self::Any => true,
        }
    }
}

/// A field declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
}

/// Field declarations for one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<Field>,
    strict: bool,
}

impl Schema {
    /// Creates a strict schema. `_id` is always declared and required.
    pub fn new() -> Self {
        Self {
            fields: vec![Field {
                name: ID_FIELD.to_string(),
                kind: FieldKind::Id,
                required: true,
            }],
            strict: true,
        }
    }

    /// Declares an optional field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.push(name.into(), kind, false);
        self
    }

    /// Declares a required field.
    #[must_use]
    pub fn required(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.push(name.into(), kind, true);
        self
    }

    /// Switches strict mode.
    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    fn push(&mut self, name: String, kind: FieldKind, required: bool) {
        self.fields.retain(|f| f.name != name);
        self.fields.push(Field {
            name,
            kind,
            required,
        });
    }

    /// Looks up a field declaration.
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// All declarations in order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Whether undeclared fields are rejected.
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Checks one field write.
    pub fn check(&self, name: &str, value: &Value) -> Result<()> {
        match self.get(name) {
            Some(field) if value.is_null() && field.required => {
                Err(StoreError::RequiredField(name.to_string()))
            }
            Some(field) if !value.is_null() && !field.kind.accepts(value) => {
                Err(StoreError::WrongKind {
                    field: name.to_string(),
                    expected: field.kind.name(),
                })
            }
            Some(_) => Ok(()),
            None if self.strict => Err(StoreError::UnknownField(name.to_string())),
            None => Ok(()),
        }
    }

    /// Checks a whole document, except `_id`, which is assigned on save.
    pub fn validate(&self, doc: &Document) -> Result<()> {
        for (name, value) in doc {
            self.check(name, value)?;
        }
        for field in &self.fields {
            if field.required && field.name != ID_FIELD && !doc.contains_key(&field.name) {
                return Err(StoreError::RequiredField(field.name.clone()));
            }
        }
        Ok(())
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::new()
    }
}

/// A document bound to a schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    schema: Arc<Schema>,
    doc: Document,
}

impl Model {
    /// Creates an empty model.
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            doc: Document::new(),
        }
    }

    /// Wraps an existing document, validating it.
    pub fn from_document(schema: Arc<Schema>, doc: Document) -> Result<Self> {
        schema.validate(&doc)?;
        Ok(Self { schema, doc })
    }

    /// The schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The identifier, if the model has been saved.
    pub fn id(&self) -> Option<ObjectId> {
        self.get_id(ID_FIELD)
    }

    /// Sets a field after checking it against the schema.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        self.schema.check(name, &value)?;
        self.doc.insert(name.to_string(), value);
        Ok(())
    }

    /// Whether a field is set.
    pub fn has(&self, name: &str) -> bool {
        self.doc.contains_key(name)
    }

    /// Removes a field. Required fields and `_id` cannot be removed.
    pub fn remove(&mut self, name: &str) -> Result<Option<Value>> {
        if name == ID_FIELD || self.schema.get(name).is_some_and(|f| f.required) {
            return Err(StoreError::RequiredField(name.to_string()));
        }
        Ok(self.doc.remove(name))
    }

    /// Raw field access.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.doc.get(name)
    }

    /// A string field.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// An integer field.
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    /// A numeric field, integers included.
    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_f64)
    }

    /// A boolean field.
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    /// A field holding a hex document id.
    pub fn get_id(&self, name: &str) -> Option<ObjectId> {
        self.get_str(name).and_then(|s| ObjectId::parse(s).ok())
    }

    /// An array field.
    pub fn get_array(&self, name: &str) -> Option<&Vec<Value>> {
        self.get(name).and_then(Value::as_array)
    }

    /// The underlying document.
    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Mutable access for stores that assign `_id`.
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    /// Consumes the model.
    pub fn into_document(self) -> Document {
        self.doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user_schema() -> Arc<Schema> {
        Arc::new(
            Schema::new()
                .required("email", FieldKind::String)
                .field("age", FieldKind::Int)
                .field("tags", FieldKind::Array),
        )
    }

    #[test]
    fn test_strict_rejects_unknown_fields() {
        let mut user = Model::new(user_schema());
        assert_eq!(
            user.set("nickname", "jd"),
            Err(StoreError::UnknownField("nickname".into()))
        );

        let mut loose = Model::new(Arc::new(Schema::new().strict(false)));
        assert!(loose.set("nickname", "jd").is_ok());
        assert_eq!(loose.get_str("nickname"), Some("jd"));
    }

    #[test]
    fn test_kind_checks() {
        let mut user = Model::new(user_schema());
        assert!(user.set("age", 31).is_ok());
        assert!(matches!(
            user.set("age", "31"),
            Err(StoreError::WrongKind { .. })
        ));
        assert!(user.set("_id", "abc").is_err());
        assert!(user.set("_id", "507f1f77bcf86cd799439011").is_ok());
        assert_eq!(user.id().map(|id| id.to_hex()).as_deref(), Some("507f1f77bcf86cd799439011"));
    }

    #[test]
    fn test_required_fields_cannot_be_removed() {
        let mut user = Model::new(user_schema());
        user.set("email", "a@b.co").unwrap();
        user.set("age", 3).unwrap();
        assert!(user.remove("email").is_err());
        assert!(user.remove(ID_FIELD).is_err());
        assert_eq!(user.remove("age").unwrap(), Some(json!(3)));
        assert!(!user.has("age"));
    }

    #[test]
    fn test_from_document_validates_required() {
        let mut doc = Document::new();
        doc.insert("age".into(), json!(4));
        assert_eq!(
            Model::from_document(user_schema(), doc.clone()).unwrap_err(),
            StoreError::RequiredField("email".into())
        );
        doc.insert("email".into(), json!("x@y.io"));
        assert!(Model::from_document(user_schema(), doc).is_ok());
    }
}

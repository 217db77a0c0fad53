//! Typed parameter declarations and binding.
//!
//! Controllers declare what they expect as a list of
//! [`ParamDescriptor`]s. Binding walks the list against the merged
//! request parameters and produces [`BoundParams`], or fails on the first
//! missing or malformed value.
//!
//! Coercion is strict. For scalar kinds an empty string counts as absent,
//! so `id=` fails a required `int("id")` with "Param is required: id"
//! rather than binding zero.
//!
//! ```
//! use oxide_mvc::{ParamDescriptor, ParamSpec, RequestContext};
//!
//! let spec = ParamSpec::declared([
//!     ParamDescriptor::int("page").default(1),
//!     ParamDescriptor::string("q"),
//! ]);
//! let ctx = RequestContext::new("GET", "/search").with_param("q", "rust");
//!
//! let params = spec.bind(&ctx).unwrap();
//! assert_eq!(params.int("page"), Some(1));
//! assert_eq!(params.str("q"), Some("rust"));
//! ```

use std::collections::HashMap;
use std::sync::OnceLock;

use oxide_docstore::ObjectId;
use regex::Regex;

use crate::context::{ParamValue, RequestContext};
use crate::error::ParamError;
use crate::request::UploadedFile;

/// The kind a parameter is coerced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Int,
    Float,
    Bool,
    String,
    Email,
    Array,
    Json,
    File,
    ObjectId,
}

impl ParamKind {
    fn expected(self) -> &'static str {
        match self {
            Self::Int => "integer",
            Self::Float => "float",
            Self::Bool => "boolean",
            Self::String => "string",
            Self::Email => "email",
            Self::Array => "array",
            Self::Json => "json",
            Self::File => "file",
            Self::ObjectId => "object id",
        }
    }
}

/// A bound, coerced value.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    List(Vec<String>),
    Json(serde_json::Value),
    File(UploadedFile),
    Id(ObjectId),
}

impl From<i64> for BoundValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for BoundValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for BoundValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for BoundValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for BoundValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for BoundValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<Vec<String>> for BoundValue {
    fn from(v: Vec<String>) -> Self {
        Self::List(v)
    }
}

impl From<serde_json::Value> for BoundValue {
    fn from(v: serde_json::Value) -> Self {
        Self::Json(v)
    }
}

impl From<ObjectId> for BoundValue {
    fn from(v: ObjectId) -> Self {
        Self::Id(v)
    }
}

impl BoundValue {
    /// The value as `kind`, if it already is one. Integers widen to floats.
    fn conform(&self, kind: ParamKind) -> Option<Self> {
        match (kind, self) {
            (ParamKind::Int, Self::Int(_))
            | (ParamKind::Float, Self::Float(_))
            | (ParamKind::Bool, Self::Bool(_))
            | (ParamKind::String | ParamKind::Email, Self::Str(_))
            | (ParamKind::Array, Self::List(_))
            | (ParamKind::Json, Self::Json(_))
            | (ParamKind::File, Self::File(_))
            | (ParamKind::ObjectId, Self::Id(_)) => Some(self.clone()),
            (ParamKind::Float, Self::Int(v)) => Some(Self::Float(*v as f64)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Presence {
    Required,
    Optional,
    Default(BoundValue),
}

/// One declared parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDescriptor {
    key: String,
    kind: ParamKind,
    presence: Presence,
}

macro_rules! descriptor_ctor {
    ($($(#[$doc:meta])* $fn_name:ident => $kind:ident),* $(,)?) => {
        $(
            $(#[$doc])*
            pub fn $fn_name(key: impl Into<String>) -> Self {
                Self::new(key, ParamKind::$kind)
            }
        )*
    };
}

impl ParamDescriptor {
    /// A required parameter of the given kind.
    pub fn new(key: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            key: key.into(),
            kind,
            presence: Presence::Required,
        }
    }

    descriptor_ctor! {
        int => Int,
        float => Float,
        /// Accepts `true/false`, `1/0`, `on/off`, `yes/no`.
        bool => Bool,
        string => String,
        email => Email,
        /// A list, from `key[]=` fields or a JSON array body.
        array => Array,
        /// A JSON document carried as a string.
        json => Json,
        file => File,
        /// A 24-character hex document id.
        object_id => ObjectId,
    }

    /// Makes the parameter optional: absence binds nothing.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.presence = Presence::Optional;
        self
    }

    /// Binds `value` when the parameter is absent. A default of another
    /// kind fails binding with [`ParamError::WrongType`].
    #[must_use]
    pub fn default(mut self, value: impl Into<BoundValue>) -> Self {
        self.presence = Presence::Default(value.into());
        self
    }

    /// The request key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The kind values are coerced to.
    pub fn kind(&self) -> ParamKind {
        self.kind
    }

    /// Whether absence fails binding.
    pub fn is_required(&self) -> bool {
        self.presence == Presence::Required
    }

    fn wrong_type(&self) -> ParamError {
        ParamError::WrongType {
            key: self.key.clone(),
            expected: self.kind.expected(),
        }
    }

    /// Coerces a raw value, or reports absence with `Ok(None)`.
    fn coerce(&self, raw: Option<&ParamValue>) -> Result<Option<BoundValue>, ParamError> {
        let Some(raw) = raw else {
            return Ok(None);
        };

        if self.kind == ParamKind::File {
            return match raw {
                ParamValue::File(file) => Ok(Some(BoundValue::File(file.clone()))),
                _ => Err(self.wrong_type()),
            };
        }

        if self.kind == ParamKind::Array {
            return match raw {
                ParamValue::List(items) => Ok(Some(BoundValue::List(items.clone()))),
                ParamValue::Text(s) if s.is_empty() => Ok(None),
                ParamValue::Text(s) => match serde_json::from_str::<serde_json::Value>(s) {
                    Ok(serde_json::Value::Array(items)) => Ok(Some(BoundValue::List(
                        items
                            .into_iter()
                            .map(|item| match item {
                                serde_json::Value::String(s) => s,
                                other => other.to_string(),
                            })
                            .collect(),
                    ))),
                    _ => Err(self.wrong_type()),
                },
                ParamValue::File(_) => Err(self.wrong_type()),
            };
        }

        let text = match raw {
            ParamValue::Text(s) => s.as_str(),
            _ => return Err(self.wrong_type()),
        };
        if text.is_empty() {
            return Ok(None);
        }

        let value = match self.kind {
            ParamKind::Int => text.parse::<i64>().ok().map(BoundValue::Int),
            ParamKind::Float => text
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(BoundValue::Float),
            ParamKind::Bool => parse_bool(text).map(BoundValue::Bool),
            ParamKind::String => Some(BoundValue::Str(text.to_string())),
            ParamKind::Email => {
                let trimmed = text.trim();
                email_regex()
                    .is_match(trimmed)
                    .then(|| BoundValue::Str(trimmed.to_string()))
            }
            ParamKind::Json => serde_json::from_str(text).ok().map(BoundValue::Json),
            ParamKind::ObjectId => ObjectId::parse(text).ok().map(BoundValue::Id),
            ParamKind::Array | ParamKind::File => None,
        };
        value.map(Some).ok_or_else(|| self.wrong_type())
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Some(true),
        "false" | "0" | "off" | "no" => Some(false),
        _ => None,
    }
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("email pattern is valid")
    })
}

/// What a controller expects from the request.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamSpec {
    /// A list of typed descriptors.
    Declared(Vec<ParamDescriptor>),
    /// Every request parameter, unvalidated.
    Passthrough,
}

impl Default for ParamSpec {
    fn default() -> Self {
        Self::Declared(Vec::new())
    }
}

impl ParamSpec {
    /// A spec from typed descriptors.
    pub fn declared(descriptors: impl IntoIterator<Item = ParamDescriptor>) -> Self {
        Self::Declared(descriptors.into_iter().collect())
    }

    /// Binds request parameters.
    pub fn bind(&self, ctx: &RequestContext) -> Result<BoundParams, ParamError> {
        let mut values = HashMap::new();
        match self {
            Self::Passthrough => {
                for (key, value) in ctx.params() {
                    let bound = match value {
                        ParamValue::Text(s) => BoundValue::Str(s.clone()),
                        ParamValue::List(items) => BoundValue::List(items.clone()),
                        ParamValue::File(file) => BoundValue::File(file.clone()),
                    };
                    values.insert(key.clone(), bound);
                }
            }
            Self::Declared(descriptors) => {
                for descriptor in descriptors {
                    let bound = descriptor.coerce(ctx.get(descriptor.key()))?;
                    let value = match (bound, &descriptor.presence) {
                        (Some(v), _) => v,
                        (None, Presence::Default(v)) => v
                            .conform(descriptor.kind)
                            .ok_or_else(|| descriptor.wrong_type())?,
                        (None, Presence::Optional) => continue,
                        (None, Presence::Required) => {
                            return Err(ParamError::Missing(descriptor.key.clone()));
                        }
                    };
                    values.insert(descriptor.key.clone(), value);
                }
            }
        }
        Ok(BoundParams { values })
    }
}

/// Parameters after binding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundParams {
    values: HashMap<String, BoundValue>,
}

impl BoundParams {
    /// No bound parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// The bound value for `key`.
    pub fn get(&self, key: &str) -> Option<&BoundValue> {
        self.values.get(key)
    }

    /// Whether `key` was bound.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// An integer parameter.
    pub fn int(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            BoundValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// A float parameter; integers widen.
    pub fn float(&self, key: &str) -> Option<f64> {
        match self.get(key)? {
            BoundValue::Float(v) => Some(*v),
            BoundValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// A boolean parameter.
    pub fn bool(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            BoundValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// A string or e-mail parameter.
    pub fn str(&self, key: &str) -> Option<&str> {
        match self.get(key)? {
            BoundValue::Str(v) => Some(v),
            _ => None,
        }
    }

    /// A list parameter.
    pub fn list(&self, key: &str) -> Option<&[String]> {
        match self.get(key)? {
            BoundValue::List(v) => Some(v),
            _ => None,
        }
    }

    /// A JSON parameter.
    pub fn json(&self, key: &str) -> Option<&serde_json::Value> {
        match self.get(key)? {
            BoundValue::Json(v) => Some(v),
            _ => None,
        }
    }

    /// An uploaded file parameter.
    pub fn file(&self, key: &str) -> Option<&UploadedFile> {
        match self.get(key)? {
            BoundValue::File(v) => Some(v),
            _ => None,
        }
    }

    /// A document id parameter.
    pub fn object_id(&self, key: &str) -> Option<ObjectId> {
        match self.get(key)? {
            BoundValue::Id(v) => Some(*v),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

//! Per-request context.
//!
//! A [`RequestContext`] is built once per request and passed by reference
//! through the dispatcher and the controller lifecycle. Request data from
//! the query string, the body and uploaded files is merged into a single
//! parameter mapping; the first source to supply a key keeps it. Matched
//! path parameters are merged explicitly and do overwrite.

use std::collections::HashMap;

use crate::path::{PathParams, PathValue};
use crate::request::{Headers, Request, UploadedFile};

/// Header that marks an asynchronous (XHR) request.
pub const XHR_HEADER: &str = "X-Requested-With";

/// One value in the merged request parameter mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    /// A scalar string.
    Text(String),
    /// A list, from `key[]=` form fields, JSON arrays or greedy path params.
    List(Vec<String>),
    /// An uploaded file.
    File(UploadedFile),
}

impl ParamValue {
    /// Returns the value if it is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

impl From<PathValue> for ParamValue {
    fn from(value: PathValue) -> Self {
        match value {
            PathValue::Single(s) => Self::Text(s),
            PathValue::Multi(parts) => Self::List(parts),
        }
    }
}

/// The inbound request as seen by routing and controllers.
#[derive(Debug, Clone)]
pub struct RequestContext {
    method: String,
    path: String,
    headers: Headers,
    params: HashMap<String, ParamValue>,
}

impl RequestContext {
    /// Creates a context with no parameters.
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            headers: Headers::new(),
            params: HashMap::new(),
        }
    }

    /// Builds a context from a host request.
    ///
    /// A `?query` suffix on the path is split off and parsed. Bodies are
    /// read as form data (`application/x-www-form-urlencoded`) or as a JSON
    /// object (`application/json`); other bodies are ignored.
    pub fn from_request(request: Request) -> Self {
        let Request {
            method,
            path,
            query,
            headers,
            body,
            files,
        } = request;

        let (path, inline_query) = match path.split_once('?') {
            Some((p, q)) => (p.to_string(), Some(q.to_string())),
            None => (path, None),
        };

        let mut ctx = Self {
            method,
            path,
            headers,
            params: HashMap::new(),
        };

        ctx.insert_form_pairs(query);
        if let Some(q) = inline_query {
            ctx.insert_form_pairs(Request::parse_query_string(&q));
        }

        let content_type = ctx
            .headers
            .get("Content-Type")
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if content_type.starts_with("application/x-www-form-urlencoded") {
            let body = String::from_utf8_lossy(&body);
            ctx.insert_form_pairs(Request::parse_query_string(&body));
        } else if content_type.starts_with("application/json") {
            if let Ok(serde_json::Value::Object(fields)) =
                serde_json::from_slice::<serde_json::Value>(&body)
            {
                for (key, value) in fields {
                    ctx.insert(key, json_to_param(value));
                }
            }
        }

        for file in files {
            let field = file.field.clone();
            ctx.insert(field, ParamValue::File(file));
        }

        ctx
    }

    /// Sets a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Adds a parameter if the key is not already present.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Adds an uploaded file under its field name.
    #[must_use]
    pub fn with_file(mut self, file: UploadedFile) -> Self {
        let field = file.field.clone();
        self.insert(field, ParamValue::File(file));
        self
    }

    /// Marks the request as XHR.
    #[must_use]
    pub fn xhr(self) -> Self {
        self.with_header(XHR_HEADER, "XMLHttpRequest")
    }

    /// Inserts a parameter unless the key already exists. Returns whether
    /// the value was stored.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> bool {
        let key = key.into();
        if self.params.contains_key(&key) {
            return false;
        }
        self.params.insert(key, value.into());
        true
    }

    /// Inserts a parameter, overwriting any existing value.
    pub fn merge(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.params.insert(key.into(), value.into());
    }

    /// Merges captured path parameters, overwriting.
    pub fn merge_path_params(&mut self, params: PathParams) {
        for (key, value) in params {
            self.merge(key, value);
        }
    }

    /// Replaces the path, e.g. after stripping a mount prefix.
    pub fn set_path(&mut self, path: impl Into<String>) {
        self.path = path.into();
    }

    /// HTTP method, verbatim.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Request path without query string.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Request headers.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Gets a header value.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Gets a parameter.
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.params.get(key)
    }

    /// All merged parameters.
    pub fn params(&self) -> &HashMap<String, ParamValue> {
        &self.params
    }

    /// Returns whether the client asked for an asynchronous response.
    pub fn is_xhr(&self) -> bool {
        self.header(XHR_HEADER)
            .is_some_and(|v| v.eq_ignore_ascii_case("XMLHttpRequest"))
    }

    fn insert_form_pairs(&mut self, pairs: Vec<(String, String)>) {
        let mut lists: Vec<(String, Vec<String>)> = Vec::new();
        for (key, value) in pairs {
            match key.strip_suffix("[]") {
                Some(list_key) => match lists.iter_mut().find(|(k, _)| k == list_key) {
                    Some((_, values)) => values.push(value),
                    None => lists.push((list_key.to_string(), vec![value])),
                },
                None => {
                    self.insert(key, ParamValue::Text(value));
                }
            }
        }
        for (key, values) in lists {
            self.insert(key, ParamValue::List(values));
        }
    }
}

fn json_to_param(value: serde_json::Value) -> ParamValue {
    match value {
        serde_json::Value::String(s) => ParamValue::Text(s),
        serde_json::Value::Array(items) => ParamValue::List(
            items
                .into_iter()
                .map(|item| match item {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect(),
        ),
        other => ParamValue::Text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_does_not_overwrite() {
        let mut ctx = RequestContext::new("GET", "/");
        assert!(ctx.insert("id", "1"));
        assert!(!ctx.insert("id", "2"));
        assert_eq!(ctx.get("id"), Some(&ParamValue::Text("1".into())));

        ctx.merge("id", "3");
        assert_eq!(ctx.get("id").and_then(ParamValue::as_text), Some("3"));
    }

    #[test]
    fn test_from_request_merges_sources_in_order() {
        let request = Request::post("/users?id=from-path-query&page=2")
            .query_param("id", "from-query")
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body("id=from-body&name=Jane+Doe&tags[]=a&tags[]=b")
            .file(UploadedFile::new("avatar", "me.png", "image/png", vec![1, 2, 3]));

        let ctx = RequestContext::from_request(request);
        assert_eq!(ctx.path(), "/users");
        assert_eq!(ctx.get("id").and_then(ParamValue::as_text), Some("from-query"));
        assert_eq!(ctx.get("page").and_then(ParamValue::as_text), Some("2"));
        assert_eq!(ctx.get("name").and_then(ParamValue::as_text), Some("Jane Doe"));
        assert_eq!(
            ctx.get("tags"),
            Some(&ParamValue::List(vec!["a".into(), "b".into()]))
        );
        assert!(matches!(ctx.get("avatar"), Some(ParamValue::File(f)) if f.size() == 3));
    }

    #[test]
    fn test_from_request_reads_json_object() {
        let request = Request::post("/widgets")
            .header("Content-Type", "application/json")
            .body(r#"{"name":"gear","count":3,"tags":["x","y"],"meta":{"a":1}}"#);

        let ctx = RequestContext::from_request(request);
        assert_eq!(ctx.get("name").and_then(ParamValue::as_text), Some("gear"));
        assert_eq!(ctx.get("count").and_then(ParamValue::as_text), Some("3"));
        assert_eq!(
            ctx.get("tags"),
            Some(&ParamValue::List(vec!["x".into(), "y".into()]))
        );
        assert_eq!(ctx.get("meta").and_then(ParamValue::as_text), Some(r#"{"a":1}"#));
    }

    #[test]
    fn test_path_params_overwrite() {
        let mut ctx = RequestContext::new("GET", "/users/5").with_param("id", "query");
        let mut params = PathParams::new();
        params.insert("id", PathValue::Single("5".into()));
        ctx.merge_path_params(params);
        assert_eq!(ctx.get("id").and_then(ParamValue::as_text), Some("5"));
    }

    #[test]
    fn test_is_xhr() {
        assert!(!RequestContext::new("GET", "/").is_xhr());
        assert!(RequestContext::new("GET", "/").xhr().is_xhr());
        assert!(RequestContext::new("GET", "/")
            .with_header("x-requested-with", "xmlhttprequest")
            .is_xhr());
        assert!(!RequestContext::new("GET", "/")
            .with_header("X-Requested-With", "fetch")
            .is_xhr());
    }
}

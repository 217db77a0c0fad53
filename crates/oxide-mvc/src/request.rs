//! HTTP request values handed over by the host.

use percent_encoding::percent_decode_str;

/// Request verbs the framework knows about.
///
/// The dispatcher keeps the raw method string; unknown verbs never parse
/// and fall through to not-found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

/// `(variant, wire name, name used in controller names)`.
static METHODS: [(Method, &str, &str); 7] = [
    (Method::Get, "GET", "Get"),
    (Method::Post, "POST", "Post"),
    (Method::Put, "PUT", "Put"),
    (Method::Patch, "PATCH", "Patch"),
    (Method::Delete, "DELETE", "Delete"),
    (Method::Head, "HEAD", "Head"),
    (Method::Options, "OPTIONS", "Options"),
];

impl Method {
    /// Case-insensitive parse.
    pub fn parse(s: &str) -> Option<Self> {
        METHODS
            .iter()
            .find(|(_, wire, _)| wire.eq_ignore_ascii_case(s))
            .map(|(method, _, _)| *method)
    }

    fn entry(self) -> &'static (Self, &'static str, &'static str) {
        &METHODS[self as usize]
    }

    /// The upper-case verb.
    pub fn as_str(self) -> &'static str {
        self.entry().1
    }

    /// `Post`, `Delete`: the form used to build controller names.
    pub fn title_case(self) -> &'static str {
        self.entry().2
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ordered header list with case-insensitive lookup.
///
/// Insertion order is kept so that echoed header names come out in the
/// order the client sent them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Creates an empty header list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a header, replacing any existing value with the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(&name))
        {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Gets a header value.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns whether a header is present.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Header names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Iterates over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of headers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether there are no headers.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (k, v) in iter {
            headers.insert(k, v);
        }
        headers
    }
}

/// A file uploaded with the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Form field the file was sent under.
    pub field: String,
    /// Client-supplied file name.
    pub filename: String,
    /// Declared content type.
    pub content_type: String,
    /// File contents.
    pub data: Vec<u8>,
}

impl UploadedFile {
    /// Creates a new uploaded file.
    pub fn new(
        field: impl Into<String>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            field: field.into(),
            filename: filename.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    /// File size in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// A request as the host hands it over.
///
/// `method` stays a string so verbs outside [`Method`] still reach the
/// not-found fallback instead of failing at the boundary.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    /// Raw path. May carry a `?query` suffix.
    pub path: String,
    /// Query pairs the host already split off, in order.
    pub query: Vec<(String, String)>,
    pub headers: Headers,
    pub body: Vec<u8>,
    pub files: Vec<UploadedFile>,
}

impl Request {
    /// A request with no headers, query or body.
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            query: Vec::new(),
            headers: Headers::new(),
            body: Vec::new(),
            files: Vec::new(),
        }
    }

    /// A `GET` request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get.as_str(), path)
    }

    /// A `POST` request.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post.as_str(), path)
    }

    /// An `OPTIONS` request.
    pub fn options(path: impl Into<String>) -> Self {
        Self::new(Method::Options.as_str(), path)
    }

    /// Adds a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Sets the raw body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Adds a query parameter.
    #[must_use]
    pub fn query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Attaches an uploaded file.
    #[must_use]
    pub fn file(mut self, file: UploadedFile) -> Self {
        self.files.push(file);
        self
    }

    /// A header value, matched case-insensitively.
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// First value sent for `key`.
    pub fn get_query(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find_map(|(k, v)| (k == key).then_some(v.as_str()))
    }

    /// The body as UTF-8, if it is.
    pub fn body_string(&self) -> Option<String> {
        std::str::from_utf8(&self.body).ok().map(str::to_string)
    }

    /// Deserializes the body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }

    /// Splits `a=1&b=two+words` into decoded pairs, keeping order and
    /// repeats. Empty segments are skipped; a key without `=` gets `""`.
    pub fn parse_query_string(query: &str) -> Vec<(String, String)> {
        query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                (decode_form_component(key), decode_form_component(value))
            })
            .collect()
    }
}

/// Decodes a form component: `+` becomes a space, then percent-decoding.
pub fn decode_form_component(s: &str) -> String {
    let spaced = s.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

/// Percent-decodes a path component. `+` is kept literally.
pub fn decode_path_component(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}

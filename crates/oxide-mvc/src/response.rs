//! Response values handed back to the host.

use crate::request::Headers;

/// Content type emitted for JSON envelopes.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Content type emitted for documents.
pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Status, headers and body produced by one dispatch.
///
/// The host owns the transport; it writes [`Response::status_line`] (or an
/// equivalent), the headers in order, then the body.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl Default for Response {
    fn default() -> Self {
        Self::ok()
    }
}

impl Response {
    /// An empty response with `status`.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Vec::new(),
        }
    }

    /// An empty `200`.
    pub fn ok() -> Self {
        Self::new(200)
    }

    /// A rendered document.
    pub fn html(body: impl Into<String>) -> Self {
        let body: String = body.into();
        Self::ok()
            .header("Content-Type", HTML_CONTENT_TYPE)
            .body(body)
    }

    /// A JSON body, readable cross-origin. Falls back to a bare `500` when
    /// `data` cannot be serialized.
    pub fn json<T: serde::Serialize>(data: &T) -> Self {
        serde_json::to_vec(data).map_or_else(
            |_| Self::internal_server_error(),
            |body| {
                Self::ok()
                    .header("Access-Control-Allow-Origin", "*")
                    .header("Content-Type", JSON_CONTENT_TYPE)
                    .body(body)
            },
        )
    }

    /// A `302` to `location`.
    pub fn redirect(location: impl Into<String>) -> Self {
        Self::new(302).header("Location", location)
    }

    /// A bare `500`.
    pub fn internal_server_error() -> Self {
        Self::new(500)
    }

    /// Sets a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Adds every header of `headers`, replacing same-named ones.
    #[must_use]
    pub fn with_headers(mut self, headers: &Headers) -> Self {
        for (name, value) in headers.iter() {
            self.headers.insert(name, value);
        }
        self
    }

    /// Overrides the status.
    #[must_use]
    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// The body as UTF-8, if it is.
    pub fn body_string(&self) -> Option<String> {
        std::str::from_utf8(&self.body).ok().map(str::to_string)
    }

    /// The body parsed as JSON.
    pub fn json_body(&self) -> Option<serde_json::Value> {
        serde_json::from_slice(&self.body).ok()
    }

    /// `HTTP/1.0 404 Not Found` for 404, `HTTP/1.0 <code>` for anything
    /// else.
    pub fn status_line(&self) -> String {
        match self.status {
            404 => "HTTP/1.0 404 Not Found".to_string(),
            code => format!("HTTP/1.0 {code}"),
        }
    }
}

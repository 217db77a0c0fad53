//! Render strategies: JSON envelopes and documents with asset merging.

use ironhtml::typed::Element;
use ironhtml_elements::{Link, Script};
use serde_json::{json, Map, Value};

use crate::response::Response;

/// Insertion point for collected stylesheets.
pub const STYLESHEETS: &str = "stylesheets";

/// Insertion point for collected scripts.
pub const JAVASCRIPTS: &str = "javascripts";

/// A JSON envelope with its HTTP status.
///
/// Success: `{"success": true, "data": ...}` (no `data` key when empty).
/// Error: `{"success": false, "message": ..., "code": ...}`.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonView {
    status: u16,
    payload: Value,
}

impl JsonView {
    /// A 200 success envelope.
    pub fn success(data: Option<Value>) -> Self {
        let mut payload = Map::new();
        payload.insert("success".to_string(), Value::Bool(true));
        if let Some(data) = data.filter(|d| !d.is_null()) {
            payload.insert("data".to_string(), data);
        }
        Self {
            status: 200,
            payload: Value::Object(payload),
        }
    }

    /// A 500 error envelope.
    pub fn error(message: impl Into<String>, code: i64) -> Self {
        Self {
            status: 500,
            payload: json!({
                "success": false,
                "message": message.into(),
                "code": code,
            }),
        }
    }

    /// Overrides the status.
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// The HTTP status.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// The envelope.
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Serializes into a response.
    pub fn into_response(self) -> Response {
        Response::json(&self.payload).status(self.status)
    }
}

/// Per-request collector of widget stylesheets and scripts.
///
/// URLs are de-duplicated, keeping first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetCollector {
    stylesheets: Vec<String>,
    scripts: Vec<String>,
}

impl AssetCollector {
    /// An empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a stylesheet unless already collected.
    pub fn add_stylesheet(&mut self, url: impl Into<String>) {
        let url = url.into();
        if !self.stylesheets.contains(&url) {
            self.stylesheets.push(url);
        }
    }

    /// Adds a script unless already collected.
    pub fn add_script(&mut self, url: impl Into<String>) {
        let url = url.into();
        if !self.scripts.contains(&url) {
            self.scripts.push(url);
        }
    }

    /// Stylesheet URLs in first-seen order.
    pub fn stylesheets(&self) -> &[String] {
        &self.stylesheets
    }

    /// Script URLs in first-seen order.
    pub fn scripts(&self) -> &[String] {
        &self.scripts
    }

    pub fn is_empty(&self) -> bool {
        self.stylesheets.is_empty() && self.scripts.is_empty()
    }

    /// `<link>` tags for every stylesheet.
    pub fn render_stylesheets(&self) -> String {
        let mut html = String::new();
        for url in &self.stylesheets {
            Element::<Link>::new()
                .attr("rel", "stylesheet")
                .attr("href", url)
                .render_to(&mut html);
        }
        html
    }

    /// `<script>` tags for every script.
    pub fn render_scripts(&self) -> String {
        let mut html = String::new();
        for url in &self.scripts {
            Element::<Script>::new().attr("src", url).render_to(&mut html);
        }
        html
    }
}

/// Escapes HTML special characters.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// A renderable fragment that may contribute assets.
pub trait Widget {
    fn render(&self, assets: &mut AssetCollector) -> String;
}

impl<F> Widget for F
where
    F: Fn(&mut AssetCollector) -> String,
{
    fn render(&self, assets: &mut AssetCollector) -> String {
        self(assets)
    }
}

enum Node {
    Raw(String),
    Widget(Box<dyn Widget>),
    Section(String),
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Raw(html) => f.debug_tuple("Raw").field(html).finish(),
            Self::Widget(_) => f.write_str("Widget"),
            Self::Section(name) => f.debug_tuple("Section").field(name).finish(),
        }
    }
}

/// A document made of raw markup, widgets and named insertion points.
///
/// Rendering is two-pass: widgets render first and contribute assets,
/// then the `stylesheets` and `javascripts` sections are filled from the
/// collector. Sections with other names render empty.
///
/// ```
/// use oxide_mvc::{AssetCollector, Layout};
///
/// let layout = Layout::new()
///     .raw("<head>")
///     .section("stylesheets")
///     .raw("</head><body>")
///     .widget(|assets: &mut AssetCollector| {
///         assets.add_stylesheet("chart.css");
///         "<div>chart</div>".to_string()
///     })
///     .raw("</body>");
///
/// let html = layout.render(&mut AssetCollector::new());
/// assert!(html.contains("chart.css"));
/// assert!(html.find("chart.css") < html.find("<div>chart</div>"));
/// ```
#[derive(Debug, Default)]
pub struct Layout {
    nodes: Vec<Node>,
}

impl Layout {
    /// An empty layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends raw markup.
    #[must_use]
    pub fn raw(mut self, html: impl Into<String>) -> Self {
        self.nodes.push(Node::Raw(html.into()));
        self
    }

    /// Appends a widget.
    #[must_use]
    pub fn widget(mut self, widget: impl Widget + 'static) -> Self {
        self.nodes.push(Node::Widget(Box::new(widget)));
        self
    }

    /// Appends a named insertion point.
    #[must_use]
    pub fn section(mut self, name: impl Into<String>) -> Self {
        self.nodes.push(Node::Section(name.into()));
        self
    }

    /// Whether the layout declares `name`.
    pub fn has_section(&self, name: &str) -> bool {
        self.nodes
            .iter()
            .any(|n| matches!(n, Node::Section(s) if s == name))
    }

    /// Renders widgets first, then fills the asset sections.
    pub fn render(&self, assets: &mut AssetCollector) -> String {
        let pieces: Vec<Option<String>> = self
            .nodes
            .iter()
            .map(|node| match node {
                Node::Raw(html) => Some(html.clone()),
                Node::Widget(widget) => Some(widget.render(assets)),
                Node::Section(_) => None,
            })
            .collect();

        let mut html = String::new();
        for (node, piece) in self.nodes.iter().zip(pieces) {
            match (node, piece) {
                (_, Some(piece)) => html.push_str(&piece),
                (Node::Section(name), None) if name == STYLESHEETS => {
                    html.push_str(&assets.render_stylesheets());
                }
                (Node::Section(name), None) if name == JAVASCRIPTS => {
                    html.push_str(&assets.render_scripts());
                }
                _ => {}
            }
        }
        html
    }
}

/// What a controller renders in document mode.
#[derive(Debug)]
pub enum View {
    /// A layout with asset insertion points.
    Document(Layout),
    /// Pre-rendered markup.
    Html(String),
    /// A `302` to another location.
    Redirect(String),
    /// No body.
    Empty,
}

impl View {
    /// Renders the body. Returns `None` for redirects.
    pub fn render(&self, assets: &mut AssetCollector) -> Option<String> {
        match self {
            Self::Document(layout) => Some(layout.render(assets)),
            Self::Html(html) => Some(html.clone()),
            Self::Redirect(_) => None,
            Self::Empty => Some(String::new()),
        }
    }
}

//! The demo application: a widget catalogue backed by a document store.
//!
//! | route                 | GET                   | POST / DELETE          |
//! |-----------------------|-----------------------|------------------------|
//! | `/`                   | landing page          |                        |
//! | `/widgets`            | list, `?tag=` filter  | create                 |
//! | `/widgets/:id`        | one widget            | remove                 |

use std::sync::Arc;

use ironhtml::typed::Element;
use ironhtml_elements::{Div, Li, P, Ul};
use oxide_docstore::{
    Collection, Document, DocumentStore, FieldKind, Model, ObjectId, Schema, StoreError,
};
use oxide_mvc::{
    AssetCollector, Context, Controller, ControllerError, Dispatcher, Flow, HookEvent, JsonView,
    Layout, Listener, Mutator, ParamDescriptor, ParamSpec, View, JAVASCRIPTS, STYLESHEETS,
};
use serde_json::Value;

/// Collection the catalogue lives in.
pub const WIDGETS: &str = "widgets";

/// Route condition for widget identifiers.
const OBJECT_ID_PATTERN: &str = "[0-9a-f]{24}";

/// Widgets need a name and may carry tags.
pub fn widget_schema() -> Schema {
    Schema::new()
        .required("name", FieldKind::String)
        .field("tags", FieldKind::Array)
}

/// The widget collection in `store`.
pub fn widgets(store: Arc<dyn DocumentStore>) -> Collection {
    Collection::new(WIDGETS, widget_schema(), store)
}

/// Builds the catalogue dispatcher.
pub fn dispatcher(
    widgets: &Collection,
    environment: &str,
    mount_path: Option<&str>,
) -> oxide_mvc::Result<Dispatcher> {
    let base = mount_path
        .unwrap_or_default()
        .trim_end_matches('/')
        .to_string();
    let environment = environment.to_string();

    let home = widgets.clone();
    let list = widgets.clone();
    let create = widgets.clone();
    let delete = widgets.clone();
    let create_base = base.clone();
    let delete_base = base.clone();

    let mut builder = Dispatcher::builder()
        .route("/", "Home")
        .route("/widgets", "Widgets")
        .route_with_conditions("/widgets/:id", &[("id", OBJECT_ID_PATTERN)], "Widgets")
        .controller_with("Home", move || HomeController::new(home.clone(), environment.clone()))
        .controller_with("Widgets", move || WidgetsController::new(list.clone()))
        .mutator_with("WidgetsPost", move || {
            WidgetsPostController::new(create.clone(), create_base.clone())
        })
        .mutator_with("WidgetsDelete", move || {
            WidgetsDeleteController::new(delete.clone(), delete_base.clone())
        })
        .listener::<AccessLog>("access-log")
        .on(HookEvent::Pre, "access-log");

    if !base.is_empty() {
        builder = builder.mount_path(base);
    }
    builder.build()
}

fn store_failure(ctx: &Context<'_>, err: StoreError) -> ControllerError {
    match err {
        StoreError::NotFound => ControllerError::NotFound(ctx.request().path().to_string()),
        other => ControllerError::failed(other.to_string()),
    }
}

/// Landing page with a counter and a footer widget.
pub struct HomeController {
    widgets: Collection,
    environment: String,
    count: usize,
}

impl HomeController {
    pub fn new(widgets: Collection, environment: String) -> Self {
        Self {
            widgets,
            environment,
            count: 0,
        }
    }
}

fn counter(assets: &mut AssetCollector, count: usize) -> String {
    assets.add_stylesheet("/static/catalogue.css");
    assets.add_script("/static/counter.js");
    let label = format!("{count} widgets");
    Element::<P>::new().class("counter").text(&label).render()
}

fn footer(assets: &mut AssetCollector, environment: &str) -> String {
    assets.add_stylesheet("/static/catalogue.css");
    let label = format!("environment: {environment}");
    Element::<Div>::new().class("footer").text(&label).render()
}

impl Controller for HomeController {
    fn run(&mut self, ctx: &Context<'_>) -> Result<Flow, ControllerError> {
        self.count = self
            .widgets
            .count(&Document::new())
            .map_err(|e| store_failure(ctx, e))?;
        Ok(Flow::Continue)
    }

    fn render(&self, _ctx: &Context<'_>) -> Result<View, ControllerError> {
        let count = self.count;
        let environment = self.environment.clone();
        Ok(View::Document(
            Layout::new()
                .raw("<!DOCTYPE html><html><head><title>Widgets</title>")
                .section(STYLESHEETS)
                .raw("</head><body>")
                .widget(move |assets: &mut AssetCollector| counter(assets, count))
                .widget(move |assets: &mut AssetCollector| footer(assets, &environment))
                .section(JAVASCRIPTS)
                .raw("</body></html>"),
        ))
    }

    fn render_json(&self, _ctx: &Context<'_>) -> Result<JsonView, ControllerError> {
        Ok(JsonView::success(Some(serde_json::json!({ "count": self.count }))))
    }
}

/// Lists widgets, optionally filtered by tag, or shows one by id.
pub struct WidgetsController {
    widgets: Collection,
    found: Vec<Model>,
}

impl WidgetsController {
    pub fn new(widgets: Collection) -> Self {
        Self {
            widgets,
            found: Vec::new(),
        }
    }
}

impl Controller for WidgetsController {
    fn params(&self) -> ParamSpec {
        ParamSpec::declared([
            ParamDescriptor::object_id("id").optional(),
            ParamDescriptor::string("tag").optional(),
        ])
    }

    fn run(&mut self, ctx: &Context<'_>) -> Result<Flow, ControllerError> {
        self.found = match ctx.params().object_id("id") {
            Some(id) => vec![self.widgets.get(id).map_err(|e| store_failure(ctx, e))?],
            None => {
                let mut query = Document::new();
                if let Some(tag) = ctx.params().str("tag") {
                    query.insert("tags".to_string(), Value::String(tag.to_string()));
                }
                self.widgets
                    .find(&query)
                    .map_err(|e| store_failure(ctx, e))?
            }
        };
        Ok(Flow::Continue)
    }

    fn render(&self, _ctx: &Context<'_>) -> Result<View, ControllerError> {
        let list = Element::<Ul>::new()
            .class("widgets")
            .children(self.found.iter(), |widget, li: Element<Li>| {
                li.text(widget.get_str("name").unwrap_or_default())
            });
        Ok(View::Html(list.render()))
    }

    fn render_json(&self, _ctx: &Context<'_>) -> Result<JsonView, ControllerError> {
        let items = self
            .found
            .iter()
            .map(|widget| Value::Object(widget.document().clone()))
            .collect();
        Ok(JsonView::success(Some(Value::Array(items))))
    }
}

/// `POST /widgets`: creates a widget.
pub struct WidgetsPostController {
    widgets: Collection,
    base: String,
    id: Option<ObjectId>,
}

impl WidgetsPostController {
    pub fn new(widgets: Collection, base: String) -> Self {
        Self {
            widgets,
            base,
            id: None,
        }
    }
}

impl Controller for WidgetsPostController {
    fn params(&self) -> ParamSpec {
        ParamSpec::declared([
            ParamDescriptor::string("name"),
            ParamDescriptor::array("tags").optional(),
        ])
    }

    fn run(&mut self, ctx: &Context<'_>) -> Result<Flow, ControllerError> {
        let failure = |e| store_failure(ctx, e);
        let mut widget = self.widgets.create();
        widget
            .set("name", ctx.params().str("name").unwrap_or_default())
            .map_err(failure)?;
        if let Some(tags) = ctx.params().list("tags") {
            widget.set("tags", tags.to_vec()).map_err(failure)?;
        }
        self.id = Some(self.widgets.save(&mut widget).map_err(failure)?);
        ctx.set_status(201);
        Ok(Flow::Continue)
    }

    fn render(&self, _ctx: &Context<'_>) -> Result<View, ControllerError> {
        let id = self.id.map(|id| id.to_hex()).unwrap_or_default();
        Ok(View::Redirect(format!("{}/widgets/{id}", self.base)))
    }

    fn render_json(&self, _ctx: &Context<'_>) -> Result<JsonView, ControllerError> {
        Ok(JsonView::success(
            self.id.map(|id| serde_json::json!({ "id": id.to_hex() })),
        ))
    }

    fn render_error(&self, _ctx: &Context<'_>, _error: &ControllerError) -> Option<View> {
        Some(View::Redirect(format!("{}/?error=1", self.base)))
    }
}

impl Mutator for WidgetsPostController {}

/// `DELETE /widgets/:id`: removes a widget.
pub struct WidgetsDeleteController {
    widgets: Collection,
    base: String,
    name: String,
}

impl WidgetsDeleteController {
    pub fn new(widgets: Collection, base: String) -> Self {
        Self {
            widgets,
            base,
            name: String::new(),
        }
    }
}

impl Controller for WidgetsDeleteController {
    fn params(&self) -> ParamSpec {
        ParamSpec::declared([ParamDescriptor::object_id("id")])
    }

    fn run(&mut self, ctx: &Context<'_>) -> Result<Flow, ControllerError> {
        let Some(id) = ctx.params().object_id("id") else {
            return Ok(Flow::halt("No widget given"));
        };
        let widget = self.widgets.get(id).map_err(|e| store_failure(ctx, e))?;
        self.widgets
            .remove(&widget)
            .map_err(|e| store_failure(ctx, e))?;
        self.name = widget.get_str("name").unwrap_or_default().to_string();
        Ok(Flow::Continue)
    }

    fn render(&self, _ctx: &Context<'_>) -> Result<View, ControllerError> {
        Ok(View::Redirect(format!("{}/widgets", self.base)))
    }

    fn render_json(&self, _ctx: &Context<'_>) -> Result<JsonView, ControllerError> {
        Ok(JsonView::success(Some(
            serde_json::json!({ "removed": self.name }),
        )))
    }
}

impl Mutator for WidgetsDeleteController {}

/// Logs every request before dispatch.
#[derive(Default)]
pub struct AccessLog;

impl Listener for AccessLog {
    fn run(&mut self, ctx: &Context<'_>) -> Result<Flow, ControllerError> {
        let request = ctx.request();
        tracing::info!(method = %request.method(), path = %request.path(), "request");
        Ok(Flow::Continue)
    }
}

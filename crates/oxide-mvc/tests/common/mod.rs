#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use oxide_mvc::{
    AssetCollector, Context, Controller, ControllerError, Dispatcher, DispatcherBuilder, Flow,
    HookEvent, JsonView, Layout, Listener, Mutator, ParamDescriptor, ParamSpec, Request,
    Response, View, JAVASCRIPTS, STYLESHEETS,
};
use serde_json::json;

/// Records what ran, in order.
pub type Journal = Arc<Mutex<Vec<String>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().unwrap().clone()
}

fn note(journal: &Journal, entry: impl Into<String>) {
    journal.lock().unwrap().push(entry.into());
}

pub fn xhr(request: Request) -> Request {
    request.header("X-Requested-With", "XMLHttpRequest")
}

pub fn json_of(response: &Response) -> serde_json::Value {
    response
        .json_body()
        .unwrap_or_else(|| panic!("not JSON: {:?}", response.body_string()))
}

pub fn body_of(response: &Response) -> String {
    response.body_string().unwrap_or_default()
}

/// `GET` controller that needs an integer `id`.
pub struct UsersController {
    journal: Journal,
    id: i64,
}

impl UsersController {
    pub fn new(journal: Journal) -> Self {
        Self { journal, id: 0 }
    }
}

impl Controller for UsersController {
    fn params(&self) -> ParamSpec {
        ParamSpec::declared([ParamDescriptor::int("id")])
    }

    fn init(&mut self, ctx: &Context<'_>) -> Result<(), ControllerError> {
        note(&self.journal, "users:init");
        self.id = ctx.params().int("id").unwrap_or_default();
        Ok(())
    }

    fn run(&mut self, _ctx: &Context<'_>) -> Result<Flow, ControllerError> {
        note(&self.journal, "users:run");
        Ok(Flow::Continue)
    }

    fn render(&self, _ctx: &Context<'_>) -> Result<View, ControllerError> {
        Ok(View::Html(format!("<h1>User {}</h1>", self.id)))
    }

    fn render_json(&self, _ctx: &Context<'_>) -> Result<JsonView, ControllerError> {
        Ok(JsonView::success(Some(json!({ "id": self.id }))))
    }
}

#[derive(Default)]
pub struct UserNewController;

impl Controller for UserNewController {
    fn run(&mut self, _ctx: &Context<'_>) -> Result<Flow, ControllerError> {
        Ok(Flow::Continue)
    }

    fn render(&self, _ctx: &Context<'_>) -> Result<View, ControllerError> {
        Ok(View::Html("<form></form>".into()))
    }
}

/// Mutator for `POST /users`; redirects on success and on error.
#[derive(Default)]
pub struct UsersPostController {
    name: String,
}

impl Controller for UsersPostController {
    fn params(&self) -> ParamSpec {
        ParamSpec::declared([ParamDescriptor::string("name")])
    }

    fn run(&mut self, ctx: &Context<'_>) -> Result<Flow, ControllerError> {
        self.name = ctx.params().str("name").unwrap_or_default().to_string();
        if self.name == "taken" {
            return Ok(Flow::halt_with_code("Name is taken", 9));
        }
        Ok(Flow::redirect(format!("/users/{}", self.name.len())))
    }

    fn render(&self, _ctx: &Context<'_>) -> Result<View, ControllerError> {
        Ok(View::Empty)
    }

    fn render_error(&self, _ctx: &Context<'_>, _error: &ControllerError) -> Option<View> {
        Some(View::Redirect("/users/new?error=1".into()))
    }
}

impl Mutator for UsersPostController {}

/// Registered for `DELETE` without the mutator capability.
#[derive(Default)]
pub struct UsersDeleteController;

impl Controller for UsersDeleteController {
    fn run(&mut self, _ctx: &Context<'_>) -> Result<Flow, ControllerError> {
        Ok(Flow::Continue)
    }

    fn render(&self, _ctx: &Context<'_>) -> Result<View, ControllerError> {
        Ok(View::Empty)
    }
}

/// Controller whose `init` always fails.
pub struct BrokenController {
    journal: Journal,
}

impl BrokenController {
    pub fn new(journal: Journal) -> Self {
        Self { journal }
    }
}

impl Controller for BrokenController {
    fn init(&mut self, _ctx: &Context<'_>) -> Result<(), ControllerError> {
        note(&self.journal, "broken:init");
        Err(ControllerError::halt("Session expired"))
    }

    fn run(&mut self, _ctx: &Context<'_>) -> Result<Flow, ControllerError> {
        note(&self.journal, "broken:run");
        Ok(Flow::Continue)
    }

    fn render(&self, _ctx: &Context<'_>) -> Result<View, ControllerError> {
        Ok(View::Html("unreachable".into()))
    }

    fn render_error(&self, ctx: &Context<'_>, error: &ControllerError) -> Option<View> {
        ctx.set_status(403);
        Some(View::Html(format!("<p class=\"error\">{error}</p>")))
    }
}

/// Document page with widgets that contribute assets.
#[derive(Default)]
pub struct DashboardController;

fn chart(assets: &mut AssetCollector) -> String {
    assets.add_stylesheet("chart.css");
    assets.add_script("chart.js");
    "<canvas id=\"chart\"></canvas>".to_string()
}

fn table(assets: &mut AssetCollector) -> String {
    assets.add_stylesheet("table.css");
    assets.add_script("chart.js");
    "<table></table>".to_string()
}

impl Controller for DashboardController {
    fn run(&mut self, _ctx: &Context<'_>) -> Result<Flow, ControllerError> {
        Ok(Flow::Continue)
    }

    fn render(&self, _ctx: &Context<'_>) -> Result<View, ControllerError> {
        Ok(View::Document(
            Layout::new()
                .raw("<html><head>")
                .section(STYLESHEETS)
                .raw("</head><body>")
                .widget(chart)
                .widget(table)
                .widget(chart)
                .section(JAVASCRIPTS)
                .raw("</body></html>"),
        ))
    }
}

/// Greedy path capture echo.
#[derive(Default)]
pub struct FilesController {
    path: Vec<String>,
}

impl Controller for FilesController {
    fn params(&self) -> ParamSpec {
        ParamSpec::declared([ParamDescriptor::array("path")])
    }

    fn run(&mut self, ctx: &Context<'_>) -> Result<Flow, ControllerError> {
        self.path = ctx.params().list("path").unwrap_or_default().to_vec();
        Ok(Flow::Continue)
    }

    fn render(&self, _ctx: &Context<'_>) -> Result<View, ControllerError> {
        Ok(View::Html(self.path.join("|")))
    }

    fn force_json(&self) -> bool {
        true
    }

    fn render_json(&self, _ctx: &Context<'_>) -> Result<JsonView, ControllerError> {
        Ok(JsonView::success(Some(json!(self.path))))
    }
}

/// Listener that records each invocation.
pub struct AuditListener {
    journal: Journal,
    label: &'static str,
}

impl AuditListener {
    pub fn new(journal: Journal, label: &'static str) -> Self {
        Self { journal, label }
    }
}

impl Listener for AuditListener {
    fn run(&mut self, ctx: &Context<'_>) -> Result<Flow, ControllerError> {
        note(
            &self.journal,
            format!("{}:{}", self.label, ctx.request().path()),
        );
        Ok(Flow::Continue)
    }
}

/// Listener that requires a parameter nobody sends.
#[derive(Default)]
pub struct StrictListener;

impl Listener for StrictListener {
    fn params(&self) -> ParamSpec {
        ParamSpec::declared([ParamDescriptor::string("api_key")])
    }

    fn run(&mut self, _ctx: &Context<'_>) -> Result<Flow, ControllerError> {
        Ok(Flow::Continue)
    }
}

/// The dispatcher every integration test starts from.
pub fn builder(journal: &Journal) -> DispatcherBuilder {
    let users = Arc::clone(journal);
    let broken = Arc::clone(journal);
    let pre = Arc::clone(journal);
    let post = Arc::clone(journal);

    Dispatcher::builder()
        .route("/users/new", "admin/UserNew")
        .route("/users/:id", "admin/Users")
        .route("/users", "admin/Users")
        .route("/broken", "Broken")
        .route("/dashboard/", "Dashboard")
        .route("/files/:path+", "Files")
        .route("/ghost", "Ghost")
        .controller_with("admin/Users", move || UsersController::new(Arc::clone(&users)))
        .controller::<UserNewController>("admin/UserNew")
        .mutator::<UsersPostController>("admin/UsersPost")
        .controller::<UsersDeleteController>("admin/UsersDelete")
        .controller_with("Broken", move || BrokenController::new(Arc::clone(&broken)))
        .controller::<DashboardController>("Dashboard")
        .controller::<FilesController>("Files")
        .listener_with("audit-pre", move || AuditListener::new(Arc::clone(&pre), "pre"))
        .listener_with("audit-post", move || AuditListener::new(Arc::clone(&post), "post"))
        .listener::<StrictListener>("strict")
        .on(HookEvent::Pre, "audit-pre")
        .on(HookEvent::Pre, "strict")
        .on_event("controllerEnd", "audit-post")
}

pub fn dispatcher(journal: &Journal) -> Dispatcher {
    builder(journal).build().unwrap()
}

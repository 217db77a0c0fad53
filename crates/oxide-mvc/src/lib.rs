//! # oxide-mvc
//!
//! A small MVC request pipeline.
//!
//! This crate provides:
//! - Route templates with `:name`, greedy `:name+` and optional `( ... )` parts
//! - An ordered route table where the first match wins
//! - Verb-to-controller resolution with CORS preflight handling
//! - Pre- and post-dispatch listener hooks
//! - A controller lifecycle with typed parameter binding and JSON or
//!   document rendering
//!
//! ## Quick Start
//!
//! ```
//! use oxide_mvc::{
//!     Context, Controller, ControllerError, Dispatcher, Flow, JsonView, ParamDescriptor,
//!     ParamSpec, Request, View,
//! };
//! use serde_json::json;
//!
//! #[derive(Default)]
//! struct UsersController {
//!     id: i64,
//! }
//!
//! impl Controller for UsersController {
//!     fn params(&self) -> ParamSpec {
//!         ParamSpec::declared([ParamDescriptor::int("id")])
//!     }
//!
//!     fn run(&mut self, ctx: &Context<'_>) -> Result<Flow, ControllerError> {
//!         self.id = ctx.params().int("id").unwrap_or_default();
//!         Ok(Flow::Continue)
//!     }
//!
//!     fn render(&self, _ctx: &Context<'_>) -> Result<View, ControllerError> {
//!         Ok(View::Html(format!("<h1>User {}</h1>", self.id)))
//!     }
//!
//!     fn render_json(&self, _ctx: &Context<'_>) -> Result<JsonView, ControllerError> {
//!         Ok(JsonView::success(Some(json!({ "id": self.id }))))
//!     }
//! }
//!
//! let dispatcher = Dispatcher::builder()
//!     .route("/users/:id", "admin/Users")
//!     .controller::<UsersController>("admin/Users")
//!     .build()
//!     .unwrap();
//!
//! let page = dispatcher.handle(Request::get("/users/7"));
//! assert_eq!(page.body_string().as_deref(), Some("<h1>User 7</h1>"));
//!
//! let api = dispatcher.handle(
//!     Request::get("/users/7").header("X-Requested-With", "XMLHttpRequest"),
//! );
//! assert_eq!(api.json_body(), Some(json!({"success": true, "data": {"id": 7}})));
//! ```
//!
//! ## Verbs
//!
//! GET runs `<Name>Controller` registered at the route target. POST, PUT
//! and DELETE run `<Name><Verb>Controller` registered at
//! `<target><Verb>`, which must be registered as a mutator. HEAD and
//! OPTIONS answer with CORS headers without running any controller.

pub mod context;
pub mod controller;
pub mod dispatcher;
pub mod error;
pub mod hooks;
pub mod lifecycle;
pub mod params;
pub mod path;
pub mod registry;
pub mod request;
pub mod response;
pub mod table;
pub mod verb;
pub mod view;

pub use context::{ParamValue, RequestContext, XHR_HEADER};
pub use controller::{Context, Controller, Flow, Listener, Mutator};
pub use dispatcher::{Dispatcher, DispatcherBuilder, NotFoundController, PATH_INFO};
pub use error::{ControllerError, ErrorCode, ParamError, Result, RouterError};
pub use hooks::{HookEvent, HookRegistry};
pub use lifecycle::{ControllerOutcome, Lifecycle, LifecycleState, RenderMode};
pub use params::{BoundParams, BoundValue, ParamDescriptor, ParamKind, ParamSpec};
pub use path::{CompiledRoute, PathParams, PathValue, RouteTemplate, Segment};
pub use registry::{ControllerKind, ControllerRegistry, Registration};
pub use request::{Headers, Method, Request, UploadedFile};
pub use response::Response;
pub use table::{RouteEntry, RouteMatch, RouteTable};
pub use verb::{ControllerTarget, DispatchDecision, VerbResolver, VerbRule};
pub use view::{
    html_escape, AssetCollector, JsonView, Layout, View, Widget, JAVASCRIPTS, STYLESHEETS,
};

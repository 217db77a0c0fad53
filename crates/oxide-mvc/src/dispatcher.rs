//! Request dispatch.
//!
//! A [`Dispatcher`] is assembled once with [`DispatcherBuilder`] and is
//! read-only afterwards, so it can be shared across threads behind an
//! `Arc`. Each call to [`Dispatcher::run`] owns its request context.
//!
//! ```
//! use oxide_mvc::{
//!     Context, Controller, ControllerError, Dispatcher, Flow, Request, View,
//! };
//!
//! #[derive(Default)]
//! struct HomeController;
//!
//! impl Controller for HomeController {
//!     fn run(&mut self, _ctx: &Context<'_>) -> Result<Flow, ControllerError> {
//!         Ok(Flow::Continue)
//!     }
//!
//!     fn render(&self, _ctx: &Context<'_>) -> Result<View, ControllerError> {
//!         Ok(View::Html("<h1>Home</h1>".into()))
//!     }
//! }
//!
//! let dispatcher = Dispatcher::builder()
//!     .route("/", "Home")
//!     .controller::<HomeController>("Home")
//!     .build()
//!     .unwrap();
//!
//! let response = dispatcher.handle(Request::get("/"));
//! assert_eq!(response.status, 200);
//! assert_eq!(dispatcher.handle(Request::get("/missing")).status, 404);
//! ```

use std::collections::HashMap;

use crate::context::RequestContext;
use crate::controller::{Context, Controller, Flow, Listener, Mutator};
use crate::error::{ControllerError, ErrorCode, Result, RouterError};
use crate::hooks::{HookEvent, HookRegistry};
use crate::lifecycle::{ControllerOutcome, Lifecycle};
use crate::params::{ParamDescriptor, ParamSpec};
use crate::registry::{ControllerKind, ControllerRegistry, Registration};
use crate::request::Request;
use crate::response::Response;
use crate::table::RouteTable;
use crate::verb::{DispatchDecision, VerbResolver};
use crate::view::{html_escape, JsonView, View};

/// Parameter the not-found controller receives the resolved path under.
pub const PATH_INFO: &str = "path_info";

/// The default fallback for unroutable requests.
///
/// Documents get `<h1>Not Found: <path></h1>`; JSON clients get
/// `{"success":false,"message":"Invalid endpoint: <path>","code":-1}`.
/// Both are sent with status 404.
#[derive(Debug, Default)]
pub struct NotFoundController {
    path: String,
}

impl Controller for NotFoundController {
    fn params(&self) -> ParamSpec {
        ParamSpec::declared([ParamDescriptor::string(PATH_INFO).default("/")])
    }

    fn init(&mut self, ctx: &Context<'_>) -> std::result::Result<(), ControllerError> {
        self.path = ctx.params().str(PATH_INFO).unwrap_or("/").to_string();
        Ok(())
    }

    fn run(&mut self, _ctx: &Context<'_>) -> std::result::Result<Flow, ControllerError> {
        Err(ControllerError::NotFound(self.path.clone()))
    }

    fn render(&self, _ctx: &Context<'_>) -> std::result::Result<View, ControllerError> {
        Ok(View::Empty)
    }

    fn render_error(&self, _ctx: &Context<'_>, _error: &ControllerError) -> Option<View> {
        Some(View::Html(format!(
            "<h1>Not Found: {}</h1>",
            html_escape(&self.path)
        )))
    }
}

#[derive(Debug)]
struct PendingRoute {
    name: Option<String>,
    template: String,
    conditions: HashMap<String, String>,
    target: String,
}

#[derive(Debug)]
enum PendingHook {
    Typed(HookEvent),
    Named(String),
}

/// Collects routes, controllers and hooks, then validates them in
/// [`DispatcherBuilder::build`].
#[derive(Debug)]
pub struct DispatcherBuilder {
    routes: Vec<PendingRoute>,
    controllers: ControllerRegistry,
    hooks: Vec<(PendingHook, String)>,
    verbs: VerbResolver,
    not_found: Registration,
    mount_path: Option<String>,
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatcherBuilder {
    /// An empty builder with the default verb table.
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            controllers: ControllerRegistry::new(),
            hooks: Vec::new(),
            verbs: VerbResolver::new(),
            not_found: Registration::new::<NotFoundController, _>(
                ControllerKind::Standard,
                NotFoundController::default,
            ),
            mount_path: None,
        }
    }

    /// Adds a route. Routes match in the order they are added.
    #[must_use]
    pub fn route(self, template: impl Into<String>, target: impl Into<String>) -> Self {
        self.push_route(None, template.into(), HashMap::new(), target.into())
    }

    /// Adds a route usable with [`Dispatcher::url_for`].
    #[must_use]
    pub fn named_route(
        self,
        name: impl Into<String>,
        template: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        self.push_route(
            Some(name.into()),
            template.into(),
            HashMap::new(),
            target.into(),
        )
    }

    /// Adds a route whose parameters must match the given regexes.
    #[must_use]
    pub fn route_with_conditions(
        self,
        template: impl Into<String>,
        conditions: &[(&str, &str)],
        target: impl Into<String>,
    ) -> Self {
        let conditions = conditions
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        self.push_route(None, template.into(), conditions, target.into())
    }

    fn push_route(
        mut self,
        name: Option<String>,
        template: String,
        conditions: HashMap<String, String>,
        target: String,
    ) -> Self {
        self.routes.push(PendingRoute {
            name,
            template,
            conditions,
            target,
        });
        self
    }

    /// Registers a read controller for `artifact`.
    #[must_use]
    pub fn controller<C: Controller + Default + 'static>(mut self, artifact: impl Into<String>) -> Self {
        self.controllers.controller::<C>(artifact);
        self
    }

    /// Registers a read controller built by `factory`.
    #[must_use]
    pub fn controller_with<C, F>(mut self, artifact: impl Into<String>, factory: F) -> Self
    where
        C: Controller + 'static,
        F: Fn() -> C + Send + Sync + 'static,
    {
        self.controllers.controller_with(artifact, factory);
        self
    }

    /// Registers a mutator for `artifact`.
    #[must_use]
    pub fn mutator<C: Mutator + Default + 'static>(mut self, artifact: impl Into<String>) -> Self {
        self.controllers.mutator::<C>(artifact);
        self
    }

    /// Registers a mutator built by `factory`.
    #[must_use]
    pub fn mutator_with<C, F>(mut self, artifact: impl Into<String>, factory: F) -> Self
    where
        C: Mutator + 'static,
        F: Fn() -> C + Send + Sync + 'static,
    {
        self.controllers.mutator_with(artifact, factory);
        self
    }

    /// Registers a listener usable as a hook.
    #[must_use]
    pub fn listener<L: Listener + Default + 'static>(mut self, id: impl Into<String>) -> Self {
        self.controllers.listener::<L>(id);
        self
    }

    /// Registers a listener built by `factory`.
    #[must_use]
    pub fn listener_with<L, F>(mut self, id: impl Into<String>, factory: F) -> Self
    where
        L: Listener + 'static,
        F: Fn() -> L + Send + Sync + 'static,
    {
        self.controllers.listener_with(id, factory);
        self
    }

    /// Attaches a registered listener to an event.
    #[must_use]
    pub fn on(mut self, event: HookEvent, id: impl Into<String>) -> Self {
        self.hooks.push((PendingHook::Typed(event), id.into()));
        self
    }

    /// Attaches a listener by event name (`pre`/`preprocess`,
    /// `post`/`controllerEnd`).
    #[must_use]
    pub fn on_event(mut self, event: impl Into<String>, id: impl Into<String>) -> Self {
        self.hooks.push((PendingHook::Named(event.into()), id.into()));
        self
    }

    /// Replaces the verb rule table.
    #[must_use]
    pub fn verbs(mut self, verbs: VerbResolver) -> Self {
        self.verbs = verbs;
        self
    }

    /// Replaces the not-found fallback.
    #[must_use]
    pub fn not_found<C: Controller + Default + 'static>(self) -> Self {
        self.not_found_with(C::default)
    }

    /// Replaces the not-found controller with one built by `factory`.
    #[must_use]
    pub fn not_found_with<C, F>(mut self, factory: F) -> Self
    where
        C: Controller + 'static,
        F: Fn() -> C + Send + Sync + 'static,
    {
        self.not_found = Registration::new::<C, F>(ControllerKind::Standard, factory);
        self
    }

    /// Prefix stripped from every request path, e.g. `/app`.
    #[must_use]
    pub fn mount_path(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let trimmed = prefix.trim_end_matches('/');
        self.mount_path = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    /// Compiles routes and checks hooks. Any error here is a
    /// misconfiguration and should abort startup.
    pub fn build(self) -> Result<Dispatcher> {
        let mut routes = RouteTable::new();
        for route in &self.routes {
            match (&route.name, route.conditions.is_empty()) {
                (Some(name), _) => {
                    routes.register_named(name.clone(), &route.template, route.target.clone())?;
                }
                (None, true) => routes.register(&route.template, route.target.clone())?,
                (None, false) => routes.register_with_conditions(
                    &route.template,
                    &route.conditions,
                    route.target.clone(),
                )?,
            }
        }

        let mut hooks = HookRegistry::new();
        for (event, id) in self.hooks {
            let event = match event {
                PendingHook::Typed(event) => event,
                PendingHook::Named(name) => name.parse()?,
            };
            hooks.register(event, id, &self.controllers)?;
        }

        tracing::debug!(
            routes = routes.len(),
            controllers = self.controllers.len(),
            "dispatcher built"
        );

        Ok(Dispatcher {
            routes,
            controllers: self.controllers,
            hooks,
            verbs: self.verbs,
            not_found: self.not_found,
            mount_path: self.mount_path,
        })
    }
}

/// Routes requests to controllers and runs them.
#[derive(Debug)]
pub struct Dispatcher {
    routes: RouteTable,
    controllers: ControllerRegistry,
    hooks: HookRegistry,
    verbs: VerbResolver,
    not_found: Registration,
    mount_path: Option<String>,
}

impl Dispatcher {
    /// Starts a [`DispatcherBuilder`].
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    /// Dispatches a host request.
    pub fn handle(&self, request: Request) -> Response {
        self.run(RequestContext::from_request(request))
            .into_response()
    }

    /// Dispatches one request.
    ///
    /// Pre hooks fire first. Post hooks fire after the controller or the
    /// not-found fallback, but not after a CORS preflight.
    pub fn run(&self, mut ctx: RequestContext) -> ControllerOutcome {
        let path = self.normalize_path(ctx.path());
        ctx.set_path(path);

        self.hooks.fire(HookEvent::Pre, &ctx, &self.controllers);

        let (outcome, fire_post) = self.dispatch(&mut ctx);

        if fire_post {
            self.hooks.fire(HookEvent::Post, &ctx, &self.controllers);
        }
        outcome
    }

    fn dispatch(&self, ctx: &mut RequestContext) -> (ControllerOutcome, bool) {
        let Some(matched) = self.routes.resolve(ctx.path()) else {
            tracing::warn!(method = %ctx.method(), path = %ctx.path(), "no route matched");
            return (self.run_not_found(ctx), true);
        };
        let target = matched.target.to_string();
        ctx.merge_path_params(matched.params);

        match self.verbs.resolve(ctx.method(), &target, ctx.headers()) {
            DispatchDecision::Preflight(headers) => {
                tracing::debug!(path = %ctx.path(), "preflight");
                let response = Response::ok().with_headers(&headers);
                (ControllerOutcome::Terminal(response), false)
            }
            DispatchDecision::NotFound => {
                tracing::warn!(method = %ctx.method(), target = %target, "verb not routable");
                (self.run_not_found(ctx), true)
            }
            DispatchDecision::Invoke(controller) => match self.controllers.resolve(&controller) {
                Ok(registration) => {
                    tracing::debug!(
                        controller = %registration.name(),
                        artifact = %controller.artifact,
                        "dispatching"
                    );
                    let mut instance = registration.instantiate();
                    let outcome = Lifecycle::new(registration.name()).run(instance.as_mut(), ctx);
                    (outcome, true)
                }
                Err(err @ RouterError::NotMutator(_)) => {
                    tracing::error!(artifact = %controller.artifact, error = %err, "rejected dispatch");
                    let response = if ctx.is_xhr() {
                        JsonView::error(err.to_string(), ErrorCode::OUR_FAULT).into_response()
                    } else {
                        Response::internal_server_error()
                    };
                    let outcome = ControllerOutcome::Failure {
                        error: ControllerError::Router(err),
                        response,
                    };
                    (outcome, true)
                }
                Err(err) => {
                    tracing::warn!(artifact = %controller.artifact, error = %err, "falling back to not found");
                    (self.run_not_found(ctx), true)
                }
            },
        }
    }

    fn run_not_found(&self, ctx: &mut RequestContext) -> ControllerOutcome {
        ctx.merge(PATH_INFO, ctx.path().to_string());
        let mut instance = self.not_found.instantiate();
        Lifecycle::new(self.not_found.name()).run(instance.as_mut(), ctx)
    }

    /// Strips the mount prefix and any query string, and makes the path
    /// start with exactly one `/`.
    pub fn normalize_path(&self, raw: &str) -> String {
        let path = raw.split_once('?').map_or(raw, |(p, _)| p);
        let path = match &self.mount_path {
            Some(prefix) => match path.strip_prefix(prefix.as_str()) {
                Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
                _ => path,
            },
            None => path,
        };
        format!("/{}", path.trim_start_matches('/'))
    }

    /// Generates a URL for a named route, under the mount prefix.
    pub fn url_for(&self, name: &str, params: &HashMap<String, String>) -> Result<String> {
        let url = self.routes.url_for(name, params)?;
        Ok(match &self.mount_path {
            Some(prefix) => format!("{prefix}{url}"),
            None => url,
        })
    }

    /// The route table.
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// The controller registry.
    pub fn controllers(&self) -> &ControllerRegistry {
        &self.controllers
    }

    /// The hook registry.
    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }
}

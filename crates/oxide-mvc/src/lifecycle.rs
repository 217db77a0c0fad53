//! The controller lifecycle state machine.
//!
//! ```text
//! Created -> ParamsBound -> Initialized -> Executed -> Rendered
//!                 \______________\______________\_____> ErrorRendered
//! ```
//!
//! Every state after `Created` has an error edge. Output is produced only
//! by the final transition, in the render mode negotiated up front.

use crate::context::RequestContext;
use crate::controller::{Context, Controller, Flow};
use crate::error::ControllerError;
use crate::params::BoundParams;
use crate::response::Response;
use crate::view::{AssetCollector, JsonView, View};

/// States a controller passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    ParamsBound,
    Initialized,
    Executed,
    Rendered,
    ErrorRendered,
}

/// How output is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// No output; errors are only logged.
    Listener,
    /// JSON envelopes.
    Json,
    /// Full documents.
    Document,
}

/// Result of one lifecycle run.
#[derive(Debug)]
pub enum ControllerOutcome {
    /// Rendered successfully.
    Success(Response),
    /// An error was rendered.
    Failure {
        error: ControllerError,
        response: Response,
    },
    /// Ended without rendering: redirects and CORS preflight.
    Terminal(Response),
}

impl ControllerOutcome {
    /// The response for this outcome.
    pub fn response(&self) -> &Response {
        match self {
            Self::Success(response)
            | Self::Failure { response, .. }
            | Self::Terminal(response) => response,
        }
    }

    /// Consumes the outcome, returning its response.
    pub fn into_response(self) -> Response {
        match self {
            Self::Success(response)
            | Self::Failure { response, .. }
            | Self::Terminal(response) => response,
        }
    }

    /// Whether the controller completed without error.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The error behind a failure.
    pub fn error(&self) -> Option<&ControllerError> {
        match self {
            Self::Failure { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Markup emitted when a controller supplies no error view.
pub const GENERIC_NOT_FOUND: &str = "<h1>Not Found</h1>";

/// Drives one controller instance through its states.
#[derive(Debug)]
pub struct Lifecycle {
    name: String,
    forced: Option<RenderMode>,
    mode: RenderMode,
    state: LifecycleState,
}

impl Lifecycle {
    /// A lifecycle that negotiates JSON or document output.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            forced: None,
            mode: RenderMode::Document,
            state: LifecycleState::Created,
        }
    }

    /// A lifecycle in listener mode.
    pub fn listener(name: impl Into<String>) -> Self {
        Self {
            forced: Some(RenderMode::Listener),
            mode: RenderMode::Listener,
            ..Self::new(name)
        }
    }

    /// Current state.
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// The negotiated render mode.
    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    /// Picks the render mode for a request.
    pub fn negotiate(&self, controller: &dyn Controller, request: &RequestContext) -> RenderMode {
        match self.forced {
            Some(mode) => mode,
            None if request.is_xhr() || controller.force_json() => RenderMode::Json,
            None => RenderMode::Document,
        }
    }

    /// Runs the controller to completion. Never panics on controller errors.
    pub fn run(
        &mut self,
        controller: &mut dyn Controller,
        request: &RequestContext,
    ) -> ControllerOutcome {
        self.mode = self.negotiate(controller, request);

        let params = match controller.params().bind(request) {
            Ok(params) => params,
            Err(err) => {
                let ctx = Context::new(request, BoundParams::new());
                return self.fail(controller, &ctx, err.into());
            }
        };
        self.transition(LifecycleState::ParamsBound);
        let ctx = Context::new(request, params);

        if let Err(err) = controller.init(&ctx) {
            return self.fail(controller, &ctx, err);
        }
        self.transition(LifecycleState::Initialized);

        match controller.run(&ctx) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Halt { message, code }) => {
                return self.fail(controller, &ctx, ControllerError::Halt { message, code });
            }
            Ok(Flow::Redirect(url)) => {
                self.transition(LifecycleState::Executed);
                self.transition(LifecycleState::Rendered);
                return match self.mode {
                    RenderMode::Listener => ControllerOutcome::Success(Response::ok()),
                    _ => ControllerOutcome::Terminal(Response::redirect(url)),
                };
            }
            Err(err) => return self.fail(controller, &ctx, err),
        }
        self.transition(LifecycleState::Executed);

        self.render(controller, &ctx)
    }

    fn render(&mut self, controller: &dyn Controller, ctx: &Context<'_>) -> ControllerOutcome {
        let response = match self.mode {
            RenderMode::Listener => Response::ok(),
            RenderMode::Json => match controller.render_json(ctx) {
                Ok(view) => json_response(view, ctx),
                Err(err) => return self.fail(controller, ctx, err),
            },
            RenderMode::Document => match controller.render(ctx) {
                Ok(View::Redirect(url)) => {
                    self.transition(LifecycleState::Rendered);
                    return ControllerOutcome::Terminal(Response::redirect(url));
                }
                Ok(view) => document_response(&view, ctx.status().unwrap_or(200)),
                Err(err) => return self.fail(controller, ctx, err),
            },
        };
        self.transition(LifecycleState::Rendered);
        ControllerOutcome::Success(response)
    }

    fn fail(
        &mut self,
        controller: &dyn Controller,
        ctx: &Context<'_>,
        error: ControllerError,
    ) -> ControllerOutcome {
        tracing::error!(
            controller = %self.name,
            state = ?self.state,
            code = error.code(),
            message = %error,
            "controller failed"
        );
        self.transition(LifecycleState::ErrorRendered);

        let response = match self.mode {
            RenderMode::Listener => Response::ok(),
            RenderMode::Json => {
                let view = controller.render_json_error(ctx, &error).unwrap_or_else(|| {
                    JsonView::error(error.to_string(), error.code()).with_status(error.status())
                });
                json_response(view, ctx)
            }
            RenderMode::Document => match controller.render_error(ctx, &error) {
                Some(View::Redirect(url)) => Response::redirect(url),
                Some(view) => document_response(&view, ctx.status().unwrap_or(error.status())),
                None => Response::html(GENERIC_NOT_FOUND).status(404),
            },
        };
        ControllerOutcome::Failure { error, response }
    }

    fn transition(&mut self, next: LifecycleState) {
        tracing::debug!(controller = %self.name, from = ?self.state, to = ?next, "lifecycle");
        self.state = next;
    }
}

fn json_response(view: JsonView, ctx: &Context<'_>) -> Response {
    let status = ctx.status().unwrap_or_else(|| view.status());
    view.with_status(status).into_response()
}

fn document_response(view: &View, status: u16) -> Response {
    let mut assets = AssetCollector::new();
    let body = view.render(&mut assets).unwrap_or_default();
    Response::html(body).status(status)
}

//! The controller contract.
//!
//! A controller declares its parameters, optionally sets itself up in
//! [`Controller::init`], runs its business logic in [`Controller::run`] and
//! renders either a document or a JSON envelope. Controllers bound to
//! POST, PUT or DELETE must also implement [`Mutator`]. Listeners are
//! side-effect-only controllers fired around dispatch.
//!
//! ```
//! use oxide_mvc::{
//!     Context, Controller, ControllerError, Flow, JsonView, ParamDescriptor, ParamSpec, View,
//! };
//!
//! #[derive(Default)]
//! struct UsersController {
//!     name: String,
//! }
//!
//! impl Controller for UsersController {
//!     fn params(&self) -> ParamSpec {
//!         ParamSpec::declared([ParamDescriptor::int("id")])
//!     }
//!
//!     fn run(&mut self, ctx: &Context<'_>) -> Result<Flow, ControllerError> {
//!         match ctx.params().int("id") {
//!             Some(1) => {
//!                 self.name = "root".to_string();
//!                 Ok(Flow::Continue)
//!             }
//!             _ => Ok(Flow::halt("no such user")),
//!         }
//!     }
//!
//!     fn render(&self, _ctx: &Context<'_>) -> Result<View, ControllerError> {
//!         Ok(View::Html(format!("<p>{}</p>", self.name)))
//!     }
//!
//!     fn render_json(&self, _ctx: &Context<'_>) -> Result<JsonView, ControllerError> {
//!         Ok(JsonView::success(Some(serde_json::json!({ "name": self.name }))))
//!     }
//! }
//! ```

use std::cell::Cell;

use crate::context::RequestContext;
use crate::error::{ControllerError, ErrorCode};
use crate::params::{BoundParams, ParamSpec};
use crate::view::{JsonView, View};

/// Result of the business-logic step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    /// Proceed to rendering.
    Continue,
    /// Stop and render an error with this message.
    Halt { message: String, code: i64 },
    /// Stop and redirect.
    Redirect(String),
}

impl Flow {
    /// Halts with the unspecified error code.
    pub fn halt(message: impl Into<String>) -> Self {
        Self::Halt {
            message: message.into(),
            code: ErrorCode::UNSPECIFIED,
        }
    }

    /// Halts with an explicit error code.
    pub fn halt_with_code(message: impl Into<String>, code: i64) -> Self {
        Self::Halt {
            message: message.into(),
            code,
        }
    }

    /// Ends the request with a `302` to `url`.
    pub fn redirect(url: impl Into<String>) -> Self {
        Self::Redirect(url.into())
    }
}

/// What a controller sees while it runs.
#[derive(Debug)]
pub struct Context<'a> {
    request: &'a RequestContext,
    params: BoundParams,
    status: Cell<Option<u16>>,
}

impl<'a> Context<'a> {
    /// Context over `request` with already bound parameters.
    pub fn new(request: &'a RequestContext, params: BoundParams) -> Self {
        Self {
            request,
            params,
            status: Cell::new(None),
        }
    }

    /// The request.
    pub fn request(&self) -> &'a RequestContext {
        self.request
    }

    /// Parameters bound from the controller's declarations.
    pub fn params(&self) -> &BoundParams {
        &self.params
    }

    /// Overrides the response status.
    pub fn set_status(&self, status: u16) {
        self.status.set(Some(status));
    }

    /// The override set with [`Context::set_status`].
    pub fn status(&self) -> Option<u16> {
        self.status.get()
    }
}

/// A request handler with a fixed lifecycle.
pub trait Controller {
    /// Parameters to bind before `init`.
    fn params(&self) -> ParamSpec {
        ParamSpec::default()
    }

    /// Setup after binding. An error skips `run`.
    fn init(&mut self, _ctx: &Context<'_>) -> Result<(), ControllerError> {
        Ok(())
    }

    /// Business logic.
    fn run(&mut self, ctx: &Context<'_>) -> Result<Flow, ControllerError>;

    /// Document-mode success rendering.
    fn render(&self, ctx: &Context<'_>) -> Result<View, ControllerError>;

    /// JSON-mode success rendering.
    fn render_json(&self, _ctx: &Context<'_>) -> Result<JsonView, ControllerError> {
        Ok(JsonView::success(None))
    }

    /// Document-mode error view. `None` yields the generic not-found page.
    fn render_error(&self, _ctx: &Context<'_>, _error: &ControllerError) -> Option<View> {
        None
    }

    /// JSON-mode error envelope. `None` yields the standard envelope built
    /// from the error message and code.
    fn render_json_error(&self, _ctx: &Context<'_>, _error: &ControllerError) -> Option<JsonView> {
        None
    }

    /// Render JSON even without an XHR header.
    fn force_json(&self) -> bool {
        false
    }
}

/// Capability required of controllers bound to state-changing verbs.
pub trait Mutator: Controller {}

/// A side-effect-only controller fired around dispatch.
pub trait Listener {
    fn params(&self) -> ParamSpec {
        ParamSpec::default()
    }

    fn init(&mut self, _ctx: &Context<'_>) -> Result<(), ControllerError> {
        Ok(())
    }

    fn run(&mut self, ctx: &Context<'_>) -> Result<Flow, ControllerError>;
}

/// Runs a [`Listener`] through the controller lifecycle with no output.
pub(crate) struct ListenerController<L>(pub(crate) L);

impl<L: Listener> Controller for ListenerController<L> {
    fn params(&self) -> ParamSpec {
        self.0.params()
    }

    fn init(&mut self, ctx: &Context<'_>) -> Result<(), ControllerError> {
        self.0.init(ctx)
    }

    fn run(&mut self, ctx: &Context<'_>) -> Result<Flow, ControllerError> {
        self.0.run(ctx)
    }

    fn render(&self, _ctx: &Context<'_>) -> Result<View, ControllerError> {
        Ok(View::Empty)
    }
}

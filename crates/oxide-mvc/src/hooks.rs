//! Pre- and post-dispatch listeners.

use std::str::FromStr;

use crate::context::RequestContext;
use crate::error::{Result, RouterError};
use crate::lifecycle::Lifecycle;
use crate::registry::ControllerRegistry;

/// When a hook fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookEvent {
    /// Before routing.
    Pre,
    /// After the main controller or the not-found fallback.
    Post,
}

impl FromStr for HookEvent {
    type Err = RouterError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pre" | "preprocess" => Ok(Self::Pre),
            "post" | "controllerEnd" => Ok(Self::Post),
            other => Err(RouterError::UnknownHook(format!("event {other}"))),
        }
    }
}

/// Ordered hook identifiers per event.
#[derive(Debug, Clone, Default)]
pub struct HookRegistry {
    pre: Vec<String>,
    post: Vec<String>,
}

impl HookRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a hook. The identifier must name a registered listener.
    pub fn register(
        &mut self,
        event: HookEvent,
        id: impl Into<String>,
        controllers: &ControllerRegistry,
    ) -> Result<()> {
        let id = id.into();
        if !controllers.is_listener(&id) {
            return Err(RouterError::UnknownHook(id));
        }
        match event {
            HookEvent::Pre => self.pre.push(id),
            HookEvent::Post => self.post.push(id),
        }
        Ok(())
    }

    /// Listener ids registered for `event`, in order.
    pub fn hooks(&self, event: HookEvent) -> &[String] {
        match event {
            HookEvent::Pre => &self.pre,
            HookEvent::Post => &self.post,
        }
    }

    /// Runs every hook for `event` in registration order. Failures are
    /// logged by the lifecycle and never reach the caller.
    pub fn fire(&self, event: HookEvent, ctx: &RequestContext, controllers: &ControllerRegistry) {
        for id in self.hooks(event) {
            let Some(registration) = controllers.get(id) else {
                tracing::warn!(hook = %id, "hook vanished from registry");
                continue;
            };
            tracing::debug!(hook = %id, ?event, "firing hook");
            let mut listener = registration.instantiate();
            let _ = Lifecycle::listener(registration.name()).run(listener.as_mut(), ctx);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pre.is_empty() && self.post.is_empty()
    }
}

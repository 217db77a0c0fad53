//! Controller registration.
//!
//! Controllers are registered under an artifact path (`admin/Users`,
//! `admin/UsersPost`) together with a factory that builds a fresh instance
//! per request. The declared name is taken from the Rust type name, so a
//! `UsersController` registered at `admin/Users` satisfies the naming
//! convention checked at dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use crate::controller::{Controller, Listener, ListenerController, Mutator};
use crate::error::{Result, RouterError};
use crate::verb::ControllerTarget;

/// What a registration may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerKind {
    /// Handles GET.
    Standard,
    /// Handles POST, PUT and DELETE.
    Mutator,
    /// Fired as a hook; never a route target.
    Listener,
}

type Factory = Arc<dyn Fn() -> Box<dyn Controller> + Send + Sync>;

/// One registered controller.
#[derive(Clone)]
pub struct Registration {
    name: String,
    kind: ControllerKind,
    factory: Factory,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl Registration {
    pub(crate) fn new<C, F>(kind: ControllerKind, factory: F) -> Self
    where
        C: Controller + 'static,
        F: Fn() -> C + Send + Sync + 'static,
    {
        Self {
            name: short_type_name::<C>().to_string(),
            kind,
            factory: Arc::new(move || -> Box<dyn Controller> { Box::new(factory()) }),
        }
    }

    /// Declared name, e.g. `UsersController`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The capability this controller was registered with.
    pub fn kind(&self) -> ControllerKind {
        self.kind
    }

    /// Builds a fresh instance.
    pub fn instantiate(&self) -> Box<dyn Controller> {
        (self.factory)()
    }
}

/// Last path segment of a type name, without generic arguments.
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Artifact path to controller registration.
#[derive(Debug, Clone, Default)]
pub struct ControllerRegistry {
    entries: HashMap<String, Registration>,
}

impl ControllerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a read controller built with `Default`.
    pub fn controller<C>(&mut self, artifact: impl Into<String>)
    where
        C: Controller + Default + 'static,
    {
        self.controller_with(artifact, C::default);
    }

    /// Registers a read controller built by `factory`.
    pub fn controller_with<C, F>(&mut self, artifact: impl Into<String>, factory: F)
    where
        C: Controller + 'static,
        F: Fn() -> C + Send + Sync + 'static,
    {
        self.insert::<C, _>(artifact.into(), ControllerKind::Standard, factory);
    }

    /// Registers a mutator for `artifact`.
    pub fn mutator<C>(&mut self, artifact: impl Into<String>)
    where
        C: Mutator + Default + 'static,
    {
        self.mutator_with(artifact, C::default);
    }

    /// Registers a mutator built by `factory`.
    pub fn mutator_with<C, F>(&mut self, artifact: impl Into<String>, factory: F)
    where
        C: Mutator + 'static,
        F: Fn() -> C + Send + Sync + 'static,
    {
        self.insert::<C, _>(artifact.into(), ControllerKind::Mutator, factory);
    }

    /// Registers a listener under a hook identifier.
    pub fn listener<L>(&mut self, id: impl Into<String>)
    where
        L: Listener + Default + 'static,
    {
        self.listener_with(id, L::default);
    }

    /// Registers a listener built by `factory`.
    pub fn listener_with<L, F>(&mut self, id: impl Into<String>, factory: F)
    where
        L: Listener + 'static,
        F: Fn() -> L + Send + Sync + 'static,
    {
        let registration = Registration {
            name: short_type_name::<L>().to_string(),
            kind: ControllerKind::Listener,
            factory: Arc::new(move || -> Box<dyn Controller> {
                Box::new(ListenerController(factory()))
            }),
        };
        self.entries.insert(id.into(), registration);
    }

    fn insert<C, F>(&mut self, artifact: String, kind: ControllerKind, factory: F)
    where
        C: Controller + 'static,
        F: Fn() -> C + Send + Sync + 'static,
    {
        self.entries
            .insert(artifact, Registration::new::<C, F>(kind, factory));
    }

    /// The registration for `artifact`.
    pub fn get(&self, artifact: &str) -> Option<&Registration> {
        self.entries.get(artifact)
    }

    /// Whether `artifact` is registered.
    pub fn contains(&self, artifact: &str) -> bool {
        self.entries.contains_key(artifact)
    }

    /// Whether `id` names a registered listener.
    pub fn is_listener(&self, id: &str) -> bool {
        self.get(id)
            .is_some_and(|r| r.kind == ControllerKind::Listener)
    }

    /// Checks a resolved target against the registry.
    ///
    /// Fails with `UnknownTarget` when nothing is registered at the
    /// artifact, when the declared name does not match, or when a listener
    /// is addressed as a route target. Fails with `NotMutator` when a
    /// state-changing verb reaches a non-mutator.
    pub fn resolve(&self, target: &ControllerTarget) -> Result<&Registration> {
        let unknown = || RouterError::UnknownTarget(target.artifact.clone());
        let registration = self.get(&target.artifact).ok_or_else(unknown)?;

        if registration.name != target.name
            || !registration.name.ends_with("Controller")
            || registration.kind == ControllerKind::Listener
        {
            return Err(unknown());
        }
        if target.mutator && registration.kind != ControllerKind::Mutator {
            return Err(RouterError::NotMutator(registration.name.clone()));
        }
        Ok(registration)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{Context, Flow};
    use crate::error::ControllerError;
    use crate::view::View;

    #[derive(Default)]
    struct UsersController;

    impl Controller for UsersController {
        fn run(&mut self, _ctx: &Context<'_>) -> std::result::Result<Flow, ControllerError> {
            Ok(Flow::Continue)
        }

        fn render(&self, _ctx: &Context<'_>) -> std::result::Result<View, ControllerError> {
            Ok(View::Empty)
        }
    }

    #[derive(Default)]
    struct UsersPostController;

    impl Controller for UsersPostController {
        fn run(&mut self, _ctx: &Context<'_>) -> std::result::Result<Flow, ControllerError> {
            Ok(Flow::Continue)
        }

        fn render(&self, _ctx: &Context<'_>) -> std::result::Result<View, ControllerError> {
            Ok(View::Empty)
        }
    }

    impl Mutator for UsersPostController {}

    fn target(artifact: &str, name: &str, mutator: bool) -> ControllerTarget {
        ControllerTarget {
            artifact: artifact.into(),
            name: name.into(),
            mutator,
        }
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name::<UsersController>(), "UsersController");
        assert_eq!(short_type_name::<Vec<String>>(), "Vec");
    }

    #[test]
    fn test_resolve_checks_name_and_kind() {
        let mut registry = ControllerRegistry::new();
        registry.controller::<UsersController>("admin/Users");
        registry.mutator::<UsersPostController>("admin/UsersPost");
        registry.controller::<UsersController>("admin/Wrong");

        let reg = registry
            .resolve(&target("admin/Users", "UsersController", false))
            .unwrap();
        assert_eq!(reg.kind(), ControllerKind::Standard);
        assert!(registry
            .resolve(&target("admin/UsersPost", "UsersPostController", true))
            .is_ok());

        assert!(matches!(
            registry.resolve(&target("admin/Missing", "MissingController", false)),
            Err(RouterError::UnknownTarget(_))
        ));
        assert!(matches!(
            registry.resolve(&target("admin/Wrong", "WrongController", false)),
            Err(RouterError::UnknownTarget(_))
        ));
    }

    #[test]
    fn test_mutating_verb_requires_mutator() {
        let mut registry = ControllerRegistry::new();
        registry.controller::<UsersPostController>("UsersPost");

        assert!(matches!(
            registry.resolve(&target("UsersPost", "UsersPostController", true)),
            Err(RouterError::NotMutator(name)) if name == "UsersPostController"
        ));
    }
}

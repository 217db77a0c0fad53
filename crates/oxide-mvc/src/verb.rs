//! HTTP verb to controller resolution.
//!
//! A route target such as `admin/Users` names a family of controllers:
//!
//! | verb               | artifact           | controller name          |
//! |--------------------|--------------------|--------------------------|
//! | GET                | `admin/Users`      | `UsersController`        |
//! | POST, PUT, DELETE  | `admin/UsersPost`  | `UsersPostController`    |
//! | HEAD, OPTIONS      | CORS preflight, no controller                 |
//!
//! Any other verb resolves to not-found.

use std::collections::HashMap;

use crate::request::{Headers, Method};

/// Methods advertised in preflight responses.
pub const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";

/// Preflight cache lifetime: one week, in seconds.
pub const PREFLIGHT_MAX_AGE: u32 = 604_800;

/// How a verb maps onto a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbRule {
    /// `<name>Controller` at the target itself.
    Read,
    /// `<name><Verb>Controller` at `<target><Verb>`; must be a mutator.
    Mutate,
    /// Answer with CORS headers without invoking any controller.
    Preflight,
}

/// The concrete controller a request should run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerTarget {
    /// Artifact path the controller is registered under.
    pub artifact: String,
    /// Expected controller name.
    pub name: String,
    /// Whether the controller must carry the mutator capability.
    pub mutator: bool,
}

/// Outcome of verb resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchDecision {
    /// Instantiate and run this controller.
    Invoke(ControllerTarget),
    /// Terminate with these CORS headers.
    Preflight(Headers),
    /// The verb is not routable.
    NotFound,
}

/// Maps HTTP verbs to controller names through an explicit rule table.
#[derive(Debug, Clone)]
pub struct VerbResolver {
    rules: HashMap<Method, VerbRule>,
}

impl Default for VerbResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl VerbResolver {
    /// Creates the standard rule table.
    pub fn new() -> Self {
        Self::empty()
            .rule(Method::Get, VerbRule::Read)
            .rule(Method::Post, VerbRule::Mutate)
            .rule(Method::Put, VerbRule::Mutate)
            .rule(Method::Delete, VerbRule::Mutate)
            .rule(Method::Head, VerbRule::Preflight)
            .rule(Method::Options, VerbRule::Preflight)
    }

    /// Creates a resolver that routes nothing.
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// Sets the rule for a verb.
    #[must_use]
    pub fn rule(mut self, method: Method, rule: VerbRule) -> Self {
        self.rules.insert(method, rule);
        self
    }

    /// Returns the rule for a verb, if any.
    pub fn rule_for(&self, method: Method) -> Option<VerbRule> {
        self.rules.get(&method).copied()
    }

    /// Resolves a request method and route target.
    pub fn resolve(&self, method: &str, target: &str, headers: &Headers) -> DispatchDecision {
        let Some(method) = Method::parse(method) else {
            return DispatchDecision::NotFound;
        };
        let Some(rule) = self.rule_for(method) else {
            return DispatchDecision::NotFound;
        };

        let (dir, base) = match target.rsplit_once('/') {
            Some((dir, base)) => (&target[..=dir.len()], base),
            None => ("", target),
        };

        match rule {
            VerbRule::Read => DispatchDecision::Invoke(ControllerTarget {
                artifact: target.to_string(),
                name: format!("{base}Controller"),
                mutator: false,
            }),
            VerbRule::Mutate => {
                let verb = method.title_case();
                DispatchDecision::Invoke(ControllerTarget {
                    artifact: format!("{dir}{base}{verb}"),
                    name: format!("{base}{verb}Controller"),
                    mutator: true,
                })
            }
            VerbRule::Preflight => DispatchDecision::Preflight(preflight_headers(headers)),
        }
    }
}

/// Builds the CORS preflight header set. Every header name the client sent
/// is echoed back as allowed, followed by `Access-Control-Allow-Origin`.
pub fn preflight_headers(request_headers: &Headers) -> Headers {
    let mut allowed: Vec<&str> = request_headers.names().collect();
    allowed.push("Access-Control-Allow-Origin");

    let mut headers = Headers::new();
    headers.insert("Access-Control-Allow-Origin", "*");
    headers.insert("Access-Control-Allow-Methods", ALLOWED_METHODS);
    headers.insert("Access-Control-Max-Age", PREFLIGHT_MAX_AGE.to_string());
    headers.insert("Access-Control-Allow-Headers", allowed.join(", "));
    headers
}

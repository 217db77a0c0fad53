//! Ordered route table.
//!
//! Entries are evaluated in registration order and the first match wins.
//! There is no specificity scoring: register `/users/new` before
//! `/users/:id` if both should be reachable.

use std::collections::HashMap;

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

use crate::error::{Result, RouterError};
use crate::path::{CompiledRoute, PathParams};

/// A compiled route paired with an opaque controller target.
#[derive(Debug, Clone)]
pub struct RouteEntry {
    /// Optional route name for reverse URL lookup.
    pub name: Option<String>,
    /// Compiled path pattern.
    pub route: CompiledRoute,
    /// Controller target, e.g. `admin/Users`.
    pub target: String,
}

/// The result of resolving a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<'a> {
    /// Target of the first matching entry.
    pub target: &'a str,
    /// Parameters captured from the path.
    pub params: PathParams,
}

/// An ordered list of routes built once at startup.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a route.
    pub fn register(&mut self, template: &str, target: impl Into<String>) -> Result<()> {
        self.push(None, CompiledRoute::compile(template)?, target.into());
        Ok(())
    }

    /// Registers a route under a name usable with [`RouteTable::url_for`].
    pub fn register_named(
        &mut self,
        name: impl Into<String>,
        template: &str,
        target: impl Into<String>,
    ) -> Result<()> {
        self.push(
            Some(name.into()),
            CompiledRoute::compile(template)?,
            target.into(),
        );
        Ok(())
    }

    /// Registers a route whose parameters are constrained by custom regexes.
    pub fn register_with_conditions(
        &mut self,
        template: &str,
        conditions: &HashMap<String, String>,
        target: impl Into<String>,
    ) -> Result<()> {
        self.push(
            None,
            CompiledRoute::compile_with_conditions(template, conditions)?,
            target.into(),
        );
        Ok(())
    }

    fn push(&mut self, name: Option<String>, route: CompiledRoute, target: String) {
        self.entries.push(RouteEntry {
            name,
            route,
            target,
        });
    }

    /// Resolves a path to the first matching entry.
    pub fn resolve(&self, path: &str) -> Option<RouteMatch<'_>> {
        self.entries.iter().find_map(|entry| {
            entry.route.matches(path).map(|params| RouteMatch {
                target: entry.target.as_str(),
                params,
            })
        })
    }

    /// Generates a URL for a named route. Parameters that do not appear in
    /// the template are appended as a query string, sorted by name.
    pub fn url_for(&self, name: &str, params: &HashMap<String, String>) -> Result<String> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.name.as_deref() == Some(name))
            .ok_or_else(|| RouterError::RouteNotFound(name.to_string()))?;

        let mut url = entry.route.reverse(params)?;

        let used = entry.route.template().param_names();
        let mut extra: Vec<(&String, &String)> = params
            .iter()
            .filter(|(k, _)| !used.contains(&k.as_str()))
            .collect();
        extra.sort();

        if !extra.is_empty() {
            let query: Vec<String> = extra
                .iter()
                .map(|(k, v)| {
                    format!(
                        "{}={}",
                        utf8_percent_encode(k, NON_ALPHANUMERIC),
                        utf8_percent_encode(v, NON_ALPHANUMERIC)
                    )
                })
                .collect();
            url.push('?');
            url.push_str(&query.join("&"));
        }

        Ok(url)
    }

    /// Returns the entries in registration order.
    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    /// Number of registered routes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether no routes are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

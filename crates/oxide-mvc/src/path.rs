//! Route template compilation and path matching.
//!
//! Template syntax:
//! - `/users` - literal path
//! - `/users/:id` - single-segment parameter
//! - `/files/:path+` - greedy parameter, captures the remaining segments
//! - `/posts(/:page)` - optional group, may be absent entirely
//! - `/users/` - a trailing `/` makes the trailing separator optional
//!
//! Matching is anchored at both ends.

use std::collections::{HashMap, HashSet};

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use regex::Regex;

use crate::error::{Result, RouterError};
use crate::request::decode_path_component;

/// Characters escaped when a value is substituted into a path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// A segment in a parsed route template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Verbatim text.
    Literal(String),
    /// A named parameter. Greedy parameters capture `a/b/c`.
    Param { name: String, greedy: bool },
    /// A parenthesized group that may be absent.
    Optional(Vec<Segment>),
}

/// A parsed route template. Parameter names are unique and a greedy
/// parameter is never optional and is always the final segment.
#[derive(Debug, Clone)]
pub struct RouteTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl RouteTemplate {
    /// Parses a template string.
    pub fn parse(template: &str) -> Result<Self> {
        let invalid = |reason: String| RouterError::InvalidTemplate {
            template: template.to_string(),
            reason,
        };

        let mut stack: Vec<Vec<Segment>> = vec![Vec::new()];
        let mut literal = String::new();
        let mut seen = HashSet::new();
        let mut chars = template.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '(' => {
                    flush_literal(&mut literal, &mut stack);
                    stack.push(Vec::new());
                }
                ')' => {
                    flush_literal(&mut literal, &mut stack);
                    let inner = match stack.pop() {
                        Some(inner) if !stack.is_empty() => inner,
                        _ => return Err(invalid("unbalanced `)`".to_string())),
                    };
                    push_segment(&mut stack, Segment::Optional(inner));
                }
                ':' if chars.peek().is_some_and(|n| is_word_char(*n)) => {
                    flush_literal(&mut literal, &mut stack);
                    let mut name = String::new();
                    while let Some(n) = chars.next_if(|n| is_word_char(*n)) {
                        name.push(n);
                    }
                    let greedy = chars.next_if_eq(&'+').is_some();
                    if greedy && stack.len() > 1 {
                        return Err(invalid(format!(
                            "greedy parameter `{name}` cannot be optional"
                        )));
                    }
                    if !seen.insert(name.clone()) {
                        return Err(invalid(format!("duplicate parameter `{name}`")));
                    }
                    push_segment(&mut stack, Segment::Param { name, greedy });
                }
                _ => literal.push(c),
            }
        }
        flush_literal(&mut literal, &mut stack);

        if stack.len() != 1 {
            return Err(invalid("unclosed `(`".to_string()));
        }
        let segments = stack.pop().unwrap_or_default();

        if let Some(pos) = segments
            .iter()
            .position(|s| matches!(s, Segment::Param { greedy: true, .. }))
        {
            let trailing_ok = match &segments[pos + 1..] {
                [] => true,
                [Segment::Literal(rest)] => rest == "/",
                _ => false,
            };
            if !trailing_ok {
                let name = match &segments[pos] {
                    Segment::Param { name, .. } => name.clone(),
                    _ => String::new(),
                };
                return Err(invalid(format!(
                    "greedy parameter `{name}` must be the final segment"
                )));
            }
        }

        Ok(Self {
            source: template.to_string(),
            segments,
        })
    }

    /// Returns the original template string.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns the parsed segments.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Returns every parameter name in template order.
    pub fn param_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        collect_names(&self.segments, &mut names);
        names
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn push_segment(stack: &mut [Vec<Segment>], segment: Segment) {
    if let Some(top) = stack.last_mut() {
        top.push(segment);
    }
}

fn flush_literal(literal: &mut String, stack: &mut [Vec<Segment>]) {
    if !literal.is_empty() {
        push_segment(stack, Segment::Literal(std::mem::take(literal)));
    }
}

fn collect_names<'a>(segments: &'a [Segment], out: &mut Vec<&'a str>) {
    for segment in segments {
        match segment {
            Segment::Literal(_) => {}
            Segment::Param { name, .. } => out.push(name),
            Segment::Optional(inner) => collect_names(inner, out),
        }
    }
}

/// A value captured by a route parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathValue {
    /// A single segment.
    Single(String),
    /// The segments captured by a greedy parameter.
    Multi(Vec<String>),
}

impl PathValue {
    /// Returns the value if it is a single segment.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Single(s) => Some(s),
            Self::Multi(_) => None,
        }
    }

    /// Returns the captured segments.
    pub fn segments(&self) -> &[String] {
        match self {
            Self::Single(s) => std::slice::from_ref(s),
            Self::Multi(parts) => parts,
        }
    }
}

/// Everything one route match captured, keyed by parameter name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    params: HashMap<String, PathValue>,
}

impl PathParams {
    /// No captured parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key`, replacing any earlier value.
    pub fn insert(&mut self, key: impl Into<String>, value: PathValue) {
        self.params.insert(key.into(), value);
    }

    /// The value captured for `key`.
    pub fn get(&self, key: &str) -> Option<&PathValue> {
        self.params.get(key)
    }

    /// `None` for greedy captures.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(PathValue::as_str)
    }

    /// `get_str` followed by `FromStr`.
    pub fn parse<T: std::str::FromStr>(&self, key: &str) -> Option<T> {
        self.get_str(key)?.parse().ok()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Iterates over captured parameters.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PathValue)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl IntoIterator for PathParams {
    type Item = (String, PathValue);
    type IntoIter = std::collections::hash_map::IntoIter<String, PathValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.params.into_iter()
    }
}

/// A capture slot in a compiled route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSlot {
    /// Parameter name.
    pub name: String,
    /// Whether the parameter captures multiple segments.
    pub greedy: bool,
}

/// A route template compiled into an anchored regex plus its ordered
/// parameter slots. Built once and reused for every request.
#[derive(Debug, Clone)]
pub struct CompiledRoute {
    template: RouteTemplate,
    regex: Regex,
    slots: Vec<ParamSlot>,
}

impl CompiledRoute {
    /// Compiles a route template.
    ///
    /// # Example
    ///
    /// ```
    /// use oxide_mvc::CompiledRoute;
    ///
    /// let route = CompiledRoute::compile("/posts/:id/comments/:comment_id").unwrap();
    /// let params = route.matches("/posts/123/comments/456").unwrap();
    /// assert_eq!(params.get_str("id"), Some("123"));
    /// assert_eq!(params.get_str("comment_id"), Some("456"));
    /// ```
    pub fn compile(template: &str) -> Result<Self> {
        Self::compile_with_conditions(template, &HashMap::new())
    }

    /// Compiles a route template, constraining some parameters with a
    /// custom regex instead of the default `[^/]+` / `.+`.
    pub fn compile_with_conditions(
        template: &str,
        conditions: &HashMap<String, String>,
    ) -> Result<Self> {
        let parsed = RouteTemplate::parse(template)?;
        let names = parsed.param_names();
        if let Some(unknown) = conditions.keys().find(|k| !names.contains(&k.as_str())) {
            return Err(RouterError::InvalidTemplate {
                template: template.to_string(),
                reason: format!("condition for unknown parameter `{unknown}`"),
            });
        }

        let mut pattern = String::from("^");
        let mut slots = Vec::new();
        write_pattern(parsed.segments(), conditions, &mut pattern, &mut slots);
        if template.ends_with('/') {
            pattern.push('?');
        }
        pattern.push('$');

        let regex = Regex::new(&pattern).map_err(|e| RouterError::InvalidTemplate {
            template: template.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            template: parsed,
            regex,
            slots,
        })
    }

    /// Attempts to match a full path against this route.
    ///
    /// Values are percent-decoded; greedy values are split on `/`.
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        let caps = self.regex.captures(path)?;
        let mut params = PathParams::new();

        for (i, slot) in self.slots.iter().enumerate() {
            let Some(m) = caps.name(&group_name(i)) else {
                continue;
            };
            let value = if slot.greedy {
                let segments: Vec<String> = m
                    .as_str()
                    .split('/')
                    .filter(|s| !s.is_empty())
                    .map(decode_path_component)
                    .collect();
                // Greedy captures need at least one non-empty segment.
                if segments.is_empty() {
                    return None;
                }
                PathValue::Multi(segments)
            } else {
                PathValue::Single(decode_path_component(m.as_str()))
            };
            params.insert(slot.name.clone(), value);
        }

        Some(params)
    }

    /// Returns the original template string.
    pub fn pattern(&self) -> &str {
        self.template.source()
    }

    /// Returns the parsed template.
    pub fn template(&self) -> &RouteTemplate {
        &self.template
    }

    /// Returns the capture slots in order.
    pub fn slots(&self) -> &[ParamSlot] {
        &self.slots
    }

    /// Generates a path from parameters.
    ///
    /// Optional groups are emitted only when every parameter inside them is
    /// supplied. Greedy values may contain `/`.
    pub fn reverse(&self, params: &HashMap<String, String>) -> Result<String> {
        let mut path = String::new();
        write_reverse(self.template.segments(), params, &mut path)?;
        if path.is_empty() {
            path.push('/');
        }
        Ok(path)
    }
}

fn group_name(index: usize) -> String {
    format!("p{index}")
}

fn write_pattern(
    segments: &[Segment],
    conditions: &HashMap<String, String>,
    out: &mut String,
    slots: &mut Vec<ParamSlot>,
) {
    for segment in segments {
        match segment {
            Segment::Literal(text) => out.push_str(&regex::escape(text)),
            Segment::Param { name, greedy } => {
                let body = match conditions.get(name) {
                    Some(condition) => condition.as_str(),
                    None if *greedy => ".+",
                    None => "[^/]+",
                };
                out.push_str(&format!("(?P<{}>{body})", group_name(slots.len())));
                slots.push(ParamSlot {
                    name: name.clone(),
                    greedy: *greedy,
                });
            }
            Segment::Optional(inner) => {
                out.push_str("(?:");
                write_pattern(inner, conditions, out, slots);
                out.push_str(")?");
            }
        }
    }
}

fn write_reverse(
    segments: &[Segment],
    params: &HashMap<String, String>,
    out: &mut String,
) -> Result<()> {
    for segment in segments {
        match segment {
            Segment::Literal(text) => out.push_str(text),
            Segment::Param { name, greedy } => {
                let value = params
                    .get(name)
                    .ok_or_else(|| RouterError::MissingRouteParam(name.clone()))?;
                if *greedy {
                    let encoded: Vec<String> = value
                        .split('/')
                        .map(|part| utf8_percent_encode(part, SEGMENT).to_string())
                        .collect();
                    out.push_str(&encoded.join("/"));
                } else {
                    out.push_str(&utf8_percent_encode(value, SEGMENT).to_string());
                }
            }
            Segment::Optional(inner) => {
                let mut names = Vec::new();
                collect_names(inner, &mut names);
                if !names.is_empty() && names.iter().all(|n| params.contains_key(*n)) {
                    write_reverse(inner, params, out)?;
                }
            }
        }
    }
    Ok(())
}

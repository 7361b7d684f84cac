//! Path routing.
//!
//! Routes are tried in registration order and the first one whose pattern matches the
//! whole path wins. There is no prefix matching and a trailing slash is significant.
//!
//! Two kinds of pattern exist:
//!
//! - templates, where `{name}` captures a run of characters other than `/` and `?`
//!   (`/hello/{name}/motd`)
//! - regular expressions, whose named groups become path arguments
//!   (`/files/(?P<id>[0-9]+)`)

use albatross_http::protocol::PathArgs;
use regex_lite::Regex;
use thiserror::Error;
use tracing::trace;

use crate::handler::{MethodRouter, RequestHandler};

#[derive(Error, Debug)]
pub enum RouteError {
    #[error("invalid route template '{template}': {reason}")]
    InvalidTemplate { template: String, reason: String },

    #[error("invalid route pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex_lite::Error,
    },
}

struct Route {
    pattern: String,
    matcher: Regex,
    methods: MethodRouter,
}

/// The ordered route table.
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
}

/// A matched route: its verb handlers and the arguments captured from the path.
#[derive(Debug)]
pub struct RouteMatch<'router> {
    methods: &'router MethodRouter,
    args: PathArgs,
}

impl<'router> RouteMatch<'router> {
    pub fn methods(&self) -> &'router MethodRouter {
        self.methods
    }

    pub fn args(&self) -> &PathArgs {
        &self.args
    }

    pub fn into_parts(self) -> (&'router MethodRouter, PathArgs) {
        (self.methods, self.args)
    }
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// Registers a path template such as `/hello/{name}`.
    pub fn add_route(&mut self, template: &str, methods: MethodRouter) -> Result<(), RouteError> {
        let pattern = compile_template(template)?;
        self.push(template, &pattern, methods)
    }

    /// Registers a regular expression; it must match the whole path.
    pub fn add_regex_route(&mut self, pattern: &str, methods: MethodRouter) -> Result<(), RouteError> {
        self.push(pattern, &format!("^(?:{pattern})$"), methods)
    }

    fn push(&mut self, pattern: &str, anchored: &str, methods: MethodRouter) -> Result<(), RouteError> {
        let matcher =
            Regex::new(anchored).map_err(|source| RouteError::InvalidPattern { pattern: pattern.to_string(), source })?;
        self.routes.push(Route { pattern: pattern.to_string(), matcher, methods });
        Ok(())
    }

    /// The first route matching `path`, in registration order.
    pub fn get_handler(&self, path: &str) -> Option<RouteMatch<'_>> {
        self.routes.iter().find_map(|route| {
            let captures = route.matcher.captures(path)?;
            trace!(path, pattern = %route.pattern, "route matched");

            let args = route
                .matcher
                .capture_names()
                .flatten()
                .filter_map(|name| captures.name(name).map(|m| (name, m.as_str())))
                .collect();

            Some(RouteMatch { methods: &route.methods, args })
        })
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.routes.iter().map(|r| (&r.pattern, &r.methods))).finish()
    }
}

/// Turns `/hello/{name}` into `^/hello/(?P<name>[^/?]+)$`.
fn compile_template(template: &str) -> Result<String, RouteError> {
    let invalid = |reason: &str| RouteError::InvalidTemplate { template: template.to_string(), reason: reason.to_string() };

    let mut pattern = String::from("^");
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        pattern.push_str(&regex_lite::escape(&rest[..open]));

        let after = &rest[open + 1..];
        let close = after.find('}').ok_or_else(|| invalid("unclosed '{'"))?;
        let name = &after[..close];

        let mut chars = name.chars();
        let valid_start = chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
        if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(invalid("placeholder names must be identifiers"));
        }

        pattern.push_str("(?P<");
        pattern.push_str(name);
        pattern.push_str(">[^/?]+)");
        rest = &after[close + 1..];
    }

    if rest.contains('}') {
        return Err(invalid("unmatched '}'"));
    }
    pattern.push_str(&regex_lite::escape(rest));
    pattern.push('$');
    Ok(pattern)
}

enum Pattern {
    Template(String),
    Regex(String),
}

/// Collects routes during setup; [`RouterBuilder::build`] compiles them.
#[derive(Default)]
pub struct RouterBuilder {
    routes: Vec<(Pattern, MethodRouter)>,
}

impl RouterBuilder {
    fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, template: impl Into<String>, methods: MethodRouter) -> Self {
        self.routes.push((Pattern::Template(template.into()), methods));
        self
    }

    pub fn regex_route(mut self, pattern: impl Into<String>, methods: MethodRouter) -> Self {
        self.routes.push((Pattern::Regex(pattern.into()), methods));
        self
    }

    pub fn build(self) -> Result<Router, RouteError> {
        let mut router = Router::new();
        for (pattern, methods) in self.routes {
            match pattern {
                Pattern::Template(template) => router.add_route(&template, methods)?,
                Pattern::Regex(pattern) => router.add_regex_route(&pattern, methods)?,
            }
        }
        Ok(router)
    }
}

impl std::fmt::Debug for RouterBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterBuilder").field("routes", &self.routes.len()).finish()
    }
}

macro_rules! method_router {
    ($name:ident) => {
        #[doc = concat!("Starts a [`MethodRouter`] answering `", stringify!($name), "`.")]
        pub fn $name<H: RequestHandler + 'static>(handler: H) -> MethodRouter {
            MethodRouter::new().$name(handler)
        }
    };
}

method_router!(get);
method_router!(post);
method_router!(put);
method_router!(delete);
method_router!(options);
method_router!(patch);

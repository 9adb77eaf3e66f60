//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store the compiled route table
//! - Resolve method + path to a gateway endpoint or an upstream group
//! - Decide auth requirement and cacheability per match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan in table order (acceptable for typical route counts)
//! - Explicit NotFound rather than silent default

use axum::http::Method;

use crate::config::UpstreamConfig;
use crate::routing::matcher::{AndMatcher, ExactPathMatcher, Matcher, MethodMatcher, PathPrefixMatcher};

/// Endpoints served by the gateway itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalEndpoint {
    Register,
    Login,
    Status,
    Metrics,
    Index,
}

impl LocalEndpoint {
    /// Route label for logs and metrics.
    pub fn name(&self) -> &'static str {
        match self {
            LocalEndpoint::Register => "auth_register",
            LocalEndpoint::Login => "auth_login",
            LocalEndpoint::Status => "status",
            LocalEndpoint::Metrics => "metrics",
            LocalEndpoint::Index => "index",
        }
    }
}

/// A route group proxied to an upstream pool.
#[derive(Debug)]
pub struct UpstreamRoute {
    pub group: String,
    matcher: PathPrefixMatcher,
    cacheable: bool,
}

impl UpstreamRoute {
    pub fn prefix(&self) -> &str {
        self.matcher.prefix()
    }

    /// Every upstream route requires a bearer token.
    pub fn requires_auth(&self) -> bool {
        true
    }

    /// Only GETs on allow-listed groups go through the cache.
    pub fn is_cacheable(&self, method: &Method) -> bool {
        self.cacheable && *method == Method::GET
    }
}

/// Result of a successful lookup.
#[derive(Debug, Clone, Copy)]
pub enum Route<'a> {
    Local(LocalEndpoint),
    Upstream(&'a UpstreamRoute),
}

impl Route<'_> {
    pub fn name(&self) -> &str {
        match self {
            Route::Local(endpoint) => endpoint.name(),
            Route::Upstream(route) => &route.group,
        }
    }
}

/// The static route table.
#[derive(Debug)]
pub struct Router {
    local: Vec<(AndMatcher, LocalEndpoint)>,
    upstreams: Vec<UpstreamRoute>,
}

impl Router {
    /// Compile the gateway endpoints plus one route per upstream group.
    pub fn from_config(upstreams: &[UpstreamConfig]) -> Self {
        let local = [
            (Method::POST, "/auth/register", LocalEndpoint::Register),
            (Method::POST, "/auth/login", LocalEndpoint::Login),
            (Method::GET, "/status", LocalEndpoint::Status),
            (Method::GET, "/metrics", LocalEndpoint::Metrics),
            (Method::GET, "/", LocalEndpoint::Index),
        ]
        .into_iter()
        .map(|(method, path, endpoint)| {
            let matcher = AndMatcher::new(vec![
                Box::new(MethodMatcher::new(method)),
                Box::new(ExactPathMatcher::new(path)),
            ]);
            (matcher, endpoint)
        })
        .collect();

        let mut routes: Vec<UpstreamRoute> = upstreams
            .iter()
            .map(|u| UpstreamRoute {
                group: u.name.clone(),
                matcher: PathPrefixMatcher::new(u.path_prefix.clone()),
                cacheable: u.cacheable,
            })
            .collect();
        // Longest prefix first so nested prefixes win.
        routes.sort_by(|a, b| b.prefix().len().cmp(&a.prefix().len()));

        Self {
            local,
            upstreams: routes,
        }
    }

    /// Resolve a request to a route, or `None` if nothing matches.
    pub fn match_request(&self, method: &Method, path: &str) -> Option<Route<'_>> {
        if let Some((_, endpoint)) = self.local.iter().find(|(m, _)| m.matches(method, path)) {
            return Some(Route::Local(*endpoint));
        }

        self.upstreams
            .iter()
            .find(|r| r.matcher.matches(method, path))
            .map(Route::Upstream)
    }

    pub fn upstream_routes(&self) -> &[UpstreamRoute] {
        &self.upstreams
    }
}

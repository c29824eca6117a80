//! Route storage and exact-match lookup.
//!
//! # Responsibilities
//! - Validate and store routes in insertion order
//! - Look up the route for a (method, path) pair
//! - Hand out owned copies so callers never hold the lock
//!
//! # Design Decisions
//! - One mutex guards every read and write; it is never held across I/O
//! - First match wins: a later duplicate of an existing (method, path) is
//!   stored but unreachable through `lookup`
//! - `upsert` is the explicit way to replace an entry

use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::{GatewayError, Result};
use crate::routing::target::TargetSpec;

/// A registered forwarding rule. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    method: String,
    path: String,
    target: String,
    upstream: TargetSpec,
}

impl Route {
    /// Build a route, normalising the method to uppercase and an empty path to `/`.
    pub fn new(method: &str, path: &str, target: &str) -> Result<Self> {
        validate_method(method)?;
        let upstream = TargetSpec::parse(target)?;
        Ok(Self {
            method: method.to_ascii_uppercase(),
            path: if path.is_empty() { "/".to_string() } else { path.to_string() },
            target: target.to_string(),
            upstream,
        })
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The target string exactly as registered.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn host(&self) -> &str {
        &self.upstream.host
    }

    pub fn port(&self) -> u16 {
        self.upstream.port
    }

    pub fn base_path(&self) -> &str {
        &self.upstream.base_path
    }

    /// `host:port` of the upstream.
    pub fn upstream_authority(&self) -> String {
        self.upstream.authority()
    }

    fn matches(&self, method: &str, path: &str) -> bool {
        self.method == method && self.path == path
    }

    pub fn summary(&self) -> RouteSummary {
        RouteSummary {
            method: self.method.clone(),
            path: self.path.clone(),
            target: self.target.clone(),
        }
    }
}

/// Accept only methods a client can actually send: a non-empty HTTP token.
pub fn validate_method(method: &str) -> Result<()> {
    let is_tchar = |b: u8| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b);
    if method.is_empty() || !method.bytes().all(is_tchar) {
        return Err(GatewayError::InvalidMethod(method.to_string()));
    }
    Ok(())
}

/// Introspection view of a route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSummary {
    pub method: String,
    pub path: String,
    pub target: String,
}

/// Ordered, lock-guarded collection of routes.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Mutex<Vec<Route>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, Vec<Route>> {
        self.routes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a route and return a copy of what was stored. On an invalid
    /// method or target the table is left unchanged.
    pub fn add(&self, method: &str, path: &str, target: &str) -> Result<Route> {
        let route = Route::new(method, path, target)?;
        tracing::info!(
            method = %route.method,
            path = %route.path,
            upstream = %route.upstream_authority(),
            base_path = %route.base_path(),
            "Route registered"
        );
        self.entries().push(route.clone());
        Ok(route)
    }

    /// Replace the first route with the same (method, path) in place, or append.
    ///
    /// Returns `true` when an existing entry was replaced.
    pub fn upsert(&self, method: &str, path: &str, target: &str) -> Result<bool> {
        let route = Route::new(method, path, target)?;
        let mut entries = self.entries();
        match entries.iter_mut().find(|r| r.matches(&route.method, &route.path)) {
            Some(existing) => {
                tracing::info!(
                    method = %route.method,
                    path = %route.path,
                    previous = %existing.target,
                    target = %route.target,
                    "Route replaced"
                );
                *existing = route;
                Ok(true)
            }
            None => {
                tracing::info!(method = %route.method, path = %route.path, target = %route.target, "Route registered");
                entries.push(route);
                Ok(false)
            }
        }
    }

    /// First route in insertion order whose method and path equal the query.
    ///
    /// `method` is compared as given; callers normalise it to uppercase.
    pub fn lookup(&self, method: &str, path: &str) -> Option<Route> {
        self.entries().iter().find(|r| r.matches(method, path)).cloned()
    }

    /// Snapshot of all routes in insertion order.
    pub fn list(&self) -> Vec<Route> {
        self.entries().clone()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

//! Upstream target parsing.
//!
//! Accepted shape: `[http://]host[:port][/base/path]`.
//!
//! # Design Decisions
//! - Only the `http://` scheme prefix is recognised; anything else is
//!   treated as part of the authority
//! - Port defaults to 80, base path defaults to `/`
//! - The authority is split at its last `:`

use crate::error::{GatewayError, Result};

const HTTP_SCHEME: &str = "http://";
const DEFAULT_PORT: u16 = 80;

/// Resolved upstream address and base path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSpec {
    pub host: String,
    pub port: u16,
    pub base_path: String,
}

impl TargetSpec {
    /// Parse a target string. Pure, no resolution is attempted.
    pub fn parse(target: &str) -> Result<Self> {
        let invalid = |reason| GatewayError::InvalidTarget {
            target: target.to_string(),
            reason,
        };

        let rest = target.strip_prefix(HTTP_SCHEME).unwrap_or(target);
        let (authority, base_path) = match rest.find('/') {
            Some(slash) => (&rest[..slash], &rest[slash..]),
            None => (rest, "/"),
        };

        if authority.is_empty() {
            return Err(invalid("empty authority"));
        }

        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => {
                if port.is_empty() {
                    return Err(invalid("empty port"));
                }
                let port: u16 = port.parse().map_err(|_| invalid("port is not a number in 1..=65535"))?;
                if port == 0 {
                    return Err(invalid("port must be positive"));
                }
                (host, port)
            }
            None => (authority, DEFAULT_PORT),
        };

        if host.is_empty() {
            return Err(invalid("empty host"));
        }

        Ok(Self {
            host: host.to_string(),
            port,
            base_path: base_path.to_string(),
        })
    }

    /// `host:port`, as sent in the upstream `Host` header.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

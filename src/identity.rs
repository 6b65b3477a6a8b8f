//! Caller identity resolution.
//!
//! Every request gets a [`Caller`] extension holding its identity source: the peer
//! address from the connection, or the left-most `X-Forwarded-For` entry when
//! [`IdentityConfig::trust_forwarded_for`] is set. IPv4-mapped IPv6 addresses are
//! canonicalised so one host always maps to one identity.

use axum::{
    body::Body,
    extract::{ConnectInfo, Request},
    middleware::Next,
    response::Response,
};
use std::net::{IpAddr, SocketAddr};

/// Identity used when neither a peer address nor a trusted header is available.
pub const UNKNOWN_SOURCE: &str = "unknown";

const FORWARDED_FOR: &str = "x-forwarded-for";

/// Resolved caller identity. Injected by [`resolve_caller`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Caller {
    pub source: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IdentityConfig {
    /// Use `X-Forwarded-For` (reverse proxies, tests) instead of the peer address.
    pub trust_forwarded_for: bool,
}

pub fn canonical_ip(ip: IpAddr) -> String {
    ip.to_canonical().to_string()
}

fn forwarded_for(req: &Request) -> Option<String> {
    let value = req.headers().get(FORWARDED_FOR)?.to_str().ok()?;
    let first = value.split(',').next()?.trim();
    if first.is_empty() {
        return None;
    }
    Some(match first.parse::<IpAddr>() {
        Ok(ip) => canonical_ip(ip),
        Err(_) => first.to_string(),
    })
}

/// Identity source for `req` under `config`.
pub fn resolve_source(req: &Request, config: IdentityConfig) -> String {
    if config.trust_forwarded_for {
        if let Some(source) = forwarded_for(req) {
            return source;
        }
    }
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| canonical_ip(addr.ip()))
        .unwrap_or_else(|| UNKNOWN_SOURCE.to_string())
}

/// Middleware: resolves the caller once and injects [`Caller`] for handlers.
pub async fn resolve_caller(mut req: Request<Body>, next: Next, config: IdentityConfig) -> Response {
    let source = resolve_source(&req, config);
    req.extensions_mut().insert(Caller { source });
    next.run(req).await
}

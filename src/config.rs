//! Server configuration from environment variables.
//!
//! `PORT` (default 3000), `BIND_ADDR` (default 0.0.0.0), `EVENT_LOG_CAPACITY`
//! (default 2000) and `TRUST_FORWARDED_FOR` (`1`/`true` to enable). Unparseable
//! values fall back to the defaults.

use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};

use crate::events::DEFAULT_EVENT_CAPACITY;
use crate::identity::IdentityConfig;

pub const DEFAULT_PORT: u16 = 3000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: IpAddr,
    pub port: u16,
    pub event_log_capacity: usize,
    pub trust_forwarded_for: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            event_log_capacity: DEFAULT_EVENT_CAPACITY,
            trust_forwarded_for: false,
        }
    }
}

impl ServerConfig {
    /// Load from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. For tests.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let bind_addr = lookup("BIND_ADDR")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.bind_addr);
        let port = lookup("PORT")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.port);
        let event_log_capacity = lookup("EVENT_LOG_CAPACITY")
            .and_then(|s| s.trim().parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(defaults.event_log_capacity);
        let trust_forwarded_for = lookup("TRUST_FORWARDED_FOR")
            .map(|v| {
                let v = v.trim();
                v == "1" || v.eq_ignore_ascii_case("true")
            })
            .unwrap_or(defaults.trust_forwarded_for);
        Self {
            bind_addr,
            port,
            event_log_capacity,
            trust_forwarded_for,
        }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }

    pub fn identity(&self) -> IdentityConfig {
        IdentityConfig {
            trust_forwarded_for: self.trust_forwarded_for,
        }
    }
}

/// Host name reported by `/status`: `HOSTNAME`, then `/etc/hostname`, else `localhost`.
pub fn hostname() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .or_else(|| std::fs::read_to_string("/etc/hostname").ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

/// Primary non-loopback IPv4 address, for the startup banner only.
///
/// Connecting a UDP socket sends nothing; it only asks the OS which local address
/// would route outward.
pub fn lan_ipv4() -> Option<Ipv4Addr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).ok()?;
    socket.connect((Ipv4Addr::new(8, 8, 8, 8), 80)).ok()?;
    match socket.local_addr().ok()?.ip() {
        IpAddr::V4(ip) if !ip.is_loopback() && !ip.is_unspecified() => Some(ip),
        _ => None,
    }
}

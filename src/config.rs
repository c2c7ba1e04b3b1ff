//! Runtime configuration from environment variables.
//!
//! Every setting has a typed default; an unset or unparsable variable falls
//! back to it. The binary loads a `.env` file first if one exists.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_BIND_ADDR: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
const DEFAULT_SUBSCRIBER_CHANNEL_CAPACITY: usize = 256;
const DEFAULT_OUTBOX_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Relay listen port.
    pub port: u16,
    /// Relay listen address.
    pub bind_addr: IpAddr,
    /// Buffered change events per board subscriber before it is dropped as too slow.
    pub subscriber_channel_capacity: usize,
    /// Buffered writes between a sync bridge and its writer task.
    pub outbox_channel_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind_addr: DEFAULT_BIND_ADDR,
            subscriber_channel_capacity: DEFAULT_SUBSCRIBER_CHANNEL_CAPACITY,
            outbox_channel_capacity: DEFAULT_OUTBOX_CHANNEL_CAPACITY,
        }
    }
}

impl Config {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            port: env_parse("PORT", DEFAULT_PORT),
            bind_addr: env_parse("BIND_ADDR", DEFAULT_BIND_ADDR),
            subscriber_channel_capacity: env_parse("SUBSCRIBER_CHANNEL_CAPACITY", DEFAULT_SUBSCRIBER_CHANNEL_CAPACITY)
                .max(1),
            outbox_channel_capacity: env_parse("OUTBOX_CHANNEL_CAPACITY", DEFAULT_OUTBOX_CHANNEL_CAPACITY).max(1),
        }
    }

    #[must_use]
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

///! Ranked DX cluster endpoint list with wrap-around failover.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Error)]
#[error("invalid endpoint '{0}', expected host:port")]
pub struct EndpointParseError(String);

impl FromStr for Endpoint {
    type Err = EndpointParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| EndpointParseError(s.to_string()))?;
        if host.is_empty() {
            return Err(EndpointParseError(s.to_string()));
        }
        let port = port
            .parse::<u16>()
            .map_err(|_| EndpointParseError(s.to_string()))?;
        Ok(Endpoint::new(host, port))
    }
}

/// One primary endpoint plus ordered backups. `advance` moves to the next
/// candidate (wrapping); a successful failover promotes the endpoint that
/// worked to primary for the rest of the run.
#[derive(Debug, Clone)]
pub struct EndpointRing {
    endpoints: Vec<Endpoint>,
    current: usize,
}

impl EndpointRing {
    pub fn new(primary: Endpoint, backups: Vec<Endpoint>) -> Self {
        let mut endpoints = Vec::with_capacity(backups.len() + 1);
        endpoints.push(primary);
        endpoints.extend(backups);
        Self {
            endpoints,
            current: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn current(&self) -> &Endpoint {
        &self.endpoints[self.current]
    }

    /// Move to the next candidate, wrapping at the end of the list.
    pub fn advance(&mut self) -> &Endpoint {
        self.current = (self.current + 1) % self.endpoints.len();
        self.current()
    }

    /// Make the current endpoint the primary, so reconnect passes start
    /// from it instead of the configured primary.
    pub fn promote_current(&mut self) {
        if self.current > 0 {
            let endpoint = self.endpoints.remove(self.current);
            self.endpoints.insert(0, endpoint);
            self.current = 0;
        }
    }

    /// Reset the walk position to the primary.
    pub fn rewind(&mut self) {
        self.current = 0;
    }
}

//! Proxy candidates and validated endpoints.

use crate::error::{Error, Result};

use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// A `host:port` endpoint believed to be a SOCKS5 proxy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Candidate {
    /// Hostname or IP literal, without IPv6 brackets.
    pub host: String,
    /// TCP port of the proxy.
    pub port: u16,
}

impl Candidate {
    /// Create a candidate from its parts.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port }
    }

    /// The `socks5://host:port` URL for this candidate.
    pub fn proxy_url(&self) -> Result<Url> {
        Url::parse(&format!("socks5://{}", self)).map_err(|_| Error::InvalidCandidate {
            input: self.to_string(),
            reason: "not representable as a socks5 url",
        })
    }

    /// Convert the candidate to a reqwest::Proxy covering every scheme.
    pub fn to_reqwest_proxy(&self) -> Result<reqwest::Proxy> {
        Ok(reqwest::Proxy::all(self.proxy_url()?)?)
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl FromStr for Candidate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason| Error::InvalidCandidate { input: s.to_string(), reason };

        let trimmed = s.trim();
        let rest = ["socks5://", "socks5h://"]
            .iter()
            .find_map(|scheme| trimmed.strip_prefix(scheme))
            .unwrap_or(trimmed)
            .trim_end_matches('/');

        let (host, port) = if let Some(bracketed) = rest.strip_prefix('[') {
            let (host, tail) = bracketed.split_once(']').ok_or_else(|| invalid("unclosed '['"))?;
            let port = tail.strip_prefix(':').ok_or_else(|| invalid("missing port"))?;
            (host, port)
        } else {
            rest.rsplit_once(':').ok_or_else(|| invalid("missing port"))?
        };

        if host.is_empty() {
            return Err(invalid("empty host"));
        }
        if !rest.starts_with('[') && host.contains(':') {
            return Err(invalid("ipv6 hosts must be bracketed"));
        }
        let port: u16 = port.parse().map_err(|_| invalid("port is not a number in 0..=65535"))?;
        if port == 0 {
            return Err(invalid("port 0"));
        }

        Ok(Self::new(host, port))
    }
}

/// A candidate that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedProxy {
    /// The endpoint that answered.
    pub candidate: Candidate,
    /// Time from probe start until the response status arrived.
    pub latency: Duration,
}

impl fmt::Display for ValidatedProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.candidate.fmt(f)
    }
}

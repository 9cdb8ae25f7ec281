//! v2ray routing configuration.

use crate::error::Result;
use crate::proxy::Candidate;

use log::debug;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Local SOCKS listener exposed by v2ray.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundConfig {
    /// Address v2ray listens on.
    pub listen: String,
    /// SOCKS port applications connect to.
    pub port: u16,
}

impl Default for InboundConfig {
    fn default() -> Self {
        Self { listen: "127.0.0.1".to_string(), port: 8888 }
    }
}

/// The v2ray JSON document: one SOCKS inbound, one SOCKS outbound.
#[derive(Debug, Serialize)]
pub struct V2rayConfig {
    inbounds: Vec<Inbound>,
    outbounds: Vec<Outbound>,
}

#[derive(Debug, Serialize)]
struct Inbound {
    port: u16,
    listen: String,
    protocol: &'static str,
    settings: InboundSettings,
}

#[derive(Debug, Serialize)]
struct InboundSettings {
    auth: &'static str,
    udp: bool,
}

#[derive(Debug, Serialize)]
struct Outbound {
    protocol: &'static str,
    settings: OutboundSettings,
}

#[derive(Debug, Serialize)]
struct OutboundSettings {
    servers: Vec<Server>,
}

#[derive(Debug, Serialize)]
struct Server {
    address: String,
    port: u16,
}

impl V2rayConfig {
    /// A config that accepts SOCKS on `inbound` and forwards everything to `upstream`.
    pub fn for_upstream(upstream: &Candidate, inbound: &InboundConfig) -> Self {
        Self {
            inbounds: vec![Inbound {
                port: inbound.port,
                listen: inbound.listen.clone(),
                protocol: "socks",
                settings: InboundSettings { auth: "noauth", udp: true },
            }],
            outbounds: vec![Outbound {
                protocol: "socks",
                settings: OutboundSettings {
                    servers: vec![Server { address: upstream.host.clone(), port: upstream.port }],
                },
            }],
        }
    }

    /// Serialize with 2-space indentation.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Writes the v2ray config file for a chosen upstream.
#[derive(Debug, Clone)]
pub struct ConfigEmitter {
    path: PathBuf,
    inbound: InboundConfig,
}

impl ConfigEmitter {
    /// Create an emitter writing to `path`.
    pub fn new(path: impl Into<PathBuf>, inbound: InboundConfig) -> Self {
        Self { path: path.into(), inbound }
    }

    /// Where the config is written.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The local listener put in every config.
    pub fn inbound(&self) -> &InboundConfig {
        &self.inbound
    }

    /// Overwrite the config file so that v2ray routes through `upstream`.
    pub fn write(&self, upstream: &Candidate) -> Result<()> {
        let mut json = V2rayConfig::for_upstream(upstream, &self.inbound).to_json()?;
        json.push('\n');

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, json)?;
        debug!("Wrote v2ray config for {} to {}", upstream, self.path.display());
        Ok(())
    }
}

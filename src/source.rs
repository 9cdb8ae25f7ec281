//! Candidate sources.

use crate::error::{Error, Result};
use crate::proxy::Candidate;
use crate::utils;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use log::{info, warn};
use reqwest::Client;
use serde::Deserialize;
use std::path::Path;
use url::Url;

/// FOFA's error code for an invalid or unknown api key.
const INVALID_KEY_CODE: &str = "-700";

/// Something that can list SOCKS5 candidates.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// Total number of candidates the source could return.
    async fn total_count(&self) -> Result<usize>;

    /// Fetch up to `limit` candidates.
    async fn fetch(&self, limit: usize) -> Result<Vec<Candidate>>;
}

/// Response body of FOFA's `search/all` endpoint.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchResponse {
    error: bool,
    errmsg: String,
    size: usize,
    results: Vec<Vec<String>>,
}

/// Candidates from the FOFA search API.
pub struct FofaSource {
    client: Client,
    endpoint: Url,
    api_key: String,
    qbase64: String,
}

impl FofaSource {
    /// Create a source for `query`, served from `base_url` (e.g. `https://fofa.info`).
    pub fn new(base_url: &str, api_key: impl Into<String>, query: &str) -> Result<Self> {
        let invalid = |e: url::ParseError| Error::InvalidSetting {
            name: "fofa.base_url",
            reason: format!("{base_url:?}: {e}"),
        };
        let endpoint = Url::parse(base_url)
            .and_then(|base| base.join("/api/v1/search/all"))
            .map_err(invalid)?;

        Ok(Self {
            client: Client::new(),
            endpoint,
            api_key: api_key.into(),
            qbase64: STANDARD.encode(query),
        })
    }

    async fn search(&self, size: usize) -> Result<SearchResponse> {
        let size = size.to_string();
        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[
                ("key", self.api_key.as_str()),
                ("qbase64", self.qbase64.as_str()),
                ("size", size.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::UnexpectedStatus(response.status()));
        }

        let body: SearchResponse = response.json().await?;
        if body.errmsg.contains(INVALID_KEY_CODE) {
            return Err(Error::InvalidApiKey(body.errmsg));
        }
        if body.error {
            return Err(Error::Fofa(body.errmsg));
        }
        Ok(body)
    }
}

#[async_trait]
impl CandidateSource for FofaSource {
    async fn total_count(&self) -> Result<usize> {
        Ok(self.search(1).await?.size)
    }

    async fn fetch(&self, limit: usize) -> Result<Vec<Candidate>> {
        let body = self.search(limit).await?;
        let rows = body.results.len();

        let candidates = body
            .results
            .into_iter()
            .filter(|row| row.len() >= 2)
            .filter_map(|row| match row[0].parse::<Candidate>() {
                Ok(candidate) => Some(candidate),
                Err(e) => {
                    warn!("Skipping FOFA result: {}", e);
                    None
                }
            });
        let candidates = utils::dedup_in_order(candidates);

        info!("Fetched {} candidates from {} FOFA results", candidates.len(), rows);
        Ok(candidates)
    }
}

/// A fixed list of candidates, e.g. read from a file.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    candidates: Vec<Candidate>,
}

impl StaticSource {
    /// Create a source serving `candidates`, deduplicated.
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self { candidates: utils::dedup_in_order(candidates) }
    }

    /// Read a newline-separated candidate list from a file.
    pub async fn from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let candidates = utils::parse_candidate_list(&content);
        info!("Loaded {} candidates from {}", candidates.len(), path.display());
        Ok(Self { candidates })
    }
}

#[async_trait]
impl CandidateSource for StaticSource {
    async fn total_count(&self) -> Result<usize> {
        Ok(self.candidates.len())
    }

    async fn fetch(&self, limit: usize) -> Result<Vec<Candidate>> {
        Ok(self.candidates.iter().take(limit).cloned().collect())
    }
}

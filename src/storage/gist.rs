use std::{collections::HashMap, time::Duration};

use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use super::{from_json, to_json, LinkStore, SentLinks};
use crate::{config::GistConfig, error::StoreError};

const API_BASE_URL: &str = "https://api.github.com";
const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";
const CLIENT_USER_AGENT: &str = concat!("feed-relay/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct GistDocument {
    #[serde(default)]
    files: HashMap<String, GistFile>,
    #[serde(default)]
    history: Vec<GistVersion>,
    updated_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GistFile {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GistVersion {
    version: String,
}

impl GistDocument {
    /// Newest history entry first, as the API returns it.
    fn revision(&self) -> Option<String> {
        self.history
            .first()
            .map(|h| h.version.clone())
            .or_else(|| self.updated_at.clone())
    }
}

/// Sent links kept as one JSON file inside a GitHub Gist.
pub struct GistStorage {
    client: reqwest::Client,
    api_base_url: String,
    token: String,
    gist_id: String,
    file_name: String,
    cap: usize,
    revision: Option<String>,
}

impl GistStorage {
    #[must_use]
    pub fn new(config: &GistConfig, cap: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base_url: API_BASE_URL.to_string(),
            token: config.token.clone(),
            gist_id: config.id.clone(),
            file_name: config.file_name.clone(),
            cap,
            revision: None,
        }
    }

    #[allow(dead_code)]
    fn with_base_url(&mut self, base_url: String) -> &mut Self {
        self.api_base_url = base_url;
        self
    }

    fn gist_url(&self) -> String {
        format!("{}/gists/{}", self.api_base_url, self.gist_id)
    }

    fn request(&self, method: reqwest::Method) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.gist_url())
            .header(AUTHORIZATION, format!("token {}", self.token))
            .header(ACCEPT, GITHUB_ACCEPT)
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
    }

    async fn fetch_gist(&self) -> Result<GistDocument, StoreError> {
        let response = self.request(reqwest::Method::GET).send().await?;
        let status = response.status();
        debug!(%status, gist = %self.gist_id, "gist responded");
        if !status.is_success() {
            return Err(StoreError::Status(status));
        }
        Ok(response.json::<GistDocument>().await?)
    }
}

impl LinkStore for GistStorage {
    async fn load(&mut self) -> SentLinks {
        info!(gist = %self.gist_id, "loading sent links from gist");
        let document = match self.fetch_gist().await {
            Ok(document) => document,
            Err(e) => {
                warn!(gist = %self.gist_id, error = %e, "could not load gist, starting empty");
                self.revision = None;
                return SentLinks::default();
            }
        };

        self.revision = document.revision();
        let Some(content) = document
            .files
            .get(&self.file_name)
            .and_then(|f| f.content.as_deref())
        else {
            warn!(file = %self.file_name, "file not found in gist, starting empty");
            return SentLinks::default();
        };

        match from_json(content) {
            Ok(links) => {
                info!(count = links.len(), "loaded sent links from gist");
                links
            }
            Err(e) => {
                warn!(file = %self.file_name, error = %e, "malformed gist file, starting empty");
                SentLinks::default()
            }
        }
    }

    /// Check the gist revision still matches the one loaded, then patch the file.
    async fn save(&mut self, links: &SentLinks) -> Result<usize, StoreError> {
        let found = self.fetch_gist().await?.revision();
        if found != self.revision {
            return Err(StoreError::Conflict {
                loaded: self.revision.clone(),
                found,
            });
        }

        let latest = links.latest(self.cap);
        let mut files = serde_json::Map::new();
        files.insert(self.file_name.clone(), json!({ "content": to_json(&latest)? }));
        let body = json!({ "files": files });

        info!(count = latest.len(), gist = %self.gist_id, "saving sent links to gist");
        let response = self
            .request(reqwest::Method::PATCH)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Status(status));
        }

        self.revision = response
            .json::<GistDocument>()
            .await
            .ok()
            .and_then(|d| d.revision());
        Ok(latest.len())
    }
}

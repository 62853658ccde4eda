//! Blocking client for the GitHub contents API.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use serde::Deserialize;

use crate::error::{HubError, Result};

pub const GH_API: &str = "https://api.github.com";
pub const USER_AGENT: &str = "skillhub";

/// Maximum decoded size of one fetched file (5 MB).
const MAX_FILE_SIZE: usize = 5 * 1024 * 1024;

/// One entry of a contents listing.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl ContentEntry {
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.kind == "dir"
    }

    #[must_use]
    pub fn is_file(&self) -> bool {
        self.kind == "file"
    }
}

#[derive(Debug, Deserialize)]
struct FileContent {
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: String,
}

/// Token from `SKILLHUB_GITHUB_TOKEN`, `GITHUB_TOKEN` or `GH_TOKEN`, first set wins.
pub fn token_from_env() -> Option<String> {
    ["SKILLHUB_GITHUB_TOKEN", "GITHUB_TOKEN", "GH_TOKEN"]
        .iter()
        .find_map(|name| std::env::var(name).ok().filter(|v| !v.trim().is_empty()))
}

#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: Client,
    api_base: String,
    user_agent: String,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(api_base: impl Into<String>, user_agent: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            user_agent: user_agent.into(),
            token,
        }
    }

    #[must_use]
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    #[must_use]
    pub const fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn contents_url(&self, owner: &str, repo: &str, path: &str, branch: &str) -> String {
        let path = path
            .split('/')
            .filter(|p| !p.is_empty())
            .map(|p| urlencoding::encode(p).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        format!(
            "{}/repos/{owner}/{repo}/contents/{path}?ref={}",
            self.api_base,
            urlencoding::encode(branch)
        )
    }

    /// List a directory. A missing path is `Ok(None)`.
    pub fn list_dir(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        branch: &str,
    ) -> Result<Option<Vec<ContentEntry>>> {
        let url = self.contents_url(owner, repo, path, branch);
        let response = self.get(&url)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(response, &url)?;
        let entries = response
            .json::<Vec<ContentEntry>>()
            .map_err(|err| HubError::RemoteFetch(format!("parse listing {url}: {err}")))?;
        Ok(Some(entries))
    }

    /// Fetch and decode one text file. A missing path is `Ok(None)`.
    pub fn get_file(&self, owner: &str, repo: &str, path: &str, branch: &str) -> Result<Option<String>> {
        let url = self.contents_url(owner, repo, path, branch);
        let response = self.get(&url)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(response, &url)?;
        let file = response
            .json::<FileContent>()
            .map_err(|err| HubError::RemoteFetch(format!("parse file {url}: {err}")))?;
        decode_content(&file, &url).map(Some)
    }

    fn get(&self, url: &str) -> Result<Response> {
        let mut request = self
            .client
            .get(url)
            .header("User-Agent", &self.user_agent)
            .header("Accept", "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        request
            .send()
            .map_err(|err| HubError::RemoteFetch(format!("GET {url}: {err}")))
    }
}

fn check_status(response: Response, url: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let exhausted = response
        .headers()
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim() == "0");
    if status == StatusCode::TOO_MANY_REQUESTS || (status == StatusCode::FORBIDDEN && exhausted) {
        return Err(HubError::RemoteRateLimited(format!("GET {url}: HTTP {status}")));
    }
    Err(HubError::RemoteFetch(format!("GET {url}: HTTP {status}")))
}

fn decode_content(file: &FileContent, url: &str) -> Result<String> {
    if !file.encoding.is_empty() && file.encoding != "base64" {
        return Err(HubError::RemoteFetch(format!(
            "{url}: unsupported encoding {}",
            file.encoding
        )));
    }
    let compact: String = file.content.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|err| HubError::RemoteFetch(format!("{url}: bad base64: {err}")))?;
    if bytes.len() > MAX_FILE_SIZE {
        return Err(HubError::RemoteFetch(format!(
            "{url}: file exceeds {} MB",
            MAX_FILE_SIZE / (1024 * 1024)
        )));
    }
    String::from_utf8(bytes).map_err(|err| HubError::RemoteFetch(format!("{url}: not UTF-8: {err}")))
}

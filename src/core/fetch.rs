//! Fetching app manifests from the hosting service without cloning.
//!
//! The contents API is tried first; its payload carries the file base64 encoded.
//! When the API call fails or answers with an error document (rate limiting, for
//! instance) the same file is fetched from the raw-content host at the same ref.
//!
//! # Public API
//! - [`ManifestFetcher`]: Memoising fetcher built from the workspace configuration
//! - [`AppSpec`]: `org/repo@branch` specifiers
//! - [`is_git_url`]: Tell git URLs apart from specifiers

use crate::core::{
    config::WorkspaceConfig,
    deps::{self, ManifestSource},
    error::{AppyardError, Result},
    manifest::{compile, HOOKS_FILE},
};
use base64::Engine;
use regex::Regex;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::LazyLock;

pub const DEFAULT_REF: &str = "develop";

static GIT_URL: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^(?:git|ssh|https?|\w*@[-\w.]+):(//)?(.*?)(\.git)?(/?|#[-\d\w._]+?)$"));

/// True for anything git would accept as a remote URL (`https://`, `ssh://`, `git@host:`)
pub fn is_git_url(text: &str) -> bool {
    GIT_URL.is_match(text)
}

/// An app specifier: `org/repo@branch`, `repo@branch`, `org/repo` or `repo`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppSpec {
    pub org: Option<String>,
    pub repo: String,
    pub branch: Option<String>,
}

impl AppSpec {
    pub fn parse(spec: &str) -> Result<Self> {
        let spec = spec.trim();
        let (path, branch) = match spec.split_once('@') {
            Some((path, branch)) => (path, Some(branch)),
            None => (spec, None),
        };

        let (org, repo) = match path.split_once('/') {
            Some((org, repo)) => (Some(org), repo),
            None => (None, path),
        };

        if repo.is_empty() || repo.contains('/') || org.is_some_and(str::is_empty) {
            return Err(AppyardError::config_error(format!(
                "Invalid app specifier '{spec}', expected org/repo@branch"
            )));
        }

        Ok(Self {
            org: org.map(str::to_string),
            repo: repo.to_string(),
            branch: branch.filter(|b| !b.is_empty()).map(str::to_string),
        })
    }

    pub fn git_ref(&self) -> &str {
        self.branch.as_deref().unwrap_or(DEFAULT_REF)
    }
}

/// Decode a contents API document; `None` when it is an error document
pub fn decode_contents_payload(payload: &Value) -> Result<Option<String>> {
    if payload.get("message").is_some() {
        return Ok(None);
    }

    let Some(encoded) = payload.get("content").and_then(Value::as_str) else {
        return Ok(None);
    };

    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = base64::engine::general_purpose::STANDARD.decode(compact)?;
    Ok(Some(String::from_utf8(bytes)?))
}

type FetchKey = (String, String, String, String);

pub struct ManifestFetcher {
    client: Client,
    api_url: String,
    raw_url: String,
    web_url: String,
    organisations: Vec<String>,
    memo: HashMap<FetchKey, String>,
}

impl ManifestFetcher {
    pub fn new(config: &WorkspaceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.network.http_timeout())
            .user_agent(concat!("appyard/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            api_url: config.github_api_url.trim_end_matches('/').to_string(),
            raw_url: config.github_raw_url.trim_end_matches('/').to_string(),
            web_url: config.github_url.trim_end_matches('/').to_string(),
            organisations: config.organisations.clone(),
            memo: HashMap::new(),
        })
    }

    /// Content of `<repo>/<file>` in `org/repo` at `branch` (default `develop`)
    pub fn fetch(&mut self, org: &str, repo: &str, branch: Option<&str>, file: &str) -> Result<String> {
        let git_ref = branch.unwrap_or(DEFAULT_REF);
        let key = (org.to_string(), repo.to_string(), git_ref.to_string(), file.to_string());
        if let Some(content) = self.memo.get(&key) {
            return Ok(content.clone());
        }

        let content = match self.fetch_from_api(org, repo, git_ref, file) {
            Ok(Some(content)) => content,
            Ok(None) => self.fetch_raw(org, repo, git_ref, file)?,
            Err(e) => {
                log::warn!("Contents API failed for {org}/{repo}@{git_ref}: {e}");
                self.fetch_raw(org, repo, git_ref, file)?
            }
        };

        self.memo.insert(key, content.clone());
        Ok(content)
    }

    fn fetch_from_api(&self, org: &str, repo: &str, git_ref: &str, file: &str) -> Result<Option<String>> {
        let url = format!("{}/repos/{org}/{repo}/contents/{repo}/{file}", self.api_url);
        log::debug!("GET {url}?ref={git_ref}");

        let response = self.client.get(&url).query(&[("ref", git_ref)]).send()?;
        let status = response.status();
        let payload: Value = response.json()?;

        let decoded = decode_contents_payload(&payload)?;
        if decoded.is_none() {
            let message = payload.get("message").and_then(Value::as_str).unwrap_or("no content");
            log::debug!("Contents API answered {status}: {message}");
        }
        Ok(decoded)
    }

    fn fetch_raw(&self, org: &str, repo: &str, git_ref: &str, file: &str) -> Result<String> {
        let url = format!("{}/{org}/{repo}/{git_ref}/{repo}/{file}", self.raw_url);
        log::debug!("GET {url}");

        let response = self.client.get(&url).send()?.error_for_status()?;
        Ok(response.text()?)
    }

    /// First configured organisation hosting `repo`
    pub fn find_org(&self, repo: &str) -> Result<String> {
        for org in &self.organisations {
            let api = format!("{}/repos/{org}/{repo}", self.api_url);
            let mut status = self.head_status(&api);

            if matches!(status, Some(StatusCode::BAD_REQUEST | StatusCode::FORBIDDEN)) {
                status = self.head_status(&format!("{}/{org}/{repo}", self.web_url));
            }

            if status.is_some_and(|status| status.is_success()) {
                log::debug!("Found {repo} in {org}");
                return Ok(org.clone());
            }
        }

        Err(AppyardError::OrganisationNotFound {
            repo: repo.to_string(),
            organisations: self.organisations.clone(),
        })
    }

    fn head_status(&self, url: &str) -> Option<StatusCode> {
        match self.client.head(url).send() {
            Ok(response) => Some(response.status()),
            Err(e) => {
                log::debug!("HEAD {url} failed: {e}");
                None
            }
        }
    }

    /// `required_apps` of the app a specifier names, read from its remote `hooks.py`
    pub fn required_apps(&mut self, spec: &AppSpec) -> Result<Vec<String>> {
        let org = match &spec.org {
            Some(org) => org.clone(),
            None => self.find_org(&spec.repo)?,
        };

        let content = self.fetch(&org, &spec.repo, spec.branch.as_deref(), HOOKS_FILE)?;
        deps::required_apps(&ManifestSource::Content {
            name: format!("{org}/{}@{}", spec.repo, spec.git_ref()),
            content,
        })
    }
}

//! GitHub contents-API remote store adapter
//!
//! Publishes objects as files in a GitHub Pages branch. The file's blob
//! `sha` doubles as the revision: updates and deletes carry it, and the
//! API rejects a write against a stale sha, which is exactly the
//! optimistic precondition the publish pipeline's index update needs.

use async_trait::async_trait;
use base64::prelude::*;
use serde::{Deserialize, Serialize};

use crate::application::ports::{RemoteObject, RemoteStore, RemoteStoreError};

/// GitHub REST API base URL
const API_BASE_URL: &str = "https://api.github.com";

// Request/response types for the contents API

#[derive(Debug, Serialize)]
struct PutContentRequest {
    message: String,
    content: String,
    branch: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<String>,
}

#[derive(Debug, Serialize)]
struct DeleteContentRequest {
    message: String,
    sha: String,
    branch: String,
}

#[derive(Debug, Deserialize)]
struct ContentResponse {
    content: Option<String>,
    sha: String,
}

/// Remote store backed by a GitHub Pages repository.
pub struct GithubRemoteStore {
    /// "owner/repo"
    repo: String,
    branch: String,
    token: String,
    api_base: String,
    client: reqwest::Client,
}

impl GithubRemoteStore {
    /// Create a store for `owner/repo` on the given branch.
    pub fn new(
        repo: impl Into<String>,
        branch: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            repo: repo.into(),
            branch: branch.into(),
            token: token.into(),
            api_base: API_BASE_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Create with a custom API base URL (tests).
    pub fn with_api_base(
        repo: impl Into<String>,
        branch: impl Into<String>,
        token: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Self {
        Self {
            repo: repo.into(),
            branch: branch.into(),
            token: token.into(),
            api_base: api_base.into(),
            client: reqwest::Client::new(),
        }
    }

    fn contents_url(&self, path: &str) -> String {
        format!("{}/repos/{}/contents/{}", self.api_base, self.repo, path)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", "application/vnd.github.v3+json")
            .header("User-Agent", "sauntercast")
    }

    /// Look up the current blob sha of a path, if the file exists.
    async fn current_sha(&self, path: &str) -> Result<Option<String>, RemoteStoreError> {
        Ok(self.read(path).await?.map(|object| object.revision))
    }
}

#[async_trait]
impl RemoteStore for GithubRemoteStore {
    async fn read(&self, path: &str) -> Result<Option<RemoteObject>, RemoteStoreError> {
        let url = format!("{}?ref={}", self.contents_url(path), self.branch);
        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .map_err(|e| RemoteStoreError::RequestFailed(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(RemoteStoreError::RequestFailed(format!(
                "HTTP {} reading {path}",
                response.status()
            )));
        }

        let body: ContentResponse = response
            .json()
            .await
            .map_err(|e| RemoteStoreError::RequestFailed(e.to_string()))?;

        // The API wraps base64 content across lines
        let encoded: String = body
            .content
            .unwrap_or_default()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        let bytes = BASE64_STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| RemoteStoreError::RequestFailed(format!("bad content encoding: {e}")))?;
        let content = String::from_utf8(bytes)
            .map_err(|e| RemoteStoreError::RequestFailed(format!("non-UTF-8 content: {e}")))?;

        Ok(Some(RemoteObject {
            content,
            revision: body.sha,
        }))
    }

    async fn write(
        &self,
        path: &str,
        content: &str,
        expected_revision: Option<&str>,
    ) -> Result<(), RemoteStoreError> {
        // Unconditional overwrite still needs the current sha if the file
        // exists; a caller-supplied revision is used as-is
        let sha = match expected_revision {
            Some(revision) => Some(revision.to_string()),
            None => self.current_sha(path).await?,
        };

        let body = PutContentRequest {
            message: format!("Publish {path}"),
            content: BASE64_STANDARD.encode(content.as_bytes()),
            branch: self.branch.clone(),
            sha,
        };

        let response = self
            .authorized(self.client.put(self.contents_url(path)))
            .json(&body)
            .send()
            .await
            .map_err(|e| RemoteStoreError::RequestFailed(e.to_string()))?;

        match response.status() {
            status if status.is_success() => Ok(()),
            reqwest::StatusCode::CONFLICT | reqwest::StatusCode::UNPROCESSABLE_ENTITY => {
                Err(RemoteStoreError::Conflict(path.to_string()))
            }
            status => Err(RemoteStoreError::RequestFailed(format!(
                "HTTP {status} writing {path}"
            ))),
        }
    }

    async fn delete(&self, path: &str, revision: &str) -> Result<(), RemoteStoreError> {
        let body = DeleteContentRequest {
            message: format!("Remove {path}"),
            sha: revision.to_string(),
            branch: self.branch.clone(),
        };

        let response = self
            .authorized(self.client.delete(self.contents_url(path)))
            .json(&body)
            .send()
            .await
            .map_err(|e| RemoteStoreError::RequestFailed(e.to_string()))?;

        match response.status() {
            status if status.is_success() => Ok(()),
            reqwest::StatusCode::NOT_FOUND => Err(RemoteStoreError::NotFound(path.to_string())),
            reqwest::StatusCode::CONFLICT => Err(RemoteStoreError::Conflict(path.to_string())),
            status => Err(RemoteStoreError::RequestFailed(format!(
                "HTTP {status} deleting {path}"
            ))),
        }
    }

    fn public_url(&self, id: &str) -> String {
        match self.repo.split_once('/') {
            Some((owner, name)) => format!("https://{owner}.github.io/{name}/#/view/{id}"),
            None => format!("https://{}/#/view/{id}", self.repo),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_url_points_at_pages_site() {
        let store = GithubRemoteStore::new("alice/saunters", "gh-pages", "tok");
        assert_eq!(
            store.public_url("abc"),
            "https://alice.github.io/saunters/#/view/abc"
        );
    }

    #[test]
    fn contents_url_includes_repo_and_path() {
        let store = GithubRemoteStore::new("alice/saunters", "gh-pages", "tok");
        assert_eq!(
            store.contents_url("saunters/index.json"),
            "https://api.github.com/repos/alice/saunters/contents/saunters/index.json"
        );
    }
}

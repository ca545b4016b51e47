//! HTTP remote speaking the GitHub Gists API.
//!
//! Snapshots are gists, the change log is the gist's comment thread. The
//! comments resource only lists forward, so the last-page index is read from
//! the `Link` response header.

use crate::config::ClientConfig;
use crate::error::TransportError;
use crate::remote::{EntryPage, Remote};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, LINK};
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use streaks_engine::{EntryId, RawEntry, RemoteSnapshot, SnapshotUpload};

const GITHUB_MEDIA_TYPE: &str = "application/vnd.github.v3+json";
const LINK_BASE: &str = "http://localhost/";

/// Remote backed by the GitHub Gists API (or any service mimicking it).
#[derive(Debug, Clone)]
pub struct GistRemote {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct NewComment<'a> {
    body: &'a str,
}

#[derive(Deserialize)]
struct CreatedComment {
    id: EntryId,
}

impl GistRemote {
    /// Build a client from the configuration's base URL, token and user agent.
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_MEDIA_TYPE));
        if let Some(token) = config.token.as_deref().filter(|t| !t.is_empty()) {
            let mut value = HeaderValue::from_str(&format!("token {}", token))
                .map_err(|_| TransportError::Decode("token is not a valid header value".into()))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(
        &self,
        method: &'static str,
        url: &str,
        request: RequestBuilder,
    ) -> Result<Response, TransportError> {
        tracing::trace!(method, url, "sending request");
        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(TransportError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(TransportError::Status {
                method,
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    async fn snapshot_response(response: Response) -> Result<RemoteSnapshot, TransportError> {
        response
            .json::<RemoteSnapshot>()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))
    }
}

impl Remote for GistRemote {
    async fn get_snapshot(&self, id: &str) -> Result<RemoteSnapshot, TransportError> {
        let url = self.url(&format!("/gists/{}", id));
        let response = self.send("GET", &url, self.client.get(&url)).await?;
        Self::snapshot_response(response).await
    }

    async fn create_snapshot(
        &self,
        upload: &SnapshotUpload,
    ) -> Result<RemoteSnapshot, TransportError> {
        let url = self.url("/gists");
        let response = self
            .send("POST", &url, self.client.post(&url).json(upload))
            .await?;
        Self::snapshot_response(response).await
    }

    async fn update_snapshot(
        &self,
        id: &str,
        upload: &SnapshotUpload,
    ) -> Result<RemoteSnapshot, TransportError> {
        let url = self.url(&format!("/gists/{}", id));
        let response = self
            .send("PATCH", &url, self.client.patch(&url).json(upload))
            .await?;
        Self::snapshot_response(response).await
    }

    async fn fetch_raw(&self, url: &str) -> Result<String, TransportError> {
        let response = self.send("GET", url, self.client.get(url)).await?;
        Ok(response.text().await?)
    }

    async fn list_entries(
        &self,
        id: &str,
        per_page: u32,
        page: u32,
    ) -> Result<EntryPage, TransportError> {
        let url = self.url(&format!(
            "/gists/{}/comments?per_page={}&page={}",
            id, per_page, page
        ));
        let response = self.send("GET", &url, self.client.get(&url)).await?;

        let last_page = response
            .headers()
            .get(LINK)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_last_page);
        let entries = response
            .json::<Vec<RawEntry>>()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))?;

        Ok(EntryPage { entries, last_page })
    }

    async fn append_entry(&self, id: &str, body: &str) -> Result<EntryId, TransportError> {
        let url = self.url(&format!("/gists/{}/comments", id));
        let response = self
            .send(
                "POST",
                &url,
                self.client.post(&url).json(&NewComment { body }),
            )
            .await?;
        let created = response
            .json::<CreatedComment>()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))?;
        Ok(created.id)
    }
}

/// Extract the `page` parameter of the `rel="last"` link.
pub fn parse_last_page(link: &str) -> Option<u32> {
    link.split(',').find_map(|part| {
        let (target, params) = part.trim().split_once(';')?;
        let is_last = params
            .split(';')
            .any(|p| p.trim().trim_start_matches("rel=").trim_matches('"') == "last");
        if !is_last {
            return None;
        }
        let target = target.trim().trim_start_matches('<').trim_end_matches('>');
        // Relative targets only need their query, so any base will do.
        let base = Url::parse(LINK_BASE).ok()?;
        let url = base.join(target).ok()?;
        page_param(&url)
    })
}

fn page_param(url: &Url) -> Option<u32> {
    url.query_pairs()
        .find(|(key, _)| key == "page")
        .and_then(|(_, value)| value.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_page_from_link_header() {
        let link = "<https://api.github.com/resource?page=2>; rel=\"next\",\
                    <https://api.github.com/resource?page=4>; rel=\"last\"";
        assert_eq!(parse_last_page(link), Some(4));
    }

    #[test]
    fn per_page_is_not_mistaken_for_page() {
        let link = "<https://api.github.com/gists/abc/comments?per_page=1&page=7>; rel=\"last\", \
                    <https://api.github.com/gists/abc/comments?per_page=1&page=2>; rel=\"next\"";
        assert_eq!(parse_last_page(link), Some(7));
    }

    #[test]
    fn relative_link_targets() {
        let link = "</gists/abc/comments?per_page=1&page=2>; rel=\"next\", \
                    </gists/abc/comments?per_page=1&page=7>; rel=\"last\"";
        assert_eq!(parse_last_page(link), Some(7));
        assert_eq!(parse_last_page("<?page=3>; rel=\"last\""), Some(3));
    }

    #[test]
    fn no_last_relation() {
        let link = "<https://api.github.com/resource?page=1>; rel=\"prev\"";
        assert_eq!(parse_last_page(link), None);
        assert_eq!(parse_last_page(""), None);
    }

    #[test]
    fn client_builds_from_config() {
        let config = ClientConfig::new()
            .with_base_url("http://localhost:4000/")
            .with_token("provided");
        let remote = GistRemote::new(&config).unwrap();
        assert_eq!(remote.base_url(), "http://localhost:4000");
        assert_eq!(remote.url("/gists"), "http://localhost:4000/gists");
    }

    #[test]
    fn invalid_token_is_rejected() {
        let config = ClientConfig::new().with_token("bad\ntoken");
        assert!(matches!(
            GistRemote::new(&config),
            Err(TransportError::Decode(_))
        ));
    }
}

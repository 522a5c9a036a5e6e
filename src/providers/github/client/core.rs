use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use url::Url;

use crate::auth::Token;
use crate::error::{DoraLensError, Result};

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const PAGE_SIZE: usize = 100;

const MEDIA_TYPE: &str = "application/vnd.github.v3+json";

pub struct GitHubClient {
    pub client: Client,
    pub api_url: Url,
    pub token: Token,
    pub per_page: usize,
}

impl GitHubClient {
    pub fn new(base_url: &str, token: Token, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(MEDIA_TYPE));

        let client = Client::builder()
            .user_agent("DoraLens/0.1.0")
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| DoraLensError::Config(format!("Failed to create HTTP client: {e}")))?;

        let api_url = Url::parse(base_url)
            .map_err(|e| DoraLensError::Config(format!("Invalid base URL: {e}")))?;
        if api_url.cannot_be_a_base() {
            return Err(DoraLensError::Config(format!(
                "Invalid base URL: {base_url}"
            )));
        }

        Ok(Self {
            client,
            api_url,
            token,
            per_page: PAGE_SIZE,
        })
    }

    pub fn auth_request(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(self.token.as_str())
    }

    /// `{api}/repos/{owner}/{repo}/{resource...}` with every segment escaped.
    pub fn repo_url(&self, owner: &str, repo: &str, resource: &[&str]) -> Result<Url> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|()| DoraLensError::Config(format!("Invalid API URL: {}", self.api_url)))?
            .pop_if_empty()
            .extend(["repos", owner, repo])
            .extend(resource);
        Ok(url)
    }

    /// Fetches one page of a list resource.
    pub async fn get_page<T: DeserializeOwned>(
        &self,
        url: &Url,
        query: &[(&str, &str)],
        page: u32,
    ) -> Result<Vec<T>> {
        let request = self.client.get(url.clone()).query(query).query(&[
            ("per_page", self.per_page.to_string()),
            ("page", page.to_string()),
        ]);

        let response = self.auth_request(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DoraLensError::Http {
                path: url.path().to_string(),
                status,
            });
        }

        Ok(response.json::<Vec<T>>().await?)
    }

    /// Fetches every page, stopping at the first page shorter than the page size.
    pub async fn get_all_pages<T: DeserializeOwned>(
        &self,
        url: &Url,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut page = 1;

        loop {
            let batch: Vec<T> = self.get_page(url, query, page).await?;
            let fetched = batch.len();
            items.extend(batch);

            if fetched < self.per_page {
                break;
            }
            page += 1;
        }

        Ok(items)
    }
}

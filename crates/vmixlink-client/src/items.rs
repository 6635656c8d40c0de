//! HTTP client for the item and profile endpoints

use reqwest::{header, Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;
use vmixlink_format::Format;
use vmixlink_store::{Items, ProfileName, Scalar};

use crate::{
    config::ClientConfig,
    error::{ClientError, Result},
};

const API_KEY_HEADER: &str = "x-api-key";

/// A rendered poll response
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedData {
    pub body: String,
    pub content_type: Option<String>,
    pub etag: Option<String>,
}

#[derive(Deserialize)]
struct ItemsBody {
    items: Items,
}

#[derive(Deserialize)]
struct ProfilesBody {
    profiles: Vec<ProfileName>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Client for `/api/data`, `/api/items` and `/api/profiles`
#[derive(Debug, Clone)]
pub struct ItemsClient {
    inner: reqwest::Client,
    config: ClientConfig,
}

impl ItemsClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| ClientError::BuildError(e.to_string()))?;

        Ok(Self { inner, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Poll a profile the way vMix does
    pub async fn fetch_data(
        &self,
        profile: &ProfileName,
        format: Format,
        include: Option<&str>,
        exclude: Option<&str>,
    ) -> Result<FetchedData> {
        let mut url = self.endpoint(&["api", "data", profile.as_str()])?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("format", format.as_str());
            if let Some(include) = include {
                query.append_pair("include", include);
            }
            if let Some(exclude) = exclude {
                query.append_pair("exclude", exclude);
            }
        }

        let response = self.send(self.request(Method::GET, url)).await?;
        let header_value = |name: header::HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };
        let content_type = header_value(header::CONTENT_TYPE);
        let etag = header_value(header::ETAG);

        Ok(FetchedData {
            body: response.text().await?,
            content_type,
            etag,
        })
    }

    /// Items of a profile; empty when it does not exist
    pub async fn items(&self, profile: &ProfileName) -> Result<Items> {
        let url = self.endpoint(&["api", "items", profile.as_str()])?;
        let body: ItemsBody = self.send(self.request(Method::GET, url)).await?.json().await?;
        Ok(body.items)
    }

    /// Add a new key; the server answers 409 if it already exists
    pub async fn add_item(&self, profile: &ProfileName, key: &str, value: impl Into<Scalar>) -> Result<Items> {
        let url = self.endpoint(&["api", "items", profile.as_str()])?;
        let body = json!({ "key": key, "value": value.into().to_json() });
        self.mutate(Method::POST, url, body).await
    }

    pub async fn update_item(&self, profile: &ProfileName, key: &str, value: impl Into<Scalar>) -> Result<Items> {
        let url = self.endpoint(&["api", "items", profile.as_str(), key])?;
        let body = json!({ "value": value.into().to_json() });
        self.mutate(Method::PUT, url, body).await
    }

    pub async fn delete_item(&self, profile: &ProfileName, key: &str) -> Result<Items> {
        let url = self.endpoint(&["api", "items", profile.as_str(), key])?;
        let body: ItemsBody = self.send(self.request(Method::DELETE, url)).await?.json().await?;
        Ok(body.items)
    }

    /// Names of all stored profiles
    pub async fn profiles(&self) -> Result<Vec<ProfileName>> {
        let url = self.endpoint(&["api", "profiles"])?;
        let body: ProfilesBody = self.send(self.request(Method::GET, url)).await?.json().await?;
        Ok(body.profiles)
    }

    pub async fn profile(&self, profile: &ProfileName) -> Result<Items> {
        let url = self.endpoint(&["api", "profiles", profile.as_str()])?;
        let body: ItemsBody = self.send(self.request(Method::GET, url)).await?.json().await?;
        Ok(body.items)
    }

    /// Replace every item of a profile
    pub async fn save_profile(&self, profile: &ProfileName, items: &Items) -> Result<Items> {
        let url = self.endpoint(&["api", "profiles", profile.as_str()])?;
        self.mutate(Method::PUT, url, json!({ "items": items.to_json() })).await
    }

    pub async fn delete_profile(&self, profile: &ProfileName) -> Result<()> {
        let url = self.endpoint(&["api", "profiles", profile.as_str()])?;
        self.send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.config.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.config.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        debug!("HTTP {}: {}", method, url);
        let request = self.inner.request(method, url);
        match &self.config.api_key {
            Some(key) => request.header(API_KEY_HEADER, key),
            None => request,
        }
    }

    async fn mutate(&self, method: Method, url: Url, body: Value) -> Result<Items> {
        let response = self.send(self.request(method, url).json(&body)).await?;
        let body: ItemsBody = response.json().await?;
        Ok(body.items)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string(),
        };
        Err(ClientError::Api { status, message })
    }
}

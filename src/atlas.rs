//! MongoDB Atlas API Client
//!
//! Thin wrapper over the Atlas admin API for a single project. Every call is
//! signed with the project's programmatic API key using HTTP digest auth.

use crate::digest::{generate_cnonce, Challenge};
use crate::error::{ProvisionError, Result};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, WWW_AUTHENTICATE};
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

const USER_AGENT: &str = "atlas-private-endpoint/0.1.0";

/// Atlas programmatic API key pair
#[derive(Clone)]
pub struct AtlasCredentials {
    pub public_key: String,
    pub private_key: String,
}

impl AtlasCredentials {
    pub fn new(public_key: impl Into<String>, private_key: impl Into<String>) -> Self {
        Self {
            public_key: public_key.into(),
            private_key: private_key.into(),
        }
    }
}

impl std::fmt::Debug for AtlasCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtlasCredentials")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Status and raw body of an Atlas response
#[derive(Debug, Clone)]
pub struct AtlasResponse {
    pub status: StatusCode,
    pub body: String,
}

impl AtlasResponse {
    async fn read(response: reqwest::Response) -> Result<Self> {
        let status = response.status();
        let body = response.text().await?;
        debug!(status = %status, body = %body, "Atlas response");
        Ok(Self { status, body })
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Atlas API client bound to one project URL
pub struct AtlasClient {
    client: Client,
    host: String,
    credentials: AtlasCredentials,
}

impl AtlasClient {
    /// Create a client for `host`, e.g. `https://cloud.mongodb.com/api/atlas/v1.0/groups/{GROUP-ID}`
    pub fn new(host: impl Into<String>, credentials: AtlasCredentials) -> Result<Self> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;

        Ok(Self {
            client,
            host: host.into(),
            credentials,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn url(&self, path: &str) -> Result<Url> {
        let raw = format!("{}{}", self.host.trim_end_matches('/'), path);
        Url::parse(&raw).map_err(|e| ProvisionError::InvalidUrl {
            url: raw.clone(),
            reason: e.to_string(),
        })
    }

    fn request(
        &self,
        method: Method,
        url: Url,
        payload: Option<&[u8]>,
        authorization: Option<String>,
    ) -> RequestBuilder {
        let mut builder = self
            .client
            .request(method, url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json");
        if let Some(payload) = payload {
            builder = builder.body(payload.to_vec());
        }
        if let Some(authorization) = authorization {
            builder = builder.header(AUTHORIZATION, authorization);
        }
        builder
    }

    /// Send a request, answering a digest challenge if the server issues one
    pub async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<AtlasResponse> {
        let url = self.url(path)?;
        let payload = body.map(serde_json::to_vec).transpose()?;

        debug!(method = %method, url = %url, "Sending Atlas request");

        let response = self
            .request(method.clone(), url.clone(), payload.as_deref(), None)
            .send()
            .await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return AtlasResponse::read(response).await;
        }

        let challenge = response
            .headers()
            .get_all(WWW_AUTHENTICATE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find(|value| {
                value
                    .trim_start()
                    .get(..6)
                    .is_some_and(|scheme| scheme.eq_ignore_ascii_case("digest"))
            })
            .ok_or_else(|| {
                ProvisionError::Authentication("401 without a digest challenge".to_string())
            })
            .and_then(Challenge::parse)?;

        let authorization = challenge.authorization(
            &self.credentials.public_key,
            &self.credentials.private_key,
            method.as_str(),
            &request_uri(&url),
            &generate_cnonce(),
            1,
        );

        debug!(realm = %challenge.realm, algorithm = %challenge.algorithm, "Answering digest challenge");

        let response = self
            .request(method, url, payload.as_deref(), Some(authorization))
            .send()
            .await?;

        AtlasResponse::read(response).await
    }

    pub async fn get(&self, path: &str) -> Result<AtlasResponse> {
        self.send::<()>(Method::GET, path, None).await
    }

    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<AtlasResponse> {
        self.send(Method::POST, path, Some(body)).await
    }
}

/// Digest `uri` value: path plus query of the request target
fn request_uri(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

use std::{sync::Arc, time::Duration};

use reqwest::{Client, Method, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use url::Url;

use shared::{
    error::ApiErrorBody,
    protocol::{RefreshTokenRequest, TokenRefreshResponse},
};

use crate::session::SessionPersistence;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Error)]
pub enum ClientError {
    /// Backend rejected the request; `Display` is the envelope's message,
    /// which is what stores surface to views verbatim.
    #[error("{}", .body.message)]
    Api {
        status: StatusCode,
        body: ApiErrorBody,
    },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid server url '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Transport(err) => err.status(),
            Self::InvalidBaseUrl { .. } => None,
        }
    }
}

/// Authenticated request/response plumbing. Attaches the bearer token to
/// every call, performs a single refresh-and-retry on 401, and decodes the
/// backend error envelope into [`ClientError`]. No retries beyond that, no
/// backoff; failure handling is the stores' job.
pub struct ApiClient {
    http: Client,
    base_url: String,
    tokens: RwLock<Option<TokenPair>>,
    persistence: Arc<dyn SessionPersistence>,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        request_timeout: Duration,
        persistence: Arc<dyn SessionPersistence>,
    ) -> Result<Self, ClientError> {
        let parsed = Url::parse(base_url).map_err(|err| ClientError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: err.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: "scheme must be http or https".to_string(),
            });
        }

        let http = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(ClientError::Transport)?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens: RwLock::new(None),
            persistence,
        })
    }

    pub async fn set_tokens(&self, tokens: TokenPair) {
        *self.tokens.write().await = Some(tokens);
    }

    pub async fn clear_tokens(&self) {
        *self.tokens.write().await = None;
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.send(Method::GET, path, None::<&()>, None::<&()>)
            .await?
            .json()
            .await
            .map_err(ClientError::Transport)
    }

    pub async fn get_with<T: DeserializeOwned, Q: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &Q,
    ) -> Result<T, ClientError> {
        self.send(Method::GET, path, Some(query), None::<&()>)
            .await?
            .json()
            .await
            .map_err(ClientError::Transport)
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        self.send(Method::POST, path, None::<&()>, Some(body))
            .await?
            .json()
            .await
            .map_err(ClientError::Transport)
    }

    pub async fn post_unit<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), ClientError> {
        self.send(Method::POST, path, None::<&()>, Some(body))
            .await
            .map(drop)
    }

    /// POST with an empty request body, decoding the response.
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.send(Method::POST, path, None::<&()>, None::<&()>)
            .await?
            .json()
            .await
            .map_err(ClientError::Transport)
    }

    /// POST with an empty request body, discarding the response body.
    pub async fn post_empty_unit(&self, path: &str) -> Result<(), ClientError> {
        self.send(Method::POST, path, None::<&()>, None::<&()>)
            .await
            .map(drop)
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        self.send(Method::PUT, path, None::<&()>, Some(body))
            .await?
            .json()
            .await
            .map_err(ClientError::Transport)
    }

    pub async fn delete(&self, path: &str) -> Result<(), ClientError> {
        self.send(Method::DELETE, path, None::<&()>, None::<&()>)
            .await
            .map(drop)
    }

    async fn send<Q: Serialize + ?Sized, B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        query: Option<&Q>,
        body: Option<&B>,
    ) -> Result<Response, ClientError> {
        let response = self.dispatch(method.clone(), path, query, body).await?;

        if response.status() == StatusCode::UNAUTHORIZED
            && !path.starts_with("/auth/")
            && self.refresh_tokens().await?
        {
            debug!(path, "retrying request after token refresh");
            let retried = self.dispatch(method, path, query, body).await?;
            return into_envelope_error(retried).await;
        }

        into_envelope_error(response).await
    }

    async fn dispatch<Q: Serialize + ?Sized, B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        query: Option<&Q>,
        body: Option<&B>,
    ) -> Result<Response, ClientError> {
        let mut builder = self.http.request(method, format!("{}{path}", self.base_url));
        if let Some(query) = query {
            builder = builder.query(query);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }
        if let Some(tokens) = self.tokens.read().await.as_ref() {
            builder = builder.bearer_auth(&tokens.access_token);
        }
        builder.send().await.map_err(ClientError::Transport)
    }

    /// Rotates the token pair through `/auth/refresh`. Returns false when no
    /// refresh token is held or the backend declines; transport failures
    /// propagate.
    pub async fn refresh_tokens(&self) -> Result<bool, ClientError> {
        let refresh_token = {
            self.tokens
                .read()
                .await
                .as_ref()
                .map(|t| t.refresh_token.clone())
        };
        let Some(refresh_token) = refresh_token else {
            return Ok(false);
        };

        let response = self
            .http
            .post(format!("{}/auth/refresh", self.base_url))
            .json(&RefreshTokenRequest { refresh_token })
            .send()
            .await
            .map_err(ClientError::Transport)?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "token refresh rejected");
            return Ok(false);
        }

        let rotated: TokenRefreshResponse =
            response.json().await.map_err(ClientError::Transport)?;
        self.set_tokens(TokenPair {
            access_token: rotated.access_token.clone(),
            refresh_token: rotated.refresh_token.clone(),
        })
        .await;

        if let Err(err) = self
            .persistence
            .update_tokens(&rotated.access_token, &rotated.refresh_token)
            .await
        {
            warn!("failed to persist refreshed tokens: {err}");
        }

        Ok(true)
    }
}

async fn into_envelope_error(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let bytes = response.bytes().await.map_err(ClientError::Transport)?;
    let body = serde_json::from_slice::<ApiErrorBody>(&bytes).unwrap_or_else(|_| {
        ApiErrorBody::new(status.as_u16(), format!("request failed with status {status}"))
    });
    Err(ClientError::Api { status, body })
}

#[cfg(test)]
#[path = "tests/http_tests.rs"]
mod tests;

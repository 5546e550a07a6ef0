//! Authenticated request pipeline.
//!
//! Outgoing: every request is decorated with `Authorization: Bearer <token>`
//! when the [`TokenChain`] resolves one, and sent without the header
//! otherwise.
//!
//! Incoming: a response with status exactly `401` deletes the persisted
//! token, whatever the request was, and is then returned to the caller as
//! an [`ApiError::Server`] like any other failure. Nothing is retried and
//! nothing navigates; deciding what to do after losing the session is up
//! to the caller.
//!
//! Cookies: the `auth_token` cookie is copied into the token store after
//! every response and put back into a fresh client's jar, so a session the
//! server keeps in a cookie survives a restart.

use std::sync::Arc;

use opsdesk_kv::KVStore;
use reqwest::cookie::Jar;
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::form::FormBody;
use crate::token::{CookieToken, LocalStoreToken, TokenChain, TokenSource, TokenStore};

/// HTTP client bound to one backend origin.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenSource>,
    cookie: Arc<CookieToken>,
    store: TokenStore,
}

impl ApiClient {
    /// Build a client for `base_url` (e.g. `http://localhost:8000/api`).
    ///
    /// Tokens resolve from `kv` first, then from the `auth_token` cookie the
    /// server set on this client's cookie jar.
    pub fn new(base_url: impl Into<String>, kv: Arc<dyn KVStore>) -> Result<Self, ApiError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let url = Url::parse(&base_url).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        let jar = Arc::new(Jar::default());
        let store = TokenStore::new(kv);
        let cookie = Arc::new(CookieToken::new(Arc::clone(&jar), url));
        if let Some(raw) = store.load_cookie()? {
            debug!("restoring saved auth cookie");
            cookie.restore(&raw);
        }
        let sources: Vec<Arc<dyn TokenSource>> = vec![
            Arc::new(LocalStoreToken::new(store.clone())),
            cookie.clone(),
        ];
        let tokens = TokenChain::new(sources);

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .cookie_provider(Arc::clone(&jar))
            .build()?;

        Ok(Self {
            http,
            base_url,
            tokens: Arc::new(tokens),
            cookie,
            store,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token_store(&self) -> &TokenStore {
        &self.store
    }

    /// Token the next request would carry, from whichever source has one.
    pub fn current_token(&self) -> Result<Option<String>, ApiError> {
        self.tokens.token()
    }

    /// Forget the cookie session, both in the jar and in the store.
    pub fn clear_cookie(&self) -> Result<(), ApiError> {
        self.cookie.expire();
        self.store.clear_cookie()
    }

    /// Mirror the jar's `auth_token` cookie into the store.
    fn save_cookie(&self) -> Result<(), ApiError> {
        let current = self.cookie.raw()?;
        let saved = self.store.load_cookie()?;
        match current {
            Some(raw) if saved.as_deref() != Some(raw.as_str()) => self.store.save_cookie(&raw),
            None if saved.is_some() => self.store.clear_cookie(),
            _ => Ok(()),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Attach the bearer token, if any source has one.
    fn authed(&self, builder: RequestBuilder) -> Result<RequestBuilder, ApiError> {
        match self.tokens.token()? {
            Some(token) => Ok(builder.bearer_auth(token)),
            None => Ok(builder),
        }
    }

    /// Send through the pipeline: decorate, send, intercept.
    async fn send(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let req = self.authed(builder)?;
        let resp = req.send().await?;
        if let Err(e) = self.save_cookie() {
            warn!("failed to save auth cookie: {}", e);
        }
        self.intercept(resp).await
    }

    /// Map non-2xx responses to `ApiError`, evicting the token on 401.
    async fn intercept(&self, resp: Response) -> Result<Response, ApiError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        if status == StatusCode::UNAUTHORIZED {
            warn!("{} answered 401, dropping stored token", resp.url().path());
            if let Err(e) = self.store.clear() {
                warn!("failed to clear token after 401: {}", e);
            }
        }

        let message = resp.text().await.unwrap_or_default();
        Err(ApiError::Server {
            status: status.as_u16(),
            message,
        })
    }

    /// Decode a JSON body. An empty body decodes as `null`.
    async fn parse<R: DeserializeOwned>(resp: Response) -> Result<R, ApiError> {
        let bytes = resp.bytes().await?;
        let bytes: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
            b"null"
        } else {
            &bytes
        };
        serde_json::from_slice(bytes).map_err(|e| ApiError::Decode(format!("response body: {}", e)))
    }

    pub async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R, ApiError> {
        debug!("GET {}", path);
        let resp = self.send(self.http.get(self.url(path))).await?;
        Self::parse(resp).await
    }

    pub async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, ApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        debug!("POST {}", path);
        let resp = self.send(self.http.post(self.url(path)).json(body)).await?;
        Self::parse(resp).await
    }

    /// POST without a body.
    pub async fn post_empty<R: DeserializeOwned>(&self, path: &str) -> Result<R, ApiError> {
        debug!("POST {}", path);
        let resp = self.send(self.http.post(self.url(path))).await?;
        Self::parse(resp).await
    }

    pub async fn put<B, R>(&self, path: &str, body: &B) -> Result<R, ApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        debug!("PUT {}", path);
        let resp = self.send(self.http.put(self.url(path)).json(body)).await?;
        Self::parse(resp).await
    }

    pub async fn delete<R: DeserializeOwned>(&self, path: &str) -> Result<R, ApiError> {
        debug!("DELETE {}", path);
        let resp = self.send(self.http.delete(self.url(path))).await?;
        Self::parse(resp).await
    }

    /// POST a multipart form.
    pub async fn post_form<R: DeserializeOwned>(&self, path: &str, form: FormBody) -> Result<R, ApiError> {
        debug!("POST {} (multipart)", path);
        let resp = self.send(self.http.post(self.url(path)).multipart(form.into_multipart()?)).await?;
        Self::parse(resp).await
    }
}

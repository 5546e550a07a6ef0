//! Bearer token resolution.
//!
//! A [`TokenSource`] is one place a token may come from. Sources are
//! chained in priority order with [`TokenChain`]; the first one that yields
//! a token wins and later sources are not consulted. The default chain used
//! by [`crate::ApiClient`] is:
//!
//! ```text
//! LocalStoreToken (KV key "auth_token")  ->  CookieToken ("auth_token" cookie)
//! ```
//!
//! Resolution is synchronous; it runs before every request.

use std::sync::Arc;

use opsdesk_kv::{KVStore, AUTH_COOKIE_KEY, AUTH_TOKEN_KEY};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::Url;
use tracing::debug;

use crate::error::ApiError;

// ── TokenSource ─────────────────────────────────────────────────────

/// Pluggable token provider. Called before every API request.
///
/// Returns `Ok(None)` when this source has no token; the request is then
/// sent without an Authorization header unless a later source has one.
pub trait TokenSource: Send + Sync + 'static {
    fn token(&self) -> Result<Option<String>, ApiError>;
}

// ── TokenStore ──────────────────────────────────────────────────────

/// The persisted session token, plus the last `auth_token` cookie the
/// server set.
///
/// Only the login flow writes the token; only a `401` response or a
/// completed logout clears it. The cookie copy mirrors the cookie jar.
#[derive(Clone)]
pub struct TokenStore {
    kv: Arc<dyn KVStore>,
}

impl TokenStore {
    pub fn new(kv: Arc<dyn KVStore>) -> Self {
        Self { kv }
    }

    pub fn load(&self) -> Result<Option<String>, ApiError> {
        Ok(self.kv.get_string(AUTH_TOKEN_KEY)?)
    }

    pub fn save(&self, token: &str) -> Result<(), ApiError> {
        Ok(self.kv.set_string(AUTH_TOKEN_KEY, token)?)
    }

    pub fn clear(&self) -> Result<(), ApiError> {
        Ok(self.kv.delete(AUTH_TOKEN_KEY)?)
    }

    /// Raw (still percent-encoded) cookie value.
    pub fn load_cookie(&self) -> Result<Option<String>, ApiError> {
        Ok(self.kv.get_string(AUTH_COOKIE_KEY)?)
    }

    pub fn save_cookie(&self, raw: &str) -> Result<(), ApiError> {
        Ok(self.kv.set_string(AUTH_COOKIE_KEY, raw)?)
    }

    pub fn clear_cookie(&self) -> Result<(), ApiError> {
        Ok(self.kv.delete(AUTH_COOKIE_KEY)?)
    }
}

/// Token from the local persistent store.
pub struct LocalStoreToken(TokenStore);

impl LocalStoreToken {
    pub fn new(store: TokenStore) -> Self {
        Self(store)
    }
}

impl TokenSource for LocalStoreToken {
    fn token(&self) -> Result<Option<String>, ApiError> {
        // Stored verbatim from the login response, so no percent-decoding
        // here. Only the cookie value is encoded.
        Ok(self.0.load()?.filter(|t| !t.is_empty()))
    }
}

// ── Cookie fallback ─────────────────────────────────────────────────

/// Find `name` in a `Cookie` header value (`a=1; b=2`) and percent-decode
/// it. Entries are split on `"; "` and matched on the exact `name=` prefix.
///
/// A value that does not decode to valid UTF-8 is returned as-is.
pub fn cookie_value(header: &str, name: &str) -> Option<String> {
    let raw = raw_cookie_value(header, name)?;
    match urlencoding::decode(raw) {
        Ok(decoded) => Some(decoded.into_owned()),
        Err(_) => Some(raw.to_string()),
    }
}

/// Undecoded value of cookie `name`; empty values count as absent.
fn raw_cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    let prefix = format!("{}=", name);
    header
        .split("; ")
        .find(|row| row.starts_with(&prefix))
        // Anything after a second '=' is dropped.
        .and_then(|row| row[prefix.len()..].split('=').next())
        .filter(|value| !value.is_empty())
}

/// Token from the `auth_token` cookie the server set on the shared jar.
pub struct CookieToken {
    jar: Arc<Jar>,
    url: Url,
}

impl CookieToken {
    pub fn new(jar: Arc<Jar>, url: Url) -> Self {
        Self { jar, url }
    }

    fn header(&self) -> Result<Option<String>, ApiError> {
        match self.jar.cookies(&self.url) {
            Some(h) => h
                .to_str()
                .map(|h| Some(h.to_string()))
                .map_err(|e| ApiError::Decode(format!("cookie header: {}", e))),
            None => Ok(None),
        }
    }

    /// The cookie as the jar holds it, before percent-decoding.
    pub fn raw(&self) -> Result<Option<String>, ApiError> {
        Ok(self
            .header()?
            .and_then(|h| raw_cookie_value(&h, AUTH_TOKEN_KEY).map(str::to_string)))
    }

    /// Put a previously saved raw value back into the jar.
    pub fn restore(&self, raw: &str) {
        self.jar
            .add_cookie_str(&format!("{}={}; Path=/", AUTH_TOKEN_KEY, raw), &self.url);
    }

    /// Drop the cookie from the jar.
    pub fn expire(&self) {
        self.jar
            .add_cookie_str(&format!("{}=; Max-Age=0; Path=/", AUTH_TOKEN_KEY), &self.url);
    }
}

impl TokenSource for CookieToken {
    fn token(&self) -> Result<Option<String>, ApiError> {
        Ok(self
            .header()?
            .and_then(|h| cookie_value(&h, AUTH_TOKEN_KEY)))
    }
}

// ── TokenChain ──────────────────────────────────────────────────────

/// Ordered token sources; first hit wins, results are never merged.
#[derive(Clone, Default)]
pub struct TokenChain {
    sources: Vec<Arc<dyn TokenSource>>,
}

impl TokenChain {
    pub fn new(sources: Vec<Arc<dyn TokenSource>>) -> Self {
        Self { sources }
    }

    pub fn push(&mut self, source: Arc<dyn TokenSource>) {
        self.sources.push(source);
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl TokenSource for TokenChain {
    fn token(&self) -> Result<Option<String>, ApiError> {
        for (idx, source) in self.sources.iter().enumerate() {
            if let Some(token) = source.token()? {
                debug!("token resolved from source #{}", idx);
                return Ok(Some(token));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opsdesk_kv::MemoryStore;

    fn store() -> TokenStore {
        TokenStore::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn token_store_roundtrip() {
        let store = store();
        assert!(store.load().unwrap().is_none());
        store.save("abc").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("abc"));
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn cookie_copy_is_kept_apart_from_token() {
        let store = store();
        store.save("tok").unwrap();
        store.save_cookie("12%7Cabc").unwrap();
        assert_eq!(store.load_cookie().unwrap().as_deref(), Some("12%7Cabc"));

        store.clear().unwrap();
        assert_eq!(store.load_cookie().unwrap().as_deref(), Some("12%7Cabc"));
        store.clear_cookie().unwrap();
        assert!(store.load_cookie().unwrap().is_none());
    }

    #[test]
    fn cookie_value_exact_match_and_decode() {
        let header = "xsrf=1; my_auth_token=nope; auth_token=12%7Cabc%20def; other=2";
        assert_eq!(cookie_value(header, "auth_token").as_deref(), Some("12|abc def"));
        assert_eq!(cookie_value("auth_token=plain", "auth_token").as_deref(), Some("plain"));
        assert!(cookie_value("xsrf=1", "auth_token").is_none());
        assert!(cookie_value("auth_token=", "auth_token").is_none());
        // Malformed escape stays raw.
        assert_eq!(cookie_value("auth_token=%FF", "auth_token").as_deref(), Some("%FF"));
    }

    #[test]
    fn cookie_token_reads_jar() {
        let url = Url::parse("http://127.0.0.1:9/api").unwrap();
        let jar = Arc::new(Jar::default());
        jar.add_cookie_str("auth_token=jar%2Dtoken; Path=/", &url);
        let ts = CookieToken::new(jar, url);
        assert_eq!(ts.token().unwrap().as_deref(), Some("jar-token"));
        assert_eq!(ts.raw().unwrap().as_deref(), Some("jar%2Dtoken"));
    }

    #[test]
    fn cookie_token_restore_and_expire() {
        let url = Url::parse("http://127.0.0.1:9/api").unwrap();
        let ts = CookieToken::new(Arc::new(Jar::default()), url);
        assert!(ts.token().unwrap().is_none());

        ts.restore("12%7Cabc");
        assert_eq!(ts.token().unwrap().as_deref(), Some("12|abc"));

        ts.expire();
        assert!(ts.token().unwrap().is_none());
        assert!(ts.raw().unwrap().is_none());
    }

    #[test]
    fn chain_prefers_local_store_over_cookie() {
        let url = Url::parse("http://127.0.0.1:9/api").unwrap();
        let jar = Arc::new(Jar::default());
        jar.add_cookie_str("auth_token=from-cookie; Path=/", &url);

        let store = store();
        let chain = TokenChain::new(vec![
            Arc::new(LocalStoreToken::new(store.clone())),
            Arc::new(CookieToken::new(jar, url)),
        ]);

        assert_eq!(chain.token().unwrap().as_deref(), Some("from-cookie"));
        store.save("from-store").unwrap();
        assert_eq!(chain.token().unwrap().as_deref(), Some("from-store"));
    }

    #[test]
    fn empty_chain_yields_nothing() {
        let url = Url::parse("http://127.0.0.1:9/api").unwrap();
        let chain = TokenChain::new(vec![
            Arc::new(LocalStoreToken::new(store())),
            Arc::new(CookieToken::new(Arc::new(Jar::default()), url)),
        ]);
        assert!(chain.token().unwrap().is_none());
        assert!(TokenChain::default().is_empty());
    }
}

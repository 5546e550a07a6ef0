//! Session-scoped facade over the API client and the query cache.

use std::sync::Arc;
use std::time::Duration;

use opsdesk_core::{partition, Capabilities, Partition, Permission, UserProfile};
use opsdesk_kv::KVStore;
use serde_json::Value;
use tracing::{info, warn};

use crate::auth::{me_key, Credentials, LoginResponse};
use crate::cache::{QueryClient, QueryKey};
use crate::error::ApiError;
use crate::form::{Attachment, FormBody};
use crate::http::ApiClient;
use crate::resource::{Action, Resource};

/// How long a fetched profile is served from cache.
pub const PROFILE_STALE_TIME: Duration = Duration::from_secs(5 * 60);
/// How long dashboard statistics are served from cache.
pub const DASHBOARD_STALE_TIME: Duration = Duration::from_secs(5 * 60);

fn dashboard_key() -> QueryKey {
    QueryKey::new(["dashboard-stats"])
}

fn system_permissions_key() -> QueryKey {
    QueryKey::new(["system-permissions"])
}

fn decode<T: serde::de::DeserializeOwned>(value: Value, what: &str) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| ApiError::Decode(format!("{}: {}", what, e)))
}

/// Accept either a bare JSON array or a `{"data": [...]}` envelope.
fn list_items(value: Value) -> Result<Vec<Value>, ApiError> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(ApiError::Decode("expected a list or a data envelope".into())),
        },
        _ => Err(ApiError::Decode("expected a list".into())),
    }
}

/// Everything one signed-in console session needs: the HTTP pipeline (with
/// its token store) and the query cache. Build one and share it by
/// reference; nothing here is global.
pub struct Console {
    api: ApiClient,
    cache: QueryClient,
}

impl Console {
    pub fn new(base_url: impl Into<String>, kv: Arc<dyn KVStore>) -> Result<Self, ApiError> {
        Ok(Self::from_parts(ApiClient::new(base_url, kv)?, QueryClient::new()))
    }

    pub fn from_parts(api: ApiClient, cache: QueryClient) -> Self {
        Self { api, cache }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn cache(&self) -> &QueryClient {
        &self.cache
    }

    /// True when a token is persisted locally. Says nothing about whether
    /// the server still accepts it.
    pub fn has_stored_token(&self) -> Result<bool, ApiError> {
        Ok(self.api.token_store().load()?.is_some())
    }

    /// True when requests would go out authenticated, by stored token or
    /// by session cookie.
    pub fn has_session(&self) -> Result<bool, ApiError> {
        Ok(self.api.current_token()?.is_some())
    }

    // ── Session ─────────────────────────────────────────────────────

    /// Log in, persist the returned token and prime the `["me"]` cache.
    ///
    /// The login only sticks once the profile fetch succeeds: if it fails,
    /// the token just stored is removed and the profile error is returned.
    pub async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, ApiError> {
        let resp: LoginResponse = self.api.post("/login", credentials).await?;
        if let Some(token) = resp.token.as_deref() {
            self.api.token_store().save(token)?;
        }

        let profile = match self.fetch_profile().await {
            Ok(profile) => profile,
            Err(e) => {
                warn!("profile fetch after login failed, dropping token: {}", e);
                if let Err(clear) = self.api.token_store().clear() {
                    warn!("failed to clear token: {}", clear);
                }
                return Err(e);
            }
        };

        let key = me_key();
        self.cache.set_query_data(&key, profile);
        self.cache.invalidate_queries(&key);
        info!("logged in as {}", credentials.phone);
        Ok(resp)
    }

    /// Log out on the server, then drop the token and the saved cookie and
    /// evict `["me"]` so the next profile read goes to the network.
    pub async fn logout(&self) -> Result<Value, ApiError> {
        let data: Value = self.api.post_empty("/logout").await?;
        self.api.token_store().clear()?;
        self.api.clear_cookie()?;
        self.cache.remove_queries(&me_key());
        info!("logged out");
        Ok(data)
    }

    /// `GET /me`, validated as a profile before it is cached.
    async fn fetch_profile(&self) -> Result<Value, ApiError> {
        let raw: Value = self.api.get("/me").await?;
        let profile: UserProfile = decode(raw, "profile")?;
        serde_json::to_value(profile).map_err(|e| ApiError::Decode(format!("profile: {}", e)))
    }

    /// The signed-in user, read through the `["me"]` cache.
    pub async fn me(&self) -> Result<UserProfile, ApiError> {
        let data = self
            .cache
            .fetch_query(&me_key(), PROFILE_STALE_TIME, || self.fetch_profile())
            .await?;
        decode(data, "profile")
    }

    /// Cached profile without touching the network.
    pub fn cached_me(&self) -> Option<UserProfile> {
        self.cache
            .get_query_data(&me_key())
            .and_then(|v| serde_json::from_value(v).ok())
    }

    /// Capabilities derived from the cached profile.
    pub fn capabilities(&self) -> Capabilities {
        Capabilities::from_profile(self.cached_me().as_ref())
    }

    /// Load the profile if needed and fail with [`ApiError::Forbidden`]
    /// when `code` is not granted.
    pub async fn require(&self, code: &str) -> Result<(), ApiError> {
        let profile = self.me().await?;
        if Capabilities::from_profile(Some(&profile)).has(code) {
            Ok(())
        } else {
            Err(ApiError::Forbidden(code.to_string()))
        }
    }

    // ── Reads ───────────────────────────────────────────────────────

    pub async fn dashboard_stats(&self) -> Result<Value, ApiError> {
        self.cache
            .fetch_query(&dashboard_key(), DASHBOARD_STALE_TIME, || {
                self.api.get::<Value>("/dashboard/stats")
            })
            .await
    }

    /// Every permission the system knows about.
    pub async fn system_permissions(&self) -> Result<Vec<Permission>, ApiError> {
        let data = self
            .cache
            .fetch_query(&system_permissions_key(), Duration::ZERO, || {
                self.api.get::<Value>("/permissions")
            })
            .await?;
        list_items(data)?
            .into_iter()
            .map(|item| decode(item, "permission"))
            .collect()
    }

    /// System permissions grouped per resource.
    pub async fn permission_groups(&self) -> Result<Partition, ApiError> {
        Ok(partition(&self.system_permissions().await?))
    }

    pub async fn list(&self, resource: Resource) -> Result<Value, ApiError> {
        self.cache
            .fetch_query(&resource.cache_key(), Duration::ZERO, || {
                self.api.get::<Value>(resource.list_path())
            })
            .await
    }

    pub async fn get(&self, resource: Resource, id: &str) -> Result<Value, ApiError> {
        let path = resource.item_path(Action::View, id);
        self.cache
            .fetch_query(&resource.cache_key().with(id), Duration::ZERO, || {
                self.api.get::<Value>(&path)
            })
            .await
    }

    // ── Mutations ───────────────────────────────────────────────────

    fn check_attachment(resource: Resource, attachment: &Option<Attachment>) -> Result<(), ApiError> {
        if attachment.is_some() && !resource.is_multipart() {
            return Err(ApiError::Attachment(format!("{} does not accept files", resource)));
        }
        Ok(())
    }

    pub async fn create(
        &self,
        resource: Resource,
        record: &Value,
        attachment: Option<Attachment>,
    ) -> Result<Value, ApiError> {
        Self::check_attachment(resource, &attachment)?;
        let path = resource.create_path();
        let data = if resource.is_multipart() {
            self.api.post_form(path, FormBody::from_record(record, attachment)).await?
        } else {
            self.api.post(path, record).await?
        };
        self.cache.invalidate_queries(&resource.cache_key());
        Ok(data)
    }

    /// Update an item. With a file attached the body goes out as a
    /// multipart `POST` carrying `_method=PUT`; otherwise as a JSON `PUT`.
    pub async fn update(
        &self,
        resource: Resource,
        id: &str,
        record: &Value,
        attachment: Option<Attachment>,
    ) -> Result<Value, ApiError> {
        Self::check_attachment(resource, &attachment)?;
        let path = resource.item_path(Action::Edit, id);
        let data = if attachment.is_some() {
            let form = FormBody::from_record(record, attachment).with_method_override("PUT");
            self.api.post_form(&path, form).await?
        } else {
            self.api.put(&path, record).await?
        };
        self.cache.invalidate_queries(&resource.cache_key());
        Ok(data)
    }

    pub async fn delete(&self, resource: Resource, id: &str) -> Result<Value, ApiError> {
        let data = self.api.delete(&resource.item_path(Action::Delete, id)).await?;
        self.cache.invalidate_queries(&resource.cache_key());
        for other in resource.delete_cascades() {
            self.cache.invalidate_queries(&other.cache_key());
        }
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_items_accepts_array_and_envelope() {
        assert_eq!(list_items(json!([1, 2])).unwrap().len(), 2);
        assert_eq!(list_items(json!({"data": [1]})).unwrap().len(), 1);
        assert!(list_items(json!({"items": []})).is_err());
        assert!(list_items(json!("x")).is_err());
    }

    #[tokio::test]
    async fn attachment_rejected_for_json_resources() {
        let console = Console::new(
            "http://127.0.0.1:9",
            Arc::new(opsdesk_kv::MemoryStore::new()),
        )
        .unwrap();
        let file = Attachment::new("image", "a.png", vec![1]);
        let err = console
            .create(Resource::Employees, &json!({"name": "x"}), Some(file))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Attachment(_)), "got: {:?}", err);
    }
}

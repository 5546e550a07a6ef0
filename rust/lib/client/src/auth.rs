//! Login payloads and the cache keys the session flows touch.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::cache::QueryKey;

/// Cache key of the signed-in user's profile.
pub fn me_key() -> QueryKey {
    QueryKey::new(["me"])
}

/// Body of `POST /login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub phone: String,
    pub password: String,
}

impl Credentials {
    pub fn new(phone: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            phone: phone.into(),
            password: password.into(),
        }
    }
}

/// Response of `POST /login`. The token is optional because the server may
/// set it as a cookie instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_response_with_and_without_token() {
        let r: LoginResponse = serde_json::from_str(r#"{"token": "1|abc", "message": "ok"}"#).unwrap();
        assert_eq!(r.token.as_deref(), Some("1|abc"));
        assert_eq!(r.extra["message"], "ok");

        let r: LoginResponse = serde_json::from_str(r#"{"message": "ok"}"#).unwrap();
        assert!(r.token.is_none());
    }

    #[test]
    fn credentials_serialize_as_phone_and_password() {
        let v = serde_json::to_value(Credentials::new("0612", "secret")).unwrap();
        assert_eq!(v, serde_json::json!({"phone": "0612", "password": "secret"}));
    }
}

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Backend record identifier. The API is not consistent about whether ids
/// are numbers or strings, so both are accepted and echoed back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Str(String),
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordId::Int(n) => write!(f, "{}", n),
            RecordId::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RecordId {
    fn from(n: i64) -> Self {
        RecordId::Int(n)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        RecordId::Str(s.to_string())
    }
}

/// One grantable capability, as listed by `GET /permissions`.
///
/// `name` is conventionally `<resource>_<action>` but nothing enforces it.
/// It is optional here so a malformed record still deserializes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Permission {
    pub id: RecordId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Fields the console does not interpret (labels, timestamps, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Permission {
    pub fn new(id: impl Into<RecordId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
            extra: Map::new(),
        }
    }
}

/// A permission code granted to the current user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub code: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Response of `GET /me`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(default)]
    pub tasks: Vec<Task>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

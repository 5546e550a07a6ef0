//! Multipart bodies for resources that carry files (product images,
//! shipment receipts).
//!
//! The backend parses form fields the PHP way, so a JSON record is
//! flattened into bracketed field names:
//!
//! ```text
//! {"name": "Drill", "is_rentable": true,
//!  "lifecycles": [{"stage": "bought", "date": "2024-01-02"}]}
//!
//! name=Drill
//! is_rentable=1
//! lifecycles[0][stage]=bought
//! lifecycles[0][date]=2024-01-02
//! ```
//!
//! Nulls are skipped and booleans become `1`/`0`.

use std::path::Path;

use reqwest::multipart::{Form, Part};
use serde_json::Value;

use crate::error::ApiError;

/// Field name used to tunnel a PUT through a multipart POST.
pub const METHOD_OVERRIDE_FIELD: &str = "_method";

/// A file to upload alongside form fields.
#[derive(Debug, Clone)]
pub struct Attachment {
    /// Form field the file is sent under (`image`, `bon_image`).
    pub field: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub mime: Option<String>,
}

impl Attachment {
    pub fn new(field: impl Into<String>, file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            field: field.into(),
            file_name: file_name.into(),
            bytes,
            mime: None,
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    /// Read a file from disk. The MIME type is guessed from the extension
    /// for the image formats the backend accepts.
    pub fn from_path(field: impl Into<String>, path: &Path) -> Result<Self, ApiError> {
        let bytes = std::fs::read(path)
            .map_err(|e| ApiError::Attachment(format!("{}: {}", path.display(), e)))?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        let mime = match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase) {
            Some(ext) if ext == "png" => Some("image/png"),
            Some(ext) if ext == "jpg" || ext == "jpeg" => Some("image/jpeg"),
            Some(ext) if ext == "webp" => Some("image/webp"),
            Some(ext) if ext == "gif" => Some("image/gif"),
            Some(ext) if ext == "pdf" => Some("application/pdf"),
            _ => None,
        };
        Ok(Self {
            field: field.into(),
            file_name,
            bytes,
            mime: mime.map(str::to_string),
        })
    }
}

/// Flatten a JSON value into form fields under `prefix`.
fn flatten_into(prefix: &str, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::Bool(b) => out.push((prefix.to_string(), (if *b { "1" } else { "0" }).to_string())),
        Value::Number(n) => out.push((prefix.to_string(), n.to_string())),
        Value::String(s) => out.push((prefix.to_string(), s.clone())),
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                flatten_into(&format!("{}[{}]", prefix, i), item, out);
            }
        }
        Value::Object(map) => {
            for (k, v) in map {
                flatten_into(&format!("{}[{}]", prefix, k), v, out);
            }
        }
    }
}

/// Flatten a JSON object into `(field, value)` pairs. Non-object values
/// produce no fields.
pub fn flatten_fields(record: &Value) -> Vec<(String, String)> {
    let mut out = Vec::new();
    if let Value::Object(map) = record {
        for (k, v) in map {
            flatten_into(k, v, &mut out);
        }
    }
    out
}

/// Form fields plus an optional file.
#[derive(Debug, Clone, Default)]
pub struct FormBody {
    pub fields: Vec<(String, String)>,
    pub attachment: Option<Attachment>,
}

impl FormBody {
    pub fn from_record(record: &Value, attachment: Option<Attachment>) -> Self {
        Self {
            fields: flatten_fields(record),
            attachment,
        }
    }

    /// Prepend `_method=<method>` so a POST is treated as `method`.
    pub fn with_method_override(mut self, method: &str) -> Self {
        self.fields.retain(|(k, _)| k != METHOD_OVERRIDE_FIELD);
        self.fields
            .insert(0, (METHOD_OVERRIDE_FIELD.to_string(), method.to_string()));
        self
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn into_multipart(self) -> Result<Form, ApiError> {
        let mut form = Form::new();
        for (k, v) in self.fields {
            form = form.text(k, v);
        }
        if let Some(file) = self.attachment {
            let mut part = Part::bytes(file.bytes).file_name(file.file_name);
            if let Some(mime) = file.mime {
                part = part
                    .mime_str(&mime)
                    .map_err(|e| ApiError::Attachment(format!("mime {}: {}", mime, e)))?;
            }
            form = form.part(file.field, part);
        }
        Ok(form)
    }
}

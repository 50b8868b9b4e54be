use serde::{Deserialize, Serialize};

/// `{message}` body used for health, acknowledgements and errors.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// `{data}` envelope for read endpoints.
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub data: T,
}

/// Query string of `GET /data`. Fields stay raw so a missing or malformed
/// bound is reported by the query service, naming the field.
#[derive(Debug, Default, Deserialize)]
pub struct DataQuery {
    pub start: Option<String>,
    pub end: Option<String>,
}

/// Body of `PUT /applications`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorUpdate {
    pub name: String,
    #[serde(default)]
    pub color_hex: String,
}

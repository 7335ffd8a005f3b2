use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Body of a successful `POST /api/predict`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PredictionResponse {
    pub predicted_disease: String,
    pub confidence_score: f32,
}

/// Error categories surfaced to clients. The wire string is the variant name.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Display, AsRefStr, EnumString,
)]
pub enum ErrorKind {
    DecodeError,
    ShapeError,
    PayloadTooLarge,
    ConfigurationError,
    ServiceUnavailable,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ErrorResponse {
    pub error: ErrorKind,
    pub message: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LabelsResponse {
    pub labels: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HelloResponse {
    #[serde(rename = "Hello")]
    pub hello: String,
}

impl Default for HelloResponse {
    fn default() -> Self {
        Self {
            hello: "World".to_string(),
        }
    }
}

use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("Empty result: {0}")]
    EmptyResult(String),
    #[error("Delivery failed: {0}")]
    DeliveryError(String),
    #[error("Cache unavailable: {0}")]
    CacheUnavailable(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// Run summaries are emitted as JSON, errors included
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

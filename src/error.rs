use thiserror::Error;

/// Marker the Gemini API puts in the message of a 404 for an unknown or unbilled key.
const ENTITY_NOT_FOUND: &str = "Requested entity was not found";

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Request error: {0}")]
    RequestError(String),
    #[error("API error ({status}): {message}")]
    ApiError { status: String, message: String },
    #[error("Response error: {0}")]
    ResponseError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("No image data found in response")]
    NoImageData,
    #[error("Key selection error: {0}")]
    KeySelectionError(String),
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl GenerationError {
    /// True when the failure means the selected key cannot reach the model and
    /// the user should pick another one.
    pub fn is_entity_not_found(&self) -> bool {
        self.to_string().contains(ENTITY_NOT_FOUND)
    }
}

pub type Result<T> = std::result::Result<T, GenerationError>;

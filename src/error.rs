use thiserror::Error;

/// Result type for PlantCare operations
pub type Result<T> = std::result::Result<T, PlantCareError>;

/// Errors that can occur when talking to a PlantCare device
#[derive(Error, Debug)]
pub enum PlantCareError {
    /// Transport failure: refused connection, timeout, DNS failure or a non-success status
    #[error("Device unreachable at {url}: {source}")]
    DeviceUnreachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The device answered, but the body is not a decimal integer
    #[error("Invalid response from {url}: {body:?}")]
    InvalidResponse {
        url: String,
        /// Raw body as returned by the device
        body: String,
    },

    /// Rejected before any request was made
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Poll broadcast or blocking task error
    #[error("Channel error: {0}")]
    ChannelError(String),
}

impl PlantCareError {
    /// True for transport-level failures
    pub fn is_unreachable(&self) -> bool {
        matches!(self, PlantCareError::DeviceUnreachable { .. })
    }

    /// True when the device sent a body that is not an integer
    pub fn is_invalid_response(&self) -> bool {
        matches!(self, PlantCareError::InvalidResponse { .. })
    }
}

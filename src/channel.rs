use crate::error::{PlantCareError, Result};
use crate::types::{ChannelIndex, PowerLevel};
use reqwest::blocking::{Client, Response};
use reqwest::Url;
use std::time::Duration;

/// Upper bound for a single GET/PUT against the device
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Build the blocking HTTP client used for device requests
///
/// Channels of the same device can share one client (and its connection pool)
/// through [`PowerChannel::with_client`].
pub fn http_client() -> Result<Client> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| PlantCareError::InvalidRequest(format!("failed to build HTTP client: {}", e)))
}

/// Check that `host` is a bare address (IP or hostname, optional port)
pub fn validate_host(host: &str) -> Result<()> {
    if host.is_empty() {
        return Err(PlantCareError::InvalidRequest("host must not be empty".to_string()));
    }
    if host.contains("://")
        || host.contains(['/', '?', '#', '@'])
        || host.chars().any(char::is_whitespace)
    {
        return Err(PlantCareError::InvalidRequest(format!(
            "host must be an address without scheme or path, got {:?}",
            host
        )));
    }
    Ok(())
}

/// One addressable power channel on one PlantCare device
///
/// Every call is a single blocking request/response exchange against
/// `http://{host}/power/{index}`. The channel caches nothing; callers keep
/// the last acknowledged value themselves.
#[derive(Debug, Clone)]
pub struct PowerChannel {
    host: String,
    channel_index: ChannelIndex,
    url: String,
    http: Client,
}

impl PowerChannel {
    /// Create a channel with its own HTTP client
    ///
    /// No network I/O happens here.
    pub fn new(host: impl Into<String>, channel_index: ChannelIndex) -> Result<Self> {
        Self::with_client(http_client()?, host, channel_index)
    }

    /// Create a channel that reuses an existing HTTP client
    pub fn with_client(
        http: Client,
        host: impl Into<String>,
        channel_index: ChannelIndex,
    ) -> Result<Self> {
        let host = host.into();
        validate_host(&host)?;
        let url = format!("http://{}/power/{}", host, channel_index);
        check_resource_url(&url, channel_index)?;

        Ok(Self {
            host,
            channel_index,
            url,
            http,
        })
    }

    /// Device address this channel talks to
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Power resource index on the device
    pub fn channel_index(&self) -> ChannelIndex {
        self.channel_index
    }

    /// Resource URL, `http://{host}/power/{index}`
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Read the current power level reported by the device
    pub fn get_power(&self) -> Result<PowerLevel> {
        tracing::debug!(url = %self.url, "GET power");
        let response = self.http.get(&self.url).send();
        let power = self.read_power(response)?;
        tracing::debug!(url = %self.url, power, "device reported power");
        Ok(power)
    }

    /// Set the power level and return the value the device acknowledged
    ///
    /// `value` is sent as-is. The device may clamp or reject it, so the
    /// returned level is the authoritative one.
    pub fn set_power(&self, value: PowerLevel) -> Result<PowerLevel> {
        tracing::debug!(url = %self.url, value, "PUT power");
        let response = self.http.put(&self.url).body(value.to_string()).send();
        let acknowledged = self.read_power(response)?;
        if acknowledged != value {
            tracing::debug!(url = %self.url, requested = value, acknowledged, "device adjusted power");
        }
        Ok(acknowledged)
    }

    fn read_power(&self, response: reqwest::Result<Response>) -> Result<PowerLevel> {
        let body = response
            .and_then(Response::error_for_status)
            .and_then(Response::text)
            .map_err(|source| PlantCareError::DeviceUnreachable {
                url: self.url.clone(),
                source,
            })?;

        parse_power(&body).ok_or_else(|| PlantCareError::InvalidResponse {
            url: self.url.clone(),
            body,
        })
    }
}

/// The derived URL must address exactly `/power/{index}` on the host
fn check_resource_url(url: &str, channel_index: ChannelIndex) -> Result<()> {
    let parsed = Url::parse(url)
        .map_err(|e| PlantCareError::InvalidRequest(format!("invalid device url {:?}: {}", url, e)))?;

    if parsed.path() != format!("/power/{}", channel_index)
        || parsed.query().is_some()
        || parsed.fragment().is_some()
        || !parsed.username().is_empty()
        || parsed.password().is_some()
    {
        return Err(PlantCareError::InvalidRequest(format!(
            "host does not form a power resource url: {:?}",
            url
        )));
    }
    Ok(())
}

/// Parse a plain-text decimal power level, ignoring surrounding whitespace
fn parse_power(body: &str) -> Option<PowerLevel> {
    body.trim().parse().ok()
}

use std::time::Duration;

use reqwest::{Client, Method, StatusCode};

use crate::error::{AppError, Result};

/// Some upstreams reject obvious bots, so requests go out with a browser agent.
pub const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

/// Shared HTTP transport for every source adapter.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { client })
    }

    /// Fetches `url`, failing on transport errors and on any status outside 200-399.
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !is_acceptable(status) {
            return Err(AppError::UnexpectedStatus {
                url: url.to_string(),
                status,
            });
        }

        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }

    /// Whether `url` answers `method` with an acceptable status.
    pub async fn can_fetch(&self, method: Method, url: &str) -> bool {
        match self.client.request(method, url).send().await {
            Ok(response) if is_acceptable(response.status()) => true,
            Ok(response) => {
                tracing::debug!("{} answered {}", url, response.status());
                false
            }
            Err(e) => {
                tracing::debug!("Failed to reach {}: {}", url, e);
                false
            }
        }
    }
}

fn is_acceptable(status: StatusCode) -> bool {
    status.is_success() || status.is_redirection()
}

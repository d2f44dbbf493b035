use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use super::error::FetchError;

/// Browser-like agent; the site serves an error page to obvious bots.
const USER_AGENT: &str = "Mozilla/5.0";

/// Where pages and image bytes come from.
#[async_trait]
pub trait HttpSource: Send + Sync {
    async fn get_text(&self, url: &Url) -> Result<String, FetchError>;

    async fn get_bytes(&self, url: &Url) -> Result<Vec<u8>, FetchError>;
}

#[derive(Clone)]
pub struct ReqwestSource {
    client: Client,
}

impl ReqwestSource {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { client })
    }

    async fn get_ok(&self, url: &Url) -> Result<reqwest::Response, FetchError> {
        let response = self.client.get(url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }
        Ok(response)
    }
}

#[async_trait]
impl HttpSource for ReqwestSource {
    async fn get_text(&self, url: &Url) -> Result<String, FetchError> {
        Ok(self.get_ok(url).await?.text().await?)
    }

    async fn get_bytes(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        Ok(self.get_ok(url).await?.bytes().await?.to_vec())
    }
}

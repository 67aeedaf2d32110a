use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use crate::config::ComputeSettings;
use crate::error::{AppError, NetworkError};

/// Formula computation service. Returns the animated image payload on a 2xx.
#[async_trait]
pub trait ComputeClient: Send + Sync {
    async fn compute(&self, query: &str) -> Result<Bytes, NetworkError>;
}

/// "Simple API" endpoint that renders the result of a query as a GIF.
pub struct WolframComputeClient {
    http: reqwest::Client,
    settings: ComputeSettings,
}

impl WolframComputeClient {
    pub fn new(settings: ComputeSettings, connect_timeout: Duration) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()?;
        Ok(Self { http, settings })
    }

    fn request(&self, query: &str) -> reqwest::RequestBuilder {
        self.http.get(&self.settings.endpoint).query(&[
            ("appid", self.settings.app_id.expose()),
            ("i", query),
        ])
    }
}

#[async_trait]
impl ComputeClient for WolframComputeClient {
    async fn compute(&self, query: &str) -> Result<Bytes, NetworkError> {
        debug!("Querying compute service with {:?}", query);
        let response = self.request(query).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::Status {
                status: status.as_u16(),
            });
        }
        Ok(response.bytes().await?)
    }
}

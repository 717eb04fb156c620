use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use super::{MetricSink, Sample, SinkError, SinkResult};
use crate::config::CloudConfig;
use crate::util::HTTP_TIMEOUT;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Pushes each sample as JSON to a remote collector.
pub struct CloudSink {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl CloudSink {
    pub fn new(config: &CloudConfig, client: Client) -> Self {
        Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait]
impl MetricSink for CloudSink {
    fn name(&self) -> &str {
        "cloud"
    }

    #[instrument(skip_all, fields(endpoint = %self.endpoint))]
    async fn write(&self, sample: &Sample) -> SinkResult<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .timeout(HTTP_TIMEOUT)
            .header(API_KEY_HEADER, &self.api_key)
            .json(sample)
            .send()
            .await?;

        SinkError::check(response).await?;
        debug!("pushed sample to cloud endpoint");
        Ok(())
    }
}

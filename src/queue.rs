//! Downstream queue publishing.
//!
//! One message is published per successfully measured object. The payload
//! field names and their order are the wire contract with consumers.

use crate::config::QueueConfig;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_sqs::config::Builder as SqsConfigBuilder;
use aws_sdk_sqs::Client as SqsClient;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument};

/// Per-object summary published to the queue.
///
/// Serialized as JSON text; field declaration order is the contract.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SizeReport {
    pub object_uri: String,
    pub size_mb: f64,
}

/// Errors from delivering one message.
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("failed to serialize message: {0}")]
    Serialize(String),

    #[error("failed to send message to {queue_url}: {message}")]
    Send { queue_url: String, message: String },
}

/// Delivery of size reports to the downstream queue.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Publish one report; an `Err` means the message was not accepted.
    async fn publish(&self, report: &SizeReport) -> Result<(), PublishError>;
}

/// SQS-backed message sink.
pub struct SqsMessageSink {
    client: SqsClient,
    queue_url: String,
}

impl SqsMessageSink {
    /// Create a new SQS sink from configuration.
    ///
    /// The queue URL in `config` is already resolved for the environment
    /// (any local-test host rewrite happened during configuration loading).
    pub async fn new(config: &QueueConfig) -> anyhow::Result<Self> {
        let aws_config = aws_config::defaults(BehaviorVersion::latest()).load().await;

        let mut sqs_config_builder = SqsConfigBuilder::from(&aws_config);

        // Custom endpoint for LocalStack
        if let Some(ref endpoint_url) = config.endpoint_url {
            sqs_config_builder = sqs_config_builder.endpoint_url(endpoint_url);
        }

        let client = SqsClient::from_conf(sqs_config_builder.build());

        info!(
            queue_url = %config.url,
            endpoint = ?config.endpoint_url,
            "SQS message sink initialized"
        );

        Ok(Self {
            client,
            queue_url: config.url.clone(),
        })
    }
}

#[async_trait]
impl MessageSink for SqsMessageSink {
    #[instrument(skip(self, report), fields(object_uri = %report.object_uri))]
    async fn publish(&self, report: &SizeReport) -> Result<(), PublishError> {
        let body =
            serde_json::to_string(report).map_err(|e| PublishError::Serialize(e.to_string()))?;

        debug!(body = %body, "Sending message to queue");

        let response = self
            .client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(body)
            .send()
            .await
            .map_err(|e| PublishError::Send {
                queue_url: self.queue_url.clone(),
                message: e.to_string(),
            })?;

        info!(message_id = ?response.message_id(), "Message sent");
        Ok(())
    }
}

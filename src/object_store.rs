//! Streaming object size measurement against an S3-compatible store.
//!
//! Objects are never materialized in memory: the body stream is read through
//! a fixed-size buffer and only the running byte count is kept, so peak
//! memory is bounded by the chunk size regardless of object size.

use crate::config::S3Config;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Builder as S3ConfigBuilder;
use aws_sdk_s3::Client as S3Client;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info, instrument};

/// Read granularity for streamed measurement.
const CHUNK_SIZE: usize = 8192;

/// Errors from the streamed read of one object.
#[derive(Error, Debug)]
pub enum ObjectAccessError {
    #[error("failed to open s3://{bucket}/{key}: {message}")]
    Open {
        bucket: String,
        key: String,
        message: String,
    },

    #[error("read failed for s3://{bucket}/{key}: {message}")]
    Read {
        bucket: String,
        key: String,
        message: String,
    },
}

/// Read access to the object store, scoped to what the processor needs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stream the addressed object and return its size in bytes.
    async fn measure_object(&self, bucket: &str, key: &str) -> Result<u64, ObjectAccessError>;
}

/// S3-backed object store.
pub struct S3ObjectStore {
    client: S3Client,
}

impl S3ObjectStore {
    /// Create a new S3 object store from configuration.
    pub async fn new(config: &S3Config) -> anyhow::Result<Self> {
        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()))
            .load()
            .await;

        let mut s3_config_builder = S3ConfigBuilder::from(&aws_config);

        // Custom endpoint for MinIO/LocalStack
        if let Some(ref endpoint_url) = config.endpoint_url {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint_url);
        }

        // Path-style access for MinIO compatibility
        if config.force_path_style {
            s3_config_builder = s3_config_builder.force_path_style(true);
        }

        let client = S3Client::from_conf(s3_config_builder.build());

        info!(
            region = %config.region,
            endpoint = ?config.endpoint_url,
            "S3 object store initialized"
        );

        Ok(Self { client })
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    #[instrument(skip(self))]
    async fn measure_object(&self, bucket: &str, key: &str) -> Result<u64, ObjectAccessError> {
        debug!("Streaming object to measure size");

        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| ObjectAccessError::Open {
                bucket: bucket.to_string(),
                key: key.to_string(),
                message: e.to_string(),
            })?;

        // The stream is released by drop on every exit path.
        let reader = response.body.into_async_read();
        let size_bytes =
            measure_stream(reader)
                .await
                .map_err(|e| ObjectAccessError::Read {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                    message: e.to_string(),
                })?;

        info!(size_bytes, "Measured object size");
        Ok(size_bytes)
    }
}

/// Accumulate the total length of a byte stream in fixed-size reads.
async fn measure_stream<R>(mut reader: R) -> std::io::Result<u64>
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; CHUNK_SIZE];
    let mut total: u64 = 0;

    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        total += n as u64;
    }

    Ok(total)
}

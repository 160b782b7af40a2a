//! Service configuration.
//!
//! Configuration is layered: defaults, then an optional config file, then
//! `SIZER__`-prefixed environment variables, then the well-known runtime
//! variables (`SQS_QUEUE_URL`, `AWS_ENDPOINT_URL`, `LOCALSTACK_HOSTNAME`).
//!
//! All local-test environment compatibility lives here: when a LocalStack
//! hostname is present, both service endpoints are pointed at it and the
//! queue URL's host component is rewritten, so the processing code never
//! sees test-environment string substitutions.

use serde::Deserialize;
use std::env;

/// Main configuration for the size reporter
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Service configuration
    #[serde(default)]
    pub service: ServiceConfig,
    /// S3 configuration
    #[serde(default)]
    pub s3: S3Config,
    /// Queue configuration
    pub queue: QueueConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Service name for logging
    #[serde(default = "default_service_name")]
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// S3 access configuration
#[derive(Debug, Clone, Deserialize)]
pub struct S3Config {
    /// AWS region
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint URL (for MinIO, LocalStack, etc.)
    pub endpoint_url: Option<String>,
    /// Force path-style access (required for MinIO)
    #[serde(default)]
    pub force_path_style: bool,
}

/// Downstream queue configuration
#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    /// Target queue URL, fully resolved for the current environment
    pub url: String,
    /// Custom endpoint URL (for LocalStack)
    pub endpoint_url: Option<String>,
}

// Default value functions
fn default_service_name() -> String {
    "size-reporter".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            region: default_region(),
            endpoint_url: None,
            force_path_style: false,
        }
    }
}

impl Config {
    /// Load configuration from defaults, config files, and environment
    pub fn load() -> anyhow::Result<Self> {
        let mut builder = config::Config::builder()
            .set_default("service.name", "size-reporter")?
            .set_default("service.log_level", "info")?
            .add_source(config::File::with_name("config/size-reporter").required(false))
            .add_source(
                config::Environment::with_prefix("SIZER")
                    .separator("__")
                    .try_parsing(true),
            );

        // Variables provided by the hosting runtime win over file values.
        if let Ok(url) = env::var("SQS_QUEUE_URL") {
            builder = builder.set_override("queue.url", url)?;
        }
        if let Ok(endpoint) = env::var("AWS_ENDPOINT_URL") {
            builder = builder.set_override("s3.endpoint_url", endpoint.clone())?;
            builder = builder.set_override("queue.endpoint_url", endpoint)?;
        }

        // LOCALSTACK_HOSTNAME is set for functions running inside the
        // LocalStack container; it supersedes any explicit endpoint.
        let localstack_host = env::var("LOCALSTACK_HOSTNAME").ok();
        if let Some(ref host) = localstack_host {
            let endpoint = localstack_endpoint(host);
            builder = builder.set_override("s3.endpoint_url", endpoint.clone())?;
            builder = builder.set_override("queue.endpoint_url", endpoint)?;
        }

        let mut config: Config = builder.build()?.try_deserialize()?;

        if let Some(ref host) = localstack_host {
            config.queue.url = rewrite_queue_host(&config.queue.url, host);
        }

        Ok(config)
    }
}

/// Endpoint URL for a LocalStack container host.
fn localstack_endpoint(host: &str) -> String {
    format!("http://{host}:4566")
}

/// Rewrite a queue URL's host component to the container-internal host.
///
/// Queue URLs handed to the function use externally-resolvable hostnames;
/// inside the container those must become the internal hostname. The longer
/// pattern is substituted first so the bare `localhost` substitution cannot
/// mangle it.
fn rewrite_queue_host(url: &str, localstack_host: &str) -> String {
    url.replace("localhost.localstack.cloud", localstack_host)
        .replace("localhost", localstack_host)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        assert_eq!(default_service_name(), "size-reporter");
        assert_eq!(default_log_level(), "info");
        assert_eq!(default_region(), "us-east-1");
        assert!(!S3Config::default().force_path_style);
    }

    #[test]
    fn test_localstack_endpoint() {
        assert_eq!(localstack_endpoint("172.17.0.2"), "http://172.17.0.2:4566");
    }

    #[test]
    fn test_rewrite_cloud_hostname() {
        let rewritten = rewrite_queue_host(
            "http://localhost.localstack.cloud:4566/000000000000/upload-events",
            "172.17.0.2",
        );
        assert_eq!(rewritten, "http://172.17.0.2:4566/000000000000/upload-events");
    }

    #[test]
    fn test_rewrite_bare_localhost() {
        let rewritten = rewrite_queue_host(
            "http://localhost:4566/000000000000/upload-events",
            "172.17.0.2",
        );
        assert_eq!(rewritten, "http://172.17.0.2:4566/000000000000/upload-events");
    }

    #[test]
    fn test_rewrite_substitution_order() {
        // The cloud hostname must not degrade into "<host>.localstack.cloud".
        let rewritten = rewrite_queue_host(
            "http://localhost.localstack.cloud:4566/q",
            "10.0.0.5",
        );
        assert!(!rewritten.contains("localstack.cloud"));
        assert!(rewritten.starts_with("http://10.0.0.5:4566"));
    }

    #[test]
    fn test_rewrite_leaves_production_urls_alone() {
        let url = "https://sqs.us-east-1.amazonaws.com/123456789012/upload-events";
        assert_eq!(rewrite_queue_host(url, "172.17.0.2"), url);
    }
}

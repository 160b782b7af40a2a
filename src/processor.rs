//! Batch processing pipeline: notification in, size report out.
//!
//! Records are processed independently and strictly in input order. A
//! failure inside one record becomes an error outcome for that record and
//! never aborts the rest of the batch; the invocation as a whole always
//! produces a 200-style response. Redelivered notifications are simply
//! reprocessed; there is no deduplication here.

use crate::event::{ObjectRef, UploadEvent, UploadRecord};
use crate::object_store::{ObjectAccessError, ObjectStore};
use crate::queue::{MessageSink, PublishError, SizeReport};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, instrument};

const BYTES_PER_MB: f64 = 1_048_576.0;

const COMPLETION_MESSAGE: &str = "Processing complete";

/// Failure of one record's processing, folded into its outcome.
#[derive(Error, Debug)]
enum ProcessingError {
    #[error(transparent)]
    ObjectAccess(#[from] ObjectAccessError),

    #[error(transparent)]
    Publish(#[from] PublishError),
}

/// Per-record outcome, reported in input order.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecordOutcome {
    Success { object_uri: String, size_mb: f64 },
    Error { object_uri: String, error: String },
}

/// Invocation result envelope.
///
/// `statusCode` is 200 regardless of per-record failures; failures are
/// reported inside the body's `results`, never as an overall failure.
#[derive(Debug, Clone, Serialize)]
pub struct FunctionResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    /// JSON string of `{ message, results }`.
    pub body: String,
}

#[derive(Serialize)]
struct BatchReport<'a> {
    message: &'static str,
    results: &'a [RecordOutcome],
}

/// Transforms a notification batch into per-record outcomes, publishing one
/// size report per successfully measured object.
pub struct SizeReportProcessor<S, Q> {
    store: S,
    sink: Q,
}

impl<S, Q> SizeReportProcessor<S, Q>
where
    S: ObjectStore,
    Q: MessageSink,
{
    pub fn new(store: S, sink: Q) -> Self {
        Self { store, sink }
    }

    /// Process a batch and wrap the outcomes in the response envelope.
    pub async fn handle(&self, event: UploadEvent) -> Result<FunctionResponse, serde_json::Error> {
        let results = self.process(event).await;
        let body = serde_json::to_string(&BatchReport {
            message: COMPLETION_MESSAGE,
            results: &results,
        })?;

        Ok(FunctionResponse {
            status_code: 200,
            body,
        })
    }

    /// Process each record independently, in input order.
    pub async fn process(&self, event: UploadEvent) -> Vec<RecordOutcome> {
        let mut results = Vec::with_capacity(event.records.len());

        for record in &event.records {
            results.push(self.process_record(record).await);
        }

        results
    }

    #[instrument(
        skip(self, record),
        fields(bucket = %record.s3.bucket.name, key = %record.s3.object.key)
    )]
    async fn process_record(&self, record: &UploadRecord) -> RecordOutcome {
        let object = ObjectRef::from_record(record);
        let object_uri = object.uri();

        info!(object_uri = %object_uri, "Processing object");

        match self.measure_and_publish(&object).await {
            Ok(size_mb) => {
                info!(object_uri = %object_uri, size_mb, "Object processed");
                RecordOutcome::Success {
                    object_uri,
                    size_mb,
                }
            }
            Err(e) => {
                error!(object_uri = %object_uri, error = %e, "Failed to process object");
                RecordOutcome::Error {
                    object_uri,
                    error: e.to_string(),
                }
            }
        }
    }

    async fn measure_and_publish(&self, object: &ObjectRef) -> Result<f64, ProcessingError> {
        let size_bytes = self.store.measure_object(&object.bucket, &object.key).await?;
        let size_mb = bytes_to_mb(size_bytes);

        self.sink
            .publish(&SizeReport {
                object_uri: object.uri(),
                size_mb,
            })
            .await?;

        Ok(size_mb)
    }
}

/// Convert a byte count to megabytes, rounded to 2 decimal places.
///
/// Ties round half-to-even, the semantics of the standard numeric rounding
/// this reproduces.
pub fn bytes_to_mb(size_bytes: u64) -> f64 {
    (size_bytes as f64 / BYTES_PER_MB * 100.0).round_ties_even() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object_store::MockObjectStore;
    use crate::queue::MockMessageSink;

    fn batch(keys: &[&str]) -> UploadEvent {
        let records: Vec<serde_json::Value> = keys
            .iter()
            .map(|key| {
                serde_json::json!({
                    "s3": {"bucket": {"name": "uploads"}, "object": {"key": key}}
                })
            })
            .collect();
        serde_json::from_value(serde_json::json!({ "Records": records })).unwrap()
    }

    #[test]
    fn test_bytes_to_mb_rounding() {
        assert_eq!(bytes_to_mb(1_048_576), 1.0);
        assert_eq!(bytes_to_mb(1_572_864), 1.5);
        assert_eq!(bytes_to_mb(0), 0.0);
        // One chunk is far below a megabyte but still registers.
        assert_eq!(bytes_to_mb(8192), 0.01);
        assert_eq!(bytes_to_mb(1024), 0.0);
    }

    #[tokio::test]
    async fn test_success_outcome_and_publish() {
        let mut store = MockObjectStore::new();
        store
            .expect_measure_object()
            .withf(|bucket, key| bucket == "uploads" && key == "folder/file.txt")
            .returning(|_, _| Ok(1_572_864));

        let mut sink = MockMessageSink::new();
        sink.expect_publish()
            .withf(|report| {
                report.object_uri == "s3://uploads/folder/file.txt" && report.size_mb == 1.5
            })
            .times(1)
            .returning(|_| Ok(()));

        let processor = SizeReportProcessor::new(store, sink);
        let results = processor.process(batch(&["folder/file.txt"])).await;

        assert_eq!(
            results,
            vec![RecordOutcome::Success {
                object_uri: "s3://uploads/folder/file.txt".to_string(),
                size_mb: 1.5,
            }]
        );
    }

    #[tokio::test]
    async fn test_key_decoded_before_addressing() {
        let mut store = MockObjectStore::new();
        store
            .expect_measure_object()
            .withf(|_, key| key == "a b/c")
            .returning(|_, _| Ok(0));

        let mut sink = MockMessageSink::new();
        sink.expect_publish()
            .withf(|report| report.object_uri == "s3://uploads/a b/c")
            .returning(|_| Ok(()));

        let processor = SizeReportProcessor::new(store, sink);
        let results = processor.process(batch(&["a+b%2Fc"])).await;

        assert!(matches!(results[0], RecordOutcome::Success { .. }));
    }

    #[tokio::test]
    async fn test_batch_continues_past_failed_record() {
        let mut store = MockObjectStore::new();
        store.expect_measure_object().times(3).returning(|_, key| {
            if key == "two" {
                Err(ObjectAccessError::Open {
                    bucket: "uploads".to_string(),
                    key: "two".to_string(),
                    message: "access denied".to_string(),
                })
            } else {
                Ok(1_048_576)
            }
        });

        let mut sink = MockMessageSink::new();
        sink.expect_publish().times(2).returning(|_| Ok(()));

        let processor = SizeReportProcessor::new(store, sink);
        let response = processor
            .handle(batch(&["one", "two", "three"]))
            .await
            .unwrap();

        assert_eq!(response.status_code, 200);

        let body: serde_json::Value = serde_json::from_str(&response.body).unwrap();
        let results = body["results"].as_array().unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0]["status"], "success");
        assert_eq!(results[1]["status"], "error");
        assert_eq!(results[1]["object_uri"], "s3://uploads/two");
        assert!(results[1]["error"]
            .as_str()
            .unwrap()
            .contains("access denied"));
        assert_eq!(results[2]["status"], "success");
    }

    #[tokio::test]
    async fn test_publish_failure_becomes_error_outcome() {
        let mut store = MockObjectStore::new();
        store.expect_measure_object().returning(|_, _| Ok(42));

        let mut sink = MockMessageSink::new();
        sink.expect_publish().returning(|_| {
            Err(PublishError::Send {
                queue_url: "http://localhost:4566/q".to_string(),
                message: "unreachable".to_string(),
            })
        });

        let processor = SizeReportProcessor::new(store, sink);
        let results = processor.process(batch(&["file.bin"])).await;

        match &results[0] {
            RecordOutcome::Error { object_uri, error } => {
                assert_eq!(object_uri, "s3://uploads/file.bin");
                assert!(error.contains("unreachable"));
            }
            other => panic!("expected error outcome, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_no_publish_when_measurement_fails() {
        let mut store = MockObjectStore::new();
        store.expect_measure_object().returning(|_, _| {
            Err(ObjectAccessError::Read {
                bucket: "uploads".to_string(),
                key: "gone".to_string(),
                message: "object vanished".to_string(),
            })
        });

        let mut sink = MockMessageSink::new();
        sink.expect_publish().times(0);

        let processor = SizeReportProcessor::new(store, sink);
        let results = processor.process(batch(&["gone"])).await;

        assert!(matches!(results[0], RecordOutcome::Error { .. }));
    }

    #[tokio::test]
    async fn test_empty_batch_yields_empty_results() {
        let store = MockObjectStore::new();
        let sink = MockMessageSink::new();

        let processor = SizeReportProcessor::new(store, sink);
        let event: UploadEvent = serde_json::from_str("{}").unwrap();
        let response = processor.handle(event).await.unwrap();

        assert_eq!(response.status_code, 200);
        let body: serde_json::Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body["message"], "Processing complete");
        assert_eq!(body["results"], serde_json::json!([]));
    }

    #[test]
    fn test_response_envelope_keys() {
        let response = FunctionResponse {
            status_code: 200,
            body: "{}".to_string(),
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["statusCode"], 200);
        assert!(value["body"].is_string());
    }

    #[test]
    fn test_outcome_serialization_shape() {
        let success = RecordOutcome::Success {
            object_uri: "s3://b/k".to_string(),
            size_mb: 2.25,
        };
        assert_eq!(
            serde_json::to_value(&success).unwrap(),
            serde_json::json!({"status": "success", "object_uri": "s3://b/k", "size_mb": 2.25})
        );

        let failure = RecordOutcome::Error {
            object_uri: "s3://b/k".to_string(),
            error: "boom".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&failure).unwrap(),
            serde_json::json!({"status": "error", "object_uri": "s3://b/k", "error": "boom"})
        );
    }
}

//! Size Reporter
//!
//! Notification-driven object size reporting service. When objects are
//! created in a bucket, the delivered notification batch is processed one
//! record at a time: the object's content is streamed from S3 to measure its
//! size in bounded-memory chunks, and a per-object summary message is
//! published to an SQS queue.
//!
//! ## Architecture
//!
//! ```text
//! Notification Batch          S3 Bucket                SQS Queue
//! ┌──────────────┐           ┌──────────────┐         ┌──────────────┐
//! │ Records[]    │──────────▶│ GetObject    │         │ {object_uri, │
//! └──────────────┘           │ (streamed)   │         │  size_mb}    │
//!        │                   └──────────────┘         └──────────────┘
//!        ▼                          │                        ▲
//! ┌──────────────┐                  ▼                        │
//! │ SizeReport   │           ┌──────────────┐                │
//! │ Processor    │──────────▶│ chunked byte │────────────────┘
//! └──────────────┘           │ counting     │
//!        │                   └──────────────┘
//!        ▼
//! ┌──────────────┐
//! │ per-record   │
//! │ outcomes     │
//! └──────────────┘
//! ```
//!
//! Records are independent: a failure on one is reported in its outcome and
//! the rest of the batch still runs. The invocation always returns a
//! 200-style envelope with per-record statuses.

pub mod config;
pub mod event;
pub mod object_store;
pub mod processor;
pub mod queue;

pub use config::{Config, QueueConfig, S3Config, ServiceConfig};
pub use event::{ObjectRef, UploadEvent, UploadRecord};
pub use object_store::{ObjectAccessError, ObjectStore, S3ObjectStore};
pub use processor::{bytes_to_mb, FunctionResponse, RecordOutcome, SizeReportProcessor};
pub use queue::{MessageSink, PublishError, SizeReport, SqsMessageSink};

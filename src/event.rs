//! Notification event model.
//!
//! Object-creation notifications arrive as a batch of records in the S3
//! notification wire shape. Object keys are delivered percent-encoded with
//! `+` standing in for spaces, so they must be decoded before the object can
//! be addressed or reported.

use serde::Deserialize;

/// A batch of object-creation notifications, as delivered per invocation.
///
/// A payload without a `Records` field deserializes to an empty batch.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<UploadRecord>,
}

/// One object-creation notification.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadRecord {
    pub s3: S3Entity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Entity {
    pub bucket: S3Bucket,
    pub object: S3Object,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Bucket {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Object {
    /// Raw key as delivered: percent-encoded, `+` for spaces.
    pub key: String,
}

/// A resolved object location: bucket name plus decoded key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    pub bucket: String,
    pub key: String,
}

impl ObjectRef {
    /// Resolve a notification record into an addressable object location.
    pub fn from_record(record: &UploadRecord) -> Self {
        Self {
            bucket: record.s3.bucket.name.clone(),
            key: decode_key(&record.s3.object.key),
        }
    }

    /// The reported URI for this object, `s3://<bucket>/<key>`.
    pub fn uri(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.key)
    }
}

/// Decode an object key from its delivered form.
///
/// `+` decodes to a space, then percent-escapes are resolved. Malformed
/// escapes decode lossily rather than failing, so every delivered key yields
/// a usable (if degenerate) object reference.
pub fn decode_key(raw: &str) -> String {
    let unplussed = raw.replace('+', " ");
    String::from_utf8_lossy(&urlencoding::decode_binary(unplussed.as_bytes())).into_owned()
}

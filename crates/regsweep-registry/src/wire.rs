//! ECR API response shapes as printed by `aws ecr ... --output json`

use chrono::{DateTime, Utc};
use regsweep_core::ImageRecord;
use serde::{Deserialize, Deserializer, Serialize};

/// `describe-repositories` output
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribeRepositoriesOutput {
    #[serde(default)]
    pub repositories: Vec<Repository>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    pub repository_name: String,
    #[serde(default)]
    pub repository_uri: Option<String>,
}

/// `describe-images` output
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribeImagesOutput {
    #[serde(default)]
    pub image_details: Vec<ImageDetail>,
}

/// One entry of `imageDetails`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageDetail {
    pub image_digest: String,
    #[serde(default)]
    pub image_tags: Option<Vec<String>>,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub image_pushed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub image_size_in_bytes: Option<u64>,
}

impl From<ImageDetail> for ImageRecord {
    fn from(detail: ImageDetail) -> Self {
        let mut record = ImageRecord::new(detail.image_digest)
            .with_tags(detail.image_tags.unwrap_or_default());
        record.pushed_at = detail.image_pushed_at;
        record
    }
}

impl DescribeImagesOutput {
    /// Convert to engine records
    pub fn into_records(self) -> Vec<ImageRecord> {
        self.image_details.into_iter().map(ImageRecord::from).collect()
    }
}

/// `batch-delete-image` output
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDeleteImageOutput {
    #[serde(default)]
    pub image_ids: Vec<ImageIdentifier>,
    #[serde(default)]
    pub failures: Vec<ImageFailure>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageIdentifier {
    #[serde(default)]
    pub image_digest: Option<String>,
    #[serde(default)]
    pub image_tag: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageFailure {
    #[serde(default)]
    pub image_id: ImageIdentifier,
    #[serde(default)]
    pub failure_code: Option<String>,
    #[serde(default)]
    pub failure_reason: Option<String>,
}

/// Timestamp as RFC 3339 text (CLI v2) or epoch seconds (CLI v1, raw API)
#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Text(String),
    Epoch(f64),
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let raw = Option::<RawTimestamp>::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(RawTimestamp::Text(text)) => DateTime::parse_from_rfc3339(&text)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|e| D::Error::custom(format!("invalid timestamp '{}': {}", text, e))),
        Some(RawTimestamp::Epoch(secs)) => {
            // Millisecond precision
            DateTime::from_timestamp_millis((secs * 1000.0).round() as i64)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("timestamp out of range: {}", secs)))
        }
    }
}

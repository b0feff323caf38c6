//! Video record models.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a recorded throw video.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl VideoId {
    /// Generate a new random video ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for VideoId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for VideoId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VideoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Human-assigned outcome of a throw. Immutable after creation; the AI
/// records its own opinion in [`AiAnalysis::detected_result`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ThrowResult {
    /// Disc landed in the basket
    Ace,
    /// Disc hit the basket but did not stay in
    Hit,
    /// Disc missed entirely
    Miss,
}

impl ThrowResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThrowResult::Ace => "ace",
            ThrowResult::Hit => "hit",
            ThrowResult::Miss => "miss",
        }
    }

    /// Parse from the form-value spelling.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ace" => Some(ThrowResult::Ace),
            "hit" => Some(ThrowResult::Hit),
            "miss" => Some(ThrowResult::Miss),
            _ => None,
        }
    }
}

impl fmt::Display for ThrowResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single point on the rendered flight-path overlay, normalized to [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FlightPoint {
    pub x: f64,
    pub y: f64,
}

/// Disc flight-path visualization produced by analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FlightPath {
    pub points: Vec<FlightPoint>,
    /// Overlay stroke color (CSS hex)
    pub color: String,
}

/// Result payload reported by the AI pipeline once a video has been analyzed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AiAnalysis {
    /// URL of the annotated clip produced by the pipeline
    pub analyzed_video_url: String,

    /// Confidence in the detected result (0-100)
    pub confidence: u8,

    /// Outcome the AI detected (may disagree with the human rating)
    pub detected_result: ThrowResult,

    /// Flight-path overlay, when one was generated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flight_path: Option<FlightPath>,

    /// Wall-clock analysis duration in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time_secs: Option<f64>,

    /// When the analysis was recorded
    pub timestamp: DateTime<Utc>,
}

/// Free-form context captured with the throw, plus the processing-status
/// fields mirrored onto the record by the queue subsystem.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoMetadata {
    /// Course or location name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Disc model/mold used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disc_type: Option<String>,

    /// Throw style (backhand, forehand, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub throw_type: Option<String>,

    /// Distance to the basket in meters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,

    /// Wind conditions at the time of the throw
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wind_conditions: Option<String>,

    /// Free-form notes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    /// Whether the AI pipeline has processed this video
    #[serde(default)]
    pub ai_processed: bool,

    /// Analysis payload, set once processing succeeds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_analysis: Option<AiAnalysis>,

    /// Queue status mirror, refreshed on every queue-item transition
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_status: Option<crate::queue::ProcessingStatus>,

    /// Last failure reason mirrored from the queue item
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_error: Option<String>,

    /// When the queue last touched this record
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_updated_at: Option<DateTime<Utc>>,
}

/// One captured throw attempt: the stored clip, the human rating, and the
/// contextual metadata mutated in place by the queue subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoRecord {
    /// Unique record ID, assigned at creation
    pub id: VideoId,

    /// Location of the stored video asset; immutable once set
    pub url: String,

    /// Human-assigned outcome
    pub result: ThrowResult,

    /// Creation timestamp
    pub timestamp: DateTime<Utc>,

    /// Optional display label
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Contextual and processing-status metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<VideoMetadata>,
}

impl VideoRecord {
    /// Create a new record for a freshly uploaded clip.
    pub fn new(url: impl Into<String>, result: ThrowResult) -> Self {
        Self {
            id: VideoId::new(),
            url: url.into(),
            result,
            timestamp: Utc::now(),
            title: None,
            metadata: None,
        }
    }

    /// Attach a display title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Attach contextual metadata.
    pub fn with_metadata(mut self, metadata: VideoMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Mutable access to the metadata, creating an empty mapping if absent.
    pub fn metadata_mut(&mut self) -> &mut VideoMetadata {
        self.metadata.get_or_insert_with(VideoMetadata::default)
    }

    /// Whether the AI pipeline has already processed this record.
    pub fn is_ai_processed(&self) -> bool {
        self.metadata.as_ref().is_some_and(|m| m.ai_processed)
    }
}

//! Video API handlers.

use axum::extract::{Multipart, Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use chaincam_models::{
    AiAnalysis, FlightPath, ProcessingStatus, QueueItemId, ThrowResult, VideoId, VideoMetadata,
    VideoRecord,
};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Response for a successful upload.
#[derive(Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub id: VideoId,
    pub url: String,
    pub result: ThrowResult,
    pub timestamp: chrono::DateTime<Utc>,
}

/// Upload a rated throw: multipart form with the clip bytes, the human
/// rating, and optional context fields. Stores the clip in blob storage,
/// creates the record, and enqueues it for AI processing.
pub async fn upload_video(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let mut video: Option<(String, String, Vec<u8>)> = None; // (filename, content type, bytes)
    let mut result: Option<ThrowResult> = None;
    let mut title: Option<String> = None;
    let mut metadata = VideoMetadata::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "video" => {
                let filename = field.file_name().unwrap_or("throw.webm").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("video/webm")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("failed to read video: {e}")))?;
                video = Some((filename, content_type, bytes.to_vec()));
            }
            "result" => {
                let value = text_field(field).await?;
                result = Some(
                    ThrowResult::parse(&value)
                        .ok_or_else(|| ApiError::bad_request(format!("unknown result '{value}'")))?,
                );
            }
            "title" => title = Some(text_field(field).await?),
            "location" => metadata.location = Some(text_field(field).await?),
            "disc_type" => metadata.disc_type = Some(text_field(field).await?),
            "throw_type" => metadata.throw_type = Some(text_field(field).await?),
            "distance" => metadata.distance = text_field(field).await?.parse().ok(),
            "wind_conditions" => metadata.wind_conditions = Some(text_field(field).await?),
            "notes" => metadata.notes = Some(text_field(field).await?),
            other => warn!(field = other, "ignoring unknown upload field"),
        }
    }

    let (filename, content_type, bytes) =
        video.ok_or_else(|| ApiError::bad_request("video file is required"))?;
    let result = result.ok_or_else(|| ApiError::bad_request("result is required"))?;
    if bytes.is_empty() {
        return Err(ApiError::bad_request("video file is empty"));
    }

    info!(
        filename,
        size = bytes.len(),
        result = %result,
        "received video upload"
    );

    let url = state.blob.upload(&filename, bytes, &content_type).await?;

    let mut record = VideoRecord::new(url.clone(), result).with_metadata(metadata);
    if let Some(title) = title {
        record = record.with_title(title);
    }
    state.records.save(&record);

    if state.queue.add_to_queue_default(&record).is_none() {
        warn!(video_id = %record.id, "upload stored but enqueue failed");
    }

    Ok(Json(UploadResponse {
        success: true,
        id: record.id,
        url,
        result,
        timestamp: record.timestamp,
    }))
}

#[derive(Deserialize, Default)]
pub struct ListVideosParams {
    /// When true, only records the AI has not processed yet
    #[serde(default)]
    pub unprocessed: bool,
}

#[derive(Serialize)]
pub struct ListVideosResponse {
    pub success: bool,
    pub videos: Vec<VideoRecord>,
}

/// List video records. `?unprocessed=true` is the AI discovery filter.
pub async fn list_videos(
    State(state): State<AppState>,
    Query(params): Query<ListVideosParams>,
) -> Json<ListVideosResponse> {
    let mut videos = state.records.get_all();
    if params.unprocessed {
        videos.retain(|v| !v.is_ai_processed());
    }
    Json(ListVideosResponse {
        success: true,
        videos,
    })
}

/// Fetch a single record.
pub async fn get_video(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> ApiResult<Json<VideoRecord>> {
    state
        .records
        .get_by_id(&VideoId::from_string(video_id.clone()))
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("video {video_id}")))
}

#[derive(Serialize)]
pub struct QueueItemSummary {
    pub id: QueueItemId,
    pub status: ProcessingStatus,
    pub created_at: chrono::DateTime<Utc>,
}

#[derive(Serialize)]
pub struct VideoForProcessing {
    pub id: VideoId,
    pub url: String,
    pub result: ThrowResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<VideoMetadata>,
}

#[derive(Serialize)]
pub struct NextForProcessingResponse {
    pub success: bool,
    pub has_video: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_item: Option<QueueItemSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<VideoForProcessing>,
}

/// Hand the next pending video to an external processor. Claims the queue
/// item (pending -> processing) and returns the video it references.
pub async fn next_for_processing(
    State(state): State<AppState>,
) -> ApiResult<Json<NextForProcessingResponse>> {
    let Some(item) = state.queue.claim_next() else {
        return Ok(Json(NextForProcessingResponse {
            success: true,
            has_video: false,
            message: Some("No videos pending for processing".to_string()),
            queue_item: None,
            video: None,
        }));
    };

    let Some(record) = state.records.get_by_id(&item.video_id) else {
        // Claimed an item whose record is gone; report the failure so the
        // retry counter advances instead of wedging the item in processing.
        state.queue.fail(&item.id, "video record not found");
        return Err(ApiError::not_found(format!(
            "video record {} for queue item {}",
            item.video_id, item.id
        )));
    };

    Ok(Json(NextForProcessingResponse {
        success: true,
        has_video: true,
        message: None,
        queue_item: Some(QueueItemSummary {
            id: item.id,
            status: item.status,
            created_at: item.created_at,
        }),
        video: Some(VideoForProcessing {
            id: record.id,
            url: record.url,
            result: record.result,
            metadata: record.metadata,
        }),
    }))
}

/// AI completion webhook payload.
#[derive(Deserialize)]
pub struct AiProcessedRequest {
    pub video_id: String,
    #[serde(default)]
    pub queue_item_id: Option<String>,
    pub analyzed_video_url: String,
    #[serde(default)]
    pub confidence: Option<u8>,
    #[serde(default)]
    pub detected_result: Option<ThrowResult>,
    #[serde(default)]
    pub flight_path: Option<FlightPath>,
    #[serde(default)]
    pub processing_time_secs: Option<f64>,
}

#[derive(Serialize)]
pub struct AiProcessedResponse {
    pub success: bool,
    pub message: String,
}

/// Webhook the AI calls when processing finishes. Annotates the record
/// with the analysis and completes the queue item when one is named.
pub async fn ai_processed(
    State(state): State<AppState>,
    Json(request): Json<AiProcessedRequest>,
) -> ApiResult<Json<AiProcessedResponse>> {
    if request.video_id.is_empty() || request.analyzed_video_url.is_empty() {
        return Err(ApiError::bad_request(
            "video_id and analyzed_video_url are required",
        ));
    }

    let video_id = VideoId::from_string(request.video_id);
    let Some(mut record) = state.records.get_by_id(&video_id) else {
        return Err(ApiError::not_found(format!("video {video_id}")));
    };

    let analysis = AiAnalysis {
        analyzed_video_url: request.analyzed_video_url,
        confidence: request.confidence.unwrap_or(0),
        detected_result: request.detected_result.unwrap_or(record.result),
        flight_path: request.flight_path,
        processing_time_secs: request.processing_time_secs,
        timestamp: Utc::now(),
    };

    if let Some(item_id) = request.queue_item_id {
        let item_id = QueueItemId::from_string(item_id);
        let Some(item) = state.queue.get_item(&item_id) else {
            return Err(ApiError::not_found(format!("queue item {item_id}")));
        };
        if item.video_id != video_id {
            return Err(ApiError::bad_request(format!(
                "queue item {item_id} does not reference video {video_id}"
            )));
        }
        if state.queue.complete(&item_id, analysis).is_none() {
            return Err(ApiError::not_found(format!("queue item {item_id}")));
        }
    } else {
        // No queue item named; annotate the record directly.
        let metadata = record.metadata_mut();
        metadata.ai_processed = true;
        metadata.ai_analysis = Some(analysis);
        if !state.records.update(&record) {
            return Err(ApiError::internal("failed to update video record"));
        }
    }

    info!(video_id = %video_id, "recorded AI analysis results");
    Ok(Json(AiProcessedResponse {
        success: true,
        message: "Video record updated with AI analysis results".to_string(),
    }))
}

async fn text_field(field: axum::extract::multipart::Field<'_>) -> ApiResult<String> {
    field
        .text()
        .await
        .map_err(|e| ApiError::bad_request(format!("failed to read form field: {e}")))
}

//! Simulated AI analysis.
//!
//! Stands in for the real analysis pipeline: staged delays, a randomized
//! confidence score, and a detected result that usually, but not always,
//! agrees with the human rating.

use std::time::Instant;

use rand::Rng;
use tracing::debug;
use url::Url;

use chaincam_models::{AiAnalysis, FlightPath, FlightPoint, ThrowResult, VideoRecord};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};

/// Simulated analyzer.
pub struct SimulatedAnalyzer {
    config: WorkerConfig,
}

impl SimulatedAnalyzer {
    pub fn new(config: WorkerConfig) -> Self {
        Self { config }
    }

    /// Run the simulated pipeline against one record.
    pub async fn analyze(&self, record: &VideoRecord) -> WorkerResult<AiAnalysis> {
        if record.url.is_empty() {
            return Err(WorkerError::analysis("video has no source url"));
        }

        let started = Instant::now();

        let (confidence, agrees, coin, total_ms) = {
            let mut rng = rand::thread_rng();
            let min = self.config.min_latency.as_millis() as u64;
            let max = self.config.max_latency.as_millis() as u64;
            (
                rng.gen_range(70..=99u8),
                rng.gen_bool(self.config.agree_probability),
                rng.gen_bool(0.5),
                if max > min { rng.gen_range(min..=max) } else { min },
            )
        };

        // Three pipeline stages, splitting the simulated latency.
        let stage = std::time::Duration::from_millis(total_ms / 3);
        debug!(video_id = %record.id, "analyzing video content");
        tokio::time::sleep(stage).await;
        debug!(video_id = %record.id, "detecting throw result");
        tokio::time::sleep(stage).await;
        debug!(video_id = %record.id, "generating flight path visualization");
        tokio::time::sleep(stage).await;

        let detected_result = derive_detected_result(record.result, agrees, coin);

        Ok(AiAnalysis {
            analyzed_video_url: analyzed_url(&record.url),
            confidence,
            detected_result,
            flight_path: Some(default_flight_path()),
            processing_time_secs: Some(started.elapsed().as_secs_f64()),
            timestamp: chrono::Utc::now(),
        })
    }
}

/// What the AI claims to have seen. When it disagrees, the disagreement is
/// plausible: an ace call downgrades to hit, a hit call flips either way,
/// and a miss call upgrades to hit.
pub fn derive_detected_result(rated: ThrowResult, agrees: bool, coin: bool) -> ThrowResult {
    if agrees {
        return rated;
    }
    match rated {
        ThrowResult::Ace => ThrowResult::Hit,
        ThrowResult::Hit => {
            if coin {
                ThrowResult::Ace
            } else {
                ThrowResult::Miss
            }
        }
        ThrowResult::Miss => ThrowResult::Hit,
    }
}

/// URL of the annotated clip: the original object name with an
/// `_analyzed` suffix before the extension.
pub fn analyzed_url(original: &str) -> String {
    let Ok(mut url) = Url::parse(original) else {
        return format!("{original}_analyzed");
    };

    let path = url.path().to_string();
    let annotated = match path.rsplit_once('.') {
        Some((stem, ext)) => format!("{stem}_analyzed.{ext}"),
        None => format!("{path}_analyzed"),
    };
    url.set_path(&annotated);
    url.to_string()
}

fn default_flight_path() -> FlightPath {
    FlightPath {
        points: vec![
            FlightPoint { x: 0.1, y: 0.5 },
            FlightPoint { x: 0.3, y: 0.4 },
            FlightPoint { x: 0.5, y: 0.3 },
            FlightPoint { x: 0.7, y: 0.4 },
            FlightPoint { x: 0.9, y: 0.5 },
        ],
        color: "#ff0000".to_string(),
    }
}

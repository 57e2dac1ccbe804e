use crate::core::json_extract::extract_as;
use crate::domain::model::{ProcessedReel, ReelSummary};
use crate::domain::ports::{
    ChatMessage, ChatModel, ChatRequest, ContentPart, ImageUrl, MediaProcessor, Transcriber,
};
use crate::utils::error::{Result, TripError};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub const DEFAULT_BATCH_SIZE: usize = 3;
pub const DEFAULT_SUMMARY_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TRANSCRIPTION_MODEL: &str = "gpt-4o-mini-transcribe";

const SUMMARY_SYSTEM_PROMPT: &str = "You are an assistant that analyzes user reels (transcripts + images) \
and produces a structured JSON summary. The JSON must strictly follow this schema:

{
  \"summary\": \"string\",
  \"keywords\": [\"string\", ...],
  \"locations\": [
     {\"name\": \"string\", \"rating\": \"string or null\"}, ...
  ]
}

Rules:
- Always output valid JSON only (no extra text).
- `summary`: a concise text summary of the user's travel preferences.
- `keywords`: 5-10 travel-related keywords extracted from reels.
- `locations`: every location mentioned, each with an optional rating if present; if not, use null.
";

#[derive(Debug, Clone)]
pub struct ReelSettings {
    pub batch_size: usize,
    pub frame_interval_secs: u32,
    pub grid_width: u32,
    pub summary_model: String,
    pub transcription_model: String,
}

impl Default for ReelSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            frame_interval_secs: 2,
            grid_width: 3,
            summary_model: DEFAULT_SUMMARY_MODEL.to_string(),
            transcription_model: DEFAULT_TRANSCRIPTION_MODEL.to_string(),
        }
    }
}

pub struct ReelProcessor<'a, C: ChatModel, T: Transcriber, M: MediaProcessor> {
    chat: &'a C,
    transcriber: &'a T,
    media: &'a M,
    settings: ReelSettings,
}

/// 將圖片檔轉成 `data:image/jpeg;base64,...`
pub async fn image_to_data_url(path: &Path) -> Result<String> {
    let data = tokio::fs::read(path).await?;
    Ok(format!("data:image/jpeg;base64,{}", STANDARD.encode(data)))
}

impl<'a, C: ChatModel, T: Transcriber, M: MediaProcessor> ReelProcessor<'a, C, T, M> {
    pub fn new(chat: &'a C, transcriber: &'a T, media: &'a M, settings: ReelSettings) -> Self {
        Self {
            chat,
            transcriber,
            media,
            settings,
        }
    }

    /// Extract audio, transcribe it and build a frame montage for one reel.
    pub async fn process_reel(&self, video: &Path) -> Result<ProcessedReel> {
        tracing::info!("🎬 Processing reel: {}", video.display());

        let audio = self.media.extract_audio(video).await?;
        let transcript = self
            .transcriber
            .transcribe(&audio, &self.settings.transcription_model)
            .await?;
        tracing::debug!("Transcript for {}: {} chars", video.display(), transcript.len());

        let montage = self
            .media
            .create_montage(
                video,
                self.settings.frame_interval_secs,
                self.settings.grid_width,
            )
            .await?;

        Ok(ProcessedReel {
            video: video.to_path_buf(),
            montage,
            transcript,
        })
    }

    pub async fn build_batch_request(&self, batch: &[ProcessedReel]) -> Result<ChatRequest> {
        let mut request = ChatRequest::new(&self.settings.summary_model)
            .message(ChatMessage::system(SUMMARY_SYSTEM_PROMPT))
            .json_mode();

        for (i, reel) in batch.iter().enumerate() {
            let url = image_to_data_url(&reel.montage).await?;
            request = request.message(ChatMessage::user_parts(vec![
                ContentPart::Text {
                    text: format!("Reel {} transcript:\n{}", i + 1, reel.transcript),
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrl { url },
                },
            ]));
        }

        Ok(request)
    }

    /// Send a batch of reels (montage + transcript) for one JSON summary.
    pub async fn summarize_batch(&self, batch: &[ProcessedReel]) -> Result<String> {
        tracing::info!("🧠 Summarizing batch of {} reels", batch.len());

        let request = self.build_batch_request(batch).await?;
        let response = self.chat.complete(request).await?;
        response
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| TripError::llm("Reel summary came back empty"))
    }

    /// 依批次處理全部影片，回傳每批模型原始輸出
    pub async fn process_all(&self, videos: &[PathBuf]) -> Result<Vec<String>> {
        let batch_size = self.settings.batch_size.max(1);
        let mut results = Vec::new();
        let mut batch = Vec::with_capacity(batch_size);

        for video in videos {
            batch.push(self.process_reel(video).await?);

            if batch.len() == batch_size {
                results.push(self.summarize_batch(&batch).await?);
                batch.clear();
            }
        }

        if !batch.is_empty() {
            results.push(self.summarize_batch(&batch).await?);
        }

        Ok(results)
    }
}

/// Merge the per-batch raw outputs into one summary. Batches without usable
/// JSON are skipped; locations are deduplicated by name, first rating wins.
pub fn merge_summaries(raw_outputs: &[String]) -> ReelSummary {
    let mut merged = ReelSummary::default();
    let mut summaries = Vec::new();
    let mut seen_keywords = HashSet::new();
    let mut seen_locations = HashSet::new();

    for (i, raw) in raw_outputs.iter().enumerate() {
        let Some(batch) = extract_as::<ReelSummary>(raw) else {
            tracing::warn!("Batch {} summary had no usable JSON, skipping", i + 1);
            continue;
        };

        if !batch.summary.trim().is_empty() {
            summaries.push(batch.summary.trim().to_string());
        }

        for keyword in batch.keywords {
            if seen_keywords.insert(keyword.to_lowercase()) {
                merged.keywords.push(keyword);
            }
        }

        for location in batch.locations {
            let key = location.name.trim().to_lowercase();
            if key.is_empty() {
                continue;
            }
            if seen_locations.insert(key) {
                merged.locations.push(location);
            }
        }
    }

    merged.summary = summaries.join(" ");
    merged
}

use crate::domain::ports::MediaProcessor;
use crate::utils::error::{Result, TripError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;
use tokio::process::Command;

/// 縮小每張影格，避免拼貼圖的 data URL 過大
const FRAME_WIDTH: u32 = 480;

/// `ffmpeg`/`ffprobe` backed media processing. Montages are written into a
/// scratch directory that lives as long as this value.
pub struct FfmpegMedia {
    ffmpeg: String,
    ffprobe: String,
    work_dir: TempDir,
    montage_count: AtomicUsize,
}

impl FfmpegMedia {
    pub fn new() -> Result<Self> {
        Ok(Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
            work_dir: TempDir::new()?,
            montage_count: AtomicUsize::new(0),
        })
    }

    pub fn with_binaries(ffmpeg: impl Into<String>, ffprobe: impl Into<String>) -> Result<Self> {
        Ok(Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
            work_dir: TempDir::new()?,
            montage_count: AtomicUsize::new(0),
        })
    }

    async fn run(&self, program: &str, args: &[String]) -> Result<String> {
        tracing::debug!("Running {} {}", program, args.join(" "));

        let output = Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|e| TripError::media(format!("Failed to launch {}: {}", program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
            return Err(TripError::media(format!(
                "{} exited with {}: {}",
                program,
                output.status,
                tail.into_iter().rev().collect::<Vec<_>>().join(" | ")
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn probe_duration(&self, video: &Path) -> Result<f64> {
        let stdout = self.run(&self.ffprobe, &probe_args(video)).await?;
        stdout
            .trim()
            .parse::<f64>()
            .map_err(|_| TripError::media(format!("Unreadable duration '{}'", stdout.trim())))
    }
}

/// `video.mp4` -> `video.mp3`, next to the source file.
pub fn audio_path_for(video: &Path) -> PathBuf {
    video.with_extension("mp3")
}

/// 每 `interval` 秒取一張影格；回傳 (影格數, 列數)
pub fn montage_layout(duration_secs: f64, interval_secs: u32, grid_width: u32) -> (u32, u32) {
    let interval = interval_secs.max(1) as f64;
    let cols = grid_width.max(1);
    let frames = ((duration_secs / interval).ceil() as u32).max(1);
    let rows = frames.div_ceil(cols);
    (frames, rows)
}

pub fn montage_file_name(index: usize, stem: &str) -> String {
    format!("{:03}_{}_montage.jpg", index, stem)
}

fn probe_args(video: &Path) -> Vec<String> {
    vec![
        "-v".to_string(),
        "error".to_string(),
        "-show_entries".to_string(),
        "format=duration".to_string(),
        "-of".to_string(),
        "default=noprint_wrappers=1:nokey=1".to_string(),
        video.to_string_lossy().into_owned(),
    ]
}

pub fn audio_args(video: &Path, audio: &Path) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-i".to_string(),
        video.to_string_lossy().into_owned(),
        "-vn".to_string(),
        "-acodec".to_string(),
        "libmp3lame".to_string(),
        audio.to_string_lossy().into_owned(),
    ]
}

pub fn montage_args(
    video: &Path,
    montage: &Path,
    interval_secs: u32,
    grid_width: u32,
    rows: u32,
) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-i".to_string(),
        video.to_string_lossy().into_owned(),
        "-vf".to_string(),
        format!(
            "fps=1/{},scale={}:-2,tile={}x{}",
            interval_secs.max(1),
            FRAME_WIDTH,
            grid_width.max(1),
            rows
        ),
        "-frames:v".to_string(),
        "1".to_string(),
        montage.to_string_lossy().into_owned(),
    ]
}

#[async_trait]
impl MediaProcessor for FfmpegMedia {
    async fn extract_audio(&self, video: &Path) -> Result<PathBuf> {
        let audio = audio_path_for(video);
        self.run(&self.ffmpeg, &audio_args(video, &audio)).await?;
        tracing::debug!("Extracted audio track to {}", audio.display());
        Ok(audio)
    }

    async fn create_montage(
        &self,
        video: &Path,
        frame_interval_secs: u32,
        grid_width: u32,
    ) -> Result<PathBuf> {
        let duration = self.probe_duration(video).await?;
        let (frames, rows) = montage_layout(duration, frame_interval_secs, grid_width);

        let stem = video
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("reel");
        // 同名影片可能來自不同資料夾，每次呼叫用獨立檔名
        let index = self.montage_count.fetch_add(1, Ordering::Relaxed);
        let montage = self
            .work_dir
            .path()
            .join(montage_file_name(index, stem));

        self.run(
            &self.ffmpeg,
            &montage_args(video, &montage, frame_interval_secs, grid_width, rows),
        )
        .await?;

        let written = tokio::fs::metadata(&montage)
            .await
            .map(|m| m.len() > 0)
            .unwrap_or(false);
        if !written {
            return Err(TripError::media("No frames extracted from video"));
        }

        tracing::debug!(
            "Built {}x{} montage from {} frames: {}",
            grid_width,
            rows,
            frames,
            montage.display()
        );
        Ok(montage)
    }
}

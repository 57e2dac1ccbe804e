// Adapters layer: concrete implementations for external systems (LLM http, ffmpeg, storage).

pub mod media;
pub mod openai;
pub mod storage;

pub use media::FfmpegMedia;
pub use openai::OpenAiClient;
pub use storage::LocalStorage;

//! API key and model lookup.
//!
//! Order: explicit value, `OPENAI_API_KEY`, then `keys.local.toml`,
//! `keys.toml`, `keys.example.toml` under the secret directory, each read
//! as `[openai] api_key = "..."`.

use crate::utils::error::{Result, TripError};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const SECRET_FILES: [&str; 3] = ["keys.local.toml", "keys.toml", "keys.example.toml"];
const PLACEHOLDER: &str = "your-api-key";

#[derive(Debug, Default, Deserialize)]
struct SecretFile {
    #[serde(default)]
    openai: OpenAiSecrets,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAiSecrets {
    api_key: Option<String>,
    model: Option<String>,
}

#[derive(Clone)]
pub struct Secrets {
    pub api_key: String,
    pub model: Option<String>,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("api_key", &"***")
            .field("model", &self.model)
            .finish()
    }
}

fn candidate_files(secret_dir: &Path) -> Vec<PathBuf> {
    SECRET_FILES.iter().map(|name| secret_dir.join(name)).collect()
}

fn read_secret_file(path: &Path) -> Option<SecretFile> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(file) => Some(file),
        Err(e) => {
            tracing::warn!("Ignoring unreadable secret file {}: {}", path.display(), e);
            None
        }
    }
}

/// 依序讀取 secret 檔，回傳第一個非空的值
fn lookup<F>(secret_dir: &Path, pick: F) -> Option<String>
where
    F: Fn(OpenAiSecrets) -> Option<String>,
{
    candidate_files(secret_dir)
        .iter()
        .filter_map(|path| read_secret_file(path))
        .filter_map(|file| pick(file.openai))
        .find(|value| !value.trim().is_empty())
}

pub fn load_secret_model(secret_dir: &Path) -> Option<String> {
    lookup(secret_dir, |s| s.model)
}

impl Secrets {
    pub fn resolve(explicit_key: Option<&str>, secret_dir: &Path) -> Result<Self> {
        let env_key = std::env::var(API_KEY_ENV).ok();
        Self::resolve_with_env(explicit_key, env_key.as_deref(), secret_dir)
    }

    pub fn resolve_with_env(
        explicit_key: Option<&str>,
        env_key: Option<&str>,
        secret_dir: &Path,
    ) -> Result<Self> {
        let api_key = explicit_key
            .filter(|k| !k.trim().is_empty())
            .map(str::to_string)
            .or_else(|| env_key.filter(|k| !k.trim().is_empty()).map(str::to_string))
            .or_else(|| lookup(secret_dir, |s| s.api_key));

        let api_key = match api_key {
            Some(key) if !key.contains(PLACEHOLDER) => key,
            _ => {
                return Err(TripError::MissingConfigError {
                    field: format!(
                        "openai.api_key (not found or is a placeholder; set {} or fill {})",
                        API_KEY_ENV,
                        secret_dir.join(SECRET_FILES[0]).display()
                    ),
                });
            }
        };

        Ok(Self {
            api_key,
            model: load_secret_model(secret_dir),
        })
    }
}

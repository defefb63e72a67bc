//! Runtime settings: defaults, then an optional TOML file, then the
//! environment, then command-line flags. Later sources win.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::providers::ModelChoice;

pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_REFERER: &str = "https://shahs-ai-world.hf.space";
pub const DEFAULT_APP_TITLE: &str = "Shah's AI World";

#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_key: Option<String>,
    pub base_url: String,
    /// Sent as `HTTP-Referer` for OpenRouter app attribution.
    pub referer: String,
    /// Sent as `X-Title`.
    pub app_title: String,
    pub default_model: String,
    pub deny_data_collection: bool,
    pub temperature: Option<f32>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            referer: DEFAULT_REFERER.to_string(),
            app_title: DEFAULT_APP_TITLE.to_string(),
            default_model: ModelChoice::Deepseek.model_id().to_string(),
            deny_data_collection: true,
            temperature: None,
        }
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("referer", &self.referer)
            .field("app_title", &self.app_title)
            .field("default_model", &self.default_model)
            .field("deny_data_collection", &self.deny_data_collection)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl Settings {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| AppError::Config {
            path: "<inline>".to_string(),
            detail: e.to_string(),
        })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| AppError::Config {
            path: path.display().to_string(),
            detail: e.to_string(),
        })
    }

    /// Defaults, overlaid by `path` if given, overlaid by the process
    /// environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        settings.apply_env(|k| std::env::var(k).ok());
        Ok(settings)
    }

    /// Overlay values from an environment lookup. A blank variable is ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key);
        }
    }

    /// Overlay an explicit key (from a flag or a form field).
    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        if let Some(key) = key.filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key);
        }
        self
    }

    /// Overlay the model picked on the command line.
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// The configured key, trimmed. Blank counts as missing.
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(AppError::MissingApiKey)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.base_url, "https://openrouter.ai/api/v1");
        assert_eq!(s.default_model, "deepseek/deepseek-v3.2");
        assert!(s.deny_data_collection);
        assert!(s.api_key.is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let s = Settings::from_toml_str("default_model = \"google/gemini-2.5-flash\"\n").expect("parse");
        assert_eq!(s.default_model, "google/gemini-2.5-flash");
        assert_eq!(s.app_title, DEFAULT_APP_TITLE);
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let err = Settings::from_toml_str("default_model = ").unwrap_err();
        assert!(matches!(err, AppError::Config { .. }));
    }

    #[test]
    fn test_env_overrides_file_key() {
        let mut s = Settings::from_toml_str("api_key = \"from-file\"").expect("parse");
        s.apply_env(|k| (k == API_KEY_ENV).then(|| "from-env".to_string()));
        assert_eq!(s.api_key.as_deref(), Some("from-env"));
    }

    #[test]
    fn test_blank_env_ignored() {
        let mut s = Settings::from_toml_str("api_key = \"from-file\"").expect("parse");
        s.apply_env(|_| Some("   ".to_string()));
        assert_eq!(s.api_key.as_deref(), Some("from-file"));
    }

    #[test]
    fn test_flag_overrides_everything() {
        let s = Settings::default().with_api_key(Some("flag".into()));
        assert_eq!(s.require_api_key().expect("key"), "flag");
    }

    #[test]
    fn test_require_api_key_missing_and_blank() {
        assert!(matches!(Settings::default().require_api_key(), Err(AppError::MissingApiKey)));
        let blank = Settings { api_key: Some("  ".into()), ..Settings::default() };
        assert!(matches!(blank.require_api_key(), Err(AppError::MissingApiKey)));
    }

    #[test]
    fn test_debug_redacts_key() {
        let s = Settings::default().with_api_key(Some("sk-or-secret".into()));
        let dbg = format!("{:?}", s);
        assert!(!dbg.contains("sk-or-secret"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn test_from_file() {
        let mut f = tempfile::NamedTempFile::new().expect("tmp");
        writeln!(f, "base_url = \"http://localhost:9999/v1\"\ndeny_data_collection = false").expect("write");
        let s = Settings::from_file(f.path()).expect("load");
        assert_eq!(s.base_url, "http://localhost:9999/v1");
        assert!(!s.deny_data_collection);
    }

    #[test]
    fn test_from_missing_file_is_io_error() {
        let dir = tempfile::tempdir().expect("dir");
        let err = Settings::from_file(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
    }

    #[test]
    fn test_with_default_model_overrides_file_value() {
        let s = Settings::from_toml_str("default_model = \"anthropic/claude-sonnet-4\"")
            .expect("parse")
            .with_default_model("google/gemini-2.5-flash");
        assert_eq!(s.default_model, "google/gemini-2.5-flash");
    }
}

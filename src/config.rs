//! Runtime configuration.
//!
//! Layered: built-in defaults, then a TOML file, then environment overrides.
//! Command-line flags are applied last by the caller.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pipeline::extraction::pdfium::DEFAULT_RENDER_DPI;
use crate::pipeline::extraction::DEFAULT_MIN_CHARS;
use crate::pipeline::labeling::{
    validate_base_url, validate_model_name, DeviceSelection, InferenceError, ModelSettings,
    LABEL_SYSTEM_PROMPT,
};

/// Application-level constants
pub const APP_NAME: &str = "resume-labeler";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "llama3.1:8b";
pub const DEFAULT_CONTEXT_WINDOW: u32 = 8000;

/// Environment overrides.
pub const ENV_OLLAMA_HOST: &str = "OLLAMA_HOST";
pub const ENV_MODEL: &str = "RESUME_LABELER_MODEL";

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "warn,resume_labeler_lib=info,resume_labeler=info"
}

/// `<config_dir>/resume-labeler/config.toml`, when the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_NAME).join("config.toml"))
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid model configuration: {0}")]
    Model(#[from] InferenceError),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Tesseract executable, looked up on PATH when not absolute.
    pub binary: PathBuf,
    /// Tesseract language list, e.g. `eng` or `eng+deu`.
    pub languages: String,
    pub tessdata_dir: Option<PathBuf>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("tesseract"),
            languages: "eng".into(),
            tessdata_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub base_url: String,
    pub name: String,
    pub context_window: u32,
    pub device: DeviceSelection,
    /// Send the evaluator system instruction with every request.
    pub system_prompt: bool,
    pub keep_alive: String,
    /// Per-request timeout. 0 waits indefinitely.
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_URL.into(),
            name: DEFAULT_MODEL.into(),
            context_window: DEFAULT_CONTEXT_WINDOW,
            device: DeviceSelection::Auto,
            system_prompt: true,
            keep_alive: "30m".into(),
            timeout_secs: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Minimum characters for direct text input and for extracted text.
    pub min_input_chars: usize,
    /// Resolution scanned PDF pages are rendered at before OCR.
    pub render_dpi: u32,
    pub ocr: OcrConfig,
    pub model: ModelConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            min_input_chars: DEFAULT_MIN_CHARS,
            render_dpi: DEFAULT_RENDER_DPI,
            ocr: OcrConfig::default(),
            model: ModelConfig::default(),
        }
    }
}

impl AppConfig {
    /// Defaults, overlaid by `explicit` (which must exist) or else the default
    /// config file when present, then by the process environment.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(path) if path.is_file() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// Apply environment overrides read through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup(ENV_OLLAMA_HOST).filter(|h| !h.trim().is_empty()) {
            self.model.base_url = normalize_host(&host);
        }
        if let Some(model) = lookup(ENV_MODEL).filter(|m| !m.trim().is_empty()) {
            self.model.name = model.trim().to_string();
        }
    }

    /// Reject values no run could succeed with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_extraction()?;
        self.validate_model()
    }

    /// Settings the text extractor reads.
    pub fn validate_extraction(&self) -> Result<(), ConfigError> {
        if self.min_input_chars == 0 {
            return Err(ConfigError::Invalid {
                field: "min_input_chars",
                reason: "must be at least 1".into(),
            });
        }
        if !(72..=1200).contains(&self.render_dpi) {
            return Err(ConfigError::Invalid {
                field: "render_dpi",
                reason: format!("{} is outside 72..=1200", self.render_dpi),
            });
        }
        Ok(())
    }

    /// Settings the label producer reads.
    pub fn validate_model(&self) -> Result<(), ConfigError> {
        validate_base_url(&self.model.base_url)?;
        validate_model_name(&self.model.name)?;
        if self.model.context_window == 0 {
            return Err(ConfigError::Invalid {
                field: "model.context_window",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    pub fn to_model_settings(&self) -> ModelSettings {
        ModelSettings {
            base_url: self.model.base_url.trim_end_matches('/').to_string(),
            model: self.model.name.clone(),
            context_window: self.model.context_window,
            device: self.model.device,
            system_prompt: self
                .model
                .system_prompt
                .then(|| LABEL_SYSTEM_PROMPT.to_string()),
            keep_alive: self.model.keep_alive.clone(),
            timeout_secs: self.model.timeout_secs,
        }
    }
}

/// `OLLAMA_HOST` is often given as bare `host:port`, and as the wildcard
/// address the server binds to. Clients reach a wildcard bind on loopback.
fn normalize_host(host: &str) -> String {
    let host = host.trim();
    let (scheme, authority) = host.split_once("://").unwrap_or(("http", host));
    let wildcard_rest = |prefix: &str| {
        authority
            .strip_prefix(prefix)
            .filter(|rest| rest.is_empty() || rest.starts_with([':', '/']))
    };
    let authority = if let Some(rest) = wildcard_rest("0.0.0.0") {
        format!("127.0.0.1{rest}")
    } else if let Some(rest) = wildcard_rest("[::]") {
        format!("[::1]{rest}")
    } else {
        authority.to_string()
    };
    format!("{scheme}://{authority}")
}

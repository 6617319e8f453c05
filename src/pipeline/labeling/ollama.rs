use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{LazyLock, Mutex};
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::types::{build_messages, ChatMessage, LabelProducer, ModelSettings};
use super::InferenceError;
use crate::hardware::{detect_hardware, HardwareProfile};

/// Ollama model names: `[namespace/]model[:tag]`, one namespace at most.
static MODEL_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9._-]*(/[a-zA-Z0-9][a-zA-Z0-9._-]*)?(:[a-zA-Z0-9._-]+)?$")
        .expect("valid regex")
});

/// Accept only loopback endpoints: the model must be hosted on this machine.
pub fn validate_base_url(url: &str) -> Result<(), InferenceError> {
    let after_scheme = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"))
        .ok_or_else(|| InferenceError::InvalidUrl(url.to_string()))?;

    let host = if let Some(bracketed) = after_scheme.strip_prefix('[') {
        bracketed.split(']').next().unwrap_or("")
    } else {
        after_scheme
            .split(['/', ':'])
            .next()
            .unwrap_or("")
    };

    match host {
        "localhost" | "127.0.0.1" | "::1" => Ok(()),
        "" => Err(InferenceError::InvalidUrl(url.to_string())),
        _ => Err(InferenceError::NonLocalEndpoint(url.to_string())),
    }
}

/// Reject names that are not valid Ollama model references.
pub fn validate_model_name(name: &str) -> Result<(), InferenceError> {
    if MODEL_NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(InferenceError::InvalidModelName(name.to_string()))
    }
}

/// Whether `requested` is among `installed`. An untagged name means `:latest`.
pub fn is_model_installed(installed: &[String], requested: &str) -> bool {
    installed.iter().any(|name| {
        name == requested
            || (!requested.contains(':') && *name == format!("{requested}:latest"))
    })
}

/// Request body for Ollama `/api/chat`.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: ChatOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    keep_alive: Option<&'a str>,
}

#[derive(Debug, Clone, Copy, Serialize)]
struct ChatOptions {
    num_ctx: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_gpu: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: Option<ChatResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    models: Vec<TagModel>,
}

#[derive(Debug, Deserialize)]
struct TagModel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct PsResponse {
    #[serde(default)]
    models: Vec<RunningModelInfo>,
}

/// A model currently loaded in Ollama's memory (from `/api/ps`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunningModelInfo {
    pub name: String,
    /// Total size in memory (bytes).
    #[serde(default)]
    pub size: u64,
    /// Bytes resident in VRAM. 0 = CPU-only.
    #[serde(default)]
    pub size_vram: u64,
}

/// Blocking HTTP client for a local Ollama instance.
pub struct OllamaClient {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl OllamaClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, InferenceError> {
        validate_base_url(base_url)?;

        let mut builder = reqwest::blocking::Client::builder();
        // 0 disables the timeout: a long generation must not be cut off.
        builder = if timeout_secs == 0 {
            builder.timeout(None::<Duration>)
        } else {
            builder.timeout(Duration::from_secs(timeout_secs))
        };
        let client = builder
            .build()
            .map_err(|e| InferenceError::Http(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn map_send_error(&self, e: reqwest::Error) -> InferenceError {
        if e.is_connect() {
            InferenceError::NotReachable(self.base_url.clone())
        } else {
            InferenceError::Http(e.to_string())
        }
    }

    fn check_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, InferenceError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        Err(InferenceError::Api {
            status: status.as_u16(),
            body,
        })
    }

    /// Installed model names from `/api/tags`.
    pub fn list_models(&self) -> Result<Vec<String>, InferenceError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| self.map_send_error(e))?;
        let parsed: TagsResponse = Self::check_status(response)?
            .json()
            .map_err(|e| InferenceError::MalformedResponse(e.to_string()))?;
        Ok(parsed.models.into_iter().map(|m| m.name).collect())
    }

    /// Models currently loaded in memory, from `/api/ps`.
    pub fn list_running_models(&self) -> Result<Vec<RunningModelInfo>, InferenceError> {
        let url = format!("{}/api/ps", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| self.map_send_error(e))?;
        let parsed: PsResponse = Self::check_status(response)?
            .json()
            .map_err(|e| InferenceError::MalformedResponse(e.to_string()))?;
        Ok(parsed.models)
    }

    fn post_chat(&self, request: &ChatRequest<'_>) -> Result<ChatResponse, InferenceError> {
        let url = format!("{}/api/chat", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .map_err(|e| self.map_send_error(e))?;
        Self::check_status(response)?
            .json()
            .map_err(|e| InferenceError::MalformedResponse(e.to_string()))
    }
}

/// Label producer backed by a model served from a local Ollama.
///
/// Construction checks the model is installed, loads it once and records
/// where it landed (GPU or CPU). Every `infer` reuses that loaded model.
pub struct OllamaProducer {
    client: OllamaClient,
    settings: ModelSettings,
    hardware: HardwareProfile,
}

impl OllamaProducer {
    pub fn connect(settings: ModelSettings) -> Result<Self, InferenceError> {
        validate_model_name(&settings.model)?;
        let client = OllamaClient::new(&settings.base_url, settings.timeout_secs)?;

        let installed = client.list_models()?;
        if !is_model_installed(&installed, &settings.model) {
            return Err(InferenceError::ModelNotFound(settings.model.clone()));
        }

        // An empty message list makes Ollama load the model without generating.
        client.post_chat(&ChatRequest {
            model: &settings.model,
            messages: &[],
            stream: false,
            options: chat_options(&settings),
            keep_alive: Some(&settings.keep_alive),
        })?;

        let hardware = detect_hardware(&client, &settings.model);
        info!(
            model = %settings.model,
            context_window = settings.context_window,
            requested_device = %settings.device,
            gpu_tier = %hardware.gpu_tier(),
            processor = %hardware.processor_label,
            "Model loaded"
        );

        Ok(Self {
            client,
            settings,
            hardware,
        })
    }

    pub fn hardware(&self) -> &HardwareProfile {
        &self.hardware
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }
}

fn chat_options(settings: &ModelSettings) -> ChatOptions {
    ChatOptions {
        num_ctx: settings.context_window,
        num_gpu: settings.device.num_gpu(),
    }
}

impl LabelProducer for OllamaProducer {
    fn infer(&self, instruction: &str) -> Result<String, InferenceError> {
        let messages = build_messages(self.settings.system_prompt.as_deref(), instruction);
        let response = self.client.post_chat(&ChatRequest {
            model: &self.settings.model,
            messages: &messages,
            stream: false,
            options: chat_options(&self.settings),
            keep_alive: Some(&self.settings.keep_alive),
        })?;

        let content = response
            .message
            .map(|m| m.content)
            .ok_or(InferenceError::EmptyCompletion)?;
        debug!(chars = content.chars().count(), "Completion received");
        Ok(content)
    }
}

/// Mock producer for testing: replays scripted completions in order,
/// repeating the last one, and records every instruction it receives.
pub struct MockLabelProducer {
    script: Vec<Result<String, String>>,
    calls: AtomicUsize,
    instructions: Mutex<Vec<String>>,
}

impl MockLabelProducer {
    pub fn new(response: &str) -> Self {
        Self::scripted(vec![Ok(response.to_string())])
    }

    /// `Err(reason)` entries surface as `InferenceError::Http(reason)`.
    pub fn scripted(script: Vec<Result<String, String>>) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
            instructions: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn instructions(&self) -> Vec<String> {
        self.instructions
            .lock()
            .map(|seen| seen.clone())
            .unwrap_or_default()
    }
}

impl LabelProducer for MockLabelProducer {
    fn infer(&self, instruction: &str) -> Result<String, InferenceError> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut seen) = self.instructions.lock() {
            seen.push(instruction.to_string());
        }
        let step = self
            .script
            .get(index)
            .or_else(|| self.script.last())
            .ok_or(InferenceError::EmptyCompletion)?;
        step.clone().map_err(InferenceError::Http)
    }
}

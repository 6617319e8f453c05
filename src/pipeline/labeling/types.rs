use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::InferenceError;

/// Where the model's layers should live.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceSelection {
    /// Let the runtime offload to GPU when it can, CPU otherwise.
    #[default]
    Auto,
    Gpu,
    Cpu,
}

/// Ollama's `num_gpu` value for "every layer".
const ALL_LAYERS: i32 = 999;

impl DeviceSelection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Gpu => "gpu",
            Self::Cpu => "cpu",
        }
    }

    /// Layers to offload, or `None` to leave the choice to the runtime.
    pub fn num_gpu(&self) -> Option<i32> {
        match self {
            Self::Auto => None,
            Self::Gpu => Some(ALL_LAYERS),
            Self::Cpu => Some(0),
        }
    }
}

impl std::fmt::Display for DeviceSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "gpu" | "cuda" => Ok(Self::Gpu),
            "cpu" => Ok(Self::Cpu),
            other => Err(format!("unknown device '{other}', expected auto, gpu or cpu")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: &str) -> Self {
        Self {
            role: ChatRole::System,
            content: content.to_string(),
        }
    }

    pub fn user(content: &str) -> Self {
        Self {
            role: ChatRole::User,
            content: content.to_string(),
        }
    }
}

/// Build the message list for one instruction: optional system message, then the user turn.
pub fn build_messages(system_prompt: Option<&str>, instruction: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = system_prompt {
        messages.push(ChatMessage::system(system));
    }
    messages.push(ChatMessage::user(instruction));
    messages
}

/// Everything fixed when a producer is constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSettings {
    pub base_url: String,
    pub model: String,
    pub context_window: u32,
    pub device: DeviceSelection,
    pub system_prompt: Option<String>,
    /// How long Ollama keeps the model resident between calls (e.g. "30m").
    pub keep_alive: String,
    pub timeout_secs: u64,
}

/// A model that turns an instruction into a completion.
///
/// Calls are side-effect free apart from the model's own state.
pub trait LabelProducer {
    fn infer(&self, instruction: &str) -> Result<String, InferenceError>;
}

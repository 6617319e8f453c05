//! Hardware detection for GPU/CPU classification.
//!
//! Queries Ollama `/api/ps` after the model is loaded to see how much of it
//! landed in VRAM. Used to report which device serves the batch.

use serde::{Deserialize, Serialize};

use crate::pipeline::labeling::ollama::{OllamaClient, RunningModelInfo};

/// GPU availability classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GpuTier {
    /// All model layers in VRAM.
    FullGpu,
    /// Some layers in VRAM, rest on CPU.
    PartialGpu,
    /// No VRAM allocated.
    CpuOnly,
}

impl std::fmt::Display for GpuTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FullGpu => write!(f, "Full GPU"),
            Self::PartialGpu => write!(f, "Partial GPU"),
            Self::CpuOnly => write!(f, "CPU only"),
        }
    }
}

/// Placement of the labeling model. Defaults to CPU-only when unknown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HardwareProfile {
    pub gpu_available: bool,
    /// VRAM held by the model (bytes). 0 = CPU-only.
    pub vram_bytes: u64,
    /// Total model size in memory (bytes).
    pub total_model_bytes: u64,
    /// Human-readable placement, e.g. "100% GPU", "48% GPU", "CPU".
    pub processor_label: String,
    /// RFC 3339 timestamp of detection.
    pub detected_at: String,
}

impl HardwareProfile {
    pub fn gpu_tier(&self) -> GpuTier {
        if self.total_model_bytes == 0 || self.vram_bytes == 0 {
            GpuTier::CpuOnly
        } else if self.vram_bytes >= self.total_model_bytes {
            GpuTier::FullGpu
        } else {
            GpuTier::PartialGpu
        }
    }

    pub fn from_running(model: &RunningModelInfo) -> Self {
        Self {
            gpu_available: model.size_vram > 0,
            vram_bytes: model.size_vram,
            total_model_bytes: model.size,
            processor_label: processor_label(model.size_vram, model.size),
            detected_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Conservative fallback when detection fails.
    pub fn cpu_fallback() -> Self {
        Self {
            gpu_available: false,
            vram_bytes: 0,
            total_model_bytes: 0,
            processor_label: "CPU (detection unavailable)".to_string(),
            detected_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Same wording Ollama's `ps` command prints.
fn processor_label(vram: u64, total: u64) -> String {
    if vram == 0 || total == 0 {
        "CPU".to_string()
    } else if vram >= total {
        "100% GPU".to_string()
    } else {
        format!("{}% GPU", vram * 100 / total)
    }
}

/// Detect where `model` is loaded. Falls back to CPU-only if Ollama is
/// unreachable or the model is not in memory.
pub fn detect_hardware(client: &OllamaClient, model: &str) -> HardwareProfile {
    let _span = tracing::info_span!("hardware_detect", model).entered();

    match client.list_running_models() {
        Ok(models) => match find_loaded(&models, model) {
            Some(running) => {
                let profile = HardwareProfile::from_running(running);
                tracing::info!(
                    gpu_tier = %profile.gpu_tier(),
                    vram_mb = profile.vram_bytes / 1_000_000,
                    total_mb = profile.total_model_bytes / 1_000_000,
                    "Hardware profile detected"
                );
                profile
            }
            None => {
                tracing::info!(loaded = models.len(), "Model not resident in Ollama, assuming CPU");
                HardwareProfile::cpu_fallback()
            }
        },
        Err(e) => {
            tracing::warn!(error = %e, "Hardware detection failed, assuming CPU");
            HardwareProfile::cpu_fallback()
        }
    }
}

fn find_loaded<'a>(models: &'a [RunningModelInfo], model: &str) -> Option<&'a RunningModelInfo> {
    let latest = format!("{model}:latest");
    models
        .iter()
        .find(|m| m.name == model || m.name == latest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running(name: &str, size: u64, size_vram: u64) -> RunningModelInfo {
        RunningModelInfo {
            name: name.into(),
            size,
            size_vram,
        }
    }

    #[test]
    fn full_gpu_when_all_vram() {
        let profile = HardwareProfile::from_running(&running("m", 5_000_000_000, 5_000_000_000));
        assert_eq!(profile.gpu_tier(), GpuTier::FullGpu);
        assert_eq!(profile.processor_label, "100% GPU");
        assert!(profile.gpu_available);
    }

    #[test]
    fn partial_gpu_when_some_vram() {
        let profile = HardwareProfile::from_running(&running("m", 5_000_000_000, 2_000_000_000));
        assert_eq!(profile.gpu_tier(), GpuTier::PartialGpu);
        assert_eq!(profile.processor_label, "40% GPU");
    }

    #[test]
    fn cpu_only_when_no_vram() {
        let profile = HardwareProfile::from_running(&running("m", 5_000_000_000, 0));
        assert_eq!(profile.gpu_tier(), GpuTier::CpuOnly);
        assert_eq!(profile.processor_label, "CPU");
        assert!(!profile.gpu_available);
    }

    #[test]
    fn cpu_fallback_is_conservative() {
        let profile = HardwareProfile::cpu_fallback();
        assert!(!profile.gpu_available);
        assert_eq!(profile.gpu_tier(), GpuTier::CpuOnly);
        assert!(!profile.detected_at.is_empty());
    }

    #[test]
    fn finds_model_by_exact_or_latest_name() {
        let models = vec![running("mistral:latest", 1, 1), running("llama3.1:8b", 2, 0)];
        assert_eq!(find_loaded(&models, "mistral").unwrap().name, "mistral:latest");
        assert_eq!(find_loaded(&models, "llama3.1:8b").unwrap().size, 2);
        assert!(find_loaded(&models, "llama3.1").is_none());
    }

    #[test]
    fn gpu_tier_display_and_serde() {
        assert_eq!(GpuTier::PartialGpu.to_string(), "Partial GPU");
        assert_eq!(serde_json::to_string(&GpuTier::CpuOnly).unwrap(), "\"cpu_only\"");
    }

    #[test]
    fn detect_hardware_falls_back_when_unreachable() {
        let client = OllamaClient::new("http://127.0.0.1:9", 2).unwrap();
        let profile = detect_hardware(&client, "llama3.1:8b");
        assert_eq!(profile.gpu_tier(), GpuTier::CpuOnly);
    }
}

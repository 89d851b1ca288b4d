use crate::brain::LlmConfig;
use crate::coordinator::CoordinatorConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub bind_addr: String,
    pub bind_port: u16,

    /// Domains that get an LLM-backed expert registered.
    pub experts: Vec<String>,

    pub audit_log_capacity: usize,

    pub llm: LlmSettings,

    pub coordinator: CoordinatorSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    pub enabled: bool,
    pub api_base: Option<String>,
    pub api_key_env: String,
    pub model: String,
    pub max_tokens: u16,
    pub temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorSettings {
    pub run_timeout_secs: u64,
    pub stage_timeout_secs: Option<u64>,
    pub max_concurrent_experts: Option<usize>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            bind_port: 9100,
            experts: vec![
                "networking".to_string(),
                "linux".to_string(),
                "security".to_string(),
                "database".to_string(),
            ],
            audit_log_capacity: 1000,
            llm: LlmSettings::default(),
            coordinator: CoordinatorSettings::default(),
        }
    }
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            api_base: None,
            api_key_env: "OPENAI_API_KEY".to_string(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 1024,
            temperature: 0.1,
        }
    }
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            run_timeout_secs: 30,
            stage_timeout_secs: None,
            max_concurrent_experts: None,
        }
    }
}

impl LlmSettings {
    pub fn to_llm_config(&self) -> LlmConfig {
        let api_key = std::env::var(&self.api_key_env).unwrap_or_default();
        LlmConfig {
            api_key,
            api_base: self.api_base.clone(),
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

impl CoordinatorSettings {
    pub fn to_coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            run_timeout: Duration::from_secs(self.run_timeout_secs.max(1)),
            stage_timeout: self.stage_timeout_secs.map(Duration::from_secs),
            max_concurrent_experts: self.max_concurrent_experts,
        }
    }
}

impl ServiceConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.bind_port)
    }
}

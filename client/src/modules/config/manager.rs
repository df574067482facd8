//! 配置管理器

use crate::error::ConfigError;
use asr_core::SessionConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "offline-asr";

/// 连接设置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// 服务端 WebSocket 地址
    pub endpoint: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            endpoint: "ws://localhost:10095".to_string(),
        }
    }
}

/// 音频发送设置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// 音频文件路径
    pub path: PathBuf,
    /// 每帧字节数
    pub chunk_size: usize,
    /// 帧间隔 (毫秒)
    pub interval_ms: u64,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("public/chat.wav"),
            chunk_size: 64 * 1024,
            interval_ms: 100,
        }
    }
}

/// 演示程序配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub client: ClientSettings,
    pub audio: AudioSettings,
    pub session: SessionConfig,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            client: ClientSettings::default(),
            audio: AudioSettings::default(),
            session: SessionConfig::new("example.wav", "pcm")
                .with_itn(true)
                .with_sample_rate(16000)
                .with_language("auto")
                .with_language_itn(true),
        }
    }
}

impl DemoConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let endpoint = &self.client.endpoint;
        if !(endpoint.starts_with("ws://") || endpoint.starts_with("wss://")) {
            return Err(ConfigError::ValidationFailed(format!(
                "endpoint must be a ws:// or wss:// url, got {:?}",
                endpoint
            )));
        }
        if self.audio.path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationFailed("audio.path is empty".to_string()));
        }
        if self.audio.chunk_size == 0 {
            return Err(ConfigError::ValidationFailed("audio.chunk_size must be > 0".to_string()));
        }
        if self.audio.interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("audio.interval_ms must be > 0".to_string()));
        }
        if self.session.wav_name.is_empty() {
            return Err(ConfigError::ValidationFailed("session.wav_name is empty".to_string()));
        }
        Ok(())
    }
}

/// 配置管理器
#[derive(Debug)]
pub struct ConfigManager {
    config_path: PathBuf,
}

impl Default for ConfigManager {
    fn default() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR);
        Self::new(config_dir.join("config.toml"))
    }
}

impl ConfigManager {
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// 读取配置，文件不存在时返回默认配置
    pub fn load(&self) -> Result<DemoConfig, ConfigError> {
        if !self.config_path.exists() {
            tracing::debug!("No config at {}, using defaults", self.config_path.display());
            return Ok(DemoConfig::default());
        }
        self.load_existing()
    }

    /// 读取配置，文件必须存在
    pub fn load_existing(&self) -> Result<DemoConfig, ConfigError> {
        if !self.config_path.exists() {
            return Err(ConfigError::NotFound);
        }
        let content = std::fs::read_to_string(&self.config_path)
            .map_err(|e| ConfigError::LoadFailed(e.to_string()))?;
        toml::from_str(&content)
            .map_err(|e| ConfigError::LoadFailed(e.to_string()))
    }
}

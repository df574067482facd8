//! 客户端发往服务端的消息
//!
//! 会话的第一帧是握手配置，之后是原始音频二进制帧，最后是结束标志

use crate::error::ProtocolError;
use crate::hotwords::Hotwords;
use serde::{Deserialize, Serialize};

/// 离线识别模式标签，握手消息中固定使用
pub const MODE_OFFLINE: &str = "offline";

/// 会话配置
///
/// 由调用方提供，不包含 `mode` 字段 (由 [`Handshake`] 注入)。
/// 交给会话之后不再修改。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// 音频名称标识
    pub wav_name: String,
    /// 音频格式标签，例如 "pcm"
    pub wav_format: String,
    /// 是否仍在说话
    pub is_speaking: bool,
    /// 热词 (服务端格式的 JSON 文本)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hotwords: Option<String>,
    /// 是否启用逆文本正则化
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub itn: Option<bool>,
    /// 采样率 (Hz)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_fs: Option<u32>,
    /// 语言标签
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub svs_lang: Option<String>,
    /// 语言相关的逆文本正则化
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub svs_itn: Option<bool>,
}

impl SessionConfig {
    pub fn new(wav_name: impl Into<String>, wav_format: impl Into<String>) -> Self {
        Self {
            wav_name: wav_name.into(),
            wav_format: wav_format.into(),
            is_speaking: true,
            hotwords: None,
            itn: None,
            audio_fs: None,
            svs_lang: None,
            svs_itn: None,
        }
    }

    pub fn with_hotwords(mut self, payload: impl Into<String>) -> Self {
        self.hotwords = Some(payload.into());
        self
    }

    /// 使用类型化热词表设置 `hotwords`
    pub fn with_hotword_map(mut self, hotwords: &Hotwords) -> Result<Self, ProtocolError> {
        self.hotwords = Some(hotwords.to_payload()?);
        Ok(self)
    }

    pub fn with_itn(mut self, itn: bool) -> Self {
        self.itn = Some(itn);
        self
    }

    pub fn with_sample_rate(mut self, audio_fs: u32) -> Self {
        self.audio_fs = Some(audio_fs);
        self
    }

    pub fn with_language(mut self, svs_lang: impl Into<String>) -> Self {
        self.svs_lang = Some(svs_lang.into());
        self
    }

    pub fn with_language_itn(mut self, svs_itn: bool) -> Self {
        self.svs_itn = Some(svs_itn);
        self
    }
}

/// 握手消息
///
/// `mode` 总是第一个字段且总是 [`MODE_OFFLINE`]
#[derive(Debug, Serialize)]
pub struct Handshake<'a> {
    mode: &'static str,
    #[serde(flatten)]
    config: &'a SessionConfig,
}

impl<'a> Handshake<'a> {
    pub fn new(config: &'a SessionConfig) -> Self {
        Self {
            mode: MODE_OFFLINE,
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        self.config
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Encode(e.to_string()))
    }
}

/// 音频结束标志: `{"is_speaking":false}`
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct EndOfSpeech {
    is_speaking: bool,
}

impl EndOfSpeech {
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Encode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handshake_minimal() {
        let config = SessionConfig::new("t.wav", "pcm");
        let json = Handshake::new(&config).to_json().unwrap();
        assert_eq!(
            json,
            r#"{"mode":"offline","wav_name":"t.wav","wav_format":"pcm","is_speaking":true}"#
        );
    }

    #[test]
    fn test_handshake_with_optionals() {
        let config = SessionConfig::new("example.wav", "pcm")
            .with_hotwords(r#"{"阿里巴巴":20}"#)
            .with_itn(true)
            .with_sample_rate(16000)
            .with_language("auto")
            .with_language_itn(false);
        let json = Handshake::new(&config).to_json().unwrap();
        assert!(json.starts_with(r#"{"mode":"offline","#));

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["hotwords"], r#"{"阿里巴巴":20}"#);
        assert_eq!(value["itn"], true);
        assert_eq!(value["audio_fs"], 16000);
        assert_eq!(value["svs_lang"], "auto");
        assert_eq!(value["svs_itn"], false);
    }

    #[test]
    fn test_config_ignores_caller_mode() {
        let config: SessionConfig = serde_json::from_str(
            r#"{"mode":"2pass","wav_name":"a","wav_format":"pcm","is_speaking":true}"#,
        )
        .unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&Handshake::new(&config).to_json().unwrap()).unwrap();
        assert_eq!(value["mode"], MODE_OFFLINE);
    }

    #[test]
    fn test_handshake_leaves_config_untouched() {
        let config = SessionConfig::new("t.wav", "pcm").with_itn(false);
        let before = config.clone();
        let handshake = Handshake::new(&config);
        let _ = handshake.to_json().unwrap();
        assert_eq!(handshake.config(), &before);
    }

    #[test]
    fn test_end_of_speech_literal() {
        assert_eq!(EndOfSpeech::default().to_json().unwrap(), r#"{"is_speaking":false}"#);
    }

    #[test]
    fn test_with_hotword_map() {
        let hotwords: Hotwords = [("hello", 5)].into_iter().collect();
        let config = SessionConfig::new("a", "pcm").with_hotword_map(&hotwords).unwrap();
        assert_eq!(config.hotwords.as_deref(), Some(r#"{"hello":5}"#));
    }
}

//! 错误类型定义
//!
//! 会话与配置的错误类型统一在此定义，使用 thiserror 自动派生 Error trait

use crate::modules::network::websocket::ConnectionState;
use thiserror::Error;

/// 错误代码（用于日志和上层展示）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // 网络错误
    NetworkConnectFailed,
    NetworkLost,
    NetworkSendFailed,

    // 会话错误
    SessionNotOpen,
    MessageMalformed,
    MessageUnexpectedBinary,
    MessageEncodeFailed,

    // 配置错误
    ConfigLoadFailed,
    ConfigValidationFailed,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCode::NetworkConnectFailed => write!(f, "NETWORK_CONNECT_FAILED"),
            ErrorCode::NetworkLost => write!(f, "NETWORK_LOST"),
            ErrorCode::NetworkSendFailed => write!(f, "NETWORK_SEND_FAILED"),
            ErrorCode::SessionNotOpen => write!(f, "SESSION_NOT_OPEN"),
            ErrorCode::MessageMalformed => write!(f, "MESSAGE_MALFORMED"),
            ErrorCode::MessageUnexpectedBinary => write!(f, "MESSAGE_UNEXPECTED_BINARY"),
            ErrorCode::MessageEncodeFailed => write!(f, "MESSAGE_ENCODE_FAILED"),
            ErrorCode::ConfigLoadFailed => write!(f, "CONFIG_LOAD_FAILED"),
            ErrorCode::ConfigValidationFailed => write!(f, "CONFIG_VALIDATION_FAILED"),
        }
    }
}

/// 会话错误
///
/// 只通过日志和 `SessionHandler::on_error` 报告，公开方法从不返回它
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("WebSocket is not open ({state}), {operation} dropped")]
    NotOpen {
        operation: &'static str,
        state: ConnectionState,
    },

    #[error("Failed to parse message: {0}")]
    MalformedMessage(String),

    #[error("Received unexpected binary frame ({0} bytes)")]
    UnexpectedBinary(usize),

    #[error("Encode failed: {0}")]
    Encode(String),
}

impl SessionError {
    /// 获取对应的错误代码
    pub fn code(&self) -> ErrorCode {
        match self {
            SessionError::ConnectionFailed(_) => ErrorCode::NetworkConnectFailed,
            SessionError::ConnectionLost(_) => ErrorCode::NetworkLost,
            SessionError::SendFailed(_) => ErrorCode::NetworkSendFailed,
            SessionError::NotOpen { .. } => ErrorCode::SessionNotOpen,
            SessionError::MalformedMessage(_) => ErrorCode::MessageMalformed,
            SessionError::UnexpectedBinary(_) => ErrorCode::MessageUnexpectedBinary,
            SessionError::Encode(_) => ErrorCode::MessageEncodeFailed,
        }
    }

    /// 错误发生后会话是否已经结束
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionError::ConnectionFailed(_)
                | SessionError::ConnectionLost(_)
                | SessionError::SendFailed(_)
                | SessionError::Encode(_)
        )
    }
}

/// 配置相关错误
#[derive(Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("Configuration file not found")]
    NotFound,
}

impl ConfigError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ConfigError::LoadFailed(_) | ConfigError::NotFound => ErrorCode::ConfigLoadFailed,
            ConfigError::ValidationFailed(_) => ErrorCode::ConfigValidationFailed,
        }
    }
}

//! 协议错误类型

use thiserror::Error;

/// 协议编解码错误
#[derive(Debug, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("Malformed message: {0}")]
    Malformed(String),

    #[error("Encode failed: {0}")]
    Encode(String),
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_syntax() || err.is_eof() {
            ProtocolError::Malformed(err.to_string())
        } else {
            ProtocolError::Encode(err.to_string())
        }
    }
}

//! 离线语音识别协议核心
//!
//! 定义客户端与识别服务之间交换的 JSON 消息结构，不包含任何 I/O

pub mod error;
pub mod hotwords;
pub mod protocol;
pub mod result;

pub use error::ProtocolError;
pub use hotwords::Hotwords;
pub use protocol::{EndOfSpeech, Handshake, SessionConfig, MODE_OFFLINE};
pub use result::{parse_result, RecognitionResult, StampSent, TokenSpan};

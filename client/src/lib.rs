//! 离线语音识别客户端
//!
//! 通过 WebSocket 连接识别服务：发送握手配置、转发音频、发送结束标志，
//! 并把服务端返回的识别结果交给调用方

pub mod error;
pub mod modules;

pub use asr_core::{Hotwords, RecognitionResult, SessionConfig, StampSent};
pub use error::{ConfigError, ErrorCode, SessionError};
pub use modules::network::{
    Callbacks, ChannelHandler, CloseReason, ConnectionState, SessionEvent, SessionHandler,
    TranscriptionSession,
};

/// 初始化日志，`RUST_LOG` 未设置时使用 info 级别
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

//! 网络通信模块
//!
//! 提供 WebSocket 传输和离线识别会话

pub mod handler;
pub mod session;
pub mod websocket;

pub use handler::{Callbacks, ChannelHandler, CloseReason, SessionEvent, SessionHandler};
pub use session::TranscriptionSession;
pub use websocket::{ConnectionState, WsMessage};

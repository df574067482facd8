//! WebSocket 传输
//!
//! 使用 tokio-tungstenite 维护单个连接：建立连接、发送握手、
//! 转发出站帧，并把入站帧路由给会话处理器

use crate::error::SessionError;
use crate::modules::network::handler::{CloseReason, SessionHandler};
use asr_core::parse_result;
use futures_util::sink::SinkExt;
use futures_util::StreamExt;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

/// 客户端发起关闭后等待服务端确认的时长
pub const CLOSE_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(2);

/// 连接状态
///
/// `Connecting -> Open -> Closed`，`Closed` 为终态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Connecting,
    Open,
    Closed,
}

impl ConnectionState {
    /// 检查是否可以发送
    pub fn is_open(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Connecting => write!(f, "Connecting"),
            ConnectionState::Open => write!(f, "Open"),
            ConnectionState::Closed => write!(f, "Closed"),
        }
    }
}

/// 出站消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsMessage {
    Text(String),
    Binary(Vec<u8>),
    Close,
}

/// 会话句柄与连接任务共享的状态
#[derive(Debug, Clone, Default)]
pub struct SharedState {
    inner: Arc<Mutex<ConnectionState>>,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> ConnectionState {
        *self.inner.lock()
    }

    /// `Connecting -> Open`，其余情况不变并返回 false
    pub fn mark_open(&self) -> bool {
        let mut state = self.inner.lock();
        if *state == ConnectionState::Connecting {
            *state = ConnectionState::Open;
            true
        } else {
            false
        }
    }

    /// 进入 `Closed`，返回之前的状态
    pub fn mark_closed(&self) -> ConnectionState {
        std::mem::replace(&mut *self.inner.lock(), ConnectionState::Closed)
    }
}

/// 连接任务
///
/// 任务结束时状态总是 `Closed`，并且只调用一次 `on_closed`
pub async fn run_connection(
    url: String,
    handshake: String,
    state: SharedState,
    commands: mpsc::UnboundedReceiver<WsMessage>,
    handler: Arc<dyn SessionHandler>,
) {
    let reason = drive(&url, handshake, &state, commands, handler.as_ref()).await;
    state.mark_closed();
    tracing::info!("WebSocket closed: {}", reason);
    handler.on_closed(reason);
}

async fn drive(
    url: &str,
    handshake: String,
    state: &SharedState,
    mut commands: mpsc::UnboundedReceiver<WsMessage>,
    handler: &dyn SessionHandler,
) -> CloseReason {
    tracing::debug!("Connecting to {}", url);

    let stream = tokio::select! {
        result = connect_async(url) => match result {
            Ok((stream, _response)) => stream,
            Err(e) => {
                return fail(handler, SessionError::ConnectionFailed(e.to_string()));
            }
        },
        _ = wait_for_close(&mut commands) => {
            tracing::info!("Close requested before connection was established");
            return CloseReason::ClientClosed;
        }
    };

    let (mut sink, mut stream) = stream.split();

    // 握手必须是第一帧
    if let Err(e) = sink.send(Message::Text(handshake.into())).await {
        return fail(handler, SessionError::SendFailed(e.to_string()));
    }

    if !state.mark_open() {
        let _ = sink.send(Message::Close(None)).await;
        return CloseReason::ClientClosed;
    }

    tracing::info!("Connection opened and initial message sent to {}", url);
    handler.on_ready();

    loop {
        tokio::select! {
            inbound = stream.next() => match inbound {
                Some(Ok(message)) => {
                    if let Some(reason) = route_inbound(message, handler) {
                        state.mark_closed();
                        // 发出 tungstenite 排队的关闭应答
                        let _ = sink.flush().await;
                        return reason;
                    }
                }
                Some(Err(e)) => {
                    state.mark_closed();
                    return fail(handler, SessionError::ConnectionLost(e.to_string()));
                }
                None => {
                    state.mark_closed();
                    return CloseReason::ServerClosed { code: None, reason: String::new() };
                }
            },
            command = commands.recv() => {
                let message = match command {
                    Some(WsMessage::Text(text)) => Message::Text(text.into()),
                    Some(WsMessage::Binary(data)) => Message::Binary(data.into()),
                    // 句柄被丢弃时通道关闭，同样视为关闭
                    Some(WsMessage::Close) | None => break,
                };
                if let Err(e) = sink.send(message).await {
                    state.mark_closed();
                    return fail(handler, SessionError::SendFailed(e.to_string()));
                }
            }
        }
    }
    state.mark_closed();

    // 客户端发起关闭：发送关闭帧，在限定时间内等待服务端确认
    let close_handshake = async {
        if let Err(e) = sink.send(Message::Close(None)).await {
            tracing::debug!("Failed to send close frame: {}", e);
            return;
        }
        while let Some(Ok(message)) = stream.next().await {
            if let Message::Text(text) = message {
                dispatch_text(text.as_str(), handler);
            }
        }
    };
    if tokio::time::timeout(CLOSE_HANDSHAKE_TIMEOUT, close_handshake).await.is_err() {
        tracing::warn!(
            "Server did not complete the close handshake within {:?}, dropping connection",
            CLOSE_HANDSHAKE_TIMEOUT
        );
    }

    CloseReason::ClientClosed
}

/// 处理一帧入站消息，返回 `Some` 表示连接已由服务端关闭
pub fn route_inbound(message: Message, handler: &dyn SessionHandler) -> Option<CloseReason> {
    match message {
        Message::Text(text) => {
            dispatch_text(text.as_str(), handler);
            None
        }
        Message::Binary(data) => {
            tracing::warn!("Received non-string data ({} bytes), discarded", data.len());
            handler.on_error(&SessionError::UnexpectedBinary(data.len()));
            None
        }
        Message::Close(frame) => {
            let (code, reason) = match frame {
                Some(frame) => (Some(u16::from(frame.code)), frame.reason.as_str().to_string()),
                None => (None, String::new()),
            };
            Some(CloseReason::ServerClosed { code, reason })
        }
        // ping/pong 由 tungstenite 自动应答
        Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => None,
    }
}

fn dispatch_text(text: &str, handler: &dyn SessionHandler) {
    match parse_result(text) {
        Ok(result) => handler.on_result(result),
        Err(e) => {
            tracing::error!("Failed to parse message: {}", e);
            handler.on_error(&SessionError::MalformedMessage(e.to_string()));
        }
    }
}

fn fail(handler: &dyn SessionHandler, error: SessionError) -> CloseReason {
    tracing::error!("WebSocket error: {}", error);
    handler.on_error(&error);
    CloseReason::Failed(error)
}

/// 连接建立前只可能收到关闭请求；通道关闭也视为关闭
async fn wait_for_close(commands: &mut mpsc::UnboundedReceiver<WsMessage>) {
    while let Some(command) = commands.recv().await {
        if command == WsMessage::Close {
            return;
        }
        tracing::debug!("Dropping {:?} queued before open", command);
    }
}

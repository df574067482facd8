//! 转写会话
//!
//! 一个会话对应一个 WebSocket 连接：连接后发送握手配置，
//! 转发音频数据和结束标志，把识别结果交给处理器

use crate::error::SessionError;
use crate::modules::network::handler::{CloseReason, SessionHandler};
use crate::modules::network::websocket::{run_connection, ConnectionState, SharedState, WsMessage};
use asr_core::{EndOfSpeech, Handshake, SessionConfig};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// 转写会话
///
/// 所有公开方法都不阻塞，也不返回错误：发送失败只记录日志并通知
/// `SessionHandler::on_error`。会话关闭后不可复用。
pub struct TranscriptionSession {
    /// 服务端地址
    endpoint: String,
    /// 握手使用的配置
    config: SessionConfig,
    /// 连接状态
    state: SharedState,
    /// 出站消息通道
    command_tx: mpsc::UnboundedSender<WsMessage>,
    /// 事件处理器
    handler: Arc<dyn SessionHandler>,
    /// 连接任务
    task: Mutex<Option<JoinHandle<()>>>,
}

impl TranscriptionSession {
    /// 创建会话并立即开始连接
    ///
    /// 连接成功后先发送握手，再调用 `on_ready`；在此之前调用
    /// [`send_audio`](Self::send_audio) 的数据会被丢弃。
    /// 不在 tokio 运行时中调用时，会话直接以 `ConnectionFailed` 关闭。
    pub fn connect<H>(endpoint: impl Into<String>, config: SessionConfig, handler: H) -> Self
    where
        H: SessionHandler + 'static,
    {
        let endpoint = endpoint.into();
        let handler: Arc<dyn SessionHandler> = Arc::new(handler);
        let state = SharedState::new();
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let spawned = Handshake::new(&config)
            .to_json()
            .map_err(|e| SessionError::Encode(e.to_string()))
            .and_then(|handshake| {
                let runtime = Handle::try_current()
                    .map_err(|e| SessionError::ConnectionFailed(e.to_string()))?;
                Ok(runtime.spawn(run_connection(
                    endpoint.clone(),
                    handshake,
                    state.clone(),
                    command_rx,
                    handler.clone(),
                )))
            });

        let task = match spawned {
            Ok(task) => Some(task),
            Err(error) => {
                tracing::error!("Failed to start connection: {}", error);
                state.mark_closed();
                handler.on_error(&error);
                handler.on_closed(CloseReason::Failed(error));
                None
            }
        };

        Self {
            endpoint,
            config,
            state,
            command_tx,
            handler,
            task: Mutex::new(task),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// 获取连接状态
    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    pub fn is_open(&self) -> bool {
        self.state.get().is_open()
    }

    /// 发送音频数据
    ///
    /// 原样作为一个二进制帧发送，不做切分
    pub fn send_audio(&self, audio: impl Into<Vec<u8>>) {
        let audio = audio.into();
        let len = audio.len();
        if self.send("audio data", WsMessage::Binary(audio)) {
            tracing::debug!("Audio data sent ({} bytes)", len);
        }
    }

    /// 发送音频结束标志
    ///
    /// 不关闭连接，服务端仍会返回剩余的识别结果
    pub fn send_end(&self) {
        let message = match EndOfSpeech::default().to_json() {
            Ok(message) => message,
            Err(e) => {
                self.report(SessionError::Encode(e.to_string()));
                return;
            }
        };
        if self.send("end marker", WsMessage::Text(message)) {
            tracing::debug!("End message sent");
        }
    }

    /// 请求关闭连接
    ///
    /// 立即进入 `Closed`，之后的发送都会被丢弃；正在传输的结果不保证送达
    pub fn close(&self) {
        let previous = self.state.mark_closed();
        if previous == ConnectionState::Closed {
            return;
        }
        tracing::info!("Closing connection to {}", self.endpoint);
        // 任务已退出时通道已关闭，无需处理
        let _ = self.command_tx.send(WsMessage::Close);
    }

    /// 等待连接任务结束 (`on_closed` 已调用)
    ///
    /// 只有第一次调用会真正等待
    pub async fn wait_closed(&self) {
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::error!("Connection task failed: {}", e);
            }
        }
    }

    fn send(&self, operation: &'static str, message: WsMessage) -> bool {
        let state = self.state.get();
        if !state.is_open() {
            self.report(SessionError::NotOpen { operation, state });
            return false;
        }
        if self.command_tx.send(message).is_err() {
            self.report(SessionError::NotOpen {
                operation,
                state: ConnectionState::Closed,
            });
            return false;
        }
        true
    }

    fn report(&self, error: SessionError) {
        tracing::error!("{}", error);
        self.handler.on_error(&error);
    }
}

impl std::fmt::Debug for TranscriptionSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranscriptionSession")
            .field("endpoint", &self.endpoint)
            .field("state", &self.state.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::network::handler::{ChannelHandler, SessionEvent};
    use tokio::net::TcpListener;

    /// 只接受 TCP 不完成 WebSocket 握手的地址，会话停留在 `Connecting`
    async fn silent_endpoint() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        (listener, url)
    }

    #[tokio::test]
    async fn test_send_while_connecting_is_dropped() {
        let (_listener, url) = silent_endpoint().await;
        let (handler, mut rx) = ChannelHandler::channel();
        let session = TranscriptionSession::connect(url, SessionConfig::new("t.wav", "pcm"), handler);

        assert_eq!(session.state(), ConnectionState::Connecting);
        session.send_audio(vec![1u8, 2, 3]);
        session.send_end();

        assert_eq!(
            rx.try_recv().unwrap(),
            SessionEvent::Error(SessionError::NotOpen {
                operation: "audio data",
                state: ConnectionState::Connecting,
            })
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            SessionEvent::Error(SessionError::NotOpen {
                operation: "end marker",
                state: ConnectionState::Connecting,
            })
        );

        session.close();
        session.wait_closed().await;
        assert_eq!(rx.recv().await.unwrap(), SessionEvent::Closed(CloseReason::ClientClosed));
        drop(session);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (_listener, url) = silent_endpoint().await;
        let (handler, mut rx) = ChannelHandler::channel();
        let session = TranscriptionSession::connect(url, SessionConfig::new("t.wav", "pcm"), handler);

        session.close();
        session.close();
        assert_eq!(session.state(), ConnectionState::Closed);
        session.wait_closed().await;
        // 第二次等待立即返回
        session.wait_closed().await;

        assert_eq!(rx.recv().await.unwrap(), SessionEvent::Closed(CloseReason::ClientClosed));
        drop(session);
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn test_connect_outside_runtime_fails() {
        let (handler, mut rx) = ChannelHandler::channel();
        let session = TranscriptionSession::connect(
            "ws://127.0.0.1:1",
            SessionConfig::new("t.wav", "pcm"),
            handler,
        );

        assert_eq!(session.state(), ConnectionState::Closed);
        match rx.try_recv().unwrap() {
            SessionEvent::Error(SessionError::ConnectionFailed(_)) => {}
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(matches!(
            rx.try_recv().unwrap(),
            SessionEvent::Closed(CloseReason::Failed(SessionError::ConnectionFailed(_)))
        ));

        session.send_audio(vec![1u8]);
        assert!(matches!(
            rx.try_recv().unwrap(),
            SessionEvent::Error(SessionError::NotOpen { state: ConnectionState::Closed, .. })
        ));
    }

    #[tokio::test]
    async fn test_send_after_close_reports_closed() {
        let (_listener, url) = silent_endpoint().await;
        let (handler, mut rx) = ChannelHandler::channel();
        let session = TranscriptionSession::connect(url, SessionConfig::new("t.wav", "pcm"), handler);

        session.close();
        session.send_audio(vec![0u8; 4]);
        assert_eq!(
            rx.try_recv().unwrap(),
            SessionEvent::Error(SessionError::NotOpen {
                operation: "audio data",
                state: ConnectionState::Closed,
            })
        );
        session.wait_closed().await;
    }
}

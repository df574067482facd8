//! 会话事件处理
//!
//! 连接任务通过 [`SessionHandler`] 通知调用方。可以直接实现该 trait，
//! 也可以使用闭包形式的 [`Callbacks`]，或用 [`ChannelHandler`] 把事件转成通道消息

use crate::error::SessionError;
use asr_core::RecognitionResult;
use auto_impl::auto_impl;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

/// 连接关闭原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// 调用方请求关闭 (或会话句柄被丢弃)
    ClientClosed,
    /// 服务端关闭
    ServerClosed { code: Option<u16>, reason: String },
    /// 连接失败或传输错误
    Failed(SessionError),
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloseReason::ClientClosed => write!(f, "closed by client"),
            CloseReason::ServerClosed { code: Some(code), reason } => {
                write!(f, "closed by server. Code: {}, Reason: {}", code, reason)
            }
            CloseReason::ServerClosed { code: None, .. } => write!(f, "closed by server"),
            CloseReason::Failed(e) => write!(f, "failed: {}", e),
        }
    }
}

/// 会话事件处理器
///
/// 同一会话的回调由连接任务依次调用，不会并发；
/// `on_error` 在发送被丢弃时也可能从调用方所在线程调用。
#[auto_impl(&, Box, Arc)]
pub trait SessionHandler: Send + Sync {
    /// 握手已发送，可以开始发送音频
    fn on_ready(&self);

    /// 每条成功解析的识别结果调用一次
    fn on_result(&self, result: RecognitionResult);

    /// 非致命或致命错误，默认只依赖日志
    fn on_error(&self, _error: &SessionError) {}

    /// 会话结束，只调用一次
    fn on_closed(&self, _reason: CloseReason) {}
}

type ReadyCallback = Box<dyn Fn() + Send + Sync>;
type ResultCallback = Box<dyn Fn(RecognitionResult) + Send + Sync>;
type ErrorCallback = Box<dyn Fn(&SessionError) + Send + Sync>;
type ClosedCallback = Box<dyn Fn(CloseReason) + Send + Sync>;

/// 闭包形式的处理器
pub struct Callbacks {
    on_ready: ReadyCallback,
    on_result: ResultCallback,
    on_error: Option<ErrorCallback>,
    on_closed: Option<ClosedCallback>,
}

impl Callbacks {
    pub fn new<R, F>(on_ready: R, on_result: F) -> Self
    where
        R: Fn() + Send + Sync + 'static,
        F: Fn(RecognitionResult) + Send + Sync + 'static,
    {
        Self {
            on_ready: Box::new(on_ready),
            on_result: Box::new(on_result),
            on_error: None,
            on_closed: None,
        }
    }

    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&SessionError) + Send + Sync + 'static,
    {
        self.on_error = Some(Box::new(callback));
        self
    }

    pub fn on_closed<F>(mut self, callback: F) -> Self
    where
        F: Fn(CloseReason) + Send + Sync + 'static,
    {
        self.on_closed = Some(Box::new(callback));
        self
    }
}

impl std::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_error", &self.on_error.is_some())
            .field("on_closed", &self.on_closed.is_some())
            .finish_non_exhaustive()
    }
}

impl SessionHandler for Callbacks {
    fn on_ready(&self) {
        (self.on_ready)();
    }

    fn on_result(&self, result: RecognitionResult) {
        (self.on_result)(result);
    }

    fn on_error(&self, error: &SessionError) {
        if let Some(callback) = &self.on_error {
            callback(error);
        }
    }

    fn on_closed(&self, reason: CloseReason) {
        if let Some(callback) = &self.on_closed {
            callback(reason);
        }
    }
}

/// 会话事件
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Ready,
    Result {
        result: RecognitionResult,
        received_at: DateTime<Utc>,
    },
    Error(SessionError),
    Closed(CloseReason),
}

/// 把所有回调转发到 mpsc 通道
#[derive(Debug, Clone)]
pub struct ChannelHandler {
    event_tx: mpsc::UnboundedSender<SessionEvent>,
}

impl ChannelHandler {
    pub fn new(event_tx: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self { event_tx }
    }

    /// 创建处理器和对应的接收端
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        (Self::new(event_tx), event_rx)
    }

    fn forward(&self, event: SessionEvent) {
        // 接收端已丢弃时直接忽略
        if self.event_tx.send(event).is_err() {
            tracing::trace!("Session event receiver dropped");
        }
    }
}

impl SessionHandler for ChannelHandler {
    fn on_ready(&self) {
        self.forward(SessionEvent::Ready);
    }

    fn on_result(&self, result: RecognitionResult) {
        self.forward(SessionEvent::Result {
            result,
            received_at: Utc::now(),
        });
    }

    fn on_error(&self, error: &SessionError) {
        self.forward(SessionEvent::Error(error.clone()));
    }

    fn on_closed(&self, reason: CloseReason) {
        self.forward(SessionEvent::Closed(reason));
    }
}

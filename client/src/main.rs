//! 演示程序：读取音频文件，定时发送给识别服务并打印结果

use anyhow::{Context, Result};
use clap::Parser;
use offline_asr::modules::audio::{pace_audio, ChunkReader};
use offline_asr::modules::config::{ConfigManager, DemoConfig};
use offline_asr::{init_tracing, ChannelHandler, SessionEvent, TranscriptionSession};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Parser)]
#[command(name = "offline-asr", about = "Stream an audio file to an offline ASR server")]
struct Cli {
    /// 配置文件路径
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 服务端地址，例如 ws://localhost:10095
    #[arg(short, long)]
    endpoint: Option<String>,

    /// 音频文件
    #[arg(short, long)]
    audio: Option<PathBuf>,

    /// 每帧字节数
    #[arg(long)]
    chunk_size: Option<usize>,

    /// 帧间隔 (毫秒)
    #[arg(long)]
    interval_ms: Option<u64>,
}

impl Cli {
    fn apply(self, config: &mut DemoConfig) {
        if let Some(endpoint) = self.endpoint {
            config.client.endpoint = endpoint;
        }
        if let Some(audio) = self.audio {
            config.audio.path = audio;
        }
        if let Some(chunk_size) = self.chunk_size {
            config.audio.chunk_size = chunk_size;
        }
        if let Some(interval_ms) = self.interval_ms {
            config.audio.interval_ms = interval_ms;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let manager = cli.config.clone().map(ConfigManager::new).unwrap_or_default();
    let mut config = manager
        .load()
        .with_context(|| format!("failed to load config from {}", manager.path().display()))?;
    cli.apply(&mut config);
    config.validate()?;

    run(config).await
}

async fn run(config: DemoConfig) -> Result<()> {
    let (handler, mut events) = ChannelHandler::channel();
    let session = Arc::new(TranscriptionSession::connect(
        config.client.endpoint.clone(),
        config.session.clone(),
        handler,
    ));
    let mut streaming: Option<JoinHandle<()>> = None;
    let mut interrupted = false;
    let mut forced = false;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(SessionEvent::Ready) => {
                    streaming = Some(spawn_streaming(session.clone(), &config));
                }
                Some(SessionEvent::Result { result, .. }) => {
                    tracing::info!(is_final = result.is_final, "Recognition Result: {}", result.text);
                    for sentence in result.sentences() {
                        tracing::debug!("  {}", sentence);
                    }
                    if result.is_final {
                        session.close();
                    }
                }
                Some(SessionEvent::Error(e)) => {
                    tracing::warn!(code = %e.code(), "Session error: {}", e);
                }
                Some(SessionEvent::Closed(reason)) => {
                    tracing::info!("Session finished: {}", reason);
                    break;
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                if interrupted {
                    tracing::warn!("Interrupted again, exiting without waiting for close");
                    forced = true;
                    break;
                }
                interrupted = true;
                tracing::info!("Process interrupted. Closing connection.");
                session.close();
            }
        }
    }

    if let Some(task) = streaming {
        task.abort();
    }
    // 连接任务会在关闭握手超时后自行结束；二次中断时不再等待
    if !forced {
        session.wait_closed().await;
    }
    Ok(())
}

fn spawn_streaming(session: Arc<TranscriptionSession>, config: &DemoConfig) -> JoinHandle<()> {
    let path = config.audio.path.clone();
    let chunk_size = config.audio.chunk_size;
    let interval = Duration::from_millis(config.audio.interval_ms);

    tokio::spawn(async move {
        let file = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) => {
                tracing::error!("Failed to open {}: {}", path.display(), e);
                session.close();
                return;
            }
        };
        tracing::info!("Sending audio data from {}", path.display());
        let reader = ChunkReader::new(file, chunk_size);
        if let Err(e) = pace_audio(session.as_ref(), reader, interval).await {
            tracing::error!("Failed to read {}: {}", path.display(), e);
            session.close();
        }
    })
}

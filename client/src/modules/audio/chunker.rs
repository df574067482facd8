//! 音频分块与定时发送
//!
//! 把文件内容按固定大小切块，按固定间隔交给会话发送，
//! 最后一块之后再隔一个间隔发送结束标志

use crate::modules::network::TranscriptionSession;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};

/// 音频发送目标
pub trait AudioSink {
    fn send_audio(&self, chunk: Vec<u8>);
    fn send_end(&self);
}

impl AudioSink for TranscriptionSession {
    fn send_audio(&self, chunk: Vec<u8>) {
        TranscriptionSession::send_audio(self, chunk);
    }

    fn send_end(&self) {
        TranscriptionSession::send_end(self);
    }
}

/// 按固定大小读取数据块，只有最后一块可能更短
#[derive(Debug)]
pub struct ChunkReader<R> {
    reader: R,
    chunk_size: usize,
    done: bool,
}

impl<R: AsyncRead + Unpin> ChunkReader<R> {
    pub fn new(reader: R, chunk_size: usize) -> Self {
        Self {
            reader,
            chunk_size: chunk_size.max(1),
            done: false,
        }
    }

    /// 读取下一块，读完返回 `None`
    pub async fn next_chunk(&mut self) -> std::io::Result<Option<Vec<u8>>> {
        if self.done {
            return Ok(None);
        }

        let mut chunk = vec![0u8; self.chunk_size];
        let mut filled = 0;
        while filled < self.chunk_size {
            let n = self.reader.read(&mut chunk[filled..]).await?;
            if n == 0 {
                self.done = true;
                break;
            }
            filled += n;
        }

        if filled == 0 {
            return Ok(None);
        }
        chunk.truncate(filled);
        Ok(Some(chunk))
    }
}

/// 发送统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PacingStats {
    pub chunks: usize,
    pub bytes: usize,
}

/// 每个间隔发送一块，全部发送后再隔一个间隔发送结束标志
pub async fn pace_audio<R, S>(
    sink: &S,
    mut reader: ChunkReader<R>,
    interval: Duration,
) -> std::io::Result<PacingStats>
where
    R: AsyncRead + Unpin,
    S: AudioSink + ?Sized,
{
    let mut ticker = tokio::time::interval(interval);
    // 第一次 tick 立即返回
    ticker.tick().await;

    let mut stats = PacingStats::default();
    while let Some(chunk) = reader.next_chunk().await? {
        ticker.tick().await;
        stats.chunks += 1;
        stats.bytes += chunk.len();
        tracing::debug!("Sending audio chunk {} ({} bytes)", stats.chunks, chunk.len());
        sink.send_audio(chunk);
    }

    tracing::info!(
        "Audio data sent ({} chunks, {} bytes). Sending end signal...",
        stats.chunks,
        stats.bytes
    );
    ticker.tick().await;
    sink.send_end();

    Ok(stats)
}

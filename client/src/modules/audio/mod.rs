//! 音频输入模块
//!
//! 只负责读取和分块，不做编解码

pub mod chunker;

pub use chunker::{pace_audio, AudioSink, ChunkReader, PacingStats};

//! 核心模块
//!
//! 包含网络会话、音频分块和演示程序配置

pub mod audio;
pub mod config;
pub mod network;

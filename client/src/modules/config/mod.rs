//! 配置模块

pub mod manager;

pub use manager::{AudioSettings, ClientSettings, ConfigManager, DemoConfig};

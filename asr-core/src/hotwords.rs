//! 热词表
//!
//! 服务端要求 `hotwords` 字段是一段 JSON 对象文本 (短语 -> 权重)，
//! 这里提供一个类型化的构建方式

use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 带权重的热词表
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Hotwords(BTreeMap<String, u32>);

impl Hotwords {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加 (或覆盖) 一个热词
    pub fn insert(&mut self, phrase: impl Into<String>, weight: u32) -> &mut Self {
        self.0.insert(phrase.into(), weight);
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn weight(&self, phrase: &str) -> Option<u32> {
        self.0.get(phrase).copied()
    }

    /// 序列化为握手消息中 `hotwords` 字段使用的文本
    pub fn to_payload(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(&self.0).map_err(|e| ProtocolError::Encode(e.to_string()))
    }

    /// 从服务端格式的文本解析
    pub fn from_payload(payload: &str) -> Result<Self, ProtocolError> {
        Ok(Self(serde_json::from_str(payload)?))
    }
}

impl<S: Into<String>> FromIterator<(S, u32)> for Hotwords {
    fn from_iter<I: IntoIterator<Item = (S, u32)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

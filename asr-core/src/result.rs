//! 服务端返回的识别结果

use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};

/// 单个 token 的起止时间 (毫秒)
///
/// 小数毫秒四舍五入
pub type TokenSpan = [i64; 2];

/// 识别结果
///
/// 任意 JSON 对象都能解析：字段缺失、为 `null` 或类型不符时取默认值，
/// 未知字段保存在 `extra` 中。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecognitionResult {
    #[serde(default, deserialize_with = "lenient::string")]
    pub mode: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub wav_name: String,
    /// 当前 (或最终) 转写文本
    #[serde(default, deserialize_with = "lenient::string")]
    pub text: String,
    #[serde(default, deserialize_with = "lenient::boolean")]
    pub is_final: bool,
    /// token 级时间戳
    #[serde(
        default,
        deserialize_with = "lenient::optional_spans",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<Vec<TokenSpan>>,
    /// 句子级分段，无法识别的元素被跳过
    #[serde(
        default,
        deserialize_with = "lenient::stamp_sents",
        skip_serializing_if = "Option::is_none"
    )]
    pub stamp_sents: Option<Vec<StampSent>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// 句子级分段
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StampSent {
    #[serde(default, deserialize_with = "lenient::string")]
    pub text_seg: String,
    /// 句尾标点
    #[serde(default, deserialize_with = "lenient::string")]
    pub punc: String,
    #[serde(default, deserialize_with = "lenient::integer")]
    pub start: i64,
    #[serde(default, deserialize_with = "lenient::integer")]
    pub end: i64,
    #[serde(default, deserialize_with = "lenient::spans")]
    pub ts_list: Vec<TokenSpan>,
}

impl RecognitionResult {
    /// 句子文本 (含标点)
    pub fn sentences(&self) -> impl Iterator<Item = String> + '_ {
        self.stamp_sents
            .iter()
            .flatten()
            .map(|s| format!("{}{}", s.text_seg, s.punc))
    }

    /// 结果覆盖的时间范围 (毫秒)
    pub fn span(&self) -> Option<TokenSpan> {
        let spans = self.timestamp.as_ref()?;
        let start = spans.first()?[0];
        let end = spans.last()?[1];
        Some([start, end])
    }
}

/// 解析一条文本帧
///
/// 只有无效 JSON 和非对象的 JSON 值会被拒绝
pub fn parse_result(text: &str) -> Result<RecognitionResult, ProtocolError> {
    Ok(serde_json::from_str(text)?)
}

/// 宽松的字段解码：服务端不同版本的字段类型并不一致
mod lenient {
    use super::{StampSent, TokenSpan};
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        })
    }

    pub fn boolean<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Bool(b) => b,
            Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
            Value::String(s) => matches!(s.trim(), "true" | "1"),
            _ => false,
        })
    }

    pub fn integer<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        Ok(millis(&Value::deserialize(deserializer)?).unwrap_or_default())
    }

    pub fn optional_spans<'de, D>(deserializer: D) -> Result<Option<Vec<TokenSpan>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(to_spans(Value::deserialize(deserializer)?))
    }

    pub fn spans<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<TokenSpan>, D::Error> {
        Ok(to_spans(Value::deserialize(deserializer)?).unwrap_or_default())
    }

    pub fn stamp_sents<'de, D>(deserializer: D) -> Result<Option<Vec<StampSent>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::Array(items) => Some(
                items
                    .into_iter()
                    .filter_map(|item| StampSent::deserialize(item).ok())
                    .collect(),
            ),
            _ => None,
        })
    }

    /// 时间戳既可能是数组，也可能是包含数组的字符串
    fn to_spans(value: Value) -> Option<Vec<TokenSpan>> {
        match value {
            Value::Array(pairs) => pairs.iter().map(pair).collect(),
            Value::String(s) if s.trim().is_empty() => Some(Vec::new()),
            Value::String(s) => match serde_json::from_str::<Value>(&s).ok()? {
                // 只展开一层
                inner @ Value::Array(_) => to_spans(inner),
                _ => None,
            },
            _ => None,
        }
    }

    fn pair(value: &Value) -> Option<TokenSpan> {
        match value.as_array()?.as_slice() {
            [start, end, ..] => Some([millis(start)?, millis(end)?]),
            _ => None,
        }
    }

    fn millis(value: &Value) -> Option<i64> {
        match value {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|v| v.round() as i64)),
            Value::String(s) => s.trim().parse::<f64>().ok().map(|v| v.round() as i64),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_partial_result() {
        let result = parse_result(
            r#"{"mode":"offline","wav_name":"t.wav","text":"hello","is_final":false}"#,
        )
        .unwrap();
        assert_eq!(result.mode, "offline");
        assert_eq!(result.wav_name, "t.wav");
        assert_eq!(result.text, "hello");
        assert!(!result.is_final);
        assert!(result.timestamp.is_none());
        assert!(result.extra.is_empty());
    }

    #[test]
    fn test_parse_timestamps_array_and_string() {
        let as_array = parse_result(r#"{"text":"ab","timestamp":[[0,120],[120,300]]}"#).unwrap();
        let as_string =
            parse_result(r#"{"text":"ab","timestamp":"[[0,120],[120,300]]"}"#).unwrap();
        assert_eq!(as_array.timestamp, Some(vec![[0, 120], [120, 300]]));
        assert_eq!(as_array.timestamp, as_string.timestamp);
        assert_eq!(as_array.span(), Some([0, 300]));
    }

    #[test]
    fn test_parse_stamp_sents() {
        let result = parse_result(
            r#"{
                "mode": "offline",
                "wav_name": "chat.wav",
                "text": "你好。再见",
                "is_final": true,
                "stamp_sents": [
                    {"text_seg": "你 好", "punc": "。", "start": 0, "end": 500, "ts_list": [[0, 250], [250, 500]]},
                    {"text_seg": "再 见", "punc": "", "start": 600, "end": 900, "ts_list": []}
                ]
            }"#,
        )
        .unwrap();
        assert!(result.is_final);
        let sents = result.stamp_sents.as_ref().unwrap();
        assert_eq!(sents.len(), 2);
        assert_eq!(sents[0].ts_list, vec![[0, 250], [250, 500]]);
        assert_eq!(sents[1].start, 600);
        assert_eq!(result.sentences().collect::<Vec<_>>(), vec!["你 好。", "再 见"]);
    }

    #[test]
    fn test_unknown_fields_preserved() {
        let result = parse_result(r#"{"text":"x","is_final":true,"server_ts":42}"#).unwrap();
        assert_eq!(result.extra.get("server_ts"), Some(&serde_json::json!(42)));
    }

    #[test]
    fn test_any_object_parses() {
        let result = parse_result("{}").unwrap();
        assert_eq!(result, RecognitionResult::default());
    }

    #[test]
    fn test_malformed_inputs_rejected() {
        for input in ["not-json", "42", r#""text""#, "", r#"{"text":"#] {
            assert!(
                matches!(parse_result(input), Err(ProtocolError::Malformed(_))),
                "expected malformed for {input:?}"
            );
        }
    }

    #[test]
    fn test_null_fields_take_defaults() {
        let result = parse_result(
            r#"{"mode":null,"wav_name":"t.wav","text":null,"is_final":null,"timestamp":null,"stamp_sents":null}"#,
        )
        .unwrap();
        assert_eq!(result.mode, "");
        assert_eq!(result.text, "");
        assert!(!result.is_final);
        assert!(result.timestamp.is_none());
        assert!(result.stamp_sents.is_none());
        assert_eq!(result.wav_name, "t.wav");
    }

    #[test]
    fn test_numeric_is_final() {
        assert!(parse_result(r#"{"is_final":1}"#).unwrap().is_final);
        assert!(!parse_result(r#"{"is_final":0}"#).unwrap().is_final);
        assert!(parse_result(r#"{"is_final":"true"}"#).unwrap().is_final);
    }

    #[test]
    fn test_float_timestamps_rounded() {
        let result = parse_result(r#"{"timestamp":[[0.0,120.5],[120.5,300.2]]}"#).unwrap();
        assert_eq!(result.timestamp, Some(vec![[0, 121], [121, 300]]));
    }

    #[test]
    fn test_null_ts_list_is_empty() {
        let result = parse_result(
            r#"{"text":"a","stamp_sents":[{"text_seg":"a","punc":null,"start":0.0,"end":"80","ts_list":null}]}"#,
        )
        .unwrap();
        let sent = &result.stamp_sents.as_ref().unwrap()[0];
        assert_eq!(sent.text_seg, "a");
        assert_eq!(sent.punc, "");
        assert_eq!(sent.end, 80);
        assert!(sent.ts_list.is_empty());
    }

    #[test]
    fn test_unexpected_shapes_still_parse() {
        let result = parse_result(r#"{"text":42,"timestamp":"[[0,"}"#).unwrap();
        assert_eq!(result.text, "42");
        assert!(result.timestamp.is_none());

        let result = parse_result(r#"{"stamp_sents":[1,{"text_seg":"ok"}],"timestamp":{"a":1}}"#)
            .unwrap();
        assert_eq!(result.sentences().collect::<Vec<_>>(), vec!["ok"]);
        assert!(result.timestamp.is_none());
    }
}

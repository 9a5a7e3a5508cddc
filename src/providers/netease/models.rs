//! 此模块定义了用于反序列化网易云音乐搜索接口响应的 `struct` 数据结构。
//!
//! 歌曲记录本身保持为 `serde_json::Value`，由 `extract` 模块统一处理缺省值。

use serde::Deserialize;
use serde_json::Value;

/// 搜索 API 的顶层响应结构。
#[derive(Debug, Default, Deserialize)]
pub struct SearchEnvelope {
    /// API 返回码，通常 `200` 表示成功。部分代理接口不返回此字段。
    #[serde(default)]
    pub code: Option<i64>,
    /// 包含搜索结果的容器。没有结果时可能缺失。
    #[serde(default)]
    pub result: Option<SearchResultData>,
}

/// 搜索结果的数据部分。
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultData {
    /// 匹配到的原始歌曲记录列表。
    #[serde(default)]
    pub songs: Option<Vec<Value>>,
    /// 匹配到的歌曲总数。
    #[serde(default)]
    pub song_count: Option<u64>,
}

//! 定义了标准化之后的歌曲信息 `TrackInfo`。

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 艺术家列表为空时使用的占位名称。
pub const UNKNOWN_ARTIST: &str = "unknown artist";

/// 代表一位艺术家的简要信息。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistRef {
    /// 艺术家的数字 ID，缺失时为 0。
    pub id: u64,
    /// 艺术家姓名。
    pub name: String,
}

/// 代表从一条原始搜索结果中提取出的歌曲信息。
///
/// 一旦构造完成就不再修改。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackInfo {
    /// 歌曲的数字 ID。
    pub id: u64,
    /// 歌曲名。
    pub name: String,
    /// 演唱者列表，保持 API 返回的顺序。
    pub artists: Vec<ArtistRef>,
    /// 所属专辑的数字 ID。
    pub album_id: u64,
    /// 所属专辑名。
    pub album_name: String,
    /// 歌曲时长，单位为毫秒 (ms)。
    pub duration_ms: u64,
    /// 专辑发行日期 (`YYYY-MM-DD`)，未知时为 `"unknown"`。
    pub publish_date: String,
    /// 由歌曲 ID 合成的下载链接。
    pub download_link: String,
    /// 原始的歌曲记录，用于诊断显示。
    #[serde(skip)]
    pub raw: Value,
}

impl TrackInfo {
    /// 以 `/` 连接的艺术家名称，列表为空时为 `"unknown artist"`。
    #[must_use]
    pub fn artist_string(&self) -> String {
        if self.artists.is_empty() {
            return UNKNOWN_ARTIST.to_string();
        }
        self.artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// 以 `,` 连接的艺术家 ID。
    #[must_use]
    pub fn artist_ids(&self) -> String {
        self.artists
            .iter()
            .map(|a| a.id.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// `分:秒` 格式的时长，秒数补齐两位。
    #[must_use]
    pub fn duration(&self) -> String {
        format_duration(self.duration_ms)
    }
}

/// 将毫秒时长格式化为 `m:ss`，0 毫秒显示为 `0:00`。
#[must_use]
pub fn format_duration(duration_ms: u64) -> String {
    let total_seconds = duration_ms / 1000;
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    format!("{minutes}:{seconds:02}")
}

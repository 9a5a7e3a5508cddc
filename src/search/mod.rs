//! 搜索模块
//!
//! 包含一次搜索请求得到的结果页 `SearchPage`，以及负责翻页的 `PaginationState`。

use serde_json::Value;

use crate::model::track::TrackInfo;

pub mod pagination;

pub use pagination::{PAGE_SIZE_CHOICES, PaginationState};

/// 一次搜索请求返回的一页结果。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchPage {
    /// 搜索关键词。
    pub keyword: String,
    /// 本页的起始偏移量。
    pub offset: u32,
    /// 请求的每页数量。
    pub limit: u32,
    /// 解码后的原始响应，用于诊断显示。
    pub raw: Value,
    /// 标准化之后的歌曲列表，保持 API 返回的顺序。
    pub tracks: Vec<TrackInfo>,
    /// 匹配到的歌曲总数。
    pub total_count: u64,
}

impl SearchPage {
    /// 是否没有任何结果。
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// 格式化后的原始 JSON。
    #[must_use]
    pub fn raw_pretty(&self) -> String {
        serde_json::to_string_pretty(&self.raw).unwrap_or_else(|_| self.raw.to_string())
    }
}

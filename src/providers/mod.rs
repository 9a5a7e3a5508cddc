//! 提供商模块
//!
//! 该模块定义了与远程音乐服务进行交互的核心抽象。

use async_trait::async_trait;

use crate::{error::Result, search::SearchPage};

pub mod netease;

/// 一次媒体请求（GET 或 HEAD）在跟随重定向之后得到的响应。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaResponse {
    /// 跟随所有重定向之后的最终 URL。
    pub final_url: String,
    /// 最终响应的 HTTP 状态码。
    pub status: u16,
    /// `Content-Length` 响应头。
    pub content_length: Option<u64>,
    /// `Content-Type` 响应头。
    pub content_type: Option<String>,
    /// 响应体。HEAD 请求时为空。
    pub body: Vec<u8>,
}

/// 定义了下载引擎依赖的所有网络操作。
#[async_trait]
pub trait MusicSource: Send + Sync {
    ///
    /// 返回提供商的唯一名称，例如 `"netease"`。
    ///
    fn name(&self) -> &'static str;

    ///
    /// 按关键词搜索单曲。
    ///
    /// # 参数
    /// * `keyword` - 搜索关键词。
    /// * `offset` - 起始偏移量。
    /// * `limit` - 每页数量。
    ///
    /// # 返回
    /// 一个 `Result`，成功时包含原始响应和标准化之后的歌曲列表。
    /// 没有结果不是错误，而是一个空的 `SearchPage`。
    ///
    async fn search(&self, keyword: &str, offset: u32, limit: u32) -> Result<SearchPage>;

    ///
    /// 以 GET 请求下载媒体文件，跟随重定向。
    ///
    async fn fetch_media(&self, url: &str) -> Result<MediaResponse>;

    ///
    /// 以 HEAD 请求探测媒体链接，跟随重定向，不下载内容。
    ///
    async fn probe_media(&self, url: &str) -> Result<MediaResponse>;

    ///
    /// 表示“歌曲不可下载”的重定向目标页面。
    ///
    fn unavailable_url(&self) -> &str;
}

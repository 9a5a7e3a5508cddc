//! 此模块实现了与网易云音乐搜索接口及外链下载地址进行交互的 `MusicSource`。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    Client, Response,
    header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap},
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::{
    error::{DownloaderError, Result},
    providers::{MediaResponse, MusicSource},
    search::SearchPage,
};

pub mod extract;
pub mod models;

/// 默认的搜索接口地址。
pub const DEFAULT_SEARCH_ENDPOINT: &str = "https://163api.qijieya.cn/search";

/// 没有下载权限的歌曲会被重定向到这个页面。
pub const DEFAULT_UNAVAILABLE_URL: &str = "https://music.163.com/#/404";

/// 搜索接口的 `type` 参数，1 代表搜索单曲。
const SEARCH_TYPE_SONG: &str = "1";

const USER_AGENT: &str = "ncm-downloader/0.1.0";

/// 客户端的网络配置。
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// 搜索接口地址。
    pub search_endpoint: String,
    /// 合成下载链接使用的媒体主机。
    pub media_base: String,
    /// 表示“不可下载”的重定向目标。
    pub unavailable_url: String,
    /// 搜索与下载请求的超时时间。
    pub request_timeout: Duration,
    /// 链接测试 (HEAD) 的超时时间。
    pub probe_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            search_endpoint: DEFAULT_SEARCH_ENDPOINT.to_string(),
            media_base: extract::DEFAULT_MEDIA_BASE.to_string(),
            unavailable_url: DEFAULT_UNAVAILABLE_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            probe_timeout: Duration::from_secs(10),
        }
    }
}

/// 网易云音乐的客户端实现。
#[derive(Debug, Clone)]
pub struct NeteaseClient {
    http_client: Client,
    config: ClientConfig,
}

impl NeteaseClient {
    /// 使用给定配置创建客户端。
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http_client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self::with_http_client(config, http_client))
    }

    /// 一个便捷的默认构造函数
    pub fn new_default() -> Result<Self> {
        Self::new(ClientConfig::default())
    }

    /// 使用外部构造好的 `reqwest::Client`。
    pub fn with_http_client(config: ClientConfig, http_client: Client) -> Self {
        Self {
            http_client,
            config,
        }
    }

    /// 当前配置。
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// 按关键词搜索单曲。
    ///
    /// 非 2xx 状态码、网络错误和 JSON 解析失败都会返回错误，不会自动重试。
    /// 没有结果时返回一个空的 `SearchPage`。
    #[instrument(skip(self))]
    pub async fn search(&self, keyword: &str, offset: u32, limit: u32) -> Result<SearchPage> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(DownloaderError::Validation("请输入搜索关键词".to_string()));
        }
        if limit == 0 {
            return Err(DownloaderError::Validation(
                "每页数量必须大于 0".to_string(),
            ));
        }

        let request = self
            .http_client
            .get(&self.config.search_endpoint)
            .query(&[
                ("keywords", keyword.to_string()),
                ("offset", offset.to_string()),
                ("limit", limit.to_string()),
                ("type", SEARCH_TYPE_SONG.to_string()),
            ])
            .timeout(self.config.request_timeout)
            .build()?;
        info!("开始搜索: '{keyword}' (offset={offset}, limit={limit})");
        debug!("请求URL: {}", request.url());

        let response = self.http_client.execute(request).await?;
        let status = response.status();
        debug!("响应状态: {status}");
        if !status.is_success() {
            return Err(DownloaderError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        let raw: Value = serde_json::from_slice(&body)?;
        let page = parse_search_response(raw, keyword, offset, limit, &self.config.media_base)?;

        if page.is_empty() {
            info!("未找到歌曲");
        } else {
            info!("获取到 {} 首歌曲，总数 {}", page.tracks.len(), page.total_count);
        }
        Ok(page)
    }
}

/// 将解码后的搜索响应转换为 `SearchPage`。
///
/// 缺少 `result` 或 `songs` 时视为没有结果；`songCount` 缺失时使用本页歌曲数量。
pub fn parse_search_response(
    raw: Value,
    keyword: &str,
    offset: u32,
    limit: u32,
    media_base: &str,
) -> Result<SearchPage> {
    let envelope = models::SearchEnvelope::deserialize(&raw)?;
    if let Some(code) = envelope.code.filter(|c| *c != 200) {
        warn!("搜索接口返回码: {code}");
    }

    let data = envelope.result.unwrap_or_default();
    let tracks: Vec<_> = data
        .songs
        .unwrap_or_default()
        .iter()
        .map(|song| extract::extract_with_media_base(song, media_base))
        .collect();
    let total_count = data.song_count.unwrap_or(tracks.len() as u64);

    Ok(SearchPage {
        keyword: keyword.to_string(),
        offset,
        limit,
        raw,
        tracks,
        total_count,
    })
}

#[async_trait]
impl MusicSource for NeteaseClient {
    fn name(&self) -> &'static str {
        "netease"
    }

    async fn search(&self, keyword: &str, offset: u32, limit: u32) -> Result<SearchPage> {
        NeteaseClient::search(self, keyword, offset, limit).await
    }

    #[instrument(skip(self))]
    async fn fetch_media(&self, url: &str) -> Result<MediaResponse> {
        let response = self
            .http_client
            .get(url)
            .timeout(self.config.request_timeout)
            .send()
            .await?;
        let mut media = media_head(&response);
        media.body = response.bytes().await?.to_vec();
        debug!(
            "最终URL: {}, 状态: {}, 大小: {} bytes",
            media.final_url,
            media.status,
            media.body.len()
        );
        Ok(media)
    }

    #[instrument(skip(self))]
    async fn probe_media(&self, url: &str) -> Result<MediaResponse> {
        let response = self
            .http_client
            .head(url)
            .timeout(self.config.probe_timeout)
            .send()
            .await?;
        let media = media_head(&response);
        debug!("最终URL: {}, 状态: {}", media.final_url, media.status);
        Ok(media)
    }

    fn unavailable_url(&self) -> &str {
        &self.config.unavailable_url
    }
}

fn media_head(response: &Response) -> MediaResponse {
    let headers = response.headers();
    MediaResponse {
        final_url: response.url().to_string(),
        status: response.status().as_u16(),
        content_length: header_str(headers, CONTENT_LENGTH).and_then(|v| v.parse().ok()),
        content_type: header_str(headers, CONTENT_TYPE).map(str::to_string),
        body: Vec::new(),
    }
}

fn header_str(headers: &HeaderMap, name: reqwest::header::HeaderName) -> Option<&str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

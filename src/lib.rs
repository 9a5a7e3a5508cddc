#![warn(missing_docs)]

//! # NCM Downloader
//!
//! 一个用于搜索网易云音乐、分页浏览结果并下载歌曲的 Rust 库。
//!
//! ## 主要功能
//!
//! - **搜索**: 按关键词搜索单曲，把原始记录标准化为 [`TrackInfo`]。
//! - **分页**: 记录关键词、偏移量和每页数量，支持上一页、下一页和任意跳转。
//! - **下载**: 单首下载、逐首批量下载和链接测试。无法下载的歌曲会被重定向到 404 页面，
//!   这会被识别为 [`DownloaderError::UnavailableMedia`]。
//! - **设置**: 命名格式和下载目录保存在一个 JSON 文件中。
//!
//! ## 示例
//!
//! ```rust,no_run
//! use ncm_downloader::netease_session;
//!
//! #[tokio::main]
//! async fn main() -> ncm_downloader::Result<()> {
//!     let mut session = netease_session()?;
//!     session.search("明天见", 0, 20)?;
//!
//!     if let Some(notice) = session.process_next().await {
//!         println!("{}", notice.message);
//!     }
//!     for track in session.tracks() {
//!         println!("{} - {} ({})", track.name, track.artist_string(), track.duration());
//!     }
//!
//!     if !session.tracks().is_empty() {
//!         session.select(0)?;
//!         session.download_selected()?;
//!         if let Some(notice) = session.process_next().await {
//!             println!("{}", notice.message);
//!         }
//!     }
//!     Ok(())
//! }
//! ```
pub mod config;
pub mod download;
pub mod error;
pub mod model;
pub mod providers;
pub mod search;
pub mod session;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

pub use crate::{
    config::{NamingFormat, Settings, SettingsStore},
    download::DownloadManager,
    error::{DownloaderError, ErrorKind, Result},
    model::{
        download::{BatchReport, BatchUpdate, DownloadResult, LinkStatus},
        track::TrackInfo,
    },
    providers::{MusicSource, netease::NeteaseClient},
    search::{PaginationState, SearchPage},
    session::{Notice, NoticeLevel, Session, SessionEvent},
};

/// 使用默认的网易云音乐客户端和用户配置目录下的设置文件创建会话。
pub fn netease_session() -> Result<Session> {
    let client = NeteaseClient::new_default()?;
    let store = SettingsStore::in_config_dir()?;
    Ok(Session::new(Arc::new(client), store))
}

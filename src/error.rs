//! 定义了整个 `ncm-downloader` 库的错误类型 `DownloaderError`。

use std::io;
use thiserror::Error;

/// `ncm-downloader` 库的通用错误枚举。
#[derive(Error, Debug)]
pub enum DownloaderError {
    /// 网络请求失败，包括连接失败与超时 (源自 `reqwest::Error`)
    #[error("网络请求失败: {0}")]
    Transport(#[from] reqwest::Error),

    /// 服务器返回了非预期的 HTTP 状态码
    #[error("请求失败，状态码: {status}")]
    HttpStatus {
        /// 最终响应的状态码。
        status: u16,
    },

    /// 下载链接被重定向到了 404 页面，通常意味着没有版权或下载权限
    #[error("歌曲无法下载：链接指向 404 页面（可能没有下载权限）")]
    UnavailableMedia,

    /// JSON 解析失败 (源自 `serde_json::Error`)
    #[error("JSON 解析失败: {0}")]
    Decode(#[from] serde_json::Error),

    /// 创建目录或写入文件失败 (源自 `io::Error`)
    #[error("文件系统错误: {0}")]
    Filesystem(#[from] io::Error),

    /// 用户输入无效，例如空关键词或负数偏移量
    #[error("输入无效: {0}")]
    Validation(String),

    /// 内部错误，例如后台任务异常退出
    #[error("内部错误: {0}")]
    Internal(String),
}

/// `DownloaderError` 的 `Result` 类型别名，方便在函数签名中使用。
pub type Result<T> = std::result::Result<T, DownloaderError>;

/// 错误的分类。
///
/// 与 `DownloaderError` 不同，它可以被克隆，适合放进下载结果和事件中传递。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 连接或超时失败。
    Transport,
    /// 非预期的 HTTP 状态码，附带状态码。
    HttpStatus(u16),
    /// 命中了“不可下载”的 404 重定向页面。
    UnavailableMedia,
    /// 响应内容无法解析。
    Decode,
    /// 目录创建或文件写入失败。
    Filesystem,
    /// 用户输入无效。
    Validation,
    /// 内部错误。
    Internal,
}

impl DownloaderError {
    /// 返回该错误所属的分类。
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) => ErrorKind::Transport,
            Self::HttpStatus { status } => ErrorKind::HttpStatus(*status),
            Self::UnavailableMedia => ErrorKind::UnavailableMedia,
            Self::Decode(_) => ErrorKind::Decode,
            Self::Filesystem(_) => ErrorKind::Filesystem,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<tokio::task::JoinError> for DownloaderError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(format!("后台任务异常退出: {err}"))
    }
}

//! 定义了下载操作的结果类型。

use std::path::PathBuf;

use crate::error::{DownloaderError, ErrorKind};

/// 单次下载尝试的结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResult {
    /// 是否下载成功。
    pub success: bool,
    /// 成功时文件写入的路径。
    pub path: Option<PathBuf>,
    /// 失败时的错误描述。
    pub error: Option<String>,
    /// 失败时的错误分类。
    pub failure: Option<ErrorKind>,
}

impl DownloadResult {
    /// 构造一个成功的结果。
    pub fn succeeded(path: PathBuf) -> Self {
        Self {
            success: true,
            path: Some(path),
            error: None,
            failure: None,
        }
    }

    /// 由错误构造一个失败的结果。
    pub fn failed(err: &DownloaderError) -> Self {
        Self {
            success: false,
            path: None,
            error: Some(err.to_string()),
            failure: Some(err.kind()),
        }
    }
}

impl From<crate::error::Result<PathBuf>> for DownloadResult {
    fn from(result: crate::error::Result<PathBuf>) -> Self {
        match result {
            Ok(path) => Self::succeeded(path),
            Err(e) => Self::failed(&e),
        }
    }
}

/// 批量下载中的一条记录。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    /// 在批次中的序号（从 0 开始）。
    pub index: usize,
    /// 歌曲名。
    pub track_name: String,
    /// 艺术家字符串。
    pub artist: String,
    /// 本次下载的结果。
    pub result: DownloadResult,
}

impl BatchEntry {
    /// 该条记录对应的下载记录文本（不含时间戳）。
    #[must_use]
    pub fn log_message(&self) -> String {
        match &self.result.error {
            None => format!("✅ 下载成功: {} - {}", self.track_name, self.artist),
            Some(err) => format!(
                "❌ 下载失败: {} - {} ({})",
                self.track_name, self.artist, err
            ),
        }
    }
}

/// 批量下载的汇总报告。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// 批次中的歌曲总数。
    pub total: usize,
    /// 成功数量。
    pub success_count: usize,
    /// 失败数量。
    pub fail_count: usize,
    /// 按提交顺序排列的每首歌曲的记录。
    pub entries: Vec<BatchEntry>,
}

impl BatchReport {
    /// 记录一条结果并更新计数。
    pub fn record(&mut self, entry: BatchEntry) {
        if entry.result.success {
            self.success_count += 1;
        } else {
            self.fail_count += 1;
        }
        self.entries.push(entry);
    }

    /// 是否全部成功。
    #[must_use]
    pub fn is_full_success(&self) -> bool {
        self.fail_count == 0
    }

    /// 批量下载完成后的汇总文本。
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "批量下载完成: 共 {} 首，成功 {} 首，失败 {} 首",
            self.total, self.success_count, self.fail_count
        )
    }
}

/// 批量下载的进度通知，在每次下载尝试之前发出。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchProgress {
    /// 当前是第几首（从 1 开始）。
    pub index: usize,
    /// 批次中的歌曲总数。
    pub total: usize,
    /// 即将下载的歌曲名。
    pub track_name: String,
}

/// 批量下载过程中逐首发出的通知。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchUpdate {
    /// 某一首即将开始下载。
    Started(BatchProgress),
    /// 某一首已下载完成（成功或失败）。
    Finished(BatchEntry),
}

/// 链接测试的结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkStatus {
    /// 链接有效 (HTTP 200)。
    Valid {
        /// `Content-Length` 响应头，缺失时为 `None`。
        content_length: Option<u64>,
        /// `Content-Type` 响应头，缺失时为 `None`。
        content_type: Option<String>,
    },
    /// 链接被重定向到 404 页面。
    Unavailable,
    /// 其他状态码或网络错误。
    Failed {
        /// 失败原因。
        reason: String,
    },
}

impl std::fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkStatus::Valid {
                content_length,
                content_type,
            } => {
                let size = content_length.map_or_else(|| "未知".to_string(), |n| n.to_string());
                let kind = content_type.as_deref().unwrap_or("未知");
                write!(f, "✅ 链接有效 | 大小: {size} bytes | 类型: {kind}")
            }
            LinkStatus::Unavailable => write!(f, "❌ 链接指向404页面（可能没有下载权限）"),
            LinkStatus::Failed { reason } => write!(f, "❌ 链接测试失败: {reason}"),
        }
    }
}

//! 只追加的下载记录。

use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Local};
use tracing::warn;

/// 时间戳格式。
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 下载记录，每一行形如 `[2024-01-01 12:00:00] ✅ 下载成功: 晴天 - 周杰伦`。
///
/// 记录保存在内存中，也可以同时追加写入到一个文件。
#[derive(Debug, Clone, Default)]
pub struct DownloadLog {
    lines: Vec<String>,
    file: Option<PathBuf>,
}

impl DownloadLog {
    /// 仅保存在内存中的记录。
    pub fn new() -> Self {
        Self::default()
    }

    /// 同时把每一行追加到指定文件。
    pub fn with_file(path: impl Into<PathBuf>) -> Self {
        Self {
            lines: Vec::new(),
            file: Some(path.into()),
        }
    }

    /// 追加一行记录，返回带时间戳的完整文本。
    ///
    /// 写入文件失败不会影响内存中的记录，只会打印一条警告。
    pub fn append(&mut self, message: &str) -> &str {
        let line = format_entry(Local::now(), message);
        if let Some(path) = &self.file
            && let Err(e) = append_line(path, &line)
        {
            warn!("写入下载记录文件 {path:?} 失败: {e}");
        }
        self.lines.push(line);
        self.lines.last().map_or("", String::as_str)
    }

    /// 所有记录，按追加顺序排列。
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// 镜像文件路径。
    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// 清空内存中的记录。镜像文件不受影响。
    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

/// 给一条消息加上时间戳。
#[must_use]
pub fn format_entry(time: DateTime<Local>, message: &str) -> String {
    format!("[{}] {message}", time.format(TIMESTAMP_FORMAT))
}

fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{line}")
}

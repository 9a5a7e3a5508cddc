//! 负责处理应用的持久化配置。
//!
//! 配置文件是一个很小的 JSON 文档，只保存两项用户偏好：歌曲命名格式和下载目录。

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use strum_macros::{Display, EnumIter, EnumString};
use tracing::{info, warn};

use crate::error::{DownloaderError, Result};

/// 配置文件名。
pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// 默认下载目录（相对于当前工作目录）。
pub const DEFAULT_DOWNLOAD_DIR: &str = "downloads";

/// 下载文件的命名格式。
///
/// 序列化时使用与旧版配置文件兼容的中文标签。
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
pub enum NamingFormat {
    /// 仅使用歌曲名，例如 `晴天.mp3`。
    #[serde(rename = "歌曲名")]
    #[strum(serialize = "歌曲名")]
    TitleOnly,
    /// 歌曲名加歌手，例如 `晴天 - 周杰伦.mp3`。
    #[default]
    #[serde(rename = "歌曲名-歌手")]
    #[strum(serialize = "歌曲名-歌手")]
    TitleDashArtist,
}

impl NamingFormat {
    /// 返回该格式下的文件名示例，供设置界面预览。
    #[must_use]
    pub fn example(self) -> &'static str {
        match self {
            NamingFormat::TitleOnly => "晴天.mp3",
            NamingFormat::TitleDashArtist => "晴天 - 周杰伦.mp3",
        }
    }
}

/// 应用的用户设置。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// 下载文件的命名格式。
    #[serde(deserialize_with = "lenient_naming_format")]
    pub naming_format: NamingFormat,
    /// 下载目录。
    pub download_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            naming_format: NamingFormat::default(),
            download_dir: PathBuf::from(DEFAULT_DOWNLOAD_DIR),
        }
    }
}

/// 无法识别的命名格式按“歌曲名-歌手”处理，而不是让整个文件解析失败。
fn lenient_naming_format<'de, D>(deserializer: D) -> std::result::Result<NamingFormat, D::Error>
where
    D: Deserializer<'de>,
{
    let label = String::deserialize(deserializer)?;
    Ok(label.parse().unwrap_or_else(|_| {
        warn!("未知的命名格式 '{label}'，将使用默认格式。");
        NamingFormat::default()
    }))
}

/// 获取应用配置目录下指定文件的完整路径。
///
/// # 参数
/// * `filename` - 目标配置文件的名称，例如 "settings.json"。
pub fn get_config_file_path(filename: &str) -> Result<PathBuf> {
    let mut config_dir = dirs::config_dir().ok_or_else(|| {
        DownloaderError::Filesystem(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "无法找到用户配置目录",
        ))
    })?;
    config_dir.push("ncm-downloader");
    fs::create_dir_all(&config_dir)?;
    config_dir.push(filename);
    Ok(config_dir)
}

/// 检查一个目录能否作为下载目录使用。
///
/// 目录不存在时会被创建，随后写入并删除一个临时文件来确认写权限。
pub fn check_download_dir(dir: &Path) -> Result<()> {
    if dir.as_os_str().is_empty() || dir.to_string_lossy().trim().is_empty() {
        return Err(DownloaderError::Validation("请输入下载位置".to_string()));
    }
    fs::create_dir_all(dir)?;
    let probe = dir.join("test_write.tmp");
    fs::write(&probe, "test")?;
    fs::remove_file(&probe)?;
    Ok(())
}

/// 负责读写设置文件。
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    /// 使用指定路径创建存储。
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// 使用用户配置目录下的 `ncm-downloader/settings.json`。
    pub fn in_config_dir() -> Result<Self> {
        Ok(Self::new(get_config_file_path(SETTINGS_FILE_NAME)?))
    }

    /// 设置文件所在路径。
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 从文件加载设置。
    ///
    /// 文件不存在或内容损坏时静默回退到默认设置，只记录一条警告。
    pub fn load(&self) -> Settings {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("设置文件 {:?} 不存在，使用默认设置。", self.path);
                return Settings::default();
            }
            Err(e) => {
                warn!("加载设置失败: {e}");
                return Settings::default();
            }
        };

        match serde_json::from_str::<Settings>(&content) {
            Ok(settings) => {
                info!(
                    "已加载设置: 命名格式 '{}', 下载目录 {:?}",
                    settings.naming_format, settings.download_dir
                );
                settings
            }
            Err(e) => {
                warn!("设置文件解析失败，使用默认设置: {e}");
                Settings::default()
            }
        }
    }

    /// 将设置完整地写回文件。
    pub fn save(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(settings)?;
        fs::write(&self.path, content)?;
        info!("设置已保存。");
        Ok(())
    }
}

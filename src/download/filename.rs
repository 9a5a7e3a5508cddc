//! 根据命名格式生成不与已有文件冲突的下载路径。

use std::{
    io,
    path::{Path, PathBuf},
};

use tokio::{fs, io::AsyncWriteExt};
use tracing::debug;

use crate::{config::NamingFormat, error::Result, model::track::TrackInfo};

/// Windows 文件名中不允许出现的字符。
pub const ILLEGAL_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// 下载文件的扩展名。
pub const EXTENSION: &str = "mp3";

/// 将非法字符替换为 `_`，并去掉首尾空白。
#[must_use]
pub fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| if ILLEGAL_CHARS.contains(&c) { '_' } else { c })
        .collect::<String>()
        .trim()
        .to_string()
}

/// 按命名格式生成不带序号的文件名。
#[must_use]
pub fn base_filename(track_name: &str, artist: &str, format: NamingFormat) -> String {
    let name = sanitize(track_name);
    match format {
        NamingFormat::TitleOnly => format!("{name}.{EXTENSION}"),
        NamingFormat::TitleDashArtist => format!("{name} - {}.{EXTENSION}", sanitize(artist)),
    }
}

/// 为一首歌生成文件名。歌曲名或歌手为空时使用 `歌曲_<id>.mp3`。
#[must_use]
pub fn track_filename(track: &TrackInfo, format: NamingFormat) -> String {
    let artist = track.artist_string();
    if sanitize(&track.name).is_empty() || sanitize(&artist).is_empty() {
        return format!("歌曲_{}.{EXTENSION}", track.id);
    }
    base_filename(&track.name, &artist, format)
}

/// 生成目标目录下一个尚不存在的绝对路径。
///
/// 目录不存在时会先递归创建。候选文件名依次为 `name.mp3`、`name (1).mp3`、`name (2).mp3`……
pub fn resolve(
    track_name: &str,
    artist: &str,
    format: NamingFormat,
    target_dir: &Path,
) -> io::Result<PathBuf> {
    resolve_filename(&base_filename(track_name, artist, format), target_dir)
}

/// 与 [`resolve`] 相同，但直接使用给定的文件名。
pub fn resolve_filename(file_name: &str, target_dir: &Path) -> io::Result<PathBuf> {
    std::fs::create_dir_all(target_dir)?;
    let dir = std::path::absolute(target_dir)?;
    let (stem, ext) = split_extension(file_name);

    let mut counter = 0u64;
    loop {
        let candidate = dir.join(numbered(stem, ext, counter));
        if !candidate.exists() {
            return Ok(candidate);
        }
        counter += 1;
    }
}

/// 将内容写入一个新文件并返回其路径。
///
/// 文件以“仅新建”方式打开，即使两次下载同时解析到同一个路径，也不会互相覆盖；
/// 冲突时重新解析下一个可用的文件名。
pub async fn write_new_file(file_name: &str, target_dir: &Path, content: &[u8]) -> Result<PathBuf> {
    loop {
        let path = {
            let file_name = file_name.to_string();
            let target_dir = target_dir.to_path_buf();
            tokio::task::spawn_blocking(move || resolve_filename(&file_name, &target_dir)).await??
        };
        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                debug!("文件 {path:?} 已被占用，重新生成文件名");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let written = async {
            file.write_all(content).await?;
            file.flush().await
        }
        .await;
        if let Err(e) = written {
            drop(file);
            let _ = fs::remove_file(&path).await;
            return Err(e.into());
        }
        return Ok(path);
    }
}

fn split_extension(file_name: &str) -> (&str, Option<&str>) {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (file_name, None),
    }
}

fn numbered(stem: &str, ext: Option<&str>, counter: u64) -> String {
    let stem = if counter == 0 {
        stem.to_string()
    } else {
        format!("{stem} ({counter})")
    };
    match ext {
        Some(ext) => format!("{stem}.{ext}"),
        None => stem,
    }
}

//! 将搜索接口返回的原始歌曲记录标准化为 `TrackInfo`。
//!
//! 所有字段的缺省值都集中在 [`defaults`] 中。

use std::fmt::Display;

use chrono::{DateTime, Local, TimeZone, Utc};
use serde_json::Value;

use crate::model::track::{ArtistRef, TrackInfo, UNKNOWN_ARTIST};

/// 媒体下载链接的默认主机。
pub const DEFAULT_MEDIA_BASE: &str = "http://music.163.com";

/// 字段缺失时使用的缺省值。
pub mod defaults {
    use super::UNKNOWN_ARTIST;

    /// `id`
    pub const ID: u64 = 0;
    /// `name`
    pub const TRACK_NAME: &str = "unknown track";
    /// `album.id`
    pub const ALBUM_ID: u64 = 0;
    /// `album.name`
    pub const ALBUM_NAME: &str = "unknown album";
    /// `artists[].id`
    pub const ARTIST_ID: u64 = 0;
    /// `artists[].name`
    pub const ARTIST_NAME: &str = UNKNOWN_ARTIST;
    /// `duration`
    pub const DURATION_MS: u64 = 0;
    /// `album.publishTime`
    pub const PUBLISH_DATE: &str = "unknown";
}

/// 使用默认媒体主机提取歌曲信息。
#[must_use]
pub fn extract(raw: &Value) -> TrackInfo {
    extract_with_media_base(raw, DEFAULT_MEDIA_BASE)
}

/// 提取歌曲信息，下载链接使用给定的媒体主机合成。
///
/// 同一条记录无论提取多少次，结果都相同。
#[must_use]
pub fn extract_with_media_base(raw: &Value, media_base: &str) -> TrackInfo {
    let id = u64_field(raw, &["id"]).unwrap_or(defaults::ID);

    // 部分接口使用 `al` / `ar` / `dt` 这样的缩写字段名
    let album = field(raw, &["album", "al"]);
    let album_id = album
        .and_then(|a| u64_field(a, &["id"]))
        .unwrap_or(defaults::ALBUM_ID);
    let album_name = album
        .and_then(|a| str_field(a, &["name"]))
        .unwrap_or(defaults::ALBUM_NAME)
        .to_string();

    let artists = field(raw, &["artists", "ar"])
        .and_then(Value::as_array)
        .map(|list| list.iter().map(extract_artist).collect())
        .unwrap_or_default();

    TrackInfo {
        id,
        name: str_field(raw, &["name"])
            .unwrap_or(defaults::TRACK_NAME)
            .to_string(),
        artists,
        album_id,
        album_name,
        duration_ms: u64_field(raw, &["duration", "dt"]).unwrap_or(defaults::DURATION_MS),
        publish_date: format_publish_time(album.and_then(|a| a.get("publishTime"))),
        download_link: download_link_for(id, media_base),
        raw: raw.clone(),
    }
}

/// 由歌曲 ID 合成下载链接。
///
/// 接口本身不返回下载链接，所有歌曲的链接都按同一规则生成，
/// 是否可以下载要等请求之后看是否被重定向到 404 页面。
#[must_use]
pub fn download_link_for(id: u64, media_base: &str) -> String {
    format!(
        "{}/song/media/outer/url?id={id}.mp3",
        media_base.trim_end_matches('/')
    )
}

fn extract_artist(raw: &Value) -> ArtistRef {
    ArtistRef {
        id: u64_field(raw, &["id"]).unwrap_or(defaults::ARTIST_ID),
        name: str_field(raw, &["name"])
            .unwrap_or(defaults::ARTIST_NAME)
            .to_string(),
    }
}

/// 将毫秒时间戳格式化为本地时区的 `YYYY-MM-DD`。
///
/// 缺失或为 0 时为 `"unknown"`；无法转换时原样输出。
fn format_publish_time(value: Option<&Value>) -> String {
    format_publish_time_in(value, &Local)
}

/// 把毫秒时间戳换算成 `tz` 时区中的日期。
fn format_publish_time_in<Tz>(value: Option<&Value>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let Some(value) = value.filter(|v| is_truthy(v)) else {
        return defaults::PUBLISH_DATE.to_string();
    };

    let millis = value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
            .map(|f| f as i64)
    });

    millis
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|utc| utc.with_timezone(tz).format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
}

fn field<'a>(raw: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| raw.get(key))
        .find(|v| !v.is_null())
}

fn u64_field(raw: &Value, keys: &[&str]) -> Option<u64> {
    field(raw, keys).and_then(Value::as_u64)
}

fn str_field<'a>(raw: &'a Value, keys: &[&str]) -> Option<&'a str> {
    field(raw, keys).and_then(Value::as_str)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

use std::{
    collections::HashSet,
    num::NonZeroUsize,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use serde_json::json;

use ncm_downloader::{
    ErrorKind, NamingFormat, NoticeLevel, Session, SettingsStore,
    download::log::DownloadLog,
    error::{DownloaderError, Result},
    model::track::TrackInfo,
    providers::{MediaResponse, MusicSource, netease::parse_search_response},
    search::SearchPage,
};

const MEDIA_BASE: &str = "http://media.test";
const SENTINEL: &str = "https://music.163.com/#/404";

/// 内存中的音乐源：按偏移量生成结果，ID 在 `blocked` 中的歌曲会被重定向到 404 页面。
struct FakeSource {
    total: u64,
    blocked: HashSet<u64>,
    failing_offsets: HashSet<u32>,
    searches: Mutex<Vec<(String, u32, u32)>>,
}

impl FakeSource {
    fn new(total: u64) -> Self {
        Self {
            total,
            blocked: HashSet::new(),
            failing_offsets: HashSet::new(),
            searches: Mutex::new(Vec::new()),
        }
    }

    fn blocking(mut self, ids: impl IntoIterator<Item = u64>) -> Self {
        self.blocked.extend(ids);
        self
    }

    fn failing_at(mut self, offset: u32) -> Self {
        self.failing_offsets.insert(offset);
        self
    }

    fn searches(&self) -> Vec<(String, u32, u32)> {
        self.searches.lock().unwrap().clone()
    }

    fn id_from_url(url: &str) -> u64 {
        url.rsplit("id=")
            .next()
            .and_then(|s| s.trim_end_matches(".mp3").parse().ok())
            .unwrap_or_default()
    }
}

#[async_trait]
impl MusicSource for FakeSource {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn search(&self, keyword: &str, offset: u32, limit: u32) -> Result<SearchPage> {
        self.searches
            .lock()
            .unwrap()
            .push((keyword.to_string(), offset, limit));
        if self.failing_offsets.contains(&offset) {
            return Err(DownloaderError::HttpStatus { status: 502 });
        }

        let end = (u64::from(offset) + u64::from(limit)).min(self.total);
        let songs: Vec<_> = (u64::from(offset)..end)
            .map(|i| {
                json!({
                    "id": i + 1,
                    "name": format!("{keyword}{}", i + 1),
                    "duration": 200_000,
                    "album": { "id": 1, "name": "专辑" },
                    "artists": [{ "id": 2, "name": "歌手" }]
                })
            })
            .collect();
        let raw = json!({ "code": 200, "result": { "songs": songs, "songCount": self.total } });
        parse_search_response(raw, keyword, offset, limit, MEDIA_BASE)
    }

    async fn fetch_media(&self, url: &str) -> Result<MediaResponse> {
        let id = Self::id_from_url(url);
        if self.blocked.contains(&id) {
            return Ok(MediaResponse {
                final_url: SENTINEL.to_string(),
                status: 200,
                content_type: Some("text/html".to_string()),
                body: b"<html>404</html>".to_vec(),
                ..Default::default()
            });
        }
        Ok(MediaResponse {
            final_url: url.to_string(),
            status: 200,
            content_length: Some(3),
            content_type: Some("audio/mpeg".to_string()),
            body: b"ID3".to_vec(),
        })
    }

    async fn probe_media(&self, url: &str) -> Result<MediaResponse> {
        let mut media = self.fetch_media(url).await?;
        media.body.clear();
        Ok(media)
    }

    fn unavailable_url(&self) -> &str {
        SENTINEL
    }
}

struct Fixture {
    session: Session,
    source: Arc<FakeSource>,
    dir: tempfile::TempDir,
}

fn fixture(source: FakeSource) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let store = SettingsStore::new(dir.path().join("settings.json"));
    store
        .save(&ncm_downloader::Settings {
            naming_format: NamingFormat::TitleDashArtist,
            download_dir: dir.path().join("downloads"),
        })
        .unwrap();
    let source = Arc::new(source);
    let session = Session::new(source.clone(), store);
    Fixture {
        session,
        source,
        dir,
    }
}

#[test_log::test(tokio::test)]
async fn test_first_page_then_next() {
    let Fixture {
        mut session,
        source,
        dir: _dir,
    } = fixture(FakeSource::new(137));

    session.search("测试", 0, 20).unwrap();
    assert!(session.is_searching());
    let notice = session.process_next().await.unwrap();
    assert_eq!(notice.level, NoticeLevel::Info);

    assert_eq!(session.tracks().len(), 20);
    assert!(session.can_next());
    assert!(!session.can_prev());
    assert_eq!(session.page_label(), "偏移量: 0 | 总数: 137");

    assert!(session.next_page());
    session.process_next().await.unwrap();
    assert_eq!(session.pagination().offset(), 20);
    assert!(session.can_prev());
    assert_eq!(session.tracks()[0].name, "测试21");

    assert_eq!(
        source.searches(),
        vec![("测试".to_string(), 0, 20), ("测试".to_string(), 20, 20)]
    );
}

#[test_log::test(tokio::test)]
async fn test_last_page_disables_next() {
    let Fixture {
        mut session,
        dir: _dir,
        ..
    } = fixture(FakeSource::new(137));

    session.search("测试", 120, 20).unwrap();
    session.process_next().await.unwrap();
    assert_eq!(session.tracks().len(), 17);
    assert!(!session.can_next());
    assert!(!session.next_page());
}

#[tokio::test]
async fn test_negative_goto_is_rejected_without_request() {
    let Fixture {
        mut session,
        source,
        dir: _dir,
    } = fixture(FakeSource::new(137));
    session.search("测试", 40, 20).unwrap();
    session.process_next().await.unwrap();
    let before = session.pagination().clone();

    let err = session.goto_offset(-5).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(session.pagination(), &before);
    assert_eq!(source.searches().len(), 1);

    assert!(session.search_from_input("测试", "-5", "20").is_err());
    assert!(session.search("   ", 0, 20).is_err());
    assert_eq!(source.searches().len(), 1);
}

#[tokio::test]
async fn test_failed_search_keeps_previous_page() {
    let Fixture {
        mut session,
        dir: _dir,
        ..
    } = fixture(FakeSource::new(137).failing_at(40));
    session.search("测试", 20, 20).unwrap();
    session.process_next().await.unwrap();

    session.goto_offset(40).unwrap();
    let notice = session.process_next().await.unwrap();
    assert_eq!(notice.level, NoticeLevel::Error);
    assert!(notice.message.contains("502"));
    assert_eq!(session.pagination().offset(), 20);
    assert_eq!(session.tracks()[0].name, "测试21");
}

#[tokio::test]
async fn test_empty_result() {
    let Fixture {
        mut session,
        dir: _dir,
        ..
    } = fixture(FakeSource::new(0));
    session.search("不存在的歌", 0, 20).unwrap();
    let notice = session.process_next().await.unwrap();
    assert_eq!(notice.level, NoticeLevel::Warning);
    assert!(session.tracks().is_empty());
    assert!(!session.can_next());
    assert_eq!(session.page_label(), "偏移量: 0 | 总数: 0");
}

#[tokio::test]
async fn test_reset_discards_pending_search() {
    let Fixture {
        mut session,
        dir: _dir,
        ..
    } = fixture(FakeSource::new(137));
    session.search("测试", 0, 20).unwrap();
    session.reset();

    assert!(session.process_next().await.is_none());
    assert!(session.page().is_none());
    assert_eq!(session.pagination().keyword(), "");
    assert!(!session.is_searching());
}

#[test_log::test(tokio::test)]
async fn test_download_page_counts_failures() {
    let Fixture {
        mut session,
        dir: _dir,
        ..
    } = fixture(FakeSource::new(5).blocking([2, 4]));
    session.search("歌", 0, 10).unwrap();
    session.process_next().await.unwrap();

    assert_eq!(session.download_page().unwrap(), 5);
    let mut notices = Vec::new();
    let summary = loop {
        let notice = session.process_next().await.unwrap();
        if notice.message.contains("批量下载完成") {
            break notice;
        }
        notices.push(notice);
    };

    let progress: Vec<_> = notices
        .iter()
        .filter(|n| n.message.starts_with("正在下载"))
        .collect();
    assert_eq!(progress.len(), 5);
    assert_eq!(progress[0].message, "正在下载 (1/5): 歌1");
    assert!(notices[1].message.contains("✅ 下载成功: 歌1 - 歌手"));
    assert_eq!(notices[3].level, NoticeLevel::Error);
    assert!(notices[3].message.contains("❌ 下载失败: 歌2 - 歌手"));
    assert_eq!(notices.len(), 10);
    assert_eq!(summary.level, NoticeLevel::Warning);
    assert!(summary.message.ends_with("批量下载完成: 共 5 首，成功 3 首，失败 2 首"));

    let lines = session.log().lines();
    assert_eq!(lines.len(), 6);
    assert!(lines[0].contains("✅ 下载成功: 歌1 - 歌手"));
    assert!(lines[1].contains("❌ 下载失败: 歌2 - 歌手"));
    assert!(lines[1].contains("404"));

    let written = std::fs::read_dir(&session.settings().download_dir)
        .unwrap()
        .count();
    assert_eq!(written, 3);
}

#[tokio::test]
async fn test_concurrent_download_page() {
    let Fixture {
        session,
        dir: _dir,
        ..
    } = fixture(FakeSource::new(8).blocking([8]));
    let mut session = session.with_batch_concurrency(NonZeroUsize::new(4).unwrap());
    session.search("歌", 0, 10).unwrap();
    session.process_next().await.unwrap();

    session.download_page().unwrap();
    let mut started = 0;
    let mut finished = 0;
    let summary = loop {
        let notice = session.process_next().await.unwrap();
        if notice.message.contains("批量下载完成") {
            break notice;
        }
        if notice.message.starts_with("正在下载") {
            started += 1;
        } else {
            finished += 1;
        }
    };
    assert_eq!((started, finished), (8, 8));
    assert_eq!(summary.level, NoticeLevel::Warning);
    assert!(summary.message.ends_with("共 8 首，成功 7 首，失败 1 首"));

    let lines = session.log().lines();
    assert_eq!(lines.len(), 9);
    assert!(lines[0].contains("歌1"));
    assert!(lines[7].contains("❌ 下载失败: 歌8"));
}

#[tokio::test]
async fn test_download_selected_and_link_test() {
    let Fixture {
        mut session,
        dir: _dir,
        ..
    } = fixture(FakeSource::new(3).blocking([3]));
    assert_eq!(
        session.download_selected().unwrap_err().kind(),
        ErrorKind::Validation
    );

    session.search("晴天", 0, 20).unwrap();
    session.process_next().await.unwrap();
    assert!(session.select(3).is_err());

    session.select(0).unwrap();
    session.download_selected().unwrap();
    let notice = session.process_next().await.unwrap();
    assert_eq!(notice.level, NoticeLevel::Info);
    let path = session.settings().download_dir.join("晴天1 - 歌手.mp3");
    assert_eq!(std::fs::read(path).unwrap(), b"ID3");

    session.test_selected_link().unwrap();
    let notice = session.process_next().await.unwrap();
    assert_eq!(notice.level, NoticeLevel::Info);
    assert!(notice.message.contains("链接有效"));

    session.select(2).unwrap();
    session.test_selected_link().unwrap();
    let notice = session.process_next().await.unwrap();
    assert_eq!(notice.level, NoticeLevel::Warning);
    assert!(notice.message.contains("404"));
}

#[tokio::test]
async fn test_settings_changes_are_persisted() {
    let Fixture {
        mut session,
        source,
        dir,
    } = fixture(FakeSource::new(1));

    session.set_naming_format(NamingFormat::TitleOnly).unwrap();
    let music_dir = dir.path().join("我的音乐");
    session.set_download_dir(&music_dir).await.unwrap();
    assert!(music_dir.is_dir());

    let store = SettingsStore::new(dir.path().join("settings.json"));
    let reloaded = Session::new(source, store);
    assert_eq!(reloaded.settings().naming_format, NamingFormat::TitleOnly);
    assert_eq!(reloaded.settings().download_dir, music_dir);

    assert_eq!(
        session.set_download_dir("  ").await.unwrap_err().kind(),
        ErrorKind::Validation
    );
    assert_eq!(session.settings().download_dir, music_dir);
}

/// 只返回歌曲和总数，不回填关键词与分页参数的音乐源。
struct BareSource {
    searches: Mutex<Vec<(String, u32, u32)>>,
}

#[async_trait]
impl MusicSource for BareSource {
    fn name(&self) -> &'static str {
        "bare"
    }

    async fn search(&self, keyword: &str, offset: u32, limit: u32) -> Result<SearchPage> {
        self.searches
            .lock()
            .unwrap()
            .push((keyword.to_string(), offset, limit));
        let tracks = (0..limit)
            .map(|i| TrackInfo {
                id: u64::from(offset + i + 1),
                name: format!("歌{}", offset + i + 1),
                ..Default::default()
            })
            .collect();
        Ok(SearchPage {
            tracks,
            total_count: 137,
            ..Default::default()
        })
    }

    async fn fetch_media(&self, _: &str) -> Result<MediaResponse> {
        Err(DownloaderError::Internal("不支持下载".to_string()))
    }

    async fn probe_media(&self, _: &str) -> Result<MediaResponse> {
        Err(DownloaderError::Internal("不支持下载".to_string()))
    }

    fn unavailable_url(&self) -> &str {
        SENTINEL
    }
}

#[tokio::test]
async fn test_pagination_uses_request_parameters() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(BareSource {
        searches: Mutex::new(Vec::new()),
    });
    let mut session = Session::new(
        source.clone(),
        SettingsStore::new(dir.path().join("settings.json")),
    );
    assert_eq!(session.source_name(), "bare");

    session.search("  测试 ", 40, 20).unwrap();
    let notice = session.process_next().await.unwrap();
    assert_eq!(notice.level, NoticeLevel::Info);
    assert_eq!(session.tracks().len(), 20);
    assert_eq!(session.pagination().keyword(), "测试");
    assert_eq!(session.pagination().offset(), 40);
    assert_eq!(session.pagination().limit(), 20);
    let page = session.page().unwrap();
    assert_eq!((page.keyword.as_str(), page.offset, page.limit), ("测试", 40, 20));

    assert!(session.next_page());
    session.process_next().await.unwrap();
    assert_eq!(session.pagination().offset(), 60);
    assert_eq!(session.tracks()[0].name, "歌61");
    assert_eq!(
        source.searches.lock().unwrap().last().unwrap(),
        &("测试".to_string(), 60, 20)
    );
}

#[tokio::test]
async fn test_page_size_must_be_a_listed_choice() {
    let Fixture {
        mut session,
        source,
        dir: _dir,
    } = fixture(FakeSource::new(137));

    for limit in ["0", "15", "abc", "1000"] {
        let err = session.search_from_input("测试", "0", limit).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
    assert!(source.searches().is_empty());

    session.search_from_input("测试", "", "50").unwrap();
    session.process_next().await.unwrap();
    assert_eq!(session.tracks().len(), 50);
    assert_eq!(source.searches(), vec![("测试".to_string(), 0, 50)]);
}

#[tokio::test]
async fn test_download_log_is_mirrored_to_file() {
    let Fixture {
        session,
        dir,
        ..
    } = fixture(FakeSource::new(2));
    let log_path = dir.path().join("download.log");
    let mut session = session.with_log(DownloadLog::with_file(&log_path));

    session.search("歌", 0, 10).unwrap();
    session.process_next().await.unwrap();
    assert_eq!(session.selected_index(), None);
    session.select(1).unwrap();
    assert_eq!(session.selected_index(), Some(1));

    session.download_selected().unwrap();
    let notice = session.process_next().await.unwrap();
    assert_eq!(notice.level, NoticeLevel::Info);

    let written = std::fs::read_to_string(&log_path).unwrap();
    assert_eq!(written.lines().count(), 1);
    assert!(written.contains("✅ 下载成功: 歌2 - 歌手"));
    assert_eq!(session.log().lines(), written.lines().collect::<Vec<_>>());
}

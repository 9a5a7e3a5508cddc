//! 会话模块
//!
//! `Session` 是界面层唯一需要持有的对象。它接收命令，把耗时的网络操作放到 tokio
//! 任务中执行，任务完成后通过 mpsc 通道送回 [`SessionEvent`]，再由界面层调用
//! [`Session::apply`] 把事件应用到会话状态上。
//!
//! 所有状态（设置、分页、当前结果页、选中项、下载记录）都只在 `apply` 和命令方法中修改，
//! 后台任务只持有自己需要的数据副本。

use std::{num::NonZeroUsize, path::PathBuf, sync::Arc};

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::{
    config::{NamingFormat, Settings, SettingsStore, check_download_dir},
    download::{DownloadManager, log::DownloadLog},
    error::{DownloaderError, Result},
    model::{
        download::{BatchEntry, BatchProgress, BatchReport, BatchUpdate, LinkStatus},
        track::TrackInfo,
    },
    providers::MusicSource,
    search::{PAGE_SIZE_CHOICES, PaginationState, SearchPage},
};

/// 后台任务完成后发回的事件。
#[derive(Debug)]
pub enum SessionEvent {
    /// 一次搜索结束。
    SearchFinished {
        /// 发起搜索时的序号，用来丢弃过期的结果。
        generation: u64,
        /// 请求使用的关键词（已去掉首尾空白）。
        keyword: String,
        /// 请求使用的偏移量。
        offset: u32,
        /// 请求使用的每页数量。
        limit: u32,
        /// 搜索结果。
        outcome: Result<SearchPage>,
    },
    /// 批量下载即将开始下载某一首。
    DownloadProgress(BatchProgress),
    /// 一首歌下载结束，单独下载和批量下载中的每一首都会发出。
    DownloadFinished(BatchEntry),
    /// 批量下载全部结束，各首的记录已经通过 `DownloadFinished` 发出。
    BatchFinished(BatchReport),
    /// 链接测试结束。
    LinkTested {
        /// 被测试的歌曲名。
        track_name: String,
        /// 测试结果。
        status: LinkStatus,
    },
}

/// 提示的级别。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    /// 普通信息。
    Info,
    /// 部分失败或没有结果。
    Warning,
    /// 操作失败。
    Error,
}

/// 应用事件之后需要展示给用户的提示。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// 提示级别。
    pub level: NoticeLevel,
    /// 提示文本。
    pub message: String,
}

impl Notice {
    fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// 搜索、翻页与下载的会话。
///
/// 命令方法会启动后台任务，因此必须在 tokio 运行时中调用。
pub struct Session {
    source: Arc<dyn MusicSource>,
    downloader: DownloadManager,
    store: SettingsStore,
    settings: Settings,
    pagination: PaginationState,
    page: Option<SearchPage>,
    selected: Option<usize>,
    log: DownloadLog,
    batch_concurrency: Option<NonZeroUsize>,
    search_generation: u64,
    searching: bool,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
}

impl Session {
    /// 创建会话，并从 `store` 加载设置。
    pub fn new(source: Arc<dyn MusicSource>, store: SettingsStore) -> Self {
        let settings = store.load();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            downloader: DownloadManager::new(Arc::clone(&source)),
            source,
            store,
            settings,
            pagination: PaginationState::default(),
            page: None,
            selected: None,
            log: DownloadLog::new(),
            batch_concurrency: None,
            search_generation: 0,
            searching: false,
            events_tx,
            events_rx,
        }
    }

    /// 使用指定的下载记录（例如同时写入文件的记录）。
    #[must_use]
    pub fn with_log(mut self, log: DownloadLog) -> Self {
        self.log = log;
        self
    }

    /// 批量下载时最多同时下载 `concurrency` 首。默认逐首下载。
    #[must_use]
    pub fn with_batch_concurrency(mut self, concurrency: NonZeroUsize) -> Self {
        self.batch_concurrency = Some(concurrency);
        self
    }

    // ---- 状态查询 ----

    /// 音乐源的名称。
    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    /// 当前设置。
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// 最近一次成功搜索的分页状态。
    pub fn pagination(&self) -> &PaginationState {
        &self.pagination
    }

    /// 当前展示的结果页。
    pub fn page(&self) -> Option<&SearchPage> {
        self.page.as_ref()
    }

    /// 当前结果页中的歌曲，没有结果时为空。
    pub fn tracks(&self) -> &[TrackInfo] {
        self.page
            .as_ref()
            .map(|p| p.tracks.as_slice())
            .unwrap_or_default()
    }

    /// 选中歌曲在当前页中的序号。
    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    /// 选中的歌曲。
    pub fn selected_track(&self) -> Option<&TrackInfo> {
        self.selected.and_then(|i| self.tracks().get(i))
    }

    /// 下载记录。
    pub fn log(&self) -> &DownloadLog {
        &self.log
    }

    /// 是否有尚未返回的搜索。
    pub fn is_searching(&self) -> bool {
        self.searching
    }

    /// 是否可以翻到下一页。
    pub fn can_next(&self) -> bool {
        self.pagination.can_next()
    }

    /// 是否可以翻到上一页。
    pub fn can_prev(&self) -> bool {
        self.pagination.can_prev()
    }

    /// 分页标签文本。
    pub fn page_label(&self) -> String {
        self.pagination.page_label()
    }

    // ---- 搜索与翻页 ----

    /// 发起一次搜索。
    ///
    /// 参数在发出请求之前校验；分页状态要等搜索成功返回之后才会更新。
    pub fn search(&mut self, keyword: &str, offset: u32, limit: u32) -> Result<()> {
        let mut target = self.pagination.clone();
        target.begin(keyword, offset, limit)?;
        self.spawn_search(target.keyword().to_string(), offset, limit);
        Ok(())
    }

    /// 使用界面输入框中的原始文本发起搜索。
    ///
    /// 每页数量只能从 [`PAGE_SIZE_CHOICES`] 中选择。
    pub fn search_from_input(&mut self, keyword: &str, offset: &str, limit: &str) -> Result<()> {
        let offset = parse_offset(offset)?;
        let limit = limit
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|n| PAGE_SIZE_CHOICES.contains(n))
            .ok_or_else(|| {
                DownloaderError::Validation(format!(
                    "无效的每页数量: {limit} (可选: {PAGE_SIZE_CHOICES:?})"
                ))
            })?;
        self.search(keyword, offset, limit)
    }

    /// 翻到下一页。当前页不是满页时返回 `false`，不发起请求。
    pub fn next_page(&mut self) -> bool {
        let mut target = self.pagination.clone();
        match target.next() {
            Some(offset) => {
                self.spawn_search(target.keyword().to_string(), offset, target.limit());
                true
            }
            None => false,
        }
    }

    /// 翻到上一页。已在首页时返回 `false`，不发起请求。
    pub fn prev_page(&mut self) -> bool {
        let mut target = self.pagination.clone();
        match target.prev() {
            Some(offset) => {
                self.spawn_search(target.keyword().to_string(), offset, target.limit());
                true
            }
            None => false,
        }
    }

    /// 以当前关键词跳转到指定偏移量。
    pub fn goto_offset(&mut self, offset: i64) -> Result<()> {
        let mut target = self.pagination.clone();
        let offset = target.goto(offset)?;
        let (keyword, limit) = (target.keyword().to_string(), target.limit());
        self.search(&keyword, offset, limit)
    }

    /// 清空关键词、分页和结果。尚未返回的搜索结果会被丢弃。
    pub fn reset(&mut self) {
        self.pagination.reset();
        self.page = None;
        self.selected = None;
        self.search_generation += 1;
        self.searching = false;
        info!("已重置搜索状态");
    }

    fn spawn_search(&mut self, keyword: String, offset: u32, limit: u32) {
        self.search_generation += 1;
        self.searching = true;
        let generation = self.search_generation;
        let source = Arc::clone(&self.source);
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let outcome = source.search(&keyword, offset, limit).await;
            let _ = tx.send(SessionEvent::SearchFinished {
                generation,
                keyword,
                offset,
                limit,
                outcome,
            });
        });
    }

    // ---- 选择与下载 ----

    /// 选中当前结果页中的第 `index` 首歌曲。
    pub fn select(&mut self, index: usize) -> Result<&TrackInfo> {
        let count = self.tracks().len();
        if index >= count {
            return Err(DownloaderError::Validation(format!(
                "序号超出范围: {index} (共 {count} 首)"
            )));
        }
        self.selected = Some(index);
        Ok(&self.tracks()[index])
    }

    fn require_selected(&self) -> Result<TrackInfo> {
        self.selected_track()
            .cloned()
            .ok_or_else(|| DownloaderError::Validation("请先选择一首歌曲".to_string()))
    }

    /// 在后台下载选中的歌曲。
    pub fn download_selected(&mut self) -> Result<()> {
        let track = self.require_selected()?;
        let settings = self.settings.clone();
        let downloader = self.downloader.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = downloader.download_one(&track, &settings).await;
            let _ = tx.send(SessionEvent::DownloadFinished(BatchEntry {
                index: 0,
                artist: track.artist_string(),
                track_name: track.name,
                result,
            }));
        });
        Ok(())
    }

    /// 在后台下载当前页的所有歌曲，返回歌曲数量。
    pub fn download_page(&mut self) -> Result<usize> {
        let tracks = self.tracks().to_vec();
        if tracks.is_empty() {
            return Err(DownloaderError::Validation(
                "没有可下载的歌曲".to_string(),
            ));
        }
        let count = tracks.len();
        let settings = self.settings.clone();
        let downloader = self.downloader.clone();
        let concurrency = self.batch_concurrency;
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let updates_tx = tx.clone();
            let on_update = move |update: BatchUpdate| {
                let event = match update {
                    BatchUpdate::Started(progress) => SessionEvent::DownloadProgress(progress),
                    BatchUpdate::Finished(entry) => SessionEvent::DownloadFinished(entry),
                };
                let _ = updates_tx.send(event);
            };
            let report = match concurrency {
                Some(n) => {
                    downloader
                        .download_batch_concurrent(&tracks, &settings, n, on_update)
                        .await
                }
                None => downloader.download_batch(&tracks, &settings, on_update).await,
            };
            let _ = tx.send(SessionEvent::BatchFinished(report));
        });
        Ok(count)
    }

    /// 在后台测试选中歌曲的下载链接。
    pub fn test_selected_link(&mut self) -> Result<()> {
        let track = self.require_selected()?;
        let downloader = self.downloader.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let status = downloader.test_link(&track).await;
            let _ = tx.send(SessionEvent::LinkTested {
                track_name: track.name,
                status,
            });
        });
        Ok(())
    }

    // ---- 设置 ----

    /// 修改命名格式并保存设置。
    ///
    /// 保存失败时内存中的设置仍然生效。
    pub fn set_naming_format(&mut self, format: NamingFormat) -> Result<()> {
        self.settings.naming_format = format;
        info!("命名格式已修改为 '{format}'");
        self.store.save(&self.settings)
    }

    /// 检查目录可写之后修改下载目录并保存设置。
    pub async fn set_download_dir(&mut self, dir: impl Into<PathBuf>) -> Result<()> {
        let dir = dir.into();
        let checked = dir.clone();
        tokio::task::spawn_blocking(move || check_download_dir(&checked)).await??;
        info!("下载目录已修改为 {dir:?}");
        self.settings.download_dir = dir;
        self.store.save(&self.settings)
    }

    // ---- 事件 ----

    /// 等待下一个后台事件。
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events_rx.recv().await
    }

    /// 等待下一个事件并应用它。
    ///
    /// 过期的搜索结果不产生提示，此时返回 `None`。
    pub async fn process_next(&mut self) -> Option<Notice> {
        let event = self.next_event().await?;
        self.apply(event)
    }

    /// 把一个事件应用到会话状态上，返回需要展示的提示。
    pub fn apply(&mut self, event: SessionEvent) -> Option<Notice> {
        match event {
            SessionEvent::SearchFinished {
                generation,
                keyword,
                offset,
                limit,
                outcome,
            } => self.apply_search(generation, (keyword, offset, limit), outcome),
            SessionEvent::DownloadProgress(progress) => Some(Notice::info(format!(
                "正在下载 ({}/{}): {}",
                progress.index, progress.total, progress.track_name
            ))),
            SessionEvent::DownloadFinished(entry) => {
                let message = self.log.append(&entry.log_message()).to_string();
                Some(if entry.result.success {
                    Notice::info(message)
                } else {
                    Notice::error(message)
                })
            }
            SessionEvent::BatchFinished(report) => {
                let summary = self.log.append(&report.summary()).to_string();
                Some(if report.is_full_success() {
                    Notice::info(summary)
                } else {
                    Notice::warning(summary)
                })
            }
            SessionEvent::LinkTested { track_name, status } => {
                let message = format!("{track_name}: {status}");
                Some(match status {
                    LinkStatus::Valid { .. } => Notice::info(message),
                    LinkStatus::Unavailable => Notice::warning(message),
                    LinkStatus::Failed { .. } => Notice::error(message),
                })
            }
        }
    }

    fn apply_search(
        &mut self,
        generation: u64,
        (keyword, offset, limit): (String, u32, u32),
        outcome: Result<SearchPage>,
    ) -> Option<Notice> {
        if generation != self.search_generation {
            debug!("丢弃过期的搜索结果 (generation={generation})");
            return None;
        }
        self.searching = false;

        let mut page = match outcome {
            Ok(page) => page,
            Err(e) => {
                error!("搜索失败: {e}");
                return Some(Notice::error(format!("搜索失败: {e}")));
            }
        };

        // 分页只认请求时的参数，音乐源返回的页面不一定带回这些字段
        if let Err(e) = self.pagination.begin(&keyword, offset, limit) {
            warn!("搜索请求的分页参数无效: {e}");
            return Some(Notice::error(e.to_string()));
        }
        page.keyword = keyword;
        page.offset = offset;
        page.limit = limit;
        self.pagination.update(page.total_count, page.tracks.len());
        self.selected = None;

        let notice = if page.is_empty() {
            Notice::warning("未找到歌曲")
        } else {
            Notice::info(format!(
                "找到 {} 首歌曲 ({})",
                page.tracks.len(),
                self.pagination.page_label()
            ))
        };
        self.page = Some(page);
        Some(notice)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("source", &self.source.name())
            .field("settings", &self.settings)
            .field("pagination", &self.pagination)
            .field("selected", &self.selected)
            .finish_non_exhaustive()
    }
}

/// 解析偏移量输入框中的文本。空白视为 0，负数是输入错误。
pub fn parse_offset(text: &str) -> Result<u32> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(0);
    }
    let value: i64 = text
        .parse()
        .map_err(|_| DownloaderError::Validation(format!("无效的偏移量: {text}")))?;
    PaginationState::default().goto(value)
}

//! 下载模块
//!
//! `DownloadManager` 负责验证下载链接、获取媒体内容，并借助 [`filename`]
//! 把文件写入下载目录。它本身不保存任何状态，设置由调用方每次传入。

use std::{
    num::NonZeroUsize,
    path::PathBuf,
    pin::pin,
    sync::{Arc, Mutex, PoisonError},
};

use futures::stream::{self, StreamExt};
use tracing::{error, info, instrument, warn};

use crate::{
    config::Settings,
    error::{DownloaderError, Result},
    model::{
        download::{
            BatchEntry, BatchProgress, BatchReport, BatchUpdate, DownloadResult, LinkStatus,
        },
        track::TrackInfo,
    },
    providers::{MediaResponse, MusicSource},
};

pub mod filename;
pub mod log;

/// 检查一次媒体请求的结果是否可用。
///
/// 先判断是否被重定向到了“不可下载”页面，这种情况下即使状态码是 200 也视为失败；
/// 之后才检查状态码。
pub fn check_media_response(media: &MediaResponse, unavailable_url: &str) -> Result<()> {
    if media.final_url == unavailable_url {
        return Err(DownloaderError::UnavailableMedia);
    }
    if media.status != 200 {
        return Err(DownloaderError::HttpStatus {
            status: media.status,
        });
    }
    Ok(())
}

/// 下载管理器。
#[derive(Clone)]
pub struct DownloadManager {
    source: Arc<dyn MusicSource>,
}

impl DownloadManager {
    /// 使用指定的音乐源创建下载管理器。
    pub fn new(source: Arc<dyn MusicSource>) -> Self {
        Self { source }
    }

    /// 下载一首歌曲。
    ///
    /// 所有失败都体现在返回的 `DownloadResult` 中，不会重试。
    #[instrument(skip_all, fields(id = track.id, name = %track.name))]
    pub async fn download_one(&self, track: &TrackInfo, settings: &Settings) -> DownloadResult {
        let result = self.try_download(track, settings).await;
        match &result {
            Ok(path) => info!("下载成功: {path:?}"),
            Err(e) => warn!("下载失败: {e}"),
        }
        result.into()
    }

    async fn try_download(&self, track: &TrackInfo, settings: &Settings) -> Result<PathBuf> {
        info!("开始下载: {}", track.download_link);
        let media = self.source.fetch_media(&track.download_link).await?;
        check_media_response(&media, self.source.unavailable_url())?;

        let file_name = filename::track_filename(track, settings.naming_format);
        filename::write_new_file(&file_name, &settings.download_dir, &media.body).await
    }

    /// 按顺序逐首下载。
    ///
    /// 每首歌下载之前发出 [`BatchUpdate::Started`]，完成之后发出 [`BatchUpdate::Finished`]。
    /// 单首失败会被记录下来，然后继续下载下一首。
    pub async fn download_batch<F>(
        &self,
        tracks: &[TrackInfo],
        settings: &Settings,
        mut on_update: F,
    ) -> BatchReport
    where
        F: FnMut(BatchUpdate),
    {
        let total = tracks.len();
        info!("开始批量下载 {total} 首歌曲");
        let mut report = BatchReport {
            total,
            ..Default::default()
        };

        for (index, track) in tracks.iter().enumerate() {
            on_update(BatchUpdate::Started(progress_of(index, total, track)));
            let entry = BatchEntry {
                index,
                track_name: track.name.clone(),
                artist: track.artist_string(),
                result: self.download_one(track, settings).await,
            };
            on_update(BatchUpdate::Finished(entry.clone()));
            report.record(entry);
        }

        info!("{}", report.summary());
        report
    }

    /// 最多同时进行 `concurrency` 个下载。
    ///
    /// `Started` 在每首歌开始下载时发出；`Finished` 和报告中的记录一样按提交顺序发出。
    pub async fn download_batch_concurrent<F>(
        &self,
        tracks: &[TrackInfo],
        settings: &Settings,
        concurrency: NonZeroUsize,
        on_update: F,
    ) -> BatchReport
    where
        F: FnMut(BatchUpdate) + Send,
    {
        let total = tracks.len();
        info!("开始批量下载 {total} 首歌曲 (并发数: {concurrency})");
        let on_update = Mutex::new(on_update);

        let mut entries = pin!(
            stream::iter(0..total)
                .map(|index| {
                    let track = &tracks[index];
                    notify(&on_update, BatchUpdate::Started(progress_of(index, total, track)));
                    async move {
                        BatchEntry {
                            index,
                            track_name: track.name.clone(),
                            artist: track.artist_string(),
                            result: self.download_one(track, settings).await,
                        }
                    }
                })
                .buffered(concurrency.get())
        );

        let mut report = BatchReport {
            total,
            ..Default::default()
        };
        while let Some(entry) = entries.next().await {
            notify(&on_update, BatchUpdate::Finished(entry.clone()));
            report.record(entry);
        }
        info!("{}", report.summary());
        report
    }

    /// 用 HEAD 请求测试下载链接是否可用。
    #[instrument(skip_all, fields(id = track.id))]
    pub async fn test_link(&self, track: &TrackInfo) -> LinkStatus {
        let media = match self.source.probe_media(&track.download_link).await {
            Ok(media) => media,
            Err(e) => {
                error!("链接测试失败: {e}");
                return LinkStatus::Failed {
                    reason: e.to_string(),
                };
            }
        };

        match check_media_response(&media, self.source.unavailable_url()) {
            Ok(()) => LinkStatus::Valid {
                content_length: media.content_length,
                content_type: media.content_type,
            },
            Err(DownloaderError::UnavailableMedia) => LinkStatus::Unavailable,
            Err(e) => LinkStatus::Failed {
                reason: e.to_string(),
            },
        }
    }
}

fn progress_of(index: usize, total: usize, track: &TrackInfo) -> BatchProgress {
    BatchProgress {
        index: index + 1,
        total,
        track_name: track.name.clone(),
    }
}

fn notify<F: FnMut(BatchUpdate)>(callback: &Mutex<F>, update: BatchUpdate) {
    let mut callback = callback.lock().unwrap_or_else(PoisonError::into_inner);
    (*callback)(update);
}

impl std::fmt::Debug for DownloadManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadManager")
            .field("source", &self.source.name())
            .finish()
    }
}

//! 搜索结果的分页状态。
//!
//! 接口不返回总页数，只能根据当前页是否“满页”来推测是否还有下一页。

use crate::error::{DownloaderError, Result};

/// 界面提供的每页数量选项。
pub const PAGE_SIZE_CHOICES: [u32; 5] = [10, 20, 30, 50, 100];

/// 默认每页数量。
pub const DEFAULT_LIMIT: u32 = 20;

/// 记录当前搜索的关键词、偏移量和结果数量。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationState {
    keyword: String,
    offset: u32,
    limit: u32,
    total_count: u64,
    last_page_size: usize,
}

impl Default for PaginationState {
    fn default() -> Self {
        Self {
            keyword: String::new(),
            offset: 0,
            limit: DEFAULT_LIMIT,
            total_count: 0,
            last_page_size: 0,
        }
    }
}

impl PaginationState {
    /// 当前关键词。
    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// 当前偏移量。
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// 每页数量。
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// 最近一次搜索返回的总数。
    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    /// 最近一页实际返回的歌曲数量。
    pub fn last_page_size(&self) -> usize {
        self.last_page_size
    }

    /// 开始一次新的搜索。
    ///
    /// 关键词为空或每页数量为 0 时返回 `Validation` 错误，状态保持不变。
    pub fn begin(&mut self, keyword: &str, offset: u32, limit: u32) -> Result<()> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(DownloaderError::Validation("请输入搜索关键词".to_string()));
        }
        if limit == 0 {
            return Err(DownloaderError::Validation(
                "每页数量必须大于 0".to_string(),
            ));
        }
        self.keyword = keyword.to_string();
        self.offset = offset;
        self.limit = limit;
        Ok(())
    }

    /// 用一次搜索的返回结果更新总数和本页数量。
    pub fn update(&mut self, total_count: u64, page_size: usize) {
        self.total_count = total_count;
        self.last_page_size = page_size;
    }

    /// 本页是满页时才认为可能还有下一页。
    pub fn can_next(&self) -> bool {
        !self.keyword.is_empty() && self.last_page_size >= self.limit as usize
    }

    /// 偏移量大于 0 时才可以向前翻页。
    pub fn can_prev(&self) -> bool {
        self.offset > 0
    }

    /// 翻到下一页，返回新的偏移量。不可翻页时返回 `None` 且不改变状态。
    pub fn next(&mut self) -> Option<u32> {
        if !self.can_next() {
            return None;
        }
        self.offset = self.offset.saturating_add(self.limit);
        Some(self.offset)
    }

    /// 翻到上一页，返回新的偏移量。已在首页时返回 `None` 且不改变状态。
    pub fn prev(&mut self) -> Option<u32> {
        if !self.can_prev() {
            return None;
        }
        self.offset = self.offset.saturating_sub(self.limit);
        Some(self.offset)
    }

    /// 跳转到任意非负偏移量。负数是输入错误，状态保持不变。
    pub fn goto(&mut self, new_offset: i64) -> Result<u32> {
        if new_offset < 0 {
            return Err(DownloaderError::Validation(
                "偏移量不能为负数".to_string(),
            ));
        }
        let offset = u32::try_from(new_offset)
            .map_err(|_| DownloaderError::Validation(format!("偏移量过大: {new_offset}")))?;
        self.offset = offset;
        Ok(offset)
    }

    /// 回到初始状态。每页数量保持不变。
    pub fn reset(&mut self) {
        self.keyword.clear();
        self.offset = 0;
        self.total_count = 0;
        self.last_page_size = 0;
    }

    /// 分页标签文本，例如 `偏移量: 0 | 总数: 137`。
    pub fn page_label(&self) -> String {
        format!("偏移量: {} | 总数: {}", self.offset, self.total_count)
    }
}

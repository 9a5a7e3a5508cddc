//! 一个交互式的终端前端，用于演示 `ncm-downloader` 的搜索、翻页与下载功能。
//!
//! ## 如何运行
//!
//! ```bash
//! cargo run --example cli
//! ```
//!
//! 设置 `RUST_LOG=ncm_downloader=debug` 可以看到请求 URL 等调试信息。

use anyhow::Context;
use ncm_downloader::{
    DownloaderError, NamingFormat, Notice, NoticeLevel, Session, SessionEvent,
    config::get_config_file_path, download::log::DownloadLog, netease_session,
    search::PAGE_SIZE_CHOICES,
};
use strum::IntoEnumIterator;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

const HELP: &str = "\
命令:
  s <关键词> [偏移量] [每页数量]  搜索 (关键词可含空格)
  n / p                           下一页 / 上一页
  g <偏移量>                      跳转
  r                               重置
  sel <序号>                      选中歌曲
  d                               下载选中的歌曲
  da                              下载本页所有歌曲
  t                               测试选中歌曲的链接
  fmt                             切换命名格式
  dir <路径>                      修改下载目录
  raw                             显示原始 JSON
  log                             显示下载记录
  q                               退出";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let log_file = get_config_file_path("download.log").context("无法定位下载记录文件")?;
    let mut session = netease_session()
        .context("初始化会话失败")?
        .with_log(DownloadLog::with_file(&log_file));
    println!(
        "音乐源: {} | 下载目录: {:?} | 命名格式: {}",
        session.source_name(),
        session.settings().download_dir,
        session.settings().naming_format
    );
    println!("下载记录: {log_file:?} | 每页数量可选: {PAGE_SIZE_CHOICES:?}");
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match handle_command(&mut session, line.trim()).await {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(e) => eprintln!("❌ {e}"),
                }
            }
            Some(event) = session.next_event() => {
                let is_search = matches!(event, SessionEvent::SearchFinished { .. });
                if let Some(notice) = session.apply(event) {
                    print_notice(&notice);
                    if is_search && notice.level == NoticeLevel::Info {
                        print_page(&session);
                    }
                }
            }
        }
    }
    Ok(())
}

async fn handle_command(session: &mut Session, line: &str) -> ncm_downloader::Result<bool> {
    let (command, args) = line.split_once(' ').unwrap_or((line, ""));
    let args = args.trim();
    match command {
        "" => {}
        "h" | "help" => println!("{HELP}"),
        "q" | "quit" => return Ok(false),
        "s" => {
            let (keyword, offset, limit) = split_search_args(args);
            session.search_from_input(&keyword, offset, limit)?;
            println!("🔍 正在搜索...");
        }
        "n" => {
            if !session.next_page() {
                println!("已经是最后一页");
            }
        }
        "p" => {
            if !session.prev_page() {
                println!("已经是第一页");
            }
        }
        "g" => {
            let offset = args.parse::<i64>().map_err(|_| {
                DownloaderError::Validation(format!("无效的偏移量: {args}"))
            })?;
            session.goto_offset(offset)?;
        }
        "r" => session.reset(),
        "sel" => {
            let index = args.parse::<usize>().map_err(|_| {
                DownloaderError::Validation(format!("无效的序号: {args}"))
            })?;
            let track = session.select(index)?;
            println!(
                "已选中: {} | ID: {} | 专辑: {} | 歌手ID: {} | 发行: {}\n  {}",
                track.name,
                track.id,
                track.album_name,
                track.artist_ids(),
                track.publish_date,
                track.download_link
            );
        }
        "d" => session.download_selected()?,
        "da" => {
            let count = session.download_page()?;
            println!("开始下载 {count} 首歌曲");
        }
        "t" => session.test_selected_link()?,
        "fmt" => {
            let current = session.settings().naming_format;
            let next = NamingFormat::iter()
                .find(|f| *f != current)
                .unwrap_or(current);
            session.set_naming_format(next)?;
            println!("命名格式: {next} (例如 {})", next.example());
        }
        "dir" => {
            session.set_download_dir(args).await?;
            println!("下载目录: {args}");
        }
        "raw" => match session.page() {
            Some(page) => println!("{}", page.raw_pretty()),
            None => println!("还没有搜索结果"),
        },
        "log" => {
            for line in session.log().lines() {
                println!("{line}");
            }
        }
        other => println!("未知命令: {other}，输入 h 查看帮助"),
    }
    Ok(true)
}

/// 把 `s` 命令的参数拆成关键词、偏移量与每页数量。
///
/// 偏移量与每页数量从末尾开始识别，最多两个；关键词至少保留一个词，其余部分原样拼回。
fn split_search_args(args: &str) -> (String, &str, &str) {
    let mut words: Vec<&str> = args.split_whitespace().collect();
    let mut numbers = Vec::new();
    while numbers.len() < 2
        && words.len() > 1
        && words.last().is_some_and(|w| w.parse::<i64>().is_ok())
    {
        numbers.extend(words.pop());
    }
    let (offset, limit) = match numbers.as_slice() {
        [limit, offset] => (*offset, *limit),
        [offset] => (*offset, "20"),
        _ => ("0", "20"),
    };
    (words.join(" "), offset, limit)
}

fn print_notice(notice: &Notice) {
    match notice.level {
        NoticeLevel::Info => println!("{}", notice.message),
        NoticeLevel::Warning => println!("⚠️ {}", notice.message),
        NoticeLevel::Error => eprintln!("{}", notice.message),
    }
}

fn print_page(session: &Session) {
    println!("{:<4} {:<30} {:<20} {:<20} {:>6}", "序号", "歌曲名", "歌手", "专辑", "时长");
    for (index, track) in session.tracks().iter().enumerate() {
        let marker = if session.selected_index() == Some(index) { "*" } else { " " };
        println!(
            "{marker}{index:<3} {:<30} {:<20} {:<20} {:>6}",
            track.name,
            track.artist_string(),
            track.album_name,
            track.duration()
        );
    }
    println!(
        "{} | 下一页: {} | 上一页: {}",
        session.page_label(),
        if session.can_next() { "可用" } else { "不可用" },
        if session.can_prev() { "可用" } else { "不可用" }
    );
}

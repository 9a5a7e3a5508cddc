//! 定义了整个库通用的核心数据模型。

pub mod download;
pub mod track;

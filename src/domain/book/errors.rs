//! Book Context - Errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BookError {
    #[error("无效的书名: {0}")]
    InvalidTitle(String),

    #[error("无效的文本内容: {0}")]
    InvalidContent(String),

    #[error("分段错误: {0}")]
    SegmentationError(String),
}

//! Synthesis Queries

use uuid::Uuid;

/// 获取任务进度
#[derive(Debug, Clone)]
pub struct GetTaskProgress {
    pub task_id: Uuid,
}

/// 按状态统计书籍的音频单元
#[derive(Debug, Clone)]
pub struct GetBookAudioStatus {
    pub book_id: Uuid,
}

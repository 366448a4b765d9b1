//! Synthesis Query Handlers

use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::ports::{
    AudioFileRepositoryPort, AudioStatusCounts, TaskRecord, TaskRepositoryPort, TaskStatus,
};
use crate::application::queries::{GetBookAudioStatus, GetTaskProgress};

/// 任务进度视图
#[derive(Debug, Clone)]
pub struct TaskProgress {
    pub task: TaskRecord,
    /// 完成百分比（total_items = 0 时为 100）
    pub percent: u32,
    pub is_terminal: bool,
}

/// GetTaskProgress Handler
pub struct GetTaskProgressHandler {
    task_repo: Arc<dyn TaskRepositoryPort>,
}

impl GetTaskProgressHandler {
    pub fn new(task_repo: Arc<dyn TaskRepositoryPort>) -> Self {
        Self { task_repo }
    }

    pub async fn handle(&self, query: GetTaskProgress) -> Result<TaskProgress, ApplicationError> {
        let task = self
            .task_repo
            .find_by_id(query.task_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("ProcessingTask", query.task_id))?;

        let percent = if task.total_items == 0 {
            100
        } else {
            // failed_items 也计入推进，任务不会因个别失败而卡在 99%
            let done = task.processed_items + task.failed_items;
            (done.min(task.total_items) * 100) / task.total_items
        };
        let is_terminal = matches!(
            task.status,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        );

        Ok(TaskProgress {
            task,
            percent,
            is_terminal,
        })
    }
}

/// GetBookAudioStatus Handler - 按状态统计书籍音频单元
pub struct GetBookAudioStatusHandler {
    audio_repo: Arc<dyn AudioFileRepositoryPort>,
}

impl GetBookAudioStatusHandler {
    pub fn new(audio_repo: Arc<dyn AudioFileRepositoryPort>) -> Self {
        Self { audio_repo }
    }

    pub async fn handle(
        &self,
        query: GetBookAudioStatus,
    ) -> Result<AudioStatusCounts, ApplicationError> {
        Ok(self.audio_repo.count_by_status(query.book_id).await?)
    }
}

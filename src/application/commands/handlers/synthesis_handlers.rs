//! Synthesis Command Handlers - 合成任务编排
//!
//! 命令侧只负责建立待合成单元与任务记录并入队，
//! 实际合成由 infrastructure/worker 异步消费。

use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::application::commands::{CancelSynthesis, ResubmitFailed, StartSynthesis};
use crate::application::error::ApplicationError;
use crate::application::ports::{
    AudioFileRecord, AudioFileRepositoryPort, AudioStatus, BookRepositoryPort,
    SentenceRepositoryPort, TaskRecord, TaskRepositoryPort, TaskType,
};

/// 启动合成响应
///
/// `task_id = None` 表示全部句子均已有成品音频，无需排队。
#[derive(Debug, Clone)]
pub struct StartSynthesisResponse {
    pub task_id: Option<Uuid>,
    pub queued_units: usize,
    pub skipped_completed: usize,
}

// ============================================================================
// StartSynthesis
// ============================================================================

/// StartSynthesis Handler - 可续传的合成启动
///
/// 已有 completed 音频的句子不再排队，其余句子各建一条
/// pending 单元；任务以 queued 状态入库后将任务 ID 投递给 worker。
pub struct StartSynthesisHandler {
    book_repo: Arc<dyn BookRepositoryPort>,
    sentence_repo: Arc<dyn SentenceRepositoryPort>,
    audio_repo: Arc<dyn AudioFileRepositoryPort>,
    task_repo: Arc<dyn TaskRepositoryPort>,
    task_tx: mpsc::Sender<Uuid>,
}

impl StartSynthesisHandler {
    pub fn new(
        book_repo: Arc<dyn BookRepositoryPort>,
        sentence_repo: Arc<dyn SentenceRepositoryPort>,
        audio_repo: Arc<dyn AudioFileRepositoryPort>,
        task_repo: Arc<dyn TaskRepositoryPort>,
        task_tx: mpsc::Sender<Uuid>,
    ) -> Self {
        Self {
            book_repo,
            sentence_repo,
            audio_repo,
            task_repo,
            task_tx,
        }
    }

    pub async fn handle(
        &self,
        command: StartSynthesis,
    ) -> Result<StartSynthesisResponse, ApplicationError> {
        let book_id = command.book_id;

        self.book_repo
            .find_by_id(book_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Book", book_id))?;

        let sentences = self.sentence_repo.find_by_book(book_id).await?;
        if sentences.is_empty() {
            return Err(ApplicationError::invalid_state(format!(
                "书籍尚无台本句子，无法合成: {}",
                book_id
            )));
        }

        // 续传：已有成品音频的句子不重复排队
        let mut pending = Vec::new();
        let mut skipped = 0usize;
        for sentence in &sentences {
            let existing = self.audio_repo.find_by_sentence(sentence.id).await?;
            if existing
                .iter()
                .any(|a| a.status == AudioStatus::Completed)
            {
                skipped += 1;
                continue;
            }
            if existing
                .iter()
                .any(|a| matches!(a.status, AudioStatus::Pending | AudioStatus::Processing))
            {
                // 已在队列/在途，归入本次任务统计但不重复建记录
                pending.push(None);
                continue;
            }
            pending.push(Some(AudioFileRecord::pending_for_sentence(
                book_id,
                sentence.id,
            )));
        }

        if pending.is_empty() {
            tracing::info!(
                book_id = %book_id,
                skipped = skipped,
                "All sentences already synthesized"
            );
            return Ok(StartSynthesisResponse {
                task_id: None,
                queued_units: 0,
                skipped_completed: skipped,
            });
        }

        let new_units: Vec<AudioFileRecord> = pending.iter().flatten().cloned().collect();
        if !new_units.is_empty() {
            self.audio_repo.save_batch(&new_units).await?;
        }

        let task = TaskRecord::queued(book_id, TaskType::Synthesis, pending.len() as u32);
        self.task_repo.create(&task).await?;

        self.task_tx
            .send(task.id)
            .await
            .map_err(|e| ApplicationError::internal(format!("合成队列已关闭: {}", e)))?;

        tracing::info!(
            book_id = %book_id,
            task_id = %task.id,
            queued_units = pending.len(),
            skipped_completed = skipped,
            "Synthesis task queued"
        );

        Ok(StartSynthesisResponse {
            task_id: Some(task.id),
            queued_units: pending.len(),
            skipped_completed: skipped,
        })
    }
}

// ============================================================================
// CancelSynthesis
// ============================================================================

/// CancelSynthesis Handler - 协作式取消
///
/// 仅标记任务为 cancelled；worker 在发放下一次认领前检查任务状态，
/// 在途单元照常收尾。终态任务的取消被仓储以 Conflict 拒绝。
pub struct CancelSynthesisHandler {
    task_repo: Arc<dyn TaskRepositoryPort>,
}

impl CancelSynthesisHandler {
    pub fn new(task_repo: Arc<dyn TaskRepositoryPort>) -> Self {
        Self { task_repo }
    }

    pub async fn handle(&self, command: CancelSynthesis) -> Result<(), ApplicationError> {
        let task = self
            .task_repo
            .find_by_id(command.task_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("ProcessingTask", command.task_id))?;

        self.task_repo.cancel(task.id).await?;

        tracing::info!(
            task_id = %task.id,
            book_id = %task.book_id,
            "Synthesis task cancelled"
        );

        Ok(())
    }
}

// ============================================================================
// ResubmitFailed
// ============================================================================

/// 重提交响应
#[derive(Debug, Clone)]
pub struct ResubmitResponse {
    pub task_id: Uuid,
    pub resubmitted_units: usize,
}

/// ResubmitFailed Handler - 失败单元重排队
///
/// failed → pending（retry_count + 1），并以新任务重新入队。
pub struct ResubmitFailedHandler {
    audio_repo: Arc<dyn AudioFileRepositoryPort>,
    task_repo: Arc<dyn TaskRepositoryPort>,
    task_tx: mpsc::Sender<Uuid>,
}

impl ResubmitFailedHandler {
    pub fn new(
        audio_repo: Arc<dyn AudioFileRepositoryPort>,
        task_repo: Arc<dyn TaskRepositoryPort>,
        task_tx: mpsc::Sender<Uuid>,
    ) -> Self {
        Self {
            audio_repo,
            task_repo,
            task_tx,
        }
    }

    pub async fn handle(
        &self,
        command: ResubmitFailed,
    ) -> Result<ResubmitResponse, ApplicationError> {
        let failed = self.audio_repo.find_failed_by_book(command.book_id).await?;
        if failed.is_empty() {
            return Err(ApplicationError::invalid_state(format!(
                "书籍没有失败的合成单元: {}",
                command.book_id
            )));
        }

        for unit in &failed {
            self.audio_repo.resubmit(unit.id).await?;
        }

        let task = TaskRecord::queued(command.book_id, TaskType::Synthesis, failed.len() as u32);
        self.task_repo.create(&task).await?;

        self.task_tx
            .send(task.id)
            .await
            .map_err(|e| ApplicationError::internal(format!("合成队列已关闭: {}", e)))?;

        tracing::info!(
            book_id = %command.book_id,
            task_id = %task.id,
            resubmitted = failed.len(),
            "Failed units resubmitted"
        );

        Ok(ResubmitResponse {
            task_id: task.id,
            resubmitted_units: failed.len(),
        })
    }
}

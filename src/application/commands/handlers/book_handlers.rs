//! Book Command Handlers

use std::sync::Arc;
use uuid::Uuid;

use crate::application::commands::{CreateBookFromText, DeleteBook, SegmentBook};
use crate::application::error::ApplicationError;
use crate::application::ports::{
    BookRecord, BookRepositoryPort, BookStatus, SegmentStatus, TextSegmentRecord,
};
use crate::domain::book::{Book, Title};
use crate::domain::text_segmenter::SegmenterConfig;

// ============================================================================
// CreateBookFromText (Step 1: Create processing record)
// ============================================================================

/// 创建书籍响应（立即返回，status=processing）
#[derive(Debug, Clone)]
pub struct CreateBookResponse {
    pub id: Uuid,
    pub title: String,
    pub status: BookStatus,
}

/// CreateBookFromText Handler - 创建 processing 状态的记录
pub struct CreateBookFromTextHandler {
    book_repo: Arc<dyn BookRepositoryPort>,
}

impl CreateBookFromTextHandler {
    pub fn new(book_repo: Arc<dyn BookRepositoryPort>) -> Self {
        Self { book_repo }
    }

    /// 第一步：创建 processing 状态的书籍记录，立即返回 ID
    pub async fn handle(
        &self,
        command: CreateBookFromText,
    ) -> Result<CreateBookResponse, ApplicationError> {
        let title =
            Title::new(command.title).map_err(|e| ApplicationError::validation(e.to_string()))?;
        let book = Book::new(title);

        let record = BookRecord {
            id: *book.id().as_uuid(),
            title: book.title().as_str().to_string(),
            total_segments: 0, // 待处理
            status: BookStatus::Processing,
            created_at: book.created_at(),
            updated_at: book.updated_at(),
        };

        self.book_repo.save(&record).await?;

        tracing::info!(
            book_id = %record.id,
            title = %record.title,
            "Book created (processing)"
        );

        Ok(CreateBookResponse {
            id: record.id,
            title: record.title,
            status: BookStatus::Processing,
        })
    }
}

// ============================================================================
// SegmentBook (Step 2: Idempotent segmentation)
// ============================================================================

/// 分段响应
#[derive(Debug, Clone)]
pub struct SegmentBookResponse {
    pub id: Uuid,
    pub total_segments: usize,
    /// 既有片段已完整覆盖文本，本次为幂等空操作
    pub already_segmented: bool,
}

/// SegmentBook Handler - 可重入的分段处理
///
/// 幂等性：若既有片段已连续覆盖全文（从 0 到文本末尾），
/// 重跑直接返回既有结果；否则在单事务内整体替换片段。
pub struct SegmentBookHandler {
    book_repo: Arc<dyn BookRepositoryPort>,
    config: SegmenterConfig,
}

impl SegmentBookHandler {
    pub fn new(book_repo: Arc<dyn BookRepositoryPort>, config: SegmenterConfig) -> Self {
        Self { book_repo, config }
    }

    pub async fn handle(
        &self,
        command: SegmentBook,
    ) -> Result<SegmentBookResponse, ApplicationError> {
        let book_id = command.book_id;

        let record = self
            .book_repo
            .find_by_id(book_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Book", book_id))?;

        // 幂等检查：既有片段是否已完整覆盖文本
        let existing = self.book_repo.find_segments_by_book(book_id).await?;
        if covers_exactly(&existing, command.text.len()) {
            tracing::debug!(
                book_id = %book_id,
                total_segments = existing.len(),
                "Segments already cover text, skipping"
            );
            return Ok(SegmentBookResponse {
                id: book_id,
                total_segments: existing.len(),
                already_segmented: true,
            });
        }

        // 聚合只在内存中完成分段，落库仍以既有 book_id 为准
        let title =
            Title::new(record.title).map_err(|e| ApplicationError::validation(e.to_string()))?;
        let mut book = Book::new(title);
        book.segment(&command.text, &self.config);

        let records: Vec<TextSegmentRecord> = book
            .segments()
            .iter()
            .map(|segment| TextSegmentRecord {
                id: Uuid::new_v4(),
                book_id,
                segment_index: segment.index(),
                start_position: segment.start(),
                end_position: segment.end(),
                content: segment.content().to_string(),
                word_count: segment.word_count(),
                kind: segment.kind(),
                status: SegmentStatus::Pending,
            })
            .collect();

        let total_segments = records.len();
        self.book_repo.replace_segments(book_id, &records).await?;
        self.book_repo
            .update_status(book_id, BookStatus::Ready, total_segments)
            .await?;

        tracing::info!(
            book_id = %book_id,
            total_segments = total_segments,
            "Book segmented"
        );

        Ok(SegmentBookResponse {
            id: book_id,
            total_segments,
            already_segmented: false,
        })
    }
}

/// 片段是否从 0 连续覆盖到 text_len
fn covers_exactly(segments: &[TextSegmentRecord], text_len: usize) -> bool {
    if segments.is_empty() || text_len == 0 {
        return false;
    }
    let mut cursor = 0;
    for segment in segments {
        if segment.start_position != cursor {
            return false;
        }
        cursor = segment.end_position;
    }
    cursor == text_len
}

// ============================================================================
// DeleteBook
// ============================================================================

/// DeleteBook Handler
pub struct DeleteBookHandler {
    book_repo: Arc<dyn BookRepositoryPort>,
}

impl DeleteBookHandler {
    pub fn new(book_repo: Arc<dyn BookRepositoryPort>) -> Self {
        Self { book_repo }
    }

    pub async fn handle(&self, command: DeleteBook) -> Result<(), ApplicationError> {
        let book_id = command.book_id;

        let book = self
            .book_repo
            .find_by_id(book_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Book", book_id))?;

        self.book_repo.delete(book_id).await?;

        tracing::info!(
            book_id = %book_id,
            title = %book.title,
            "Book deleted"
        );

        Ok(())
    }
}

//! Script Command Handlers - 句子归属
//!
//! 将片段切分为有序句子，逐句咨询外部说话人检测器，
//! 通过角色解析器落角色与别名，产出台本句子。

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::application::commands::handlers::{RecordAliasHandler, UpsertCharacterHandler};
use crate::application::commands::{
    AttributeBook, AttributeSegment, RecordAlias, UpsertCharacter,
};
use crate::application::error::ApplicationError;
use crate::application::ports::{
    BookRepositoryPort, CharacterRepositoryPort, SegmentStatus, SentenceRecord,
    SentenceRepositoryPort, SpeakerDetectorPort, SpeechAnalysis,
};
use crate::domain::sentence_splitter::split_sentences;

/// 归属响应
#[derive(Debug, Clone)]
pub struct AttributeResponse {
    pub segments_attributed: usize,
    pub sentences_created: usize,
    /// 未能归属到角色（character_id = None，回落旁白音色）的句子数
    pub unresolved_sentences: usize,
}

// ============================================================================
// AttributeSegment
// ============================================================================

/// AttributeSegment Handler - 归属单个片段
///
/// 可重入：重跑会先清掉该片段的既有句子再重新归属
/// （片段内容不可变，status 可变以支持重处理）。
pub struct AttributeSegmentHandler {
    book_repo: Arc<dyn BookRepositoryPort>,
    sentence_repo: Arc<dyn SentenceRepositoryPort>,
    character_repo: Arc<dyn CharacterRepositoryPort>,
    detector: Arc<dyn SpeakerDetectorPort>,
    upsert_character: UpsertCharacterHandler,
    record_alias: RecordAliasHandler,
}

impl AttributeSegmentHandler {
    pub fn new(
        book_repo: Arc<dyn BookRepositoryPort>,
        sentence_repo: Arc<dyn SentenceRepositoryPort>,
        character_repo: Arc<dyn CharacterRepositoryPort>,
        detector: Arc<dyn SpeakerDetectorPort>,
    ) -> Self {
        Self {
            book_repo,
            sentence_repo,
            character_repo: character_repo.clone(),
            detector,
            upsert_character: UpsertCharacterHandler::new(character_repo.clone()),
            record_alias: RecordAliasHandler::new(character_repo),
        }
    }

    pub async fn handle(
        &self,
        command: AttributeSegment,
    ) -> Result<AttributeResponse, ApplicationError> {
        let segment = self
            .book_repo
            .find_segment(command.segment_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("TextSegment", command.segment_id))?;

        // 重新归属前清掉旧句子
        self.sentence_repo.delete_by_segment(segment.id).await?;

        let pieces = split_sentences(&segment.content);
        let mut sentences = Vec::with_capacity(pieces.len());
        let mut unresolved = 0usize;

        for (order, piece) in pieces.iter().enumerate() {
            let analysis = self
                .detector
                .analyze(&piece.text)
                .await
                .map_err(|e| ApplicationError::ExternalServiceError(e.to_string()))?;

            let character_id = self
                .resolve_speaker(segment.book_id, &piece.text, piece.is_dialogue, &analysis)
                .await?;
            if character_id.is_none() {
                unresolved += 1;
            }

            sentences.push(SentenceRecord {
                id: Uuid::new_v4(),
                book_id: segment.book_id,
                segment_id: segment.id,
                order_in_segment: order,
                text: piece.text.clone(),
                raw_speaker: analysis.speaker,
                character_id,
                tone: analysis.tone,
                strength: analysis.strength,
                pause_after_ms: analysis.pause_after_ms,
                tts_overrides: None,
                created_at: Utc::now(),
            });
        }

        self.sentence_repo.save_batch(&sentences).await?;
        self.book_repo
            .update_segment_status(segment.id, SegmentStatus::Attributed)
            .await?;

        tracing::debug!(
            segment_id = %segment.id,
            sentences = sentences.len(),
            unresolved = unresolved,
            "Segment attributed"
        );

        Ok(AttributeResponse {
            segments_attributed: 1,
            sentences_created: sentences.len(),
            unresolved_sentences: unresolved,
        })
    }

    /// 将检测结果落为角色引用：创建/取回角色、记录别名、累加计数
    async fn resolve_speaker(
        &self,
        book_id: Uuid,
        sentence_text: &str,
        is_dialogue: bool,
        analysis: &SpeechAnalysis,
    ) -> Result<Option<Uuid>, ApplicationError> {
        let speaker = match analysis.speaker.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => s,
            _ => return Ok(None),
        };

        let character = self
            .upsert_character
            .handle(UpsertCharacter {
                book_id,
                candidate_name: speaker.to_string(),
            })
            .await?;

        for candidate in &analysis.aliases {
            self.record_alias
                .handle(RecordAlias {
                    character_id: character.id,
                    alias: candidate.alias.clone(),
                    confidence: candidate.confidence,
                    source_sentence: Some(sentence_text.to_string()),
                })
                .await?;
        }

        let quotes = if is_dialogue { 1 } else { 0 };
        self.character_repo
            .bump_counters(character.id, 1, quotes)
            .await?;

        Ok(Some(character.id))
    }
}

// ============================================================================
// AttributeBook
// ============================================================================

/// AttributeBook Handler - 归属整本书的未归属片段
pub struct AttributeBookHandler {
    book_repo: Arc<dyn BookRepositoryPort>,
    segment_handler: AttributeSegmentHandler,
}

impl AttributeBookHandler {
    pub fn new(
        book_repo: Arc<dyn BookRepositoryPort>,
        sentence_repo: Arc<dyn SentenceRepositoryPort>,
        character_repo: Arc<dyn CharacterRepositoryPort>,
        detector: Arc<dyn SpeakerDetectorPort>,
    ) -> Self {
        Self {
            book_repo: book_repo.clone(),
            segment_handler: AttributeSegmentHandler::new(
                book_repo,
                sentence_repo,
                character_repo,
                detector,
            ),
        }
    }

    pub async fn handle(
        &self,
        command: AttributeBook,
    ) -> Result<AttributeResponse, ApplicationError> {
        let segments = self
            .book_repo
            .find_segments_by_book(command.book_id)
            .await?;
        if segments.is_empty() {
            return Err(ApplicationError::invalid_state(format!(
                "书籍尚未分段: {}",
                command.book_id
            )));
        }

        let mut total = AttributeResponse {
            segments_attributed: 0,
            sentences_created: 0,
            unresolved_sentences: 0,
        };

        for segment in segments
            .iter()
            .filter(|s| s.status == SegmentStatus::Pending)
        {
            let response = self
                .segment_handler
                .handle(AttributeSegment {
                    segment_id: segment.id,
                })
                .await?;
            total.segments_attributed += response.segments_attributed;
            total.sentences_created += response.sentences_created;
            total.unresolved_sentences += response.unresolved_sentences;
        }

        tracing::info!(
            book_id = %command.book_id,
            segments = total.segments_attributed,
            sentences = total.sentences_created,
            unresolved = total.unresolved_sentences,
            "Book attributed"
        );

        Ok(total)
    }
}

//! Script Query Handlers

use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::ports::{SentenceRecord, SentenceRepositoryPort};
use crate::application::queries::{GetScript, GetSegmentSentences};

/// GetScript Handler - 整本书的台本
pub struct GetScriptHandler {
    sentence_repo: Arc<dyn SentenceRepositoryPort>,
}

impl GetScriptHandler {
    pub fn new(sentence_repo: Arc<dyn SentenceRepositoryPort>) -> Self {
        Self { sentence_repo }
    }

    pub async fn handle(&self, query: GetScript) -> Result<Vec<SentenceRecord>, ApplicationError> {
        Ok(self.sentence_repo.find_by_book(query.book_id).await?)
    }
}

/// GetSegmentSentences Handler
pub struct GetSegmentSentencesHandler {
    sentence_repo: Arc<dyn SentenceRepositoryPort>,
}

impl GetSegmentSentencesHandler {
    pub fn new(sentence_repo: Arc<dyn SentenceRepositoryPort>) -> Self {
        Self { sentence_repo }
    }

    pub async fn handle(
        &self,
        query: GetSegmentSentences,
    ) -> Result<Vec<SentenceRecord>, ApplicationError> {
        Ok(self.sentence_repo.find_by_segment(query.segment_id).await?)
    }
}

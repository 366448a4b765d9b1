//! Book Query Handlers

use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::queries::{GetBook, GetBookSegments, ListBooks};
use crate::application::ports::{BookRecord, BookRepositoryPort, TextSegmentRecord};

/// GetBook Handler
pub struct GetBookHandler {
    book_repo: Arc<dyn BookRepositoryPort>,
}

impl GetBookHandler {
    pub fn new(book_repo: Arc<dyn BookRepositoryPort>) -> Self {
        Self { book_repo }
    }

    pub async fn handle(&self, query: GetBook) -> Result<BookRecord, ApplicationError> {
        self.book_repo
            .find_by_id(query.book_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Book", query.book_id))
    }
}

/// ListBooks Handler
pub struct ListBooksHandler {
    book_repo: Arc<dyn BookRepositoryPort>,
}

impl ListBooksHandler {
    pub fn new(book_repo: Arc<dyn BookRepositoryPort>) -> Self {
        Self { book_repo }
    }

    pub async fn handle(&self, _query: ListBooks) -> Result<Vec<BookRecord>, ApplicationError> {
        Ok(self.book_repo.find_all().await?)
    }
}

/// GetBookSegments Handler
pub struct GetBookSegmentsHandler {
    book_repo: Arc<dyn BookRepositoryPort>,
}

impl GetBookSegmentsHandler {
    pub fn new(book_repo: Arc<dyn BookRepositoryPort>) -> Self {
        Self { book_repo }
    }

    pub async fn handle(
        &self,
        query: GetBookSegments,
    ) -> Result<Vec<TextSegmentRecord>, ApplicationError> {
        self.book_repo
            .find_by_id(query.book_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Book", query.book_id))?;
        Ok(self.book_repo.find_segments_by_book(query.book_id).await?)
    }
}

//! Character Query Handlers

use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::ports::{
    AliasRecord, CharacterRecord, CharacterRepositoryPort, MergeAuditRecord,
};
use crate::application::queries::{GetBookCharacters, GetCharacterAliases, GetMergeHistory};

/// GetBookCharacters Handler - 书籍的活跃角色
pub struct GetBookCharactersHandler {
    character_repo: Arc<dyn CharacterRepositoryPort>,
}

impl GetBookCharactersHandler {
    pub fn new(character_repo: Arc<dyn CharacterRepositoryPort>) -> Self {
        Self { character_repo }
    }

    pub async fn handle(
        &self,
        query: GetBookCharacters,
    ) -> Result<Vec<CharacterRecord>, ApplicationError> {
        Ok(self.character_repo.find_active_by_book(query.book_id).await?)
    }
}

/// GetCharacterAliases Handler
///
/// 角色 ID 先规范化到活跃根，被合并角色的旧 ID 也能取到全量别名。
pub struct GetCharacterAliasesHandler {
    character_repo: Arc<dyn CharacterRepositoryPort>,
}

impl GetCharacterAliasesHandler {
    pub fn new(character_repo: Arc<dyn CharacterRepositoryPort>) -> Self {
        Self { character_repo }
    }

    pub async fn handle(
        &self,
        query: GetCharacterAliases,
    ) -> Result<Vec<AliasRecord>, ApplicationError> {
        let root = self
            .character_repo
            .find_active_root(query.character_id)
            .await?;
        Ok(self.character_repo.find_aliases(root.id).await?)
    }
}

/// GetMergeHistory Handler - 只追加的合并审计
pub struct GetMergeHistoryHandler {
    character_repo: Arc<dyn CharacterRepositoryPort>,
}

impl GetMergeHistoryHandler {
    pub fn new(character_repo: Arc<dyn CharacterRepositoryPort>) -> Self {
        Self { character_repo }
    }

    pub async fn handle(
        &self,
        query: GetMergeHistory,
    ) -> Result<Vec<MergeAuditRecord>, ApplicationError> {
        Ok(self.character_repo.find_merge_audits(query.book_id).await?)
    }
}

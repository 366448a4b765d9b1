//! Script Queries

use uuid::Uuid;

/// 获取整本书的台本（句子按片段序、句序排列）
#[derive(Debug, Clone)]
pub struct GetScript {
    pub book_id: Uuid,
}

/// 获取单个片段的句子
#[derive(Debug, Clone)]
pub struct GetSegmentSentences {
    pub segment_id: Uuid,
}

//! Book Queries

use uuid::Uuid;

/// 获取书籍详情
#[derive(Debug, Clone)]
pub struct GetBook {
    pub book_id: Uuid,
}

/// 获取所有书籍
#[derive(Debug, Clone, Default)]
pub struct ListBooks;

/// 获取书籍的片段列表（按 segment_index 升序）
#[derive(Debug, Clone)]
pub struct GetBookSegments {
    pub book_id: Uuid,
}

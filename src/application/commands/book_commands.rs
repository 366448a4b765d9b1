//! Book Commands

use uuid::Uuid;

/// 从文本创建书籍命令（第一步：创建 processing 状态记录）
#[derive(Debug, Clone)]
pub struct CreateBookFromText {
    pub title: String,
    pub text: String,
}

/// 书籍分段命令（第二步：可重入的分段处理）
#[derive(Debug, Clone)]
pub struct SegmentBook {
    pub book_id: Uuid,
    pub text: String,
}

/// 删除书籍命令（级联删除其下所有实体）
#[derive(Debug, Clone)]
pub struct DeleteBook {
    pub book_id: Uuid,
}

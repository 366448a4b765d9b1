//! Script Commands - 句子归属

use uuid::Uuid;

/// 归属单个片段命令：切句、调用外部检测器、落角色与别名
#[derive(Debug, Clone)]
pub struct AttributeSegment {
    pub segment_id: Uuid,
}

/// 归属整本书命令：对所有未归属片段逐个执行归属
#[derive(Debug, Clone)]
pub struct AttributeBook {
    pub book_id: Uuid,
}

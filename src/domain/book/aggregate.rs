//! Book Context - Aggregate Root

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BookId, TextSegment, Title};
use crate::domain::text_segmenter::{segment_text, word_count, SegmenterConfig};

/// Book 聚合根
///
/// 不变量:
/// - 书籍文本只属于一个 Book
/// - 片段区间连续覆盖全文：按序拼接片段内容可逐字节还原原文
/// - 片段创建后内容不可变（重新分段会整体替换）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    id: BookId,
    title: Title,
    segments: Vec<TextSegment>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Book {
    /// 创建新书籍
    pub fn new(title: Title) -> Self {
        let now = Utc::now();
        Self {
            id: BookId::new(),
            title,
            segments: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// 从原始文本创建书籍并自动分段
    pub fn from_text(title: Title, text: &str) -> Self {
        let mut book = Self::new(title);
        book.segment(text, &SegmenterConfig::default());
        book
    }

    /// 对文本进行分段（整体替换既有片段）
    pub fn segment(&mut self, text: &str, config: &SegmenterConfig) {
        self.segments = segment_text(text, config)
            .into_iter()
            .filter_map(|draft| {
                let content = draft.slice(text).to_string();
                let words = word_count(&content);
                TextSegment::new(draft.index, draft.start, draft.end, content, draft.kind, words)
                    .ok()
            })
            .collect();
        self.updated_at = Utc::now();
    }

    /// 校验片段是否无缝覆盖指定文本
    pub fn covers(&self, text: &str) -> bool {
        if text.is_empty() {
            return self.segments.is_empty();
        }
        let mut cursor = 0;
        for segment in &self.segments {
            if segment.start() != cursor {
                return false;
            }
            cursor = segment.end();
        }
        cursor == text.len()
    }

    // Getters
    pub fn id(&self) -> &BookId {
        &self.id
    }

    pub fn title(&self) -> &Title {
        &self.title
    }

    pub fn segments(&self) -> &[TextSegment] {
        &self.segments
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_book_creation() {
        let title = Title::new("测试书籍").unwrap();
        let book = Book::new(title);

        assert_eq!(book.title().as_str(), "测试书籍");
        assert!(book.segments().is_empty());
    }

    #[test]
    fn test_segmentation_covers_text() {
        let title = Title::new("测试书籍").unwrap();
        let text = "这是第一句话内容较长需要超过二十个字符。\n这是第二句话内容也较长需要超过二十个字符。";
        let book = Book::from_text(title, text);

        assert_eq!(book.segment_count(), 2);
        assert!(book.covers(text));

        let reassembled: String = book.segments().iter().map(|s| s.content()).collect();
        assert_eq!(reassembled, text);
    }

    #[test]
    fn test_resegmentation_replaces() {
        let title = Title::new("测试书籍").unwrap();
        let mut book = Book::from_text(title, "旧文本内容需要足够长超过二十个字符限制。");
        let new_text = "新文本第一段需要足够长超过二十个字符限制。\n新文本第二段同样需要超过二十个字符。";
        book.segment(new_text, &SegmenterConfig::default());

        assert_eq!(book.segment_count(), 2);
        assert!(book.covers(new_text));
    }
}

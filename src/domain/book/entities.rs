//! Book Context - Entities

use serde::{Deserialize, Serialize};

use super::BookError;
use crate::domain::text_segmenter::SegmentKind;

/// 文本片段 - 书籍原文的一个连续切片
///
/// 不变量:
/// - index 在 Book 内唯一且从 0 严格递增
/// - `[start, end)` 区间与相邻片段首尾相接，无缝隙无重叠
/// - content 与区间对应的原文切片一致，创建后不可变
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSegment {
    index: usize,
    start: usize,
    end: usize,
    content: String,
    kind: SegmentKindRepr,
    word_count: usize,
}

// SegmentKind 不带 serde 派生（与分段器保持 std-only），此处做一层映射
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum SegmentKindRepr {
    Heading,
    Paragraph,
    Dialogue,
}

impl From<SegmentKind> for SegmentKindRepr {
    fn from(kind: SegmentKind) -> Self {
        match kind {
            SegmentKind::Heading => SegmentKindRepr::Heading,
            SegmentKind::Paragraph => SegmentKindRepr::Paragraph,
            SegmentKind::Dialogue => SegmentKindRepr::Dialogue,
        }
    }
}

impl From<SegmentKindRepr> for SegmentKind {
    fn from(repr: SegmentKindRepr) -> Self {
        match repr {
            SegmentKindRepr::Heading => SegmentKind::Heading,
            SegmentKindRepr::Paragraph => SegmentKind::Paragraph,
            SegmentKindRepr::Dialogue => SegmentKind::Dialogue,
        }
    }
}

impl TextSegment {
    pub fn new(
        index: usize,
        start: usize,
        end: usize,
        content: String,
        kind: SegmentKind,
        word_count: usize,
    ) -> Result<Self, BookError> {
        if end <= start {
            return Err(BookError::SegmentationError(
                "片段区间不能为空".to_string(),
            ));
        }
        if content.len() != end - start {
            return Err(BookError::InvalidContent(
                "片段内容与区间长度不一致".to_string(),
            ));
        }
        Ok(Self {
            index,
            start,
            end,
            content,
            kind: kind.into(),
            word_count,
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn kind(&self) -> SegmentKind {
        self.kind.into()
    }

    pub fn word_count(&self) -> usize {
        self.word_count
    }
}

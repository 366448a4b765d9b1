//! 领域层
//!
//! 三个限界上下文：
//! - Book Context: 书籍、文本片段、台本句子
//! - Character Context: 角色档案、别名、身份合并
//! - Voice Context: 音色档案、合成参数与兜底选择

pub mod book;
pub mod character;
pub mod sentence_splitter;
pub mod text_segmenter;
pub mod voice;

pub use sentence_splitter::{split_sentences, SentencePiece};
pub use text_segmenter::{
    segment_text, segment_text_default, word_count, SegmentDraft, SegmentKind, SegmenterConfig,
};

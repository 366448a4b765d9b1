//! 文本分段器
//!
//! 将规范化后的书籍文本切分为有序、连续、不重叠的片段。
//!
//! 与一般的"抽取句子"式分割不同，这里的片段以 `[start, end)` 字节区间
//! 表示，所有片段按序拼接必须逐字节还原原文——段间的换行与空白
//! 一律归入前一个片段的尾部，不会被丢弃。

/// 默认最小字符数限制
/// 当片段字符数未达到此限制时，段内的句末标点不会触发分割
pub const DEFAULT_MIN_CHARS: usize = 20;

/// 标题判定的最大字符数（无句末标点的短行视为标题）
const HEADING_MAX_CHARS: usize = 30;

/// 分段配置
#[derive(Debug, Clone)]
pub struct SegmenterConfig {
    /// 最小字符数限制（用于合并短句）
    pub min_chars: usize,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            min_chars: DEFAULT_MIN_CHARS,
        }
    }
}

/// 片段类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// 标题（短行、无句末标点）
    Heading,
    /// 普通叙述段落
    Paragraph,
    /// 对话段落（以引号开头）
    Dialogue,
}

impl SegmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentKind::Heading => "heading",
            SegmentKind::Paragraph => "paragraph",
            SegmentKind::Dialogue => "dialogue",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "heading" => Some(SegmentKind::Heading),
            "paragraph" => Some(SegmentKind::Paragraph),
            "dialogue" => Some(SegmentKind::Dialogue),
            _ => None,
        }
    }
}

/// 分段结果：原文的一个 `[start, end)` 字节切片
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentDraft {
    /// 片段顺序（从 0 开始严格递增）
    pub index: usize,
    /// 起始字节偏移（含）
    pub start: usize,
    /// 结束字节偏移（不含）
    pub end: usize,
    /// 片段类型
    pub kind: SegmentKind,
}

impl SegmentDraft {
    /// 取出片段对应的原文切片
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..self.end]
    }
}

/// 检查是否为强分隔符（句末标点，满足 min_chars 时分割）
#[inline]
fn is_strong_delimiter(ch: char) -> bool {
    matches!(ch, '。' | '？' | '！' | '…' | '.' | '?' | '!')
}

/// 检查是否为收尾引号（分割点顺延到引号之后）
#[inline]
fn is_closing_quote(ch: char) -> bool {
    matches!(ch, '"' | '\u{201D}' | '\u{2019}' | '」' | '』' | '\'')
}

/// 检查是否为起始引号（用于判定对话片段）
#[inline]
fn is_opening_quote(ch: char) -> bool {
    matches!(ch, '"' | '\u{201C}' | '\u{2018}' | '「' | '『' | '\'')
}

/// 对文本进行分段
///
/// 切分规则：
/// 1. 段落边界：换行之后的第一个非空白字符处切分（空行与缩进归入前段）
/// 2. 段内边界：强分隔符（及其后紧随的收尾引号）之后切分，
///    且当前片段字符数须达到 `min_chars`
///
/// 不变量：片段区间连续覆盖全文，无缝隙、无重叠；
/// 按 index 顺序拼接各片段即逐字节还原原文。
pub fn segment_text(text: &str, config: &SegmenterConfig) -> Vec<SegmentDraft> {
    if text.is_empty() {
        return Vec::new();
    }

    // 先求所有切分点（每个切分点是新片段的起始字节偏移）
    let mut cuts: Vec<usize> = vec![0];
    let mut chars_since_cut = 0usize;
    let mut has_content = false; // 当前片段是否已有非空白内容
    let mut prev_was_newline = false;
    let mut pending_sentence_cut = false;

    for (offset, ch) in text.char_indices() {
        let paragraph_boundary = prev_was_newline && !ch.is_whitespace() && has_content;
        let sentence_boundary = pending_sentence_cut
            && !ch.is_whitespace()
            && !is_closing_quote(ch)
            && !is_strong_delimiter(ch);

        if paragraph_boundary || sentence_boundary {
            cuts.push(offset);
            chars_since_cut = 0;
            has_content = false;
            pending_sentence_cut = false;
        }

        chars_since_cut += 1;
        if !ch.is_whitespace() {
            has_content = true;
        }
        prev_was_newline = ch == '\n';

        if is_strong_delimiter(ch) && chars_since_cut >= config.min_chars {
            pending_sentence_cut = true;
        } else if pending_sentence_cut && !is_closing_quote(ch) {
            // 分隔符之后又出现了普通字符（上面的切分条件未触发，
            // 说明该字符是空白），保持 pending 直到遇到实际内容
            if !ch.is_whitespace() {
                pending_sentence_cut = false;
            }
        }
    }

    // 由切分点生成片段
    let mut segments = Vec::with_capacity(cuts.len());
    for (index, window) in cuts.windows(2).enumerate() {
        segments.push(make_draft(text, index, window[0], window[1]));
    }
    let last_start = *cuts.last().unwrap_or(&0);
    segments.push(make_draft(text, segments.len(), last_start, text.len()));

    segments
}

/// 使用默认配置分段（便捷方法）
pub fn segment_text_default(text: &str) -> Vec<SegmentDraft> {
    segment_text(text, &SegmenterConfig::default())
}

fn make_draft(text: &str, index: usize, start: usize, end: usize) -> SegmentDraft {
    SegmentDraft {
        index,
        start,
        end,
        kind: classify(&text[start..end]),
    }
}

/// 判定片段类型
fn classify(content: &str) -> SegmentKind {
    let trimmed = content.trim();
    if trimmed.chars().next().map(is_opening_quote).unwrap_or(false) {
        return SegmentKind::Dialogue;
    }
    let has_terminal = trimmed.chars().any(is_strong_delimiter);
    if !has_terminal && trimmed.chars().count() <= HEADING_MAX_CHARS {
        return SegmentKind::Heading;
    }
    SegmentKind::Paragraph
}

/// 统计词数
///
/// CJK 字符按单字计数，其余文字按字母数字连续串计数。
pub fn word_count(text: &str) -> usize {
    let mut count = 0;
    let mut in_word = false;
    for ch in text.chars() {
        if is_cjk(ch) {
            count += 1;
            in_word = false;
        } else if ch.is_alphanumeric() {
            if !in_word {
                count += 1;
                in_word = true;
            }
        } else {
            in_word = false;
        }
    }
    count
}

#[inline]
fn is_cjk(ch: char) -> bool {
    matches!(ch, '\u{4E00}'..='\u{9FFF}' | '\u{3400}'..='\u{4DBF}')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reassemble(text: &str, segments: &[SegmentDraft]) -> String {
        segments.iter().map(|s| s.slice(text)).collect()
    }

    #[test]
    fn test_empty_text_yields_no_segments() {
        assert!(segment_text_default("").is_empty());
    }

    #[test]
    fn test_concatenation_reproduces_text() {
        let text = "第001章 陨落的天才\n\n\"斗之力，三段！\"\n\n望着测验魔石碑上面闪亮得甚至有些刺眼的五个大字，少年面无表情。紧握的手掌因为大力而微微发白，带来一阵阵钻心的疼痛。\n";
        let segments = segment_text_default(text);
        assert_eq!(reassemble(text, &segments), text);
    }

    #[test]
    fn test_segments_contiguous_and_ordered() {
        let text = "第一段内容比较长需要超过二十个字符才行。\n第二段内容也比较长需要超过二十个字符。";
        let segments = segment_text_default(text);
        assert_eq!(segments[0].start, 0);
        assert_eq!(segments.last().unwrap().end, text.len());
        for (i, pair) in segments.windows(2).enumerate() {
            assert_eq!(pair[0].end, pair[1].start);
            assert_eq!(pair[0].index, i);
            assert_eq!(pair[1].index, i + 1);
        }
    }

    #[test]
    fn test_paragraph_boundary_splits() {
        let text = "第一行。\n第二行。";
        let segments = segment_text_default(text);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].slice(text), "第一行。\n");
        assert_eq!(segments[1].slice(text), "第二行。");
    }

    #[test]
    fn test_blank_lines_attach_to_previous_segment() {
        let text = "第一段。\n\n\n第二段。";
        let segments = segment_text_default(text);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].slice(text), "第一段。\n\n\n");
        assert_eq!(reassemble(text, &segments), text);
    }

    #[test]
    fn test_sentence_cut_respects_min_chars() {
        let config = SegmenterConfig { min_chars: 10 };
        let text = "这是一段很长的文字内容够十个字了。另一段也很长的内容同样够长。";
        let segments = segment_text(text, &config);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].slice(text), "这是一段很长的文字内容够十个字了。");
    }

    #[test]
    fn test_short_sentences_not_cut() {
        let config = SegmenterConfig { min_chars: 100 };
        let text = "短。短？短！";
        let segments = segment_text(text, &config);
        assert_eq!(segments.len(), 1);
    }

    #[test]
    fn test_closing_quote_stays_with_sentence() {
        let config = SegmenterConfig { min_chars: 5 };
        let text = "\u{201C}斗之力，三段，果然不出所料！\u{201D}少年转身离开了测验场地没有停留。";
        let segments = segment_text(text, &config);
        assert_eq!(segments.len(), 2);
        assert!(segments[0].slice(text).ends_with('\u{201D}'));
        assert_eq!(reassemble(text, &segments), text);
    }

    #[test]
    fn test_heading_detection() {
        let text = "第001章 陨落的天才\n望着测验魔石碑，少年面无表情，唇角有着一抹自嘲的弧度。";
        let segments = segment_text_default(text);
        assert_eq!(segments[0].kind, SegmentKind::Heading);
        assert_eq!(segments[1].kind, SegmentKind::Paragraph);
    }

    #[test]
    fn test_dialogue_detection() {
        let text = "\u{201C}三段？嘿嘿，果然不出我所料！\u{201D}";
        let segments = segment_text_default(text);
        assert_eq!(segments[0].kind, SegmentKind::Dialogue);
    }

    #[test]
    fn test_word_count_cjk_and_latin() {
        assert_eq!(word_count("斗之力"), 3);
        assert_eq!(word_count("hello world"), 2);
        assert_eq!(word_count("Tom对Jerry说"), 5);
        assert_eq!(word_count("……"), 0);
    }

    #[test]
    fn test_crlf_text_reassembles() {
        let text = "第一段内容比较长需要超过二十个字符才可以。\r\n第二段内容同样比较长也需要超过二十字。";
        let segments = segment_text_default(text);
        assert_eq!(reassemble(text, &segments), text);
        assert_eq!(segments.len(), 2);
    }
}

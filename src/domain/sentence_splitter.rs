//! 句子分割器
//!
//! 将一个文本片段切分为有序的可归属句子，供说话人归属使用。
//! 与 [`crate::domain::text_segmenter`] 不同，这里不要求位置连续——
//! 句子是修剪后的语义单元，空白与纯引号碎片会被合并或丢弃。

/// 单个句子
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentencePiece {
    /// 句子文本（已修剪）
    pub text: String,
    /// 是否为对话（带引号的直接引语）
    pub is_dialogue: bool,
}

#[inline]
fn is_sentence_end(ch: char) -> bool {
    matches!(ch, '。' | '？' | '！' | '…' | '.' | '?' | '!')
}

#[inline]
fn is_quote(ch: char) -> bool {
    matches!(
        ch,
        '"' | '\u{201C}' | '\u{201D}' | '\u{2018}' | '\u{2019}' | '「' | '」' | '『' | '』'
    )
}

/// 检查碎片是否只含引号或空白
#[inline]
fn is_trivial(s: &str) -> bool {
    s.chars().all(|c| is_quote(c) || c.is_whitespace())
}

/// 将片段内容切分为句子
///
/// 切分策略：
/// 1. 在句末标点（及其后紧随的收尾引号）处断句
/// 2. 换行视为句子边界
/// 3. 纯引号/空白碎片并入前一句
pub fn split_sentences(content: &str) -> Vec<SentencePiece> {
    let mut raw: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut pending_end = false;

    for ch in content.chars() {
        if ch == '\n' {
            flush(&mut raw, &mut current);
            pending_end = false;
            continue;
        }

        if pending_end && !is_quote(ch) && !is_sentence_end(ch) && !ch.is_whitespace() {
            flush(&mut raw, &mut current);
            pending_end = false;
        }

        current.push(ch);

        if is_sentence_end(ch) {
            pending_end = true;
        }
    }
    flush(&mut raw, &mut current);

    // 合并纯引号碎片，标注对话
    let mut sentences: Vec<SentencePiece> = Vec::new();
    for piece in raw {
        if is_trivial(&piece) {
            if let Some(last) = sentences.last_mut() {
                last.text.push_str(piece.trim_end());
            }
            continue;
        }
        let is_dialogue = piece.chars().any(is_quote);
        sentences.push(SentencePiece {
            text: piece,
            is_dialogue,
        });
    }

    sentences
}

fn flush(out: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
    current.clear();
}

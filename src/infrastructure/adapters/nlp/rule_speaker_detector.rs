//! Rule Speaker Detector - 规则版说话人检测器
//!
//! 生产部署通过外部 NLP 模型实现 SpeakerDetectorPort；
//! 本实现覆盖常见的中文对话标注形式，供开发与测试使用：
//! - 「张三说：「……」」 / 「张三道："……"」
//! - 引语后缀 「"……"张三说。」
//! 无法判定时返回 speaker = None（旁白）。

use async_trait::async_trait;

use crate::application::ports::{
    AliasCandidate, DetectorError, SpeakerDetectorPort, SpeechAnalysis,
};

/// 说话动词（名字紧邻其前/后）
const SPEECH_VERBS: &[&str] = &["说道", "说", "道", "问道", "问", "答道", "喊道", "叫道"];

const OPENING_QUOTES: &[char] = &['\u{201C}', '\u{300C}', '\u{300E}', '"'];

/// 规则版说话人检测器
#[derive(Debug, Default)]
pub struct RuleSpeakerDetector;

impl RuleSpeakerDetector {
    pub fn new() -> Self {
        Self
    }

    /// 从 "<名字><说话动词>" 前缀提取名字
    fn extract_prefix_speaker(text: &str) -> Option<String> {
        // 引语前的叙述部分（到第一个开引号为止）
        let narration: &str = match text.find(|c| OPENING_QUOTES.contains(&c)) {
            Some(pos) => &text[..pos],
            None => return None,
        };
        let narration = narration.trim_end_matches(['：', ':', '，', ',']).trim();

        for verb in SPEECH_VERBS {
            if let Some(name) = narration.strip_suffix(verb) {
                let name = name.trim();
                if is_plausible_name(name) {
                    return Some(name.to_string());
                }
            }
        }
        None
    }

    /// 从 "……"<名字><说话动词> 后缀提取名字
    fn extract_suffix_speaker(text: &str) -> Option<String> {
        let closing = text.rfind(['\u{201D}', '\u{300D}', '\u{300F}'])?;
        let trailing = text[closing..]
            .trim_start_matches(['\u{201D}', '\u{300D}', '\u{300F}'])
            .trim_end_matches(['。', '.', '！', '!'])
            .trim();
        if trailing.is_empty() {
            return None;
        }

        for verb in SPEECH_VERBS {
            if let Some(name) = trailing.strip_suffix(verb) {
                let name = name.trim();
                if is_plausible_name(name) {
                    return Some(name.to_string());
                }
            }
        }
        None
    }
}

/// 名字合理性：1~8 个字符，不含标点
fn is_plausible_name(name: &str) -> bool {
    let count = name.chars().count();
    (1..=8).contains(&count) && name.chars().all(|c| c.is_alphanumeric())
}

#[async_trait]
impl SpeakerDetectorPort for RuleSpeakerDetector {
    async fn analyze(&self, text: &str) -> Result<SpeechAnalysis, DetectorError> {
        let speaker =
            Self::extract_prefix_speaker(text).or_else(|| Self::extract_suffix_speaker(text));

        let is_dialogue = text.trim_start().starts_with(|c| OPENING_QUOTES.contains(&c))
            || speaker.is_some();

        let aliases = speaker
            .as_ref()
            .map(|name| {
                vec![AliasCandidate {
                    alias: name.clone(),
                    confidence: 0.6,
                }]
            })
            .unwrap_or_default();

        Ok(SpeechAnalysis {
            speaker,
            aliases,
            tone: None,
            strength: None,
            pause_after_ms: if is_dialogue { Some(300) } else { None },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_prefix_pattern() {
        let detector = RuleSpeakerDetector::new();
        let analysis = detector
            .analyze("张三说：\u{201C}今天天气不错。\u{201D}")
            .await
            .unwrap();
        assert_eq!(analysis.speaker.as_deref(), Some("张三"));
        assert_eq!(analysis.aliases.len(), 1);
    }

    #[tokio::test]
    async fn test_suffix_pattern() {
        let detector = RuleSpeakerDetector::new();
        let analysis = detector
            .analyze("\u{201C}我们走吧。\u{201D}李四道。")
            .await
            .unwrap();
        assert_eq!(analysis.speaker.as_deref(), Some("李四"));
    }

    #[tokio::test]
    async fn test_narration_returns_none() {
        let detector = RuleSpeakerDetector::new();
        let analysis = detector.analyze("夜色渐深，雨声不断。").await.unwrap();
        assert!(analysis.speaker.is_none());
        assert!(analysis.aliases.is_empty());
    }

    #[tokio::test]
    async fn test_quote_without_attribution() {
        let detector = RuleSpeakerDetector::new();
        let analysis = detector
            .analyze("\u{201C}谁在那里？\u{201D}")
            .await
            .unwrap();
        assert!(analysis.speaker.is_none());
        // 引语仍给出句后停顿提示
        assert_eq!(analysis.pause_after_ms, Some(300));
    }

    #[tokio::test]
    async fn test_implausible_name_rejected() {
        let detector = RuleSpeakerDetector::new();
        let analysis = detector
            .analyze("站在远处山坡上的那个神秘陌生人影说：\u{201C}你好。\u{201D}")
            .await
            .unwrap();
        assert!(analysis.speaker.is_none());
    }
}

//! NLP Adapters - 说话人检测适配器

mod rule_speaker_detector;

pub use rule_speaker_detector::RuleSpeakerDetector;

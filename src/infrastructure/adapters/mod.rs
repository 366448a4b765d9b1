//! Adapters - 外部服务适配器

pub mod nlp;
pub mod tts;

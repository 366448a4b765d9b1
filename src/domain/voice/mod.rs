//! Voice Context - 音色限界上下文
//!
//! 职责:
//! - 音色档案聚合（跨书共享）
//! - 合成参数与情感叠加合并
//! - 无绑定时的兜底音色选择

mod aggregate;
mod errors;
mod selection;
mod value_objects;

pub use aggregate::TtsVoiceProfile;
pub use errors::VoiceError;
pub use selection::{HeuristicVoiceSelector, VoiceCandidate, VoicePreference, VoiceSelector};
pub use value_objects::{
    AgeRange, EmotionOverlayMap, ParamOverlay, SynthesisParams, VoiceCharacteristics, VoiceGender,
};

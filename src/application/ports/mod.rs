//! Application Ports - 端口定义
//!
//! - repositories: 持久化出站端口
//! - speaker_detector: 外部说话人/情感检测器
//! - tts_engine: 外部 TTS 合成引擎

mod merge_lock;
mod repositories;
mod speaker_detector;
mod tts_engine;

pub use merge_lock::MergeLockPort;
pub use repositories::{
    AliasRecord, AliasUpsertOutcome, AudioFileRecord, AudioFileRepositoryPort, AudioStatus,
    AudioStatusCounts, BindingRecord, BookRecord, BookRepositoryPort, BookStatus, CharacterRecord,
    CharacterRepositoryPort, CompletedAudio, MergeAuditRecord, MergeOutcome, MergeRequest,
    RepositoryError, SegmentStatus, SentenceRecord, SentenceRepositoryPort, TaskRecord,
    TaskRepositoryPort, TaskStatus, TaskType, TextSegmentRecord, VoiceRecord, VoiceRepositoryPort,
};
pub use speaker_detector::{AliasCandidate, DetectorError, SpeakerDetectorPort, SpeechAnalysis};
pub use tts_engine::{SynthesisOutput, SynthesisRequest, TtsEnginePort, TtsError};

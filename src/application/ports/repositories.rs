//! Repository Ports - 出站端口
//!
//! 定义数据持久化的抽象接口
//! 具体实现在 infrastructure 层（SQLite）
//!
//! 并发约定：认领（claim）、状态迁移、默认绑定提升等均由实现方
//! 以存储层的条件更新/事务保证原子性，端口不依赖任何进程内锁。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::character::{GenderHint, MergeEdge};
use crate::domain::text_segmenter::SegmentKind;
use crate::domain::voice::{
    EmotionOverlayMap, ParamOverlay, SynthesisParams, VoiceCharacteristics,
};

/// Repository 错误
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Duplicate entity: {0}")]
    Duplicate(String),

    /// 条件更新未命中（认领竞争失败、非法状态迁移等）
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

// ============================================================================
// Book Repository
// ============================================================================

/// 书籍处理状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookStatus {
    /// 分段处理中
    Processing,
    /// 已就绪
    Ready,
    /// 处理失败
    Failed,
}

impl BookStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookStatus::Processing => "processing",
            BookStatus::Ready => "ready",
            BookStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "processing" => Some(BookStatus::Processing),
            "ready" => Some(BookStatus::Ready),
            "failed" => Some(BookStatus::Failed),
            _ => None,
        }
    }
}

impl Default for BookStatus {
    fn default() -> Self {
        BookStatus::Ready
    }
}

/// 书籍实体（用于持久化）
#[derive(Debug, Clone)]
pub struct BookRecord {
    pub id: Uuid,
    pub title: String,
    pub total_segments: usize,
    pub status: BookStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 片段归属状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentStatus {
    /// 尚未做句子归属
    Pending,
    /// 已完成句子归属
    Attributed,
}

impl SegmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentStatus::Pending => "pending",
            SegmentStatus::Attributed => "attributed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(SegmentStatus::Pending),
            "attributed" => Some(SegmentStatus::Attributed),
            _ => None,
        }
    }
}

/// 文本片段实体
///
/// `[start_position, end_position)` 为原文字节区间，
/// 同一本书内各片段区间连续覆盖全文。
#[derive(Debug, Clone)]
pub struct TextSegmentRecord {
    pub id: Uuid,
    pub book_id: Uuid,
    pub segment_index: usize,
    pub start_position: usize,
    pub end_position: usize,
    pub content: String,
    pub word_count: usize,
    pub kind: SegmentKind,
    pub status: SegmentStatus,
}

/// Book Repository Port
#[async_trait]
pub trait BookRepositoryPort: Send + Sync {
    /// 保存书籍
    async fn save(&self, book: &BookRecord) -> Result<(), RepositoryError>;

    /// 根据 ID 查找书籍
    async fn find_by_id(&self, id: Uuid) -> Result<Option<BookRecord>, RepositoryError>;

    /// 获取所有书籍
    async fn find_all(&self) -> Result<Vec<BookRecord>, RepositoryError>;

    /// 删除书籍（级联删除其下所有实体）
    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError>;

    /// 更新书籍状态
    async fn update_status(
        &self,
        id: Uuid,
        status: BookStatus,
        total_segments: usize,
    ) -> Result<(), RepositoryError>;

    /// 整体替换书籍片段（单事务删除旧片段并插入新片段）
    async fn replace_segments(
        &self,
        book_id: Uuid,
        segments: &[TextSegmentRecord],
    ) -> Result<(), RepositoryError>;

    /// 获取书籍的所有片段（按 segment_index 升序）
    async fn find_segments_by_book(
        &self,
        book_id: Uuid,
    ) -> Result<Vec<TextSegmentRecord>, RepositoryError>;

    /// 获取指定片段
    async fn find_segment(
        &self,
        segment_id: Uuid,
    ) -> Result<Option<TextSegmentRecord>, RepositoryError>;

    /// 更新片段归属状态
    async fn update_segment_status(
        &self,
        segment_id: Uuid,
        status: SegmentStatus,
    ) -> Result<(), RepositoryError>;
}

// ============================================================================
// Script Sentence Repository
// ============================================================================

/// 台本句子实体
///
/// `character_id` 为 None 表示未归属/旁白，下游需回落到旁白音色。
#[derive(Debug, Clone)]
pub struct SentenceRecord {
    pub id: Uuid,
    pub book_id: Uuid,
    pub segment_id: Uuid,
    pub order_in_segment: usize,
    pub text: String,
    /// 外部检测器给出的原始说话人标签
    pub raw_speaker: Option<String>,
    pub character_id: Option<Uuid>,
    /// 情感标签（用于情感叠加查表）
    pub tone: Option<String>,
    /// 情感强度（0.0 ~ 1.0）
    pub strength: Option<f32>,
    /// 句后停顿（毫秒）
    pub pause_after_ms: Option<u32>,
    /// 句级合成参数覆盖（最后一层叠加）
    pub tts_overrides: Option<ParamOverlay>,
    pub created_at: DateTime<Utc>,
}

/// Script Sentence Repository Port
#[async_trait]
pub trait SentenceRepositoryPort: Send + Sync {
    /// 批量保存句子
    async fn save_batch(&self, sentences: &[SentenceRecord]) -> Result<(), RepositoryError>;

    /// 根据 ID 查找句子
    async fn find_by_id(&self, id: Uuid) -> Result<Option<SentenceRecord>, RepositoryError>;

    /// 获取片段的所有句子（按 order_in_segment 升序）
    async fn find_by_segment(
        &self,
        segment_id: Uuid,
    ) -> Result<Vec<SentenceRecord>, RepositoryError>;

    /// 获取书籍的所有句子（按片段序、句序升序）
    async fn find_by_book(&self, book_id: Uuid) -> Result<Vec<SentenceRecord>, RepositoryError>;

    /// 删除片段的所有句子（重新归属前调用）
    async fn delete_by_segment(&self, segment_id: Uuid) -> Result<usize, RepositoryError>;
}

// ============================================================================
// Character Repository
// ============================================================================

/// 角色档案实体（用于持久化）
#[derive(Debug, Clone)]
pub struct CharacterRecord {
    pub id: Uuid,
    pub book_id: Uuid,
    pub canonical_name: String,
    pub characteristics: Value,
    pub voice_preferences: Value,
    pub emotion_profile: Value,
    pub gender_hint: GenderHint,
    pub age_hint: Option<u32>,
    pub is_active: bool,
    pub mentions: u64,
    pub quotes: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 角色别名实体
#[derive(Debug, Clone)]
pub struct AliasRecord {
    pub id: Uuid,
    pub character_id: Uuid,
    pub alias: String,
    pub confidence: f64,
    pub source_sentence: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// 别名写入结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasUpsertOutcome {
    /// 新别名
    Inserted,
    /// 置信度/时效策略判定替换既有记录
    Refreshed,
    /// 既有记录更优，保持不变
    Kept,
}

/// 合并审计实体（只追加）
#[derive(Debug, Clone)]
pub struct MergeAuditRecord {
    pub id: Uuid,
    pub book_id: Uuid,
    pub source_id: Uuid,
    pub target_id: Uuid,
    pub reason: String,
    pub actor: String,
    pub created_at: DateTime<Utc>,
}

/// 合并请求
#[derive(Debug, Clone)]
pub struct MergeRequest {
    pub book_id: Uuid,
    pub source_id: Uuid,
    pub target_id: Uuid,
    pub reason: String,
    pub actor: String,
}

/// 合并结果
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub audit_id: Uuid,
    /// 实际吸收方（target 规范化到活跃根之后）
    pub target_id: Uuid,
    pub moved_aliases: usize,
    pub moved_sentences: usize,
    pub moved_bindings: usize,
}

/// Character Repository Port
#[async_trait]
pub trait CharacterRepositoryPort: Send + Sync {
    /// 保存角色
    async fn save(&self, character: &CharacterRecord) -> Result<(), RepositoryError>;

    /// 根据 ID 查找角色
    async fn find_by_id(&self, id: Uuid) -> Result<Option<CharacterRecord>, RepositoryError>;

    /// 获取书籍的所有活跃角色
    async fn find_active_by_book(
        &self,
        book_id: Uuid,
    ) -> Result<Vec<CharacterRecord>, RepositoryError>;

    /// 按规范名或别名查找活跃角色
    async fn find_active_by_name_or_alias(
        &self,
        book_id: Uuid,
        name: &str,
    ) -> Result<Option<CharacterRecord>, RepositoryError>;

    /// 插入或按置信度/时效策略刷新别名
    async fn upsert_alias(&self, alias: &AliasRecord)
        -> Result<AliasUpsertOutcome, RepositoryError>;

    /// 获取角色的所有别名
    async fn find_aliases(&self, character_id: Uuid) -> Result<Vec<AliasRecord>, RepositoryError>;

    /// 获取书籍的合并边（供根查找）
    async fn find_merge_edges(&self, book_id: Uuid) -> Result<Vec<MergeEdge>, RepositoryError>;

    /// 获取书籍的全部合并审计记录
    async fn find_merge_audits(
        &self,
        book_id: Uuid,
    ) -> Result<Vec<MergeAuditRecord>, RepositoryError>;

    /// 将任意（可能已被合并的）角色 ID 规范化到当前活跃根
    async fn find_active_root(&self, id: Uuid) -> Result<CharacterRecord, RepositoryError>;

    /// 原子合并：重挂别名/句子/非冲突音色绑定，停用 source，
    /// 追加恰好一条审计记录（全部在单事务内完成）
    async fn merge(&self, request: &MergeRequest) -> Result<MergeOutcome, RepositoryError>;

    /// 累加提及/引语计数
    async fn bump_counters(
        &self,
        character_id: Uuid,
        mentions_delta: u64,
        quotes_delta: u64,
    ) -> Result<(), RepositoryError>;
}

// ============================================================================
// Voice Repository
// ============================================================================

/// 音色实体（用于持久化，跨书共享）
#[derive(Debug, Clone)]
pub struct VoiceRecord {
    pub id: Uuid,
    pub provider: String,
    pub provider_voice_id: String,
    pub name: String,
    pub characteristics: VoiceCharacteristics,
    pub default_params: SynthesisParams,
    pub preview_path: Option<String>,
    pub usage_count: u64,
    pub rating: f32,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
}

/// 角色-音色绑定实体
///
/// 不变量: (character_id, voice_id) 唯一；
/// 任一时刻每个角色至多一条 is_default = true 的绑定。
#[derive(Debug, Clone)]
pub struct BindingRecord {
    pub id: Uuid,
    pub character_id: Uuid,
    pub voice_id: Uuid,
    /// 绑定级自定义叠加（优先级最高的一层）
    pub custom_params: ParamOverlay,
    /// 情感 → 参数叠加映射
    pub emotion_overlays: EmotionOverlayMap,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Voice Repository Port
#[async_trait]
pub trait VoiceRepositoryPort: Send + Sync {
    /// 保存音色
    async fn save(&self, voice: &VoiceRecord) -> Result<(), RepositoryError>;

    /// 根据 ID 查找音色
    async fn find_by_id(&self, id: Uuid) -> Result<Option<VoiceRecord>, RepositoryError>;

    /// 获取所有可用音色
    async fn find_available(&self) -> Result<Vec<VoiceRecord>, RepositoryError>;

    /// 合成完成后累加使用计数
    async fn increment_usage(&self, voice_id: Uuid) -> Result<(), RepositoryError>;

    /// 创建或更新绑定；`is_default = true` 时在同一事务内降级旧默认
    async fn bind(&self, binding: &BindingRecord) -> Result<(), RepositoryError>;

    /// 查找指定绑定
    async fn find_binding(
        &self,
        character_id: Uuid,
        voice_id: Uuid,
    ) -> Result<Option<BindingRecord>, RepositoryError>;

    /// 获取角色的所有绑定
    async fn find_bindings_by_character(
        &self,
        character_id: Uuid,
    ) -> Result<Vec<BindingRecord>, RepositoryError>;

    /// 获取角色的默认绑定
    async fn find_default_binding(
        &self,
        character_id: Uuid,
    ) -> Result<Option<BindingRecord>, RepositoryError>;
}

// ============================================================================
// Audio File Repository
// ============================================================================

/// 音频文件状态
///
/// 合法迁移: pending→processing, processing→completed,
/// processing→failed, failed→pending（重提交）。其余一律拒绝。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl AudioStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioStatus::Pending => "pending",
            AudioStatus::Processing => "processing",
            AudioStatus::Completed => "completed",
            AudioStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(AudioStatus::Pending),
            "processing" => Some(AudioStatus::Processing),
            "completed" => Some(AudioStatus::Completed),
            "failed" => Some(AudioStatus::Failed),
            _ => None,
        }
    }
}

/// 音频文件实体 - 一次合成单元的产物记录
#[derive(Debug, Clone)]
pub struct AudioFileRecord {
    pub id: Uuid,
    pub book_id: Uuid,
    /// 句子粒度（主要）
    pub sentence_id: Option<Uuid>,
    /// 片段粒度（可选）
    pub segment_id: Option<Uuid>,
    /// blob 存储内的不透明引用
    pub file_path: Option<String>,
    pub duration_ms: Option<u64>,
    pub file_size: Option<u64>,
    pub format: Option<String>,
    pub status: AudioStatus,
    pub error_message: Option<String>,
    /// 只增不减
    pub retry_count: u32,
    pub provider: Option<String>,
    /// 合成时实际使用的音色（独立于角色当前绑定，保证审计准确）
    pub voice_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AudioFileRecord {
    /// 为句子创建待合成记录
    pub fn pending_for_sentence(book_id: Uuid, sentence_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            book_id,
            sentence_id: Some(sentence_id),
            segment_id: None,
            file_path: None,
            duration_ms: None,
            file_size: None,
            format: None,
            status: AudioStatus::Pending,
            error_message: None,
            retry_count: 0,
            provider: None,
            voice_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// 合成成功的产物信息
#[derive(Debug, Clone)]
pub struct CompletedAudio {
    pub file_path: String,
    pub duration_ms: u64,
    pub file_size: u64,
    pub format: String,
    pub provider: String,
    pub voice_id: Uuid,
}

/// 按状态统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AudioStatusCounts {
    pub pending: u64,
    pub processing: u64,
    pub completed: u64,
    pub failed: u64,
}

/// Audio File Repository Port
///
/// 待合成的记录同时充当分布式工作队列：认领是存储层的
/// 条件状态迁移，跨进程 worker 不会重复处理同一单元。
#[async_trait]
pub trait AudioFileRepositoryPort: Send + Sync {
    /// 批量创建记录
    async fn save_batch(&self, files: &[AudioFileRecord]) -> Result<(), RepositoryError>;

    /// 根据 ID 查找
    async fn find_by_id(&self, id: Uuid) -> Result<Option<AudioFileRecord>, RepositoryError>;

    /// 获取书籍的所有音频记录
    async fn find_by_book(&self, book_id: Uuid)
        -> Result<Vec<AudioFileRecord>, RepositoryError>;

    /// 获取句子的音频记录
    async fn find_by_sentence(
        &self,
        sentence_id: Uuid,
    ) -> Result<Vec<AudioFileRecord>, RepositoryError>;

    /// 原子认领书内下一个 pending 单元（pending→processing）；
    /// 无可认领单元时返回 None
    async fn claim_next_pending(
        &self,
        book_id: Uuid,
    ) -> Result<Option<AudioFileRecord>, RepositoryError>;

    /// 原子认领指定单元；竞争失败返回 false
    async fn claim(&self, id: Uuid) -> Result<bool, RepositoryError>;

    /// processing→completed，记录产物与实际使用的音色
    async fn complete(&self, id: Uuid, outcome: &CompletedAudio) -> Result<(), RepositoryError>;

    /// processing→failed，记录错误信息
    async fn fail(&self, id: Uuid, error: &str) -> Result<(), RepositoryError>;

    /// failed→pending，retry_count + 1
    async fn resubmit(&self, id: Uuid) -> Result<(), RepositoryError>;

    /// 获取书籍的失败单元
    async fn find_failed_by_book(
        &self,
        book_id: Uuid,
    ) -> Result<Vec<AudioFileRecord>, RepositoryError>;

    /// 按状态统计书籍的音频单元
    async fn count_by_status(&self, book_id: Uuid)
        -> Result<AudioStatusCounts, RepositoryError>;
}

// ============================================================================
// Processing Task Repository
// ============================================================================

/// 任务类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskType {
    /// 文本分段
    Segmentation,
    /// 句子归属
    Attribution,
    /// 音频合成
    Synthesis,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Segmentation => "segmentation",
            TaskType::Attribution => "attribution",
            TaskType::Synthesis => "synthesis",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "segmentation" => Some(TaskType::Segmentation),
            "attribution" => Some(TaskType::Attribution),
            "synthesis" => Some(TaskType::Synthesis),
            _ => None,
        }
    }
}

/// 任务状态机: queued → running → {completed, failed, cancelled}
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Queued => "queued",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(TaskStatus::Queued),
            "running" => Some(TaskStatus::Running),
            "completed" => Some(TaskStatus::Completed),
            "failed" => Some(TaskStatus::Failed),
            "cancelled" => Some(TaskStatus::Cancelled),
            _ => None,
        }
    }

    /// 是否终态
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }
}

/// 处理任务实体 - 每本书的异步作业
///
/// 不变量:
/// - running 期间 processed_items 单调不减
/// - processed_items 永不超过 total_items
/// - processed_items == total_items 时强制进入 completed
#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub id: Uuid,
    pub book_id: Uuid,
    pub task_type: TaskType,
    pub status: TaskStatus,
    pub total_items: u32,
    /// 成功完成的子单元数
    pub processed_items: u32,
    /// 最终失败（不再重试）的子单元数
    pub failed_items: u32,
    /// 不透明负载（浅合并更新）
    pub task_data: Value,
    /// 外部执行方的关联 ID（轮询/回调对账用）
    pub external_task_id: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TaskRecord {
    /// 创建 queued 状态的新任务
    pub fn queued(book_id: Uuid, task_type: TaskType, total_items: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            book_id,
            task_type,
            status: TaskStatus::Queued,
            total_items,
            processed_items: 0,
            failed_items: 0,
            task_data: Value::Object(Default::default()),
            external_task_id: None,
            error_message: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }
}

/// Processing Task Repository Port
#[async_trait]
pub trait TaskRepositoryPort: Send + Sync {
    /// 创建任务
    async fn create(&self, task: &TaskRecord) -> Result<(), RepositoryError>;

    /// 根据 ID 查找任务
    async fn find_by_id(&self, id: Uuid) -> Result<Option<TaskRecord>, RepositoryError>;

    /// 获取书籍的所有任务
    async fn find_by_book(&self, book_id: Uuid) -> Result<Vec<TaskRecord>, RepositoryError>;

    /// 按外部关联 ID 查找任务
    async fn find_by_external_id(
        &self,
        external_task_id: &str,
    ) -> Result<Option<TaskRecord>, RepositoryError>;

    /// 设置外部关联 ID
    async fn set_external_id(
        &self,
        id: Uuid,
        external_task_id: &str,
    ) -> Result<(), RepositoryError>;

    /// queued → running，设置 started_at
    async fn start(&self, id: Uuid) -> Result<(), RepositoryError>;

    /// 累加进度（succeeded 计入 processed_items，failed 计入 failed_items）；
    /// 仅 running 状态可更新；processed_items 超过 total_items 的更新被拒绝；
    /// processed_items 达到 total_items 时自动转入 completed 并设置 completed_at。
    /// 返回更新后的任务。
    async fn record_progress(
        &self,
        id: Uuid,
        succeeded: u32,
        failed: u32,
    ) -> Result<TaskRecord, RepositoryError>;

    /// 浅合并 task_data 负载
    async fn merge_task_data(&self, id: Uuid, updates: &Value) -> Result<(), RepositoryError>;

    /// {queued, running} → failed，记录错误信息
    async fn fail(&self, id: Uuid, error: &str) -> Result<(), RepositoryError>;

    /// {queued, running} → cancelled（协作式：不中断在途单元）
    async fn cancel(&self, id: Uuid) -> Result<(), RepositoryError>;
}

//! Synthesis Worker - 后台音频合成处理器
//!
//! 从队列消费合成任务（每本书一个任务 ID），任务内循环认领
//! pending 音频单元并按 max_concurrent 并发合成。
//!
//! 协作式取消：每次认领前重读任务状态，终态即停止认领，
//! 在途单元跑完为止。瞬时 TTS 失败在 max_retries 内重新入队，
//! 超限或致命失败计入 failed_items。

use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use uuid::Uuid;

use crate::application::ports::{
    AudioFileRecord, AudioFileRepositoryPort, CompletedAudio, RepositoryError, SentenceRecord,
    SentenceRepositoryPort, SynthesisRequest, TaskRepositoryPort, TaskStatus, TtsEnginePort,
    VoiceRepositoryPort,
};
use crate::application::queries::handlers::ResolveCharacterVoiceHandler;
use crate::application::queries::ResolveCharacterVoice;
use crate::config::SynthesisConfig;

/// 认领循环的退出原因
enum ClaimExit {
    /// 队列暂时排空（重新入队的单元可能随后出现）
    Drained,
    /// 任务终态或存储层错误
    Stop,
}

/// Worker 依赖集合（任务/单元间共享）
#[derive(Clone)]
pub struct WorkerContext {
    pub task_repo: Arc<dyn TaskRepositoryPort>,
    pub audio_repo: Arc<dyn AudioFileRepositoryPort>,
    pub sentence_repo: Arc<dyn SentenceRepositoryPort>,
    pub voice_repo: Arc<dyn VoiceRepositoryPort>,
    pub voice_resolver: Arc<ResolveCharacterVoiceHandler>,
    pub tts_engine: Arc<dyn TtsEnginePort>,
    /// 瞬时失败的最大重试次数
    pub max_retries: u32,
}

/// 合成 Worker
///
/// 任务按入队顺序逐个处理，任务内按 max_concurrent 并发合成单元
pub struct SynthesisWorker {
    config: SynthesisConfig,
    queue_receiver: mpsc::Receiver<Uuid>,
    ctx: WorkerContext,
}

impl SynthesisWorker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: SynthesisConfig,
        queue_receiver: mpsc::Receiver<Uuid>,
        task_repo: Arc<dyn TaskRepositoryPort>,
        audio_repo: Arc<dyn AudioFileRepositoryPort>,
        sentence_repo: Arc<dyn SentenceRepositoryPort>,
        voice_repo: Arc<dyn VoiceRepositoryPort>,
        voice_resolver: Arc<ResolveCharacterVoiceHandler>,
        tts_engine: Arc<dyn TtsEnginePort>,
    ) -> Self {
        let max_retries = config.max_retries;
        Self {
            config,
            queue_receiver,
            ctx: WorkerContext {
                task_repo,
                audio_repo,
                sentence_repo,
                voice_repo,
                voice_resolver,
                tts_engine,
                max_retries,
            },
        }
    }

    /// 启动 Worker
    pub async fn run(mut self) {
        tracing::info!(
            max_concurrent = self.config.max_concurrent,
            max_retries = self.config.max_retries,
            "SynthesisWorker started"
        );

        while let Some(task_id) = self.queue_receiver.recv().await {
            Self::process_task(self.ctx.clone(), self.config.max_concurrent, task_id).await;
        }

        tracing::info!("SynthesisWorker stopped");
    }

    /// 处理单个合成任务（一本书的全部待合成单元）
    pub async fn process_task(ctx: WorkerContext, max_concurrent: usize, task_id: Uuid) {
        let task = match ctx.task_repo.find_by_id(task_id).await {
            Ok(Some(t)) => t,
            Ok(None) => {
                tracing::warn!(task_id = %task_id, "Task not found, skipping");
                return;
            }
            Err(e) => {
                tracing::error!(task_id = %task_id, error = %e, "Failed to load task");
                return;
            }
        };

        match task.status {
            TaskStatus::Queued => {
                // 入队后被取消时 start 返回 Conflict
                if let Err(e) = ctx.task_repo.start(task_id).await {
                    tracing::debug!(task_id = %task_id, error = %e, "Task not startable, skipping");
                    return;
                }
            }
            // running: 进程重启后的续跑
            TaskStatus::Running => {}
            _ => {
                tracing::debug!(
                    task_id = %task_id,
                    status = task.status.as_str(),
                    "Task already terminal, skipping"
                );
                return;
            }
        }

        tracing::info!(
            task_id = %task_id,
            book_id = %task.book_id,
            total_items = task.total_items,
            "Synthesis task started"
        );

        let semaphore = Arc::new(Semaphore::new(max_concurrent));
        let mut jobs = tokio::task::JoinSet::new();

        loop {
            let exit = Self::claim_loop(&ctx, &semaphore, &mut jobs, task_id, task.book_id).await;
            while jobs.join_next().await.is_some() {}
            if matches!(exit, ClaimExit::Stop) {
                break;
            }

            // 瞬时失败重新入队的单元可能在队列看似排空后回到 pending
            match ctx.audio_repo.count_by_status(task.book_id).await {
                Ok(counts) if counts.pending > 0 => continue,
                _ => break,
            }
        }

        Self::finalize_task(&ctx, task_id).await;
    }

    /// 循环认领 pending 单元直到队列排空或任务进入终态
    async fn claim_loop(
        ctx: &WorkerContext,
        semaphore: &Arc<Semaphore>,
        jobs: &mut tokio::task::JoinSet<()>,
        task_id: Uuid,
        book_id: Uuid,
    ) -> ClaimExit {
        loop {
            // 认领前重读任务状态，取消后不再认领新单元
            match ctx.task_repo.find_by_id(task_id).await {
                Ok(Some(t)) if !t.status.is_terminal() => {}
                Ok(_) => return ClaimExit::Stop,
                Err(e) => {
                    tracing::error!(task_id = %task_id, error = %e, "Failed to reload task");
                    return ClaimExit::Stop;
                }
            }

            let permit = match semaphore.clone().acquire_owned().await {
                Ok(p) => p,
                Err(_) => return ClaimExit::Stop,
            };

            let unit = match ctx.audio_repo.claim_next_pending(book_id).await {
                Ok(Some(unit)) => unit,
                Ok(None) => return ClaimExit::Drained,
                Err(e) => {
                    tracing::error!(task_id = %task_id, error = %e, "Failed to claim unit");
                    return ClaimExit::Stop;
                }
            };

            let ctx = ctx.clone();
            jobs.spawn(async move {
                let _permit = permit;
                Self::process_unit(ctx, task_id, unit).await;
            });
        }
    }

    /// 队列排空后收尾：有最终失败单元的任务转 failed；
    /// 其余在途单元被其他 worker 完成时按书内余量对账。
    async fn finalize_task(ctx: &WorkerContext, task_id: Uuid) {
        let task = match ctx.task_repo.find_by_id(task_id).await {
            Ok(Some(t)) => t,
            Ok(None) => return,
            Err(e) => {
                tracing::error!(task_id = %task_id, error = %e, "Failed to reload task");
                return;
            }
        };

        if task.status != TaskStatus::Running {
            tracing::info!(
                task_id = %task_id,
                status = task.status.as_str(),
                processed_items = task.processed_items,
                failed_items = task.failed_items,
                "Synthesis task finished"
            );
            return;
        }

        if task.failed_items > 0 {
            let error = format!("{} synthesis units failed", task.failed_items);
            if let Err(e) = ctx.task_repo.fail(task_id, &error).await {
                tracing::warn!(task_id = %task_id, error = %e, "Failed to mark task failed");
            }
            tracing::warn!(
                task_id = %task_id,
                processed_items = task.processed_items,
                failed_items = task.failed_items,
                "Synthesis task failed"
            );
            return;
        }

        if task.processed_items < task.total_items {
            // 建任务时计入总数、但由其他 worker 持有的在途单元：
            // 书内已无 pending/processing 时按余量补记进度
            match ctx.audio_repo.count_by_status(task.book_id).await {
                Ok(counts) if counts.pending == 0 && counts.processing == 0 => {
                    let remaining = task.total_items - task.processed_items;
                    if let Err(e) = ctx.task_repo.record_progress(task_id, remaining, 0).await {
                        tracing::debug!(task_id = %task_id, error = %e, "Reconcile skipped");
                    }
                }
                Ok(_) => {
                    tracing::debug!(task_id = %task_id, "Units still in flight elsewhere");
                }
                Err(e) => {
                    tracing::error!(task_id = %task_id, error = %e, "Failed to count audio units");
                }
            }
        }
    }

    /// 处理单个音频单元
    async fn process_unit(ctx: WorkerContext, task_id: Uuid, unit: AudioFileRecord) {
        let unit_id = unit.id;

        let sentence = match Self::load_sentence(&ctx, &unit).await {
            Ok(s) => s,
            Err(error) => {
                Self::mark_unit_failed(&ctx, task_id, unit_id, &error).await;
                return;
            }
        };

        // 归属句子走角色绑定解析，旁白句子走兜底音色
        let resolved = match sentence.character_id {
            Some(character_id) => {
                ctx.voice_resolver
                    .handle(ResolveCharacterVoice {
                        character_id,
                        emotion: sentence.tone.clone(),
                    })
                    .await
            }
            None => ctx.voice_resolver.resolve_narrator().await,
        };
        let resolved = match resolved {
            Ok(r) => r,
            Err(e) => {
                Self::mark_unit_failed(&ctx, task_id, unit_id, &format!("voice resolution: {}", e))
                    .await;
                return;
            }
        };

        // 句级覆盖是最后一层叠加
        let mut params = resolved.params.clone();
        if let Some(overrides) = &sentence.tts_overrides {
            params = params.apply(overrides);
        }

        let request = SynthesisRequest {
            text: sentence.text.clone(),
            provider_voice_id: resolved.voice.provider_voice_id.clone(),
            params,
        };

        match ctx.tts_engine.synthesize(request).await {
            Ok(output) => {
                let completed = CompletedAudio {
                    file_path: output.audio_ref,
                    duration_ms: output.duration_ms,
                    file_size: output.file_size,
                    format: output.format,
                    provider: ctx.tts_engine.provider().to_string(),
                    voice_id: resolved.voice.id,
                };
                if let Err(e) = ctx.audio_repo.complete(unit_id, &completed).await {
                    tracing::warn!(unit_id = %unit_id, error = %e, "Failed to record completed audio");
                    return;
                }
                if let Err(e) = ctx.voice_repo.increment_usage(resolved.voice.id).await {
                    tracing::warn!(voice_id = %resolved.voice.id, error = %e, "Failed to bump voice usage");
                }
                Self::record_progress(&ctx, task_id, 1, 0).await;
                tracing::debug!(
                    unit_id = %unit_id,
                    sentence_id = %sentence.id,
                    duration_ms = completed.duration_ms,
                    "Synthesis unit completed"
                );
            }
            Err(e) if e.is_retryable() && unit.retry_count < ctx.max_retries => {
                tracing::warn!(
                    unit_id = %unit_id,
                    retry_count = unit.retry_count,
                    error = %e,
                    "Transient synthesis failure, requeueing"
                );
                if let Err(e) = ctx.audio_repo.fail(unit_id, &e.to_string()).await {
                    tracing::warn!(unit_id = %unit_id, error = %e, "Failed to mark unit failed");
                    return;
                }
                if let Err(e) = ctx.audio_repo.resubmit(unit_id).await {
                    tracing::warn!(unit_id = %unit_id, error = %e, "Failed to requeue unit");
                }
            }
            Err(e) => {
                tracing::error!(unit_id = %unit_id, error = %e, "Synthesis unit failed");
                Self::mark_unit_failed(&ctx, task_id, unit_id, &format!("TTS error: {}", e)).await;
            }
        }
    }

    async fn load_sentence(
        ctx: &WorkerContext,
        unit: &AudioFileRecord,
    ) -> Result<SentenceRecord, String> {
        let sentence_id = unit
            .sentence_id
            .ok_or_else(|| "audio unit has no sentence".to_string())?;
        match ctx.sentence_repo.find_by_id(sentence_id).await {
            Ok(Some(s)) => Ok(s),
            Ok(None) => Err(format!("sentence not found: {}", sentence_id)),
            Err(e) => Err(format!("failed to load sentence: {}", e)),
        }
    }

    /// 单元终止失败：processing→failed 并计入任务 failed_items
    async fn mark_unit_failed(ctx: &WorkerContext, task_id: Uuid, unit_id: Uuid, error: &str) {
        if let Err(e) = ctx.audio_repo.fail(unit_id, error).await {
            tracing::warn!(unit_id = %unit_id, error = %e, "Failed to mark unit failed");
        }
        Self::record_progress(ctx, task_id, 0, 1).await;
    }

    /// 记录进度；任务已取消时的 Conflict 静默忽略
    async fn record_progress(ctx: &WorkerContext, task_id: Uuid, succeeded: u32, failed: u32) {
        match ctx.task_repo.record_progress(task_id, succeeded, failed).await {
            Ok(_) => {}
            Err(RepositoryError::Conflict(_)) => {
                tracing::debug!(task_id = %task_id, "Progress dropped, task no longer running");
            }
            Err(e) => {
                tracing::warn!(task_id = %task_id, error = %e, "Failed to record progress");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    use crate::application::ports::{
        AudioStatus, BindingRecord, BookRecord, BookRepositoryPort, BookStatus, CharacterRecord,
        CharacterRepositoryPort, SegmentStatus, TaskRecord, TaskType, TextSegmentRecord,
        VoiceRecord,
    };
    use crate::application::queries::handlers::ResolveCharacterVoiceHandler;
    use crate::domain::character::GenderHint;
    use crate::domain::text_segmenter::SegmentKind;
    use crate::domain::voice::{
        EmotionOverlayMap, HeuristicVoiceSelector, ParamOverlay, SynthesisParams,
        VoiceCharacteristics,
    };
    use crate::infrastructure::adapters::tts::{FakeTtsClient, FakeTtsClientConfig};
    use crate::infrastructure::persistence::sqlite::{
        create_pool, run_migrations, DatabaseConfig, SqliteAudioFileRepository,
        SqliteBookRepository, SqliteCharacterRepository, SqliteSentenceRepository,
        SqliteTaskRepository, SqliteVoiceRepository,
    };

    struct Fixture {
        ctx: WorkerContext,
        book_repo: Arc<SqliteBookRepository>,
        character_repo: Arc<SqliteCharacterRepository>,
        book_id: Uuid,
        segment_id: Uuid,
    }

    async fn setup(tts: FakeTtsClient, max_retries: u32) -> Fixture {
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let book_repo = Arc::new(SqliteBookRepository::new(pool.clone()));
        let sentence_repo = Arc::new(SqliteSentenceRepository::new(pool.clone()));
        let character_repo = Arc::new(SqliteCharacterRepository::new(pool.clone()));
        let voice_repo = Arc::new(SqliteVoiceRepository::new(pool.clone()));
        let audio_repo = Arc::new(SqliteAudioFileRepository::new(pool.clone()));
        let task_repo = Arc::new(SqliteTaskRepository::new(pool.clone()));

        let voice_resolver = Arc::new(ResolveCharacterVoiceHandler::new(
            character_repo.clone(),
            voice_repo.clone(),
            Arc::new(HeuristicVoiceSelector::new()),
        ));

        let book_id = Uuid::new_v4();
        let now = Utc::now();
        book_repo
            .save(&BookRecord {
                id: book_id,
                title: "测试书".to_string(),
                total_segments: 1,
                status: BookStatus::Ready,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();

        let segment_id = Uuid::new_v4();
        book_repo
            .replace_segments(
                book_id,
                &[TextSegmentRecord {
                    id: segment_id,
                    book_id,
                    segment_index: 0,
                    start_position: 0,
                    end_position: 30,
                    content: "夜色渐深。".to_string(),
                    word_count: 5,
                    kind: SegmentKind::Paragraph,
                    status: SegmentStatus::Attributed,
                }],
            )
            .await
            .unwrap();

        Fixture {
            ctx: WorkerContext {
                task_repo,
                audio_repo,
                sentence_repo,
                voice_repo,
                voice_resolver,
                tts_engine: Arc::new(tts),
                max_retries,
            },
            book_repo,
            character_repo,
            book_id,
            segment_id,
        }
    }

    async fn seed_voice(fixture: &Fixture) -> Uuid {
        let voice = VoiceRecord {
            id: Uuid::new_v4(),
            provider: "fake".to_string(),
            provider_voice_id: "fake-v1".to_string(),
            name: "男声甲".to_string(),
            characteristics: VoiceCharacteristics::default(),
            default_params: SynthesisParams::default(),
            preview_path: None,
            usage_count: 0,
            rating: 4.0,
            is_available: true,
            created_at: Utc::now(),
        };
        fixture.ctx.voice_repo.save(&voice).await.unwrap();
        voice.id
    }

    async fn seed_character(fixture: &Fixture, name: &str) -> Uuid {
        let now = Utc::now();
        let character = CharacterRecord {
            id: Uuid::new_v4(),
            book_id: fixture.book_id,
            canonical_name: name.to_string(),
            characteristics: json!({}),
            voice_preferences: json!({}),
            emotion_profile: json!({}),
            gender_hint: GenderHint::Male,
            age_hint: None,
            is_active: true,
            mentions: 0,
            quotes: 0,
            created_at: now,
            updated_at: now,
        };
        fixture.character_repo.save(&character).await.unwrap();
        character.id
    }

    async fn seed_sentence(
        fixture: &Fixture,
        order: usize,
        text: &str,
        character_id: Option<Uuid>,
    ) -> Uuid {
        let sentence = SentenceRecord {
            id: Uuid::new_v4(),
            book_id: fixture.book_id,
            segment_id: fixture.segment_id,
            order_in_segment: order,
            text: text.to_string(),
            raw_speaker: None,
            character_id,
            tone: None,
            strength: None,
            pause_after_ms: None,
            tts_overrides: None,
            created_at: Utc::now(),
        };
        fixture
            .ctx
            .sentence_repo
            .save_batch(std::slice::from_ref(&sentence))
            .await
            .unwrap();
        sentence.id
    }

    async fn seed_pending_unit(fixture: &Fixture, sentence_id: Uuid) -> Uuid {
        let unit = AudioFileRecord::pending_for_sentence(fixture.book_id, sentence_id);
        fixture
            .ctx
            .audio_repo
            .save_batch(std::slice::from_ref(&unit))
            .await
            .unwrap();
        unit.id
    }

    async fn seed_queued_task(fixture: &Fixture, total: u32) -> Uuid {
        let task = TaskRecord::queued(fixture.book_id, TaskType::Synthesis, total);
        fixture.ctx.task_repo.create(&task).await.unwrap();
        task.id
    }

    #[tokio::test]
    async fn test_task_runs_to_completion() {
        let fixture = setup(FakeTtsClient::with_defaults(), 3).await;
        let voice_id = seed_voice(&fixture).await;

        // 归属句子绑定音色，旁白句子走兜底选择
        let character_id = seed_character(&fixture, "张三").await;
        let now = Utc::now();
        fixture
            .ctx
            .voice_repo
            .bind(&BindingRecord {
                id: Uuid::new_v4(),
                character_id,
                voice_id,
                custom_params: ParamOverlay::default(),
                emotion_overlays: EmotionOverlayMap::new(),
                is_default: true,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();

        let dialogue = seed_sentence(&fixture, 0, "今天天气不错。", Some(character_id)).await;
        let narration = seed_sentence(&fixture, 1, "夜色渐深。", None).await;
        seed_pending_unit(&fixture, dialogue).await;
        seed_pending_unit(&fixture, narration).await;
        let task_id = seed_queued_task(&fixture, 2).await;

        SynthesisWorker::process_task(fixture.ctx.clone(), 2, task_id).await;

        let task = fixture.ctx.task_repo.find_by_id(task_id).await.unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.processed_items, 2);
        assert_eq!(task.failed_items, 0);

        let counts = fixture
            .ctx
            .audio_repo
            .count_by_status(fixture.book_id)
            .await
            .unwrap();
        assert_eq!(counts.completed, 2);
        assert_eq!(counts.pending, 0);

        // 两个单元都落在同一可用音色上，使用计数 +2
        let voice = fixture.ctx.voice_repo.find_by_id(voice_id).await.unwrap().unwrap();
        assert_eq!(voice.usage_count, 2);

        // 产物记录实际使用的音色
        let files = fixture
            .ctx
            .audio_repo
            .find_by_sentence(dialogue)
            .await
            .unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].status, AudioStatus::Completed);
        assert_eq!(files[0].voice_id, Some(voice_id));
        assert_eq!(files[0].provider.as_deref(), Some("fake"));
        assert!(files[0].file_path.as_deref().unwrap().starts_with("fake://"));
    }

    #[tokio::test]
    async fn test_transient_failure_retried_until_cap() {
        let fixture = setup(
            FakeTtsClient::new(FakeTtsClientConfig {
                transient_failure_marker: Some("@@flaky@@".to_string()),
                ..Default::default()
            }),
            1,
        )
        .await;
        seed_voice(&fixture).await;

        let sentence = seed_sentence(&fixture, 0, "内容 @@flaky@@", None).await;
        let unit_id = seed_pending_unit(&fixture, sentence).await;
        let task_id = seed_queued_task(&fixture, 1).await;

        SynthesisWorker::process_task(fixture.ctx.clone(), 1, task_id).await;

        // 重试 1 次后终止失败，任务随之失败
        let unit = fixture.ctx.audio_repo.find_by_id(unit_id).await.unwrap().unwrap();
        assert_eq!(unit.status, AudioStatus::Failed);
        assert_eq!(unit.retry_count, 1);

        let task = fixture.ctx.task_repo.find_by_id(task_id).await.unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.processed_items, 0);
        assert_eq!(task.failed_items, 1);
    }

    #[tokio::test]
    async fn test_fatal_failure_no_retry() {
        let fixture = setup(
            FakeTtsClient::new(FakeTtsClientConfig {
                fatal_failure_marker: Some("@@fatal@@".to_string()),
                ..Default::default()
            }),
            3,
        )
        .await;
        seed_voice(&fixture).await;

        let sentence = seed_sentence(&fixture, 0, "内容 @@fatal@@", None).await;
        let unit_id = seed_pending_unit(&fixture, sentence).await;
        let task_id = seed_queued_task(&fixture, 1).await;

        SynthesisWorker::process_task(fixture.ctx.clone(), 1, task_id).await;

        // 致命失败不重试
        let unit = fixture.ctx.audio_repo.find_by_id(unit_id).await.unwrap().unwrap();
        assert_eq!(unit.status, AudioStatus::Failed);
        assert_eq!(unit.retry_count, 0);

        let task = fixture.ctx.task_repo.find_by_id(task_id).await.unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
    }

    #[tokio::test]
    async fn test_cancelled_task_claims_nothing() {
        let fixture = setup(FakeTtsClient::with_defaults(), 3).await;
        seed_voice(&fixture).await;

        let s1 = seed_sentence(&fixture, 0, "第一句。", None).await;
        let s2 = seed_sentence(&fixture, 1, "第二句。", None).await;
        seed_pending_unit(&fixture, s1).await;
        seed_pending_unit(&fixture, s2).await;
        let task_id = seed_queued_task(&fixture, 2).await;
        fixture.ctx.task_repo.cancel(task_id).await.unwrap();

        SynthesisWorker::process_task(fixture.ctx.clone(), 2, task_id).await;

        let counts = fixture
            .ctx
            .audio_repo
            .count_by_status(fixture.book_id)
            .await
            .unwrap();
        assert_eq!(counts.pending, 2);
        assert_eq!(counts.completed, 0);

        let task = fixture.ctx.task_repo.find_by_id(task_id).await.unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Cancelled);

        // 书籍数据保持不变
        let segments = fixture
            .book_repo
            .find_segments_by_book(fixture.book_id)
            .await
            .unwrap();
        assert_eq!(segments.len(), 1);
    }

    #[tokio::test]
    async fn test_sentence_overrides_affect_duration() {
        let fixture = setup(FakeTtsClient::with_defaults(), 3).await;
        seed_voice(&fixture).await;

        // 同样文本，一句带 rate=2.0 覆盖，时长应减半
        let plain = seed_sentence(&fixture, 0, "一模一样的文本内容。", None).await;
        let fast = SentenceRecord {
            id: Uuid::new_v4(),
            book_id: fixture.book_id,
            segment_id: fixture.segment_id,
            order_in_segment: 1,
            text: "一模一样的文本内容。".to_string(),
            raw_speaker: None,
            character_id: None,
            tone: None,
            strength: None,
            pause_after_ms: None,
            tts_overrides: Some(ParamOverlay {
                rate: Some(2.0),
                ..Default::default()
            }),
            created_at: Utc::now(),
        };
        fixture
            .ctx
            .sentence_repo
            .save_batch(std::slice::from_ref(&fast))
            .await
            .unwrap();

        seed_pending_unit(&fixture, plain).await;
        seed_pending_unit(&fixture, fast.id).await;
        let task_id = seed_queued_task(&fixture, 2).await;

        SynthesisWorker::process_task(fixture.ctx.clone(), 1, task_id).await;

        let plain_files = fixture.ctx.audio_repo.find_by_sentence(plain).await.unwrap();
        let fast_files = fixture.ctx.audio_repo.find_by_sentence(fast.id).await.unwrap();
        let plain_ms = plain_files[0].duration_ms.unwrap();
        let fast_ms = fast_files[0].duration_ms.unwrap();
        assert_eq!(fast_ms, plain_ms / 2);
    }
}

//! SQLite Database - 数据库连接和迁移

use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Sqlite,
};
use std::path::Path;
use std::str::FromStr;

/// 数据库配置
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// 数据库文件路径
    pub database_url: String,
    /// 最大连接数
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite:./data/voxbook.db?mode=rwc".to_string(),
            max_connections: 5,
        }
    }
}

impl DatabaseConfig {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            database_url: format!("sqlite:{}?mode=rwc", path.as_ref().display()),
            max_connections: 5,
        }
    }

    /// 内存数据库按连接隔离，必须限制为单连接
    pub fn in_memory() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            max_connections: 1,
        }
    }
}

/// 数据库连接池
pub type DbPool = Pool<Sqlite>;

/// 创建数据库连接池
pub async fn create_pool(config: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    // sqlx 默认开启 foreign_keys，这里恢复 SQLite 原生默认（关闭）：
    // 删除顺序由各仓储手动保证（见 book_repo 的级联删除）
    let options =
        SqliteConnectOptions::from_str(&config.database_url)?.foreign_keys(false);
    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await?;

    // 启用 WAL 模式，允许并发读写
    sqlx::query("PRAGMA journal_mode=WAL")
        .execute(&pool)
        .await?;

    // 设置 busy_timeout=5000ms，遇到锁时等待而不是立即失败
    sqlx::query("PRAGMA busy_timeout=5000")
        .execute(&pool)
        .await?;

    // 设置同步模式为 NORMAL（平衡性能和安全性）
    sqlx::query("PRAGMA synchronous=NORMAL")
        .execute(&pool)
        .await?;

    tracing::info!("SQLite pool created with WAL mode and busy_timeout=5000ms");

    Ok(pool)
}

/// 运行数据库迁移
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    // 创建 books 表
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS books (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            total_segments INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'processing',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // 创建 text_segments 表
    // [start_position, end_position) 为原文字节区间；
    // (book_id, start_position) 唯一，杜绝同一位置的重复片段
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS text_segments (
            id TEXT PRIMARY KEY,
            book_id TEXT NOT NULL,
            segment_index INTEGER NOT NULL,
            start_position INTEGER NOT NULL,
            end_position INTEGER NOT NULL,
            content TEXT NOT NULL,
            word_count INTEGER NOT NULL,
            kind TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            FOREIGN KEY (book_id) REFERENCES books(id) ON DELETE CASCADE,
            UNIQUE (book_id, segment_index),
            UNIQUE (book_id, start_position)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // 创建 script_sentences 表
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS script_sentences (
            id TEXT PRIMARY KEY,
            book_id TEXT NOT NULL,
            segment_id TEXT NOT NULL,
            order_in_segment INTEGER NOT NULL,
            text TEXT NOT NULL,
            raw_speaker TEXT,
            character_id TEXT,
            tone TEXT,
            strength REAL,
            pause_after_ms INTEGER,
            tts_overrides TEXT,
            created_at TEXT NOT NULL,
            FOREIGN KEY (book_id) REFERENCES books(id) ON DELETE CASCADE,
            FOREIGN KEY (segment_id) REFERENCES text_segments(id) ON DELETE CASCADE,
            UNIQUE (segment_id, order_in_segment)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // 创建 character_profiles 表
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS character_profiles (
            id TEXT PRIMARY KEY,
            book_id TEXT NOT NULL,
            canonical_name TEXT NOT NULL,
            characteristics TEXT NOT NULL DEFAULT '{}',
            voice_preferences TEXT NOT NULL DEFAULT '{}',
            emotion_profile TEXT NOT NULL DEFAULT '{}',
            gender_hint TEXT NOT NULL DEFAULT 'unknown',
            age_hint INTEGER,
            is_active INTEGER NOT NULL DEFAULT 1,
            mentions INTEGER NOT NULL DEFAULT 0,
            quotes INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (book_id) REFERENCES books(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    // 创建 character_aliases 表
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS character_aliases (
            id TEXT PRIMARY KEY,
            character_id TEXT NOT NULL,
            alias TEXT NOT NULL,
            confidence REAL NOT NULL,
            source_sentence TEXT,
            created_at TEXT NOT NULL,
            FOREIGN KEY (character_id) REFERENCES character_profiles(id) ON DELETE CASCADE,
            UNIQUE (character_id, alias)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // 创建 character_merge_audits 表（只追加，构成合并图的边）
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS character_merge_audits (
            id TEXT PRIMARY KEY,
            book_id TEXT NOT NULL,
            source_id TEXT NOT NULL,
            target_id TEXT NOT NULL,
            reason TEXT NOT NULL,
            actor TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY (book_id) REFERENCES books(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    // 创建 voice_profiles 表（跨书共享）
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS voice_profiles (
            id TEXT PRIMARY KEY,
            provider TEXT NOT NULL,
            provider_voice_id TEXT NOT NULL,
            name TEXT NOT NULL,
            characteristics TEXT NOT NULL,
            default_params TEXT NOT NULL,
            preview_path TEXT,
            usage_count INTEGER NOT NULL DEFAULT 0,
            rating REAL NOT NULL DEFAULT 0,
            is_available INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // 创建 character_voice_bindings 表
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS character_voice_bindings (
            id TEXT PRIMARY KEY,
            character_id TEXT NOT NULL,
            voice_id TEXT NOT NULL,
            custom_params TEXT NOT NULL DEFAULT '{}',
            emotion_overlays TEXT NOT NULL DEFAULT '{}',
            is_default INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (character_id) REFERENCES character_profiles(id) ON DELETE CASCADE,
            FOREIGN KEY (voice_id) REFERENCES voice_profiles(id),
            UNIQUE (character_id, voice_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // 部分唯一索引：每个角色至多一条默认绑定，存储层兜底
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_bindings_default
        ON character_voice_bindings(character_id) WHERE is_default = 1
        "#,
    )
    .execute(pool)
    .await?;

    // 创建 audio_files 表（pending 记录同时充当合成工作队列）
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS audio_files (
            id TEXT PRIMARY KEY,
            book_id TEXT NOT NULL,
            sentence_id TEXT,
            segment_id TEXT,
            file_path TEXT,
            duration_ms INTEGER,
            file_size INTEGER,
            format TEXT,
            status TEXT NOT NULL DEFAULT 'pending',
            error_message TEXT,
            retry_count INTEGER NOT NULL DEFAULT 0,
            provider TEXT,
            voice_id TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (book_id) REFERENCES books(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    // 创建 processing_tasks 表
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS processing_tasks (
            id TEXT PRIMARY KEY,
            book_id TEXT NOT NULL,
            task_type TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'queued',
            total_items INTEGER NOT NULL DEFAULT 0,
            processed_items INTEGER NOT NULL DEFAULT 0,
            failed_items INTEGER NOT NULL DEFAULT 0,
            task_data TEXT NOT NULL DEFAULT '{}',
            external_task_id TEXT,
            error_message TEXT,
            created_at TEXT NOT NULL,
            started_at TEXT,
            completed_at TEXT,
            FOREIGN KEY (book_id) REFERENCES books(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    // 创建索引
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_text_segments_book_id
        ON text_segments(book_id)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_sentences_segment_id
        ON script_sentences(segment_id)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_sentences_book_id
        ON script_sentences(book_id)
        "#,
    )
    .execute(pool)
    .await?;

    // 索引: script_sentences.character_id (合并时重挂句子)
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_sentences_character_id
        ON script_sentences(character_id)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_characters_book_id
        ON character_profiles(book_id)
        "#,
    )
    .execute(pool)
    .await?;

    // 索引: character_aliases.alias (按别名反查角色)
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_aliases_alias
        ON character_aliases(alias)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_merge_audits_book_id
        ON character_merge_audits(book_id)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_bindings_character_id
        ON character_voice_bindings(character_id)
        "#,
    )
    .execute(pool)
    .await?;

    // 索引: audio_files(book_id, status) (认领扫描)
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_audio_files_book_status
        ON audio_files(book_id, status)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_audio_files_sentence_id
        ON audio_files(sentence_id)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_tasks_book_id
        ON processing_tasks(book_id)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_tasks_external_id
        ON processing_tasks(external_task_id)
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database migrations completed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_in_memory_db() {
        let config = DatabaseConfig::in_memory();
        let pool = create_pool(&config).await.unwrap();
        run_migrations(&pool).await.unwrap();
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let config = DatabaseConfig::in_memory();
        let pool = create_pool(&config).await.unwrap();
        run_migrations(&pool).await.unwrap();
        run_migrations(&pool).await.unwrap();
    }
}

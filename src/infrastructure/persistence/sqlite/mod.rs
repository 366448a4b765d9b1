//! SQLite Persistence - 仓储实现
//!
//! 认领、状态迁移、默认绑定提升、身份合并均以
//! 条件更新/单事务实现，跨进程安全。

mod audio_file_repo;
mod book_repo;
mod character_repo;
mod database;
mod script_repo;
mod task_repo;
mod voice_repo;

pub use audio_file_repo::SqliteAudioFileRepository;
pub use book_repo::SqliteBookRepository;
pub use character_repo::SqliteCharacterRepository;
pub use database::{create_pool, run_migrations, DatabaseConfig, DbPool};
pub use script_repo::SqliteSentenceRepository;
pub use task_repo::SqliteTaskRepository;
pub use voice_repo::SqliteVoiceRepository;

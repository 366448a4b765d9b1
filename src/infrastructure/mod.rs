//! Infrastructure Layer - 基础设施层
//!
//! 出站端口的具体实现：
//! - persistence: SQLite 持久化
//! - memory: 进程内合并锁
//! - adapters: 外部服务适配器（NLP 检测器 / TTS 引擎）
//! - worker: 后台合成 worker

pub mod adapters;
pub mod memory;
pub mod persistence;
pub mod worker;

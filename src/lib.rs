//! Voxbook - 多角色有声书生成引擎
//!
//! 架构设计: DDD + CQRS + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Book Context: 书籍、文本片段与台本句子
//! - Character Context: 角色档案、别名与身份合并
//! - Voice Context: 音色档案、参数叠加与兜底选择
//!
//! 应用层 (application/):
//! - Ports: 端口定义（Repositories, SpeakerDetector, TtsEngine）
//! - Commands: CQRS 命令处理器
//! - Queries: CQRS 查询处理器
//!
//! 基础设施层 (infrastructure/):
//! - Persistence: SQLite 存储（含原子认领与合并事务）
//! - Memory: 每本书的合并顾问锁
//! - Worker: SynthesisWorker 后台合成任务处理
//! - Adapters: 规则版说话人检测器、Fake TTS Client
//!
//! 本 crate 是库级编排引擎，不包含网络/服务层；
//! 说话人检测模型与 TTS 合成引擎均为外部协作者，仅以端口形式消费。

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};

//! 应用层 - CQRS 命令/查询与出站端口
//!
//! - commands: 写操作及其 handler
//! - queries: 读操作及其 handler
//! - ports: 持久化与外部服务的抽象接口
//! - error: 统一应用层错误

pub mod commands;
pub mod error;
pub mod ports;
pub mod queries;

pub use error::ApplicationError;

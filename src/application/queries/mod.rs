//! 应用层 - 查询（读操作）
//!
//! CQRS 查询侧：处理所有读操作

mod book_queries;
mod character_queries;
mod script_queries;
mod synthesis_queries;
mod voice_queries;

pub mod handlers;

pub use book_queries::*;
pub use character_queries::*;
pub use script_queries::*;
pub use synthesis_queries::*;
pub use voice_queries::*;

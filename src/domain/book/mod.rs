//! Book Context - 书籍限界上下文
//!
//! 职责:
//! - 书籍聚合管理
//! - 文本片段实体（位置连续、可还原原文）

mod aggregate;
mod entities;
mod errors;
mod value_objects;

pub use aggregate::Book;
pub use entities::TextSegment;
pub use errors::BookError;
pub use value_objects::{BookId, Title};

//! Character Context - 角色限界上下文
//!
//! 职责:
//! - 角色档案聚合（每本书的规范角色注册表）
//! - 别名追踪
//! - 身份合并（审计边 + 根查找，从不原地改写身份）

mod aggregate;
mod entities;
mod errors;
mod merge_graph;
mod value_objects;

pub use aggregate::CharacterProfile;
pub use entities::{CharacterAlias, CharacterMergeAudit};
pub use errors::CharacterError;
pub use merge_graph::{resolve_root, MergeEdge};
pub use value_objects::{AliasConfidence, CanonicalName, GenderHint};

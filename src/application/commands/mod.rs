//! 应用层 - 命令（写操作）
//!
//! CQRS 命令侧：处理所有写操作

mod book_commands;
mod character_commands;
mod script_commands;
mod synthesis_commands;
mod voice_commands;

pub mod handlers;

pub use book_commands::*;
pub use character_commands::*;
pub use script_commands::*;
pub use synthesis_commands::*;
pub use voice_commands::*;

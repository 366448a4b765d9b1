//! Merge Lock Port - 每本书的合并顾问锁
//!
//! 角色合并必须按书串行化，防止并发合并互相覆盖。
//! 锁实现在 infrastructure/memory 层（单进程部署）；
//! 多进程部署可替换为基于存储的 advisory lock 实现。

use async_trait::async_trait;
use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

/// Merge Lock Port
#[async_trait]
pub trait MergeLockPort: Send + Sync {
    /// 获取指定书籍的合并锁，guard 释放前同书合并被阻塞
    async fn acquire(&self, book_id: Uuid) -> OwnedMutexGuard<()>;
}

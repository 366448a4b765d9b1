//! In-Memory Merge Lock - 每本书的合并顾问锁
//!
//! 单进程部署下以 DashMap + tokio Mutex 实现按书串行化；
//! 锁条目按 book_id 惰性创建，进程生命周期内常驻。

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::application::ports::MergeLockPort;

/// 进程内合并锁
#[derive(Default)]
pub struct InMemoryMergeLock {
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl InMemoryMergeLock {
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }
}

#[async_trait]
impl MergeLockPort for InMemoryMergeLock {
    async fn acquire(&self, book_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(book_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_same_book_serializes() {
        let lock = InMemoryMergeLock::new();
        let book_id = Uuid::new_v4();

        let guard = lock.acquire(book_id).await;
        // 持锁期间同书二次获取必须阻塞
        let second = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            lock.acquire(book_id),
        )
        .await;
        assert!(second.is_err());

        drop(guard);
        let third = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            lock.acquire(book_id),
        )
        .await;
        assert!(third.is_ok());
    }

    #[tokio::test]
    async fn test_different_books_independent() {
        let lock = InMemoryMergeLock::new();
        let _guard = lock.acquire(Uuid::new_v4()).await;

        let other = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            lock.acquire(Uuid::new_v4()),
        )
        .await;
        assert!(other.is_ok());
    }
}

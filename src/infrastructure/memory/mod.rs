//! Memory - 进程内并发原语

mod merge_lock;

pub use merge_lock::InMemoryMergeLock;

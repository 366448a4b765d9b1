//! Persistence - 持久化实现

pub mod sqlite;

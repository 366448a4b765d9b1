//! 合并图 - 角色身份合并的根查找
//!
//! 合并以审计日志中的有向边（source → target）建模，身份从不原地改写。
//! 任何历史引用在使用前都必须沿边规范化到当前的活跃根，
//! 类似 union-find 的 find 操作（链式合并 a→b、b→c 后，a 解析为 c）。

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use super::errors::CharacterError;

/// 一条合并边（取自审计日志）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeEdge {
    pub source_id: Uuid,
    pub target_id: Uuid,
}

/// 沿合并边查找活跃根
///
/// `edges` 为某本书的全部合并记录；同一 source 至多一条出边
/// （角色停用后不会再次作为 source 参与合并）。
/// 遇到环说明审计数据被破坏，返回错误而不是死循环。
pub fn resolve_root(start: Uuid, edges: &[MergeEdge]) -> Result<Uuid, CharacterError> {
    let forward: HashMap<Uuid, Uuid> = edges
        .iter()
        .map(|e| (e.source_id, e.target_id))
        .collect();

    let mut current = start;
    let mut visited = HashSet::new();
    visited.insert(current);

    while let Some(&next) = forward.get(&current) {
        if !visited.insert(next) {
            return Err(CharacterError::MergeCycle(start));
        }
        current = next;
    }

    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_edges_returns_self() {
        let id = Uuid::new_v4();
        assert_eq!(resolve_root(id, &[]).unwrap(), id);
    }

    #[test]
    fn test_chained_merges_resolve_to_final_target() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let edges = vec![
            MergeEdge { source_id: a, target_id: b },
            MergeEdge { source_id: b, target_id: c },
        ];

        // merge(a,b) 后 merge(b,c)：曾指向 a 的引用解析为 c
        assert_eq!(resolve_root(a, &edges).unwrap(), c);
        assert_eq!(resolve_root(b, &edges).unwrap(), c);
        assert_eq!(resolve_root(c, &edges).unwrap(), c);
    }

    #[test]
    fn test_cycle_detected() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let edges = vec![
            MergeEdge { source_id: a, target_id: b },
            MergeEdge { source_id: b, target_id: a },
        ];

        assert!(matches!(
            resolve_root(a, &edges),
            Err(CharacterError::MergeCycle(_))
        ));
    }
}

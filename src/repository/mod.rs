//! 层级数据访问层
//!
//! 权限内核只通过 [`HierarchyStore`] 读取层级与角色数据，不关心具体存储。

pub mod cache;
pub mod memory;
pub mod snapshot;

pub use cache::CachedHierarchy;
pub use memory::{CascadeReport, MemoryHierarchy};
pub use snapshot::HierarchySnapshot;

use crate::{
    error::AuthzError,
    models::{Collection, Membership, Principal, RoleAssignment, RoleKind},
};
use std::collections::{BTreeSet, HashSet};
use uuid::Uuid;

/// 层级存储
///
/// 未知节点返回空序列而不是错误。实现方应当为一次调用提供一致的快照。
pub trait HierarchyStore {
    fn user(&self, id: Uuid) -> Result<Option<Principal>, AuthzError>;

    fn collection(&self, id: Uuid) -> Result<Option<Collection>, AuthzError>;

    /// 祖先链，从最近的节点到 Facility
    fn ancestors(&self, id: Uuid, include_self: bool) -> Result<Vec<Collection>, AuthzError>;

    fn descendants(&self, id: Uuid, include_self: bool) -> Result<Vec<Collection>, AuthzError>;

    /// 用户持有的全部角色分配
    fn role_assignments_for(&self, user_id: Uuid) -> Result<Vec<RoleAssignment>, AuthzError>;

    /// 用户在子树内各节点上持有的角色类型
    fn role_assignments(
        &self,
        user_id: Uuid,
        subtree_root: Uuid,
    ) -> Result<BTreeSet<RoleKind>, AuthzError> {
        let subtree: HashSet<Uuid> = self
            .descendants(subtree_root, true)?
            .into_iter()
            .map(|c| c.id)
            .collect();

        Ok(self
            .role_assignments_for(user_id)?
            .into_iter()
            .filter(|a| subtree.contains(&a.collection_id))
            .map(|a| a.kind)
            .collect())
    }

    fn memberships(&self, user_id: Uuid) -> Result<Vec<Membership>, AuthzError>;

    /// 某个集合的直接成员关系
    fn members_of(&self, collection_id: Uuid) -> Result<Vec<Membership>, AuthzError>;

    fn is_member(&self, user_id: Uuid, collection_id: Uuid) -> Result<bool, AuthzError> {
        Ok(self
            .memberships(user_id)?
            .iter()
            .any(|m| m.collection_id == collection_id))
    }
}

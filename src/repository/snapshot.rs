//! 层级快照（JSON）
//! 用于导入导出完整的层级数据

use super::MemoryHierarchy;
use crate::{
    error::AuthzError,
    models::{Collection, Membership, Principal, RoleAssignment},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HierarchySnapshot {
    #[serde(default)]
    pub collections: Vec<Collection>,
    #[serde(default)]
    pub users: Vec<Principal>,
    #[serde(default)]
    pub roles: Vec<RoleAssignment>,
    #[serde(default)]
    pub memberships: Vec<Membership>,
}

impl HierarchySnapshot {
    pub fn from_json(json: &str) -> Result<Self, AuthzError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, AuthzError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// 从文件加载快照
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AuthzError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            AuthzError::Store(format!("cannot read snapshot {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }
}

impl MemoryHierarchy {
    /// 从快照构建存储，所有结构约束照常校验
    pub fn from_snapshot(
        snapshot: HierarchySnapshot,
        max_depth: usize,
    ) -> Result<Self, AuthzError> {
        let mut store = MemoryHierarchy::with_max_depth(max_depth);

        // 父节点必须先于子节点插入
        let mut collections = snapshot.collections;
        collections.sort_by_key(|c| c.kind.depth());
        for collection in collections {
            store.add_collection(collection)?;
        }
        for user in snapshot.users {
            store.add_user(user)?;
        }
        for role in snapshot.roles {
            store.assign_role(role)?;
        }
        for membership in snapshot.memberships {
            store.add_membership(membership)?;
        }

        tracing::info!(
            collections = store.collections().count(),
            users = store.users().count(),
            roles = store.roles().count(),
            memberships = store.all_memberships().count(),
            "Hierarchy snapshot loaded"
        );

        Ok(store)
    }

    pub fn to_snapshot(&self) -> HierarchySnapshot {
        let mut collections: Vec<Collection> = self.collections().cloned().collect();
        collections.sort_by_key(|c| (c.kind.depth(), c.created_at));

        HierarchySnapshot {
            collections,
            users: self.users().cloned().collect(),
            roles: self.roles().cloned().collect(),
            memberships: self.all_memberships().cloned().collect(),
        }
    }
}

//! In-memory hierarchy store (内存层级存储)
//!
//! 写入时校验结构约束，删除时级联清理，保证不存在悬空的边。

use super::HierarchyStore;
use crate::{
    error::AuthzError,
    models::{Collection, Membership, Principal, RoleAssignment},
};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use uuid::Uuid;

/// 祖先遍历的默认最大深度
pub const DEFAULT_MAX_DEPTH: usize = 16;

/// 一次级联删除移除的对象
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CascadeReport {
    pub collections: Vec<Uuid>,
    pub roles: Vec<Uuid>,
    pub memberships: Vec<Uuid>,
    pub users: Vec<Uuid>,
}

impl CascadeReport {
    pub fn total(&self) -> usize {
        self.collections.len() + self.roles.len() + self.memberships.len() + self.users.len()
    }
}

#[derive(Debug, Clone)]
pub struct MemoryHierarchy {
    users: HashMap<Uuid, Principal>,
    collections: HashMap<Uuid, Collection>,
    children: HashMap<Uuid, BTreeSet<Uuid>>,
    roles: HashMap<Uuid, RoleAssignment>,
    memberships: HashMap<Uuid, Membership>,
    max_depth: usize,
}

impl Default for MemoryHierarchy {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHierarchy {
    pub fn new() -> Self {
        Self::with_max_depth(DEFAULT_MAX_DEPTH)
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            users: HashMap::new(),
            collections: HashMap::new(),
            children: HashMap::new(),
            roles: HashMap::new(),
            memberships: HashMap::new(),
            max_depth,
        }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    // ==================== Collections ====================

    /// 添加集合节点，父节点必须已存在且类型匹配
    pub fn add_collection(&mut self, collection: Collection) -> Result<Uuid, AuthzError> {
        if self.collections.contains_key(&collection.id) {
            return Err(AuthzError::Integrity(format!(
                "collection {} already exists",
                collection.id
            )));
        }

        {
            let parent = match collection.parent_id {
                Some(parent_id) => Some(self.collections.get(&parent_id).ok_or(
                    AuthzError::NotFound {
                        kind: "collection",
                        id: parent_id,
                    },
                )?),
                None => None,
            };
            collection.validate_parent(parent)?;
        }

        let id = collection.id;
        if let Some(parent_id) = collection.parent_id {
            self.children.entry(parent_id).or_default().insert(id);
        }

        tracing::debug!(
            collection_id = %id,
            kind = %collection.kind,
            "Collection added"
        );
        self.collections.insert(id, collection);

        Ok(id)
    }

    /// 删除集合及其全部后代，并清理指向它们的角色与成员关系。
    /// 删除 Facility 时同时删除其下的用户。
    pub fn delete_collection(&mut self, id: Uuid) -> Result<CascadeReport, AuthzError> {
        let doomed: Vec<Uuid> = self
            .descendants(id, true)?
            .into_iter()
            .map(|c| c.id)
            .collect();

        if doomed.is_empty() {
            return Err(AuthzError::NotFound {
                kind: "collection",
                id,
            });
        }

        let doomed_set: HashSet<Uuid> = doomed.iter().copied().collect();
        let mut report = CascadeReport::default();

        // 从父节点的子列表中摘除
        if let Some(parent_id) = self.collections.get(&id).and_then(|c| c.parent_id) {
            if let Some(siblings) = self.children.get_mut(&parent_id) {
                siblings.remove(&id);
            }
        }

        let mut removed_facilities = HashSet::new();
        for collection_id in &doomed {
            if let Some(collection) = self.collections.remove(collection_id) {
                if collection.is_facility() {
                    removed_facilities.insert(collection.id);
                }
            }
            self.children.remove(collection_id);
            report.collections.push(*collection_id);
        }

        self.users.retain(|user_id, user| {
            let keep = user
                .facility_id()
                .map_or(true, |facility_id| !removed_facilities.contains(&facility_id));
            if !keep {
                report.users.push(*user_id);
            }
            keep
        });

        let removed_users: HashSet<Uuid> = report.users.iter().copied().collect();

        self.roles.retain(|role_id, role| {
            let keep = !doomed_set.contains(&role.collection_id)
                && !removed_users.contains(&role.user_id);
            if !keep {
                report.roles.push(*role_id);
            }
            keep
        });

        self.memberships.retain(|membership_id, membership| {
            let keep = !doomed_set.contains(&membership.collection_id)
                && !removed_users.contains(&membership.user_id);
            if !keep {
                report.memberships.push(*membership_id);
            }
            keep
        });

        tracing::info!(
            collection_id = %id,
            collections = report.collections.len(),
            roles = report.roles.len(),
            memberships = report.memberships.len(),
            users = report.users.len(),
            "Collection deleted with cascade"
        );

        Ok(report)
    }

    // ==================== Users ====================

    /// 添加用户；Facility 用户的 Facility 必须已存在
    pub fn add_user(&mut self, user: Principal) -> Result<Uuid, AuthzError> {
        let Some(id) = user.id() else {
            return Err(AuthzError::Integrity(
                "anonymous users cannot be stored".to_string(),
            ));
        };

        if self.users.contains_key(&id) {
            return Err(AuthzError::Integrity(format!("user {} already exists", id)));
        }

        if let Some(facility_id) = user.facility_id() {
            let facility = self
                .collections
                .get(&facility_id)
                .ok_or(AuthzError::NotFound {
                    kind: "facility",
                    id: facility_id,
                })?;
            if !facility.is_facility() {
                return Err(AuthzError::Integrity(format!(
                    "user {} must belong to a facility, not a {}",
                    id, facility.kind
                )));
            }
        }

        self.users.insert(id, user);
        Ok(id)
    }

    /// 删除用户及其角色与成员关系
    pub fn delete_user(&mut self, id: Uuid) -> Result<CascadeReport, AuthzError> {
        if self.users.remove(&id).is_none() {
            return Err(AuthzError::NotFound { kind: "user", id });
        }

        let mut report = CascadeReport {
            users: vec![id],
            ..CascadeReport::default()
        };

        self.roles.retain(|role_id, role| {
            let keep = role.user_id != id;
            if !keep {
                report.roles.push(*role_id);
            }
            keep
        });
        self.memberships.retain(|membership_id, membership| {
            let keep = membership.user_id != id;
            if !keep {
                report.memberships.push(*membership_id);
            }
            keep
        });

        Ok(report)
    }

    // ==================== Roles & memberships ====================

    /// 分配角色；重复分配返回已有记录的 ID
    pub fn assign_role(&mut self, assignment: RoleAssignment) -> Result<Uuid, AuthzError> {
        self.check_edge(assignment.user_id, assignment.collection_id)?;

        if let Some(existing) = self.roles.values().find(|r| {
            r.user_id == assignment.user_id
                && r.collection_id == assignment.collection_id
                && r.kind == assignment.kind
        }) {
            return Ok(existing.id);
        }

        tracing::debug!(
            user_id = %assignment.user_id,
            collection_id = %assignment.collection_id,
            kind = %assignment.kind,
            "Role assigned"
        );

        let id = assignment.id;
        self.roles.insert(id, assignment);
        Ok(id)
    }

    pub fn remove_role(&mut self, id: Uuid) -> bool {
        self.roles.remove(&id).is_some()
    }

    /// 添加成员关系；重复添加返回已有记录的 ID
    pub fn add_membership(&mut self, membership: Membership) -> Result<Uuid, AuthzError> {
        self.check_edge(membership.user_id, membership.collection_id)?;

        if let Some(existing) = self.memberships.values().find(|m| {
            m.user_id == membership.user_id && m.collection_id == membership.collection_id
        }) {
            return Ok(existing.id);
        }

        let id = membership.id;
        self.memberships.insert(id, membership);
        Ok(id)
    }

    pub fn remove_membership(&mut self, id: Uuid) -> bool {
        self.memberships.remove(&id).is_some()
    }

    /// 边的两端必须存在，且属于同一个 Facility
    fn check_edge(&self, user_id: Uuid, collection_id: Uuid) -> Result<(), AuthzError> {
        let user = self.users.get(&user_id).ok_or(AuthzError::NotFound {
            kind: "user",
            id: user_id,
        })?;
        let collection = self
            .collections
            .get(&collection_id)
            .ok_or(AuthzError::NotFound {
                kind: "collection",
                id: collection_id,
            })?;

        match user.facility_id() {
            Some(facility_id) if facility_id == collection.facility_id => Ok(()),
            Some(_) => Err(AuthzError::Integrity(format!(
                "user {} and collection {} belong to different facilities",
                user_id, collection_id
            ))),
            None => Err(AuthzError::Integrity(format!(
                "user {} is not scoped to a facility",
                user_id
            ))),
        }
    }

    // ==================== Inspection ====================

    pub fn users(&self) -> impl Iterator<Item = &Principal> {
        self.users.values()
    }

    pub fn collections(&self) -> impl Iterator<Item = &Collection> {
        self.collections.values()
    }

    pub fn roles(&self) -> impl Iterator<Item = &RoleAssignment> {
        self.roles.values()
    }

    pub fn all_memberships(&self) -> impl Iterator<Item = &Membership> {
        self.memberships.values()
    }
}

impl HierarchyStore for MemoryHierarchy {
    fn user(&self, id: Uuid) -> Result<Option<Principal>, AuthzError> {
        Ok(self.users.get(&id).cloned())
    }

    fn collection(&self, id: Uuid) -> Result<Option<Collection>, AuthzError> {
        Ok(self.collections.get(&id).cloned())
    }

    fn ancestors(&self, id: Uuid, include_self: bool) -> Result<Vec<Collection>, AuthzError> {
        let mut cursor = self.collections.get(&id);
        if !include_self {
            cursor = cursor
                .and_then(|c| c.parent_id)
                .and_then(|parent_id| self.collections.get(&parent_id));
        }

        let mut chain = Vec::new();
        while let Some(node) = cursor {
            if chain.len() >= self.max_depth {
                tracing::error!(
                    collection_id = %id,
                    max_depth = self.max_depth,
                    "Ancestor traversal exceeded max depth"
                );
                return Err(AuthzError::Integrity(format!(
                    "ancestor chain of {} exceeds max depth {}",
                    id, self.max_depth
                )));
            }
            chain.push(node.clone());
            cursor = node
                .parent_id
                .and_then(|parent_id| self.collections.get(&parent_id));
        }

        Ok(chain)
    }

    fn descendants(&self, id: Uuid, include_self: bool) -> Result<Vec<Collection>, AuthzError> {
        let Some(root) = self.collections.get(&id) else {
            return Ok(Vec::new());
        };

        let mut result = Vec::new();
        if include_self {
            result.push(root.clone());
        }

        let mut visited = HashSet::from([id]);
        let mut queue = VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            let Some(children) = self.children.get(&current) else {
                continue;
            };
            for child_id in children {
                if !visited.insert(*child_id) {
                    continue;
                }
                if let Some(child) = self.collections.get(child_id) {
                    result.push(child.clone());
                    queue.push_back(*child_id);
                }
            }
        }

        Ok(result)
    }

    fn role_assignments_for(&self, user_id: Uuid) -> Result<Vec<RoleAssignment>, AuthzError> {
        Ok(self
            .roles
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    fn memberships(&self, user_id: Uuid) -> Result<Vec<Membership>, AuthzError> {
        Ok(self
            .memberships
            .values()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect())
    }

    fn members_of(&self, collection_id: Uuid) -> Result<Vec<Membership>, AuthzError> {
        Ok(self
            .memberships
            .values()
            .filter(|m| m.collection_id == collection_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ancestor_traversal_is_depth_guarded() {
        let mut store = MemoryHierarchy::with_max_depth(8);
        let facility = Collection::new_facility("Riverside");
        let classroom = Collection::new_classroom("Grade 4", &facility);
        store.add_collection(facility.clone()).unwrap();
        store.add_collection(classroom.clone()).unwrap();

        // 人为制造环
        store
            .collections
            .get_mut(&facility.id)
            .unwrap()
            .parent_id = Some(classroom.id);

        let result = store.ancestors(classroom.id, true);
        assert!(matches!(result, Err(AuthzError::Integrity(_))));
    }

    #[test]
    fn test_descendants_terminate_on_cycle() {
        let mut store = MemoryHierarchy::new();
        let facility = Collection::new_facility("Riverside");
        let classroom = Collection::new_classroom("Grade 4", &facility);
        store.add_collection(facility.clone()).unwrap();
        store.add_collection(classroom.clone()).unwrap();

        store
            .children
            .entry(classroom.id)
            .or_default()
            .insert(facility.id);

        let nodes = store.descendants(facility.id, true).unwrap();
        assert_eq!(nodes.len(), 2);
    }

    #[test]
    fn test_duplicate_assignment_is_idempotent() {
        let mut store = MemoryHierarchy::new();
        let facility = Collection::new_facility("Riverside");
        store.add_collection(facility.clone()).unwrap();
        let user = Principal::facility_user("alice", &facility);
        let user_id = store.add_user(user).unwrap();

        let first = store
            .assign_role(RoleAssignment::new(user_id, facility.id, crate::models::RoleKind::Admin))
            .unwrap();
        let second = store
            .assign_role(RoleAssignment::new(user_id, facility.id, crate::models::RoleKind::Admin))
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(store.roles().count(), 1);
    }
}

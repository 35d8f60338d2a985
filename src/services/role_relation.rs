//! 有效角色推导
//!
//! 计算主体相对于某个用户或集合持有哪些关系，
//! 以及按集合批量过滤时使用的 [`RoleScope`]。

use crate::{
    error::AuthzError,
    models::{Collection, Principal, Relation, RoleKind, RoleRequirement, RoleSet, Target},
    repository::HierarchyStore,
};
use std::collections::{BTreeSet, HashSet};
use uuid::Uuid;

pub struct RoleRelation<'a> {
    store: &'a dyn HierarchyStore,
}

impl<'a> RoleRelation<'a> {
    pub fn new(store: &'a dyn HierarchyStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &'a dyn HierarchyStore {
        self.store
    }

    /// 主体相对于目标的有效关系集合
    pub fn roles_for(&self, source: &Principal, target: &Target) -> Result<RoleSet, AuthzError> {
        if source.is_superuser() {
            return Ok(RoleSet::universal());
        }

        let Some(source_id) = source.id() else {
            return Ok(RoleSet::empty());
        };

        let mut roles = RoleSet::empty();
        if let Target::User(user) = target {
            if source.is_same(user) {
                roles.insert(Relation::Own);
            }
        }

        // 不同 Facility 之间不存在任何关系
        let same_facility = matches!(
            (source.facility_id(), target.facility_id()),
            (Some(a), Some(b)) if a == b
        );
        if !same_facility {
            return Ok(roles);
        }

        let held = self.store.role_assignments_for(source_id)?;
        if held.is_empty() {
            return Ok(roles);
        }

        let path = match target {
            Target::User(user) => self.membership_paths(user)?,
            Target::Collection(collection) => self.collection_path(collection)?,
        };

        for assignment in held {
            if path.contains(&assignment.collection_id) {
                roles.insert(assignment.kind);
            }
        }

        Ok(roles)
    }

    /// 主体相对于目标是否持有任一要求的关系
    pub fn has_role_for(
        &self,
        source: &Principal,
        required: &[RoleRequirement],
        target: &Target,
    ) -> Result<bool, AuthzError> {
        if required.contains(&RoleRequirement::Anyone) {
            return Ok(true);
        }
        Ok(self.roles_for(source, target)?.satisfies(required))
    }

    /// 按集合过滤时使用的范围，结果与逐个调用 `roles_for` 等价
    pub fn scope_for(
        &self,
        source: &Principal,
        required: &[RoleRequirement],
    ) -> Result<RoleScope, AuthzError> {
        let mut scope = RoleScope {
            facility_id: source.facility_id(),
            ..RoleScope::default()
        };

        if required.contains(&RoleRequirement::Anyone) {
            scope.anyone = true;
            return Ok(scope);
        }
        if required.is_empty() {
            return Ok(scope);
        }
        if source.is_superuser() {
            scope.universal = true;
            return Ok(scope);
        }
        let Some(source_id) = source.id() else {
            return Ok(scope);
        };

        if required.contains(&RoleRequirement::OWN) {
            scope.own = Some(source_id);
        }

        let kinds: BTreeSet<RoleKind> = required.iter().filter_map(|r| r.role_kind()).collect();
        if kinds.is_empty() {
            return Ok(scope);
        }

        for assignment in self.store.role_assignments_for(source_id)? {
            if !kinds.contains(&assignment.kind) || scope.collections.contains(&assignment.collection_id) {
                continue;
            }
            for node in self.store.descendants(assignment.collection_id, true)? {
                if Some(node.facility_id) == scope.facility_id {
                    scope.collections.insert(node.id);
                }
            }
        }

        for collection_id in &scope.collections {
            for membership in self.store.members_of(*collection_id)? {
                scope.members.insert(membership.user_id);
            }
        }

        tracing::trace!(
            user_id = %source_id,
            collections = scope.collections.len(),
            members = scope.members.len(),
            "Role scope computed"
        );

        Ok(scope)
    }

    /// 用户所有成员节点（显式成员关系加上隐式的 Facility 成员）的祖先并集
    fn membership_paths(&self, user: &Principal) -> Result<HashSet<Uuid>, AuthzError> {
        let mut path = HashSet::new();
        let Some(user_id) = user.id() else {
            return Ok(path);
        };

        let mut nodes: Vec<Uuid> = self
            .store
            .memberships(user_id)?
            .into_iter()
            .map(|m| m.collection_id)
            .collect();
        nodes.extend(user.facility_id());

        for node in nodes {
            if path.contains(&node) {
                continue;
            }
            path.extend(self.store.ancestors(node, true)?.into_iter().map(|c| c.id));
        }

        Ok(path)
    }

    /// 集合自身加上其父节点的祖先链；对尚未保存的集合同样适用
    fn collection_path(&self, collection: &Collection) -> Result<HashSet<Uuid>, AuthzError> {
        let mut path = HashSet::from([collection.id]);
        if let Some(parent_id) = collection.parent_id {
            path.extend(self.store.ancestors(parent_id, true)?.into_iter().map(|c| c.id));
        }
        Ok(path)
    }
}

/// 主体可读范围的集合表示
#[derive(Debug, Clone, Default)]
pub struct RoleScope {
    anyone: bool,
    universal: bool,
    own: Option<Uuid>,
    facility_id: Option<Uuid>,
    collections: HashSet<Uuid>,
    members: HashSet<Uuid>,
}

impl RoleScope {
    /// 是否无需解析目标即可放行所有候选
    pub fn is_unrestricted(&self) -> bool {
        self.anyone || self.universal
    }

    pub fn collections(&self) -> &HashSet<Uuid> {
        &self.collections
    }

    pub fn members(&self) -> &HashSet<Uuid> {
        &self.members
    }

    /// 目标是否在范围内；`None` 表示目标字段为空引用
    pub fn admits(&self, target: Option<&Target>) -> bool {
        if self.is_unrestricted() {
            return true;
        }
        let Some(target) = target else {
            return false;
        };

        if let (Target::User(user), Some(own)) = (target, self.own) {
            if user.id() == Some(own) {
                return true;
            }
        }

        if self.facility_id.is_none() || target.facility_id() != self.facility_id {
            return false;
        }

        match target {
            Target::User(user) => {
                user.id().is_some_and(|id| self.members.contains(&id))
                    || user
                        .facility_id()
                        .is_some_and(|facility_id| self.collections.contains(&facility_id))
            }
            Target::Collection(collection) => {
                self.collections.contains(&collection.id)
                    || collection
                        .parent_id
                        .is_some_and(|parent_id| self.collections.contains(&parent_id))
            }
        }
    }
}

//! 集合节点的权限规则
//!
//! 创建和删除看父节点上的 Admin 角色，读取和更新看集合自身。
//! Facility 没有父节点，因此只有超级用户可以创建或删除。

use super::{
    role_based::{RoleBasedConfig, RoleBasedPermissions},
    PermissionRule,
};
use crate::{
    error::AuthzError,
    models::{Principal, Resource, RoleKind},
    services::RoleRelation,
};

#[derive(Debug, Clone)]
pub struct CollectionPermissions {
    on_parent: RoleBasedPermissions,
    on_self: RoleBasedPermissions,
}

impl CollectionPermissions {
    pub fn new() -> Result<Self, AuthzError> {
        Ok(Self {
            on_parent: RoleBasedConfig::default()
                .target("parent")
                .created_by([RoleKind::Admin])
                .deleted_by([RoleKind::Admin])
                .build()?,
            on_self: RoleBasedConfig::default()
                .target(".")
                .read_by([RoleKind::Admin, RoleKind::Coach])
                .updated_by([RoleKind::Admin])
                .build()?,
        })
    }
}

impl PermissionRule for CollectionPermissions {
    fn user_can_create_object(
        &self,
        rel: &RoleRelation<'_>,
        user: &Principal,
        obj: &dyn Resource,
    ) -> Result<bool, AuthzError> {
        self.on_parent.user_can_create_object(rel, user, obj)
    }

    fn user_can_read_object(
        &self,
        rel: &RoleRelation<'_>,
        user: &Principal,
        obj: &dyn Resource,
    ) -> Result<bool, AuthzError> {
        self.on_self.user_can_read_object(rel, user, obj)
    }

    fn user_can_update_object(
        &self,
        rel: &RoleRelation<'_>,
        user: &Principal,
        obj: &dyn Resource,
    ) -> Result<bool, AuthzError> {
        self.on_self.user_can_update_object(rel, user, obj)
    }

    fn user_can_delete_object(
        &self,
        rel: &RoleRelation<'_>,
        user: &Principal,
        obj: &dyn Resource,
    ) -> Result<bool, AuthzError> {
        self.on_parent.user_can_delete_object(rel, user, obj)
    }

    fn readable_indices(
        &self,
        rel: &RoleRelation<'_>,
        user: &Principal,
        candidates: &[&dyn Resource],
    ) -> Result<Vec<usize>, AuthzError> {
        self.on_self.readable_indices(rel, user, candidates)
    }
}

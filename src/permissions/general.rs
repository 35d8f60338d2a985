//! 通用权限规则：本人对象、同一 Facility

use super::{target::resolve_target, PermissionRule};
use crate::{
    error::AuthzError,
    models::{Principal, Resource, Target},
    services::RoleRelation,
};

/// 目标字段指向请求者本人的对象
#[derive(Debug, Clone)]
pub struct IsOwn {
    field: String,
    read_only: bool,
}

impl IsOwn {
    pub fn field(field: &str) -> Self {
        Self {
            field: field.to_string(),
            read_only: false,
        }
    }

    /// 对象本身就是请求者
    pub fn itself() -> Self {
        Self::field(".")
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    fn owns(
        &self,
        rel: &RoleRelation<'_>,
        user: &Principal,
        obj: &dyn Resource,
    ) -> Result<bool, AuthzError> {
        if user.is_anonymous() {
            return Ok(false);
        }
        Ok(matches!(
            resolve_target(rel.store(), obj, &self.field)?,
            Some(Target::User(owner)) if owner.is_same(user)
        ))
    }

    fn writes(
        &self,
        rel: &RoleRelation<'_>,
        user: &Principal,
        obj: &dyn Resource,
    ) -> Result<bool, AuthzError> {
        if self.read_only {
            return Ok(false);
        }
        self.owns(rel, user, obj)
    }
}

impl Default for IsOwn {
    fn default() -> Self {
        Self::field("user")
    }
}

impl PermissionRule for IsOwn {
    fn user_can_create_object(
        &self,
        rel: &RoleRelation<'_>,
        user: &Principal,
        obj: &dyn Resource,
    ) -> Result<bool, AuthzError> {
        self.writes(rel, user, obj)
    }

    fn user_can_read_object(
        &self,
        rel: &RoleRelation<'_>,
        user: &Principal,
        obj: &dyn Resource,
    ) -> Result<bool, AuthzError> {
        self.owns(rel, user, obj)
    }

    fn user_can_update_object(
        &self,
        rel: &RoleRelation<'_>,
        user: &Principal,
        obj: &dyn Resource,
    ) -> Result<bool, AuthzError> {
        self.writes(rel, user, obj)
    }

    fn user_can_delete_object(
        &self,
        rel: &RoleRelation<'_>,
        user: &Principal,
        obj: &dyn Resource,
    ) -> Result<bool, AuthzError> {
        self.writes(rel, user, obj)
    }

    fn readable_indices(
        &self,
        rel: &RoleRelation<'_>,
        user: &Principal,
        candidates: &[&dyn Resource],
    ) -> Result<Vec<usize>, AuthzError> {
        let mut readable = Vec::new();
        for (index, obj) in candidates.iter().enumerate() {
            if self.owns(rel, user, *obj)? {
                readable.push(index);
            }
        }
        Ok(readable)
    }
}

/// 目标与请求者属于同一个 Facility
#[derive(Debug, Clone)]
pub struct IsFromSameFacility {
    field: String,
    read_only: bool,
}

impl IsFromSameFacility {
    pub fn field(field: &str) -> Self {
        Self {
            field: field.to_string(),
            read_only: false,
        }
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    fn same_facility(
        &self,
        rel: &RoleRelation<'_>,
        user: &Principal,
        obj: &dyn Resource,
    ) -> Result<bool, AuthzError> {
        // 快速路径：不属于任何 Facility 的主体直接拒绝
        let Some(facility_id) = user.facility_id() else {
            return Ok(false);
        };
        Ok(resolve_target(rel.store(), obj, &self.field)?
            .and_then(|target| target.facility_id())
            == Some(facility_id))
    }

    fn writes(
        &self,
        rel: &RoleRelation<'_>,
        user: &Principal,
        obj: &dyn Resource,
    ) -> Result<bool, AuthzError> {
        if self.read_only {
            return Ok(false);
        }
        self.same_facility(rel, user, obj)
    }
}

impl Default for IsFromSameFacility {
    fn default() -> Self {
        Self::field(".")
    }
}

impl PermissionRule for IsFromSameFacility {
    fn user_can_create_object(
        &self,
        rel: &RoleRelation<'_>,
        user: &Principal,
        obj: &dyn Resource,
    ) -> Result<bool, AuthzError> {
        self.writes(rel, user, obj)
    }

    fn user_can_read_object(
        &self,
        rel: &RoleRelation<'_>,
        user: &Principal,
        obj: &dyn Resource,
    ) -> Result<bool, AuthzError> {
        self.same_facility(rel, user, obj)
    }

    fn user_can_update_object(
        &self,
        rel: &RoleRelation<'_>,
        user: &Principal,
        obj: &dyn Resource,
    ) -> Result<bool, AuthzError> {
        self.writes(rel, user, obj)
    }

    fn user_can_delete_object(
        &self,
        rel: &RoleRelation<'_>,
        user: &Principal,
        obj: &dyn Resource,
    ) -> Result<bool, AuthzError> {
        self.writes(rel, user, obj)
    }

    fn readable_indices(
        &self,
        rel: &RoleRelation<'_>,
        user: &Principal,
        candidates: &[&dyn Resource],
    ) -> Result<Vec<usize>, AuthzError> {
        if user.facility_id().is_none() {
            return Ok(Vec::new());
        }
        let mut readable = Vec::new();
        for (index, obj) in candidates.iter().enumerate() {
            if self.same_facility(rel, user, *obj)? {
                readable.push(index);
            }
        }
        Ok(readable)
    }
}

//! 权限规则
//!
//! 每种资源类型配置一个 [`PermissionRule`]，回答四种 CRUD 单点检查，
//! 并给出与读检查等价的集合过滤。

pub mod algebra;
pub mod collection;
pub mod general;
pub mod registry;
pub mod role_based;
pub mod target;

pub use algebra::{rule, shared, All, Any, SharedRule};
pub use collection::CollectionPermissions;
pub use general::{IsFromSameFacility, IsOwn};
pub use registry::PermissionRegistry;
pub use role_based::{RoleBasedConfig, RoleBasedPermissions};
pub use target::resolve_target;

use crate::{
    error::AuthzError,
    models::{Principal, Resource},
    services::RoleRelation,
};
use std::{fmt, str::FromStr};

/// CRUD 操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

impl Operation {
    pub const ALL: [Operation; 4] = [
        Operation::Create,
        Operation::Read,
        Operation::Update,
        Operation::Delete,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "create" => Ok(Operation::Create),
            "read" => Ok(Operation::Read),
            "update" => Ok(Operation::Update),
            "delete" => Ok(Operation::Delete),
            other => Err(format!(
                "Invalid operation: {}. Must be one of: create, read, update, delete",
                other
            )),
        }
    }
}

/// 一种资源类型的授权策略
pub trait PermissionRule: Send + Sync + fmt::Debug {
    fn user_can_create_object(
        &self,
        rel: &RoleRelation<'_>,
        user: &Principal,
        obj: &dyn Resource,
    ) -> Result<bool, AuthzError>;

    fn user_can_read_object(
        &self,
        rel: &RoleRelation<'_>,
        user: &Principal,
        obj: &dyn Resource,
    ) -> Result<bool, AuthzError>;

    fn user_can_update_object(
        &self,
        rel: &RoleRelation<'_>,
        user: &Principal,
        obj: &dyn Resource,
    ) -> Result<bool, AuthzError>;

    fn user_can_delete_object(
        &self,
        rel: &RoleRelation<'_>,
        user: &Principal,
        obj: &dyn Resource,
    ) -> Result<bool, AuthzError>;

    /// 可读候选的下标，按升序排列
    fn readable_indices(
        &self,
        rel: &RoleRelation<'_>,
        user: &Principal,
        candidates: &[&dyn Resource],
    ) -> Result<Vec<usize>, AuthzError>;

    fn user_can(
        &self,
        op: Operation,
        rel: &RoleRelation<'_>,
        user: &Principal,
        obj: &dyn Resource,
    ) -> Result<bool, AuthzError> {
        match op {
            Operation::Create => self.user_can_create_object(rel, user, obj),
            Operation::Read => self.user_can_read_object(rel, user, obj),
            Operation::Update => self.user_can_update_object(rel, user, obj),
            Operation::Delete => self.user_can_delete_object(rel, user, obj),
        }
    }

    /// 候选中用户可读的子集，保持原有顺序
    fn readable_by_user_filter<'r>(
        &self,
        rel: &RoleRelation<'_>,
        user: &Principal,
        candidates: &[&'r dyn Resource],
    ) -> Result<Vec<&'r dyn Resource>, AuthzError> {
        let indices = self.readable_indices(rel, user, candidates)?;
        Ok(indices
            .into_iter()
            .filter_map(|i| candidates.get(i).copied())
            .collect())
    }
}

pub(crate) fn all_indices(len: usize) -> Vec<usize> {
    (0..len).collect()
}

/// 允许任何人执行任何操作
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl PermissionRule for AllowAll {
    fn user_can_create_object(
        &self,
        _rel: &RoleRelation<'_>,
        _user: &Principal,
        _obj: &dyn Resource,
    ) -> Result<bool, AuthzError> {
        Ok(true)
    }

    fn user_can_read_object(
        &self,
        _rel: &RoleRelation<'_>,
        _user: &Principal,
        _obj: &dyn Resource,
    ) -> Result<bool, AuthzError> {
        Ok(true)
    }

    fn user_can_update_object(
        &self,
        _rel: &RoleRelation<'_>,
        _user: &Principal,
        _obj: &dyn Resource,
    ) -> Result<bool, AuthzError> {
        Ok(true)
    }

    fn user_can_delete_object(
        &self,
        _rel: &RoleRelation<'_>,
        _user: &Principal,
        _obj: &dyn Resource,
    ) -> Result<bool, AuthzError> {
        Ok(true)
    }

    fn readable_indices(
        &self,
        _rel: &RoleRelation<'_>,
        _user: &Principal,
        candidates: &[&dyn Resource],
    ) -> Result<Vec<usize>, AuthzError> {
        Ok(all_indices(candidates.len()))
    }
}

/// 拒绝所有操作（超级用户仍可通过网关绕过）
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAll;

impl PermissionRule for DenyAll {
    fn user_can_create_object(
        &self,
        _rel: &RoleRelation<'_>,
        _user: &Principal,
        _obj: &dyn Resource,
    ) -> Result<bool, AuthzError> {
        Ok(false)
    }

    fn user_can_read_object(
        &self,
        _rel: &RoleRelation<'_>,
        _user: &Principal,
        _obj: &dyn Resource,
    ) -> Result<bool, AuthzError> {
        Ok(false)
    }

    fn user_can_update_object(
        &self,
        _rel: &RoleRelation<'_>,
        _user: &Principal,
        _obj: &dyn Resource,
    ) -> Result<bool, AuthzError> {
        Ok(false)
    }

    fn user_can_delete_object(
        &self,
        _rel: &RoleRelation<'_>,
        _user: &Principal,
        _obj: &dyn Resource,
    ) -> Result<bool, AuthzError> {
        Ok(false)
    }

    fn readable_indices(
        &self,
        _rel: &RoleRelation<'_>,
        _user: &Principal,
        _candidates: &[&dyn Resource],
    ) -> Result<Vec<usize>, AuthzError> {
        Ok(Vec::new())
    }
}

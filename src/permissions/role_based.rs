//! 基于角色的权限规则
//!
//! 为每个 CRUD 操作声明允许的角色，按 `target_field` 解析出的目标计算主体的关系。

use super::{
    all_indices,
    target::{resolve_target, validate_field_path},
    Operation, PermissionRule,
};
use crate::{
    error::AuthzError,
    models::{Principal, Resource, RoleRequirement, RoleSet},
    services::RoleRelation,
};
use serde::Deserialize;

fn default_target_field() -> String {
    "user".to_string()
}

/// 规则配置，也可以直接从配置文件反序列化
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleBasedConfig {
    #[serde(default = "default_target_field")]
    pub target_field: String,
    #[serde(default)]
    pub can_be_created_by: Option<Vec<RoleRequirement>>,
    #[serde(default)]
    pub can_be_read_by: Option<Vec<RoleRequirement>>,
    #[serde(default)]
    pub can_be_updated_by: Option<Vec<RoleRequirement>>,
    #[serde(default)]
    pub can_be_deleted_by: Option<Vec<RoleRequirement>>,
    /// create/update/delete 未单独配置时的回退
    #[serde(default)]
    pub can_be_written_by: Option<Vec<RoleRequirement>>,
}

impl Default for RoleBasedConfig {
    fn default() -> Self {
        Self {
            target_field: default_target_field(),
            can_be_created_by: None,
            can_be_read_by: None,
            can_be_updated_by: None,
            can_be_deleted_by: None,
            can_be_written_by: None,
        }
    }
}

fn collect_roles<R: Into<RoleRequirement>>(roles: impl IntoIterator<Item = R>) -> Vec<RoleRequirement> {
    roles.into_iter().map(Into::into).collect()
}

impl RoleBasedConfig {
    pub fn target(mut self, field: &str) -> Self {
        self.target_field = field.to_string();
        self
    }

    pub fn created_by<R: Into<RoleRequirement>>(mut self, roles: impl IntoIterator<Item = R>) -> Self {
        self.can_be_created_by = Some(collect_roles(roles));
        self
    }

    pub fn read_by<R: Into<RoleRequirement>>(mut self, roles: impl IntoIterator<Item = R>) -> Self {
        self.can_be_read_by = Some(collect_roles(roles));
        self
    }

    pub fn updated_by<R: Into<RoleRequirement>>(mut self, roles: impl IntoIterator<Item = R>) -> Self {
        self.can_be_updated_by = Some(collect_roles(roles));
        self
    }

    pub fn deleted_by<R: Into<RoleRequirement>>(mut self, roles: impl IntoIterator<Item = R>) -> Self {
        self.can_be_deleted_by = Some(collect_roles(roles));
        self
    }

    pub fn written_by<R: Into<RoleRequirement>>(mut self, roles: impl IntoIterator<Item = R>) -> Self {
        self.can_be_written_by = Some(collect_roles(roles));
        self
    }

    pub fn build(self) -> Result<RoleBasedPermissions, AuthzError> {
        RoleBasedPermissions::new(self)
    }
}

#[derive(Debug, Clone)]
pub struct RoleBasedPermissions {
    target_field: String,
    create: Option<Vec<RoleRequirement>>,
    read: Option<Vec<RoleRequirement>>,
    update: Option<Vec<RoleRequirement>>,
    delete: Option<Vec<RoleRequirement>>,
}

impl RoleBasedPermissions {
    pub fn builder() -> RoleBasedConfig {
        RoleBasedConfig::default()
    }

    /// 构建规则；具体写权限与 `can_be_written_by` 同时配置时报错
    pub fn new(config: RoleBasedConfig) -> Result<Self, AuthzError> {
        validate_field_path(&config.target_field)?;

        let written = config.can_be_written_by;
        let pick = |specific: Option<Vec<RoleRequirement>>, verb: &str| match (specific, &written) {
            (Some(_), Some(_)) => Err(AuthzError::Configuration(format!(
                "can_be_{}_by and can_be_written_by cannot both be set",
                verb
            ))),
            (Some(roles), None) => Ok(Some(roles)),
            (None, fallback) => Ok(fallback.clone()),
        };

        let create = pick(config.can_be_created_by, "created")?;
        let update = pick(config.can_be_updated_by, "updated")?;
        let delete = pick(config.can_be_deleted_by, "deleted")?;

        Ok(Self {
            target_field: config.target_field,
            create,
            read: config.can_be_read_by,
            update,
            delete,
        })
    }

    pub fn target_field(&self) -> &str {
        &self.target_field
    }

    /// 操作要求的角色；未配置属于配置错误
    pub fn required(&self, op: Operation) -> Result<&[RoleRequirement], AuthzError> {
        let roles = match op {
            Operation::Create => &self.create,
            Operation::Read => &self.read,
            Operation::Update => &self.update,
            Operation::Delete => &self.delete,
        };
        roles.as_deref().ok_or_else(|| {
            AuthzError::Configuration(format!(
                "no roles configured for {} on rule targeting `{}`",
                op, self.target_field
            ))
        })
    }

    fn check(
        &self,
        op: Operation,
        rel: &RoleRelation<'_>,
        user: &Principal,
        obj: &dyn Resource,
    ) -> Result<bool, AuthzError> {
        let required = self.required(op)?;
        if required.contains(&RoleRequirement::Anyone) {
            return Ok(true);
        }

        let roles = match resolve_target(rel.store(), obj, &self.target_field)? {
            Some(target) => rel.roles_for(user, &target)?,
            None if user.is_superuser() => RoleSet::universal(),
            None => RoleSet::empty(),
        };

        Ok(roles.satisfies(required))
    }
}

impl PermissionRule for RoleBasedPermissions {
    fn user_can_create_object(
        &self,
        rel: &RoleRelation<'_>,
        user: &Principal,
        obj: &dyn Resource,
    ) -> Result<bool, AuthzError> {
        self.check(Operation::Create, rel, user, obj)
    }

    fn user_can_read_object(
        &self,
        rel: &RoleRelation<'_>,
        user: &Principal,
        obj: &dyn Resource,
    ) -> Result<bool, AuthzError> {
        self.check(Operation::Read, rel, user, obj)
    }

    fn user_can_update_object(
        &self,
        rel: &RoleRelation<'_>,
        user: &Principal,
        obj: &dyn Resource,
    ) -> Result<bool, AuthzError> {
        self.check(Operation::Update, rel, user, obj)
    }

    fn user_can_delete_object(
        &self,
        rel: &RoleRelation<'_>,
        user: &Principal,
        obj: &dyn Resource,
    ) -> Result<bool, AuthzError> {
        self.check(Operation::Delete, rel, user, obj)
    }

    fn readable_indices(
        &self,
        rel: &RoleRelation<'_>,
        user: &Principal,
        candidates: &[&dyn Resource],
    ) -> Result<Vec<usize>, AuthzError> {
        let required = self.required(Operation::Read)?;
        let scope = rel.scope_for(user, required)?;
        if scope.is_unrestricted() {
            return Ok(all_indices(candidates.len()));
        }

        let mut readable = Vec::new();
        for (index, obj) in candidates.iter().enumerate() {
            let target = resolve_target(rel.store(), *obj, &self.target_field)?;
            if scope.admits(target.as_ref()) {
                readable.push(index);
            }
        }

        Ok(readable)
    }
}

//! 资源类型 → 权限规则 的映射
//!
//! 由服务层持有并传递，内核中没有全局注册表。

use super::{
    algebra::{rule, shared, Any, SharedRule},
    collection::CollectionPermissions,
    general::{IsFromSameFacility, IsOwn},
    role_based::{RoleBasedConfig, RoleBasedPermissions},
    DenyAll,
};
use crate::{
    error::AuthzError,
    models::{kinds, Resource, RoleKind, RoleRequirement},
};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct PermissionRegistry {
    rules: HashMap<String, SharedRule>,
}

impl PermissionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 内置资源类型的默认策略
    pub fn with_defaults() -> Result<Self, AuthzError> {
        let mut registry = Self::new();

        // 本人，或本 Facility 的管理员/教练
        registry.register(
            kinds::FACILITY_USER,
            shared(Any::new([
                shared(IsOwn::itself()),
                shared(
                    RoleBasedConfig::default()
                        .target(".")
                        .created_by([RoleKind::Admin])
                        .read_by([RoleKind::Admin, RoleKind::Coach])
                        .updated_by([RoleKind::Admin])
                        .deleted_by([RoleKind::Admin])
                        .build()?,
                ),
            ])?),
        );

        // 超级用户之外没有人可以操作
        registry.register(kinds::DEVICE_OWNER, rule::<DenyAll>());
        registry.register(kinds::ANONYMOUS_USER, rule::<DenyAll>());

        registry.register(
            kinds::COLLECTION,
            shared(Any::new([
                shared(CollectionPermissions::new()?),
                shared(IsFromSameFacility::default().read_only()),
            ])?),
        );

        registry.register(kinds::ROLE, Self::edge_rule()?);
        registry.register(kinds::MEMBERSHIP, Self::edge_rule()?);

        Ok(registry)
    }

    /// 角色分配与成员关系：本人只读，上级集合的管理员可增删
    fn edge_rule() -> Result<SharedRule, AuthzError> {
        Ok(shared(Any::new([
            shared(IsOwn::field("user").read_only()),
            shared(
                RoleBasedConfig::default()
                    .target("collection")
                    .created_by([RoleKind::Admin])
                    .read_by([RoleKind::Admin, RoleKind::Coach])
                    .updated_by(Vec::<RoleRequirement>::new())
                    .deleted_by([RoleKind::Admin])
                    .build()?,
            ),
        ])?))
    }

    /// 注册规则，返回被替换的旧规则
    pub fn register(&mut self, kind: &str, rule: SharedRule) -> Option<SharedRule> {
        self.rules.insert(kind.to_string(), rule)
    }

    /// 用配置中的策略覆盖或扩展注册表
    pub fn apply_policies(
        &mut self,
        policies: &HashMap<String, RoleBasedConfig>,
    ) -> Result<(), AuthzError> {
        for (kind, policy) in policies {
            let rule = RoleBasedPermissions::new(policy.clone()).map_err(|e| {
                AuthzError::Configuration(format!("policy `{}`: {}", kind, e))
            })?;
            let replaced = self.register(kind, shared(rule)).is_some();
            tracing::info!(kind = %kind, replaced, "Permission policy registered");
        }
        Ok(())
    }

    pub fn get(&self, kind: &str) -> Option<&SharedRule> {
        self.rules.get(kind)
    }

    /// 对象对应的规则；未注册的资源类型属于配置错误
    pub fn rule_for(&self, obj: &dyn Resource) -> Result<&SharedRule, AuthzError> {
        let kind = obj.resource_kind();
        self.rules.get(kind).ok_or_else(|| {
            AuthzError::Configuration(format!(
                "no permission rule registered for resource kind `{}`",
                kind
            ))
        })
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }
}

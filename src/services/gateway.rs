//! 权限检查网关
//!
//! Web/服务层唯一的入口。超级用户直接放行，不经过任何规则。

use super::RoleRelation;
use crate::{
    config::AppConfig,
    error::AuthzError,
    models::{Principal, Resource},
    permissions::{Operation, PermissionRegistry},
    repository::{CachedHierarchy, HierarchyStore},
};
use std::collections::BTreeMap;

pub struct PermissionGateway {
    registry: PermissionRegistry,
    request_cache: bool,
}

impl PermissionGateway {
    pub fn new(registry: PermissionRegistry) -> Self {
        Self {
            registry,
            request_cache: false,
        }
    }

    /// 默认策略加上配置中的覆盖
    pub fn from_config(config: &AppConfig) -> Result<Self, AuthzError> {
        let mut registry = PermissionRegistry::with_defaults()?;
        registry.apply_policies(&config.policies)?;
        Ok(Self::new(registry).with_request_cache(config.engine.request_cache))
    }

    /// 每次调用内缓存层级查询
    pub fn with_request_cache(mut self, enabled: bool) -> Self {
        self.request_cache = enabled;
        self
    }

    pub fn registry(&self) -> &PermissionRegistry {
        &self.registry
    }

    fn with_relation<T>(
        &self,
        store: &dyn HierarchyStore,
        f: impl FnOnce(&RoleRelation<'_>) -> Result<T, AuthzError>,
    ) -> Result<T, AuthzError> {
        if self.request_cache {
            let cached = CachedHierarchy::new(store);
            f(&RoleRelation::new(&cached))
        } else {
            f(&RoleRelation::new(store))
        }
    }

    /// 检查用户能否对对象执行操作；拒绝返回 `Ok(false)`
    pub fn authorize(
        &self,
        store: &dyn HierarchyStore,
        op: Operation,
        user: &Principal,
        obj: &dyn Resource,
    ) -> Result<bool, AuthzError> {
        if user.is_superuser() {
            record_decision(op, "bypass");
            return Ok(true);
        }

        let result = self.registry.rule_for(obj).and_then(|rule| {
            self.with_relation(store, |rel| rule.user_can(op, rel, user, obj))
        });

        match &result {
            Ok(allowed) => {
                record_decision(op, if *allowed { "allow" } else { "deny" });
                tracing::debug!(
                    user_id = ?user.id(),
                    operation = %op,
                    resource = obj.resource_kind(),
                    allowed = *allowed,
                    "Authorization decided"
                );
            }
            Err(e) => {
                record_decision(op, "error");
                tracing::error!(
                    user_id = ?user.id(),
                    operation = %op,
                    resource = obj.resource_kind(),
                    error = %e,
                    "Authorization check failed"
                );
            }
        }

        result
    }

    /// 检查权限，如果无权限则返回错误
    pub fn require(
        &self,
        store: &dyn HierarchyStore,
        op: Operation,
        user: &Principal,
        obj: &dyn Resource,
    ) -> Result<(), AuthzError> {
        if !self.authorize(store, op, user, obj)? {
            tracing::warn!(
                user_id = ?user.id(),
                operation = %op,
                resource = obj.resource_kind(),
                "Permission denied"
            );
            return Err(AuthzError::Forbidden);
        }
        Ok(())
    }

    /// 候选中用户可读的子集，保持原有顺序；候选可以混合多种资源类型
    pub fn filter_readable<'r>(
        &self,
        store: &dyn HierarchyStore,
        user: &Principal,
        candidates: &[&'r dyn Resource],
    ) -> Result<Vec<&'r dyn Resource>, AuthzError> {
        let positions = self.readable_positions(store, user, candidates)?;
        Ok(positions.into_iter().map(|i| candidates[i]).collect())
    }

    /// `filter_readable` 的类型化版本
    pub fn filter_readable_items<'r, T: Resource>(
        &self,
        store: &dyn HierarchyStore,
        user: &Principal,
        items: &'r [T],
    ) -> Result<Vec<&'r T>, AuthzError> {
        let candidates: Vec<&dyn Resource> = items.iter().map(|item| item as &dyn Resource).collect();
        let positions = self.readable_positions(store, user, &candidates)?;
        Ok(positions.into_iter().map(|i| &items[i]).collect())
    }

    fn readable_positions(
        &self,
        store: &dyn HierarchyStore,
        user: &Principal,
        candidates: &[&dyn Resource],
    ) -> Result<Vec<usize>, AuthzError> {
        if user.is_superuser() {
            return Ok((0..candidates.len()).collect());
        }

        // 按资源类型分组，每组交给对应的规则
        let mut groups: BTreeMap<&'static str, Vec<usize>> = BTreeMap::new();
        for (index, obj) in candidates.iter().enumerate() {
            groups.entry(obj.resource_kind()).or_default().push(index);
        }

        let mut readable = self.with_relation(store, |rel| {
            let mut readable = Vec::new();
            for (kind, indices) in &groups {
                let Some(rule) = self.registry.get(kind) else {
                    return Err(AuthzError::Configuration(format!(
                        "no permission rule registered for resource kind `{}`",
                        kind
                    )));
                };
                let subset: Vec<&dyn Resource> = indices.iter().map(|&i| candidates[i]).collect();
                for kept in rule.readable_indices(rel, user, &subset)? {
                    if let Some(&original) = indices.get(kept) {
                        readable.push(original);
                    }
                }
            }
            Ok(readable)
        })?;
        readable.sort_unstable();

        tracing::debug!(
            user_id = ?user.id(),
            candidates = candidates.len(),
            readable = readable.len(),
            "Readable filter applied"
        );

        Ok(readable)
    }
}

fn record_decision(op: Operation, outcome: &'static str) {
    metrics::counter!(
        "authz_decisions_total",
        "operation" => op.as_str(),
        "outcome" => outcome
    )
    .increment(1);
}

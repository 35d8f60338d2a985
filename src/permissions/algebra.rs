//! 规则组合：`Any`（或）与 `All`（与）
//!
//! 单点检查严格短路：一旦结果确定，后续子规则不会被调用。

use super::{all_indices, PermissionRule};
use crate::{
    error::AuthzError,
    models::{Principal, Resource},
    services::RoleRelation,
};
use std::{collections::BTreeSet, sync::Arc};

pub type SharedRule = Arc<dyn PermissionRule>;

/// 包装一个已构建的规则
pub fn shared<R: PermissionRule + 'static>(rule: R) -> SharedRule {
    Arc::new(rule)
}

/// 以默认配置实例化规则
pub fn rule<R: PermissionRule + Default + 'static>() -> SharedRule {
    Arc::new(R::default())
}

fn non_empty(rules: Vec<SharedRule>, combinator: &str) -> Result<Vec<SharedRule>, AuthzError> {
    if rules.is_empty() {
        return Err(AuthzError::Configuration(format!(
            "{} requires at least one rule",
            combinator
        )));
    }
    Ok(rules)
}

/// 任一子规则允许即允许
#[derive(Debug, Clone)]
pub struct Any {
    rules: Vec<SharedRule>,
}

impl Any {
    pub fn new(rules: impl IntoIterator<Item = SharedRule>) -> Result<Self, AuthzError> {
        Ok(Self {
            rules: non_empty(rules.into_iter().collect(), "Any")?,
        })
    }

    pub fn rules(&self) -> &[SharedRule] {
        &self.rules
    }

    fn any_of(
        &self,
        mut check: impl FnMut(&dyn PermissionRule) -> Result<bool, AuthzError>,
    ) -> Result<bool, AuthzError> {
        for rule in &self.rules {
            if check(rule.as_ref())? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl PermissionRule for Any {
    fn user_can_create_object(
        &self,
        rel: &RoleRelation<'_>,
        user: &Principal,
        obj: &dyn Resource,
    ) -> Result<bool, AuthzError> {
        self.any_of(|rule| rule.user_can_create_object(rel, user, obj))
    }

    fn user_can_read_object(
        &self,
        rel: &RoleRelation<'_>,
        user: &Principal,
        obj: &dyn Resource,
    ) -> Result<bool, AuthzError> {
        self.any_of(|rule| rule.user_can_read_object(rel, user, obj))
    }

    fn user_can_update_object(
        &self,
        rel: &RoleRelation<'_>,
        user: &Principal,
        obj: &dyn Resource,
    ) -> Result<bool, AuthzError> {
        self.any_of(|rule| rule.user_can_update_object(rel, user, obj))
    }

    fn user_can_delete_object(
        &self,
        rel: &RoleRelation<'_>,
        user: &Principal,
        obj: &dyn Resource,
    ) -> Result<bool, AuthzError> {
        self.any_of(|rule| rule.user_can_delete_object(rel, user, obj))
    }

    /// 每个子规则都基于原始候选集过滤，结果取并集
    fn readable_indices(
        &self,
        rel: &RoleRelation<'_>,
        user: &Principal,
        candidates: &[&dyn Resource],
    ) -> Result<Vec<usize>, AuthzError> {
        let mut union = BTreeSet::new();
        for rule in &self.rules {
            if union.len() == candidates.len() {
                break;
            }
            union.extend(rule.readable_indices(rel, user, candidates)?);
        }
        Ok(union.into_iter().collect())
    }
}

/// 全部子规则允许才允许
#[derive(Debug, Clone)]
pub struct All {
    rules: Vec<SharedRule>,
}

impl All {
    pub fn new(rules: impl IntoIterator<Item = SharedRule>) -> Result<Self, AuthzError> {
        Ok(Self {
            rules: non_empty(rules.into_iter().collect(), "All")?,
        })
    }

    pub fn rules(&self) -> &[SharedRule] {
        &self.rules
    }

    fn all_of(
        &self,
        mut check: impl FnMut(&dyn PermissionRule) -> Result<bool, AuthzError>,
    ) -> Result<bool, AuthzError> {
        for rule in &self.rules {
            if !check(rule.as_ref())? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl PermissionRule for All {
    fn user_can_create_object(
        &self,
        rel: &RoleRelation<'_>,
        user: &Principal,
        obj: &dyn Resource,
    ) -> Result<bool, AuthzError> {
        self.all_of(|rule| rule.user_can_create_object(rel, user, obj))
    }

    fn user_can_read_object(
        &self,
        rel: &RoleRelation<'_>,
        user: &Principal,
        obj: &dyn Resource,
    ) -> Result<bool, AuthzError> {
        self.all_of(|rule| rule.user_can_read_object(rel, user, obj))
    }

    fn user_can_update_object(
        &self,
        rel: &RoleRelation<'_>,
        user: &Principal,
        obj: &dyn Resource,
    ) -> Result<bool, AuthzError> {
        self.all_of(|rule| rule.user_can_update_object(rel, user, obj))
    }

    fn user_can_delete_object(
        &self,
        rel: &RoleRelation<'_>,
        user: &Principal,
        obj: &dyn Resource,
    ) -> Result<bool, AuthzError> {
        self.all_of(|rule| rule.user_can_delete_object(rel, user, obj))
    }

    /// 子规则依次过滤上一个子规则的输出
    fn readable_indices(
        &self,
        rel: &RoleRelation<'_>,
        user: &Principal,
        candidates: &[&dyn Resource],
    ) -> Result<Vec<usize>, AuthzError> {
        let mut survivors = all_indices(candidates.len());
        for rule in &self.rules {
            if survivors.is_empty() {
                break;
            }
            let subset: Vec<&dyn Resource> = survivors.iter().map(|&i| candidates[i]).collect();
            let kept = rule.readable_indices(rel, user, &subset)?;
            survivors = kept
                .into_iter()
                .filter_map(|k| survivors.get(k).copied())
                .collect();
        }
        Ok(survivors)
    }
}

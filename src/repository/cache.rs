//! 请求级缓存
//!
//! 只在一次授权调用内有效；跨调用复用会得到过期的授权结果。

use super::HierarchyStore;
use crate::{
    error::AuthzError,
    models::{Collection, Membership, Principal, RoleAssignment},
};
use std::{cell::RefCell, collections::HashMap, hash::Hash};
use uuid::Uuid;

pub struct CachedHierarchy<'a> {
    inner: &'a dyn HierarchyStore,
    ancestors: RefCell<HashMap<(Uuid, bool), Vec<Collection>>>,
    descendants: RefCell<HashMap<(Uuid, bool), Vec<Collection>>>,
    roles: RefCell<HashMap<Uuid, Vec<RoleAssignment>>>,
    memberships: RefCell<HashMap<Uuid, Vec<Membership>>>,
    members: RefCell<HashMap<Uuid, Vec<Membership>>>,
}

impl<'a> CachedHierarchy<'a> {
    pub fn new(inner: &'a dyn HierarchyStore) -> Self {
        Self {
            inner,
            ancestors: RefCell::default(),
            descendants: RefCell::default(),
            roles: RefCell::default(),
            memberships: RefCell::default(),
            members: RefCell::default(),
        }
    }
}

fn memoize<K, V>(
    cache: &RefCell<HashMap<K, V>>,
    key: K,
    load: impl FnOnce() -> Result<V, AuthzError>,
) -> Result<V, AuthzError>
where
    K: Eq + Hash,
    V: Clone,
{
    if let Some(hit) = cache.borrow().get(&key) {
        return Ok(hit.clone());
    }
    let value = load()?;
    cache.borrow_mut().insert(key, value.clone());
    Ok(value)
}

impl HierarchyStore for CachedHierarchy<'_> {
    fn user(&self, id: Uuid) -> Result<Option<Principal>, AuthzError> {
        self.inner.user(id)
    }

    fn collection(&self, id: Uuid) -> Result<Option<Collection>, AuthzError> {
        self.inner.collection(id)
    }

    fn ancestors(&self, id: Uuid, include_self: bool) -> Result<Vec<Collection>, AuthzError> {
        memoize(&self.ancestors, (id, include_self), || {
            self.inner.ancestors(id, include_self)
        })
    }

    fn descendants(&self, id: Uuid, include_self: bool) -> Result<Vec<Collection>, AuthzError> {
        memoize(&self.descendants, (id, include_self), || {
            self.inner.descendants(id, include_self)
        })
    }

    fn role_assignments_for(&self, user_id: Uuid) -> Result<Vec<RoleAssignment>, AuthzError> {
        memoize(&self.roles, user_id, || self.inner.role_assignments_for(user_id))
    }

    fn memberships(&self, user_id: Uuid) -> Result<Vec<Membership>, AuthzError> {
        memoize(&self.memberships, user_id, || self.inner.memberships(user_id))
    }

    fn members_of(&self, collection_id: Uuid) -> Result<Vec<Membership>, AuthzError> {
        memoize(&self.members, collection_id, || {
            self.inner.members_of(collection_id)
        })
    }
}

//! 目标字段解析
//!
//! `target_field` 为 `.` 时目标是对象自身，否则按 `.` 分隔的路径逐级读取字段。
//! 外键通过 HierarchyStore 加载，因此尚未保存的对象也可以被解析。

use crate::{
    error::AuthzError,
    models::{FieldValue, Resource, Target},
    repository::HierarchyStore,
};

/// 校验字段路径格式
pub(crate) fn validate_field_path(path: &str) -> Result<(), AuthzError> {
    if path == "." {
        return Ok(());
    }
    if path.is_empty() || path.split('.').any(|segment| segment.trim().is_empty()) {
        return Err(AuthzError::Configuration(format!(
            "Invalid target field: `{}`",
            path
        )));
    }
    Ok(())
}

/// 解析对象的检查目标；空引用返回 `None`
pub fn resolve_target(
    store: &dyn HierarchyStore,
    obj: &dyn Resource,
    path: &str,
) -> Result<Option<Target>, AuthzError> {
    if path == "." {
        return into_target(store, obj.resource_kind(), path, obj.this());
    }

    let segments: Vec<&str> = path.split('.').collect();
    resolve_path(store, obj, path, &segments)
}

fn resolve_path(
    store: &dyn HierarchyStore,
    resource: &dyn Resource,
    path: &str,
    segments: &[&str],
) -> Result<Option<Target>, AuthzError> {
    let Some((head, rest)) = segments.split_first() else {
        return Err(AuthzError::resolution(resource.resource_kind(), path));
    };

    let value = resource
        .field(head)
        .ok_or_else(|| AuthzError::resolution(resource.resource_kind(), path))?;

    if rest.is_empty() {
        return into_target(store, resource.resource_kind(), path, value);
    }

    match value {
        FieldValue::Record(next) => resolve_path(store, next, path, rest),
        FieldValue::User(user) => resolve_path(store, user, path, rest),
        FieldValue::Collection(collection) => resolve_path(store, collection, path, rest),
        FieldValue::UserId(id) => {
            let user = store
                .user(id)?
                .ok_or_else(|| AuthzError::resolution(resource.resource_kind(), path))?;
            resolve_path(store, &user, path, rest)
        }
        FieldValue::CollectionId(id) => {
            let collection = store
                .collection(id)?
                .ok_or_else(|| AuthzError::resolution(resource.resource_kind(), path))?;
            resolve_path(store, &collection, path, rest)
        }
        FieldValue::Null => Ok(None),
        FieldValue::Other(_) => Err(AuthzError::resolution(resource.resource_kind(), path)),
    }
}

fn into_target(
    store: &dyn HierarchyStore,
    resource: &str,
    path: &str,
    value: FieldValue<'_>,
) -> Result<Option<Target>, AuthzError> {
    match value {
        FieldValue::User(user) => Ok(Some(Target::User(user.clone()))),
        FieldValue::Collection(collection) => Ok(Some(Target::Collection(collection.clone()))),
        FieldValue::UserId(id) => store
            .user(id)?
            .map(|user| Some(Target::User(user)))
            .ok_or_else(|| AuthzError::resolution(resource, path)),
        FieldValue::CollectionId(id) => store
            .collection(id)?
            .map(|collection| Some(Target::Collection(collection)))
            .ok_or_else(|| AuthzError::resolution(resource, path)),
        FieldValue::Null => Ok(None),
        FieldValue::Record(record) => Err(AuthzError::type_mismatch(
            resource,
            path,
            record.resource_kind(),
        )),
        FieldValue::Other(found) => Err(AuthzError::type_mismatch(resource, path, found)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_field_path() {
        assert!(validate_field_path(".").is_ok());
        assert!(validate_field_path("user").is_ok());
        assert!(validate_field_path("membership.collection").is_ok());
        assert!(validate_field_path("").is_err());
        assert!(validate_field_path("a..b").is_err());
        assert!(validate_field_path("user.").is_err());
    }
}

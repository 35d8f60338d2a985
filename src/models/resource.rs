//! 受检对象抽象
//!
//! 权限规则不关心对象的具体类型，只通过 [`Resource`] 读取字段，
//! 再把字段解析为一个用户或一个集合节点（[`Target`]）。

use super::{collection::Collection, user::Principal};
use uuid::Uuid;

/// 资源类型名称
pub mod kinds {
    pub const DEVICE_OWNER: &str = "device_owner";
    pub const FACILITY_USER: &str = "facility_user";
    pub const ANONYMOUS_USER: &str = "anonymous_user";
    pub const COLLECTION: &str = "collection";
    pub const ROLE: &str = "role";
    pub const MEMBERSHIP: &str = "membership";
}

/// 字段取值
#[derive(Debug, Clone, Copy)]
pub enum FieldValue<'a> {
    /// 已加载的用户
    User(&'a Principal),
    /// 用户外键，需要通过 HierarchyStore 加载
    UserId(Uuid),
    /// 已加载的集合（可以是尚未保存的对象）
    Collection(&'a Collection),
    /// 集合外键
    CollectionId(Uuid),
    /// 嵌套对象，可继续按路径解析
    Record(&'a dyn Resource),
    /// 空引用，例如 Facility 的 parent
    Null,
    /// 其他标量，携带类型名用于报错
    Other(&'static str),
}

/// 可被权限规则检查的对象
pub trait Resource: std::fmt::Debug {
    /// 资源类型名称，网关据此查找对应的权限规则
    fn resource_kind(&self) -> &'static str;

    /// `target_field = "."` 时的目标
    fn this(&self) -> FieldValue<'_>;

    /// 按名称读取字段；字段不存在时返回 None
    fn field(&self, name: &str) -> Option<FieldValue<'_>>;
}

/// 解析后的检查目标
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    User(Principal),
    Collection(Collection),
}

impl Target {
    /// 目标所属的 Facility
    pub fn facility_id(&self) -> Option<Uuid> {
        match self {
            Target::User(user) => user.facility_id(),
            Target::Collection(collection) => Some(collection.facility_id),
        }
    }
}

impl From<Principal> for Target {
    fn from(user: Principal) -> Self {
        Target::User(user)
    }
}

impl From<Collection> for Target {
    fn from(collection: Collection) -> Self {
        Target::Collection(collection)
    }
}

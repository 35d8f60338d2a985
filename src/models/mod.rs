//! 数据模型模块
//! 主体、集合层级、角色与成员关系，以及受检对象的抽象

pub mod collection;
pub mod resource;
pub mod role;
pub mod user;

pub use collection::{Collection, CollectionKind};
pub use resource::{kinds, FieldValue, Resource, Target};
pub use role::{Membership, Relation, RoleAssignment, RoleKind, RoleRequirement, RoleSet};
pub use user::Principal;

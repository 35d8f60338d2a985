//! 服务层
//! 角色关系推导与权限检查网关

pub mod gateway;
pub mod role_relation;

pub use gateway::PermissionGateway;
pub use role_relation::{RoleRelation, RoleScope};

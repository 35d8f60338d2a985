//! Kolibri 权限内核
//! 基于 Facility → Classroom → LearnerGroup 层级与角色的授权判断

pub mod config;
pub mod error;
pub mod models;
pub mod permissions;
pub mod repository;
pub mod services;
pub mod telemetry;

pub use error::AuthzError;
pub use permissions::{Operation, PermissionRule};
pub use services::{PermissionGateway, RoleRelation};

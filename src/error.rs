//! 统一错误模型
//! 定义权限内核的错误分类
//!
//! 授权被拒绝不是错误：`authorize` 返回 `Ok(false)`。
//! 这里的变体都表示配置或数据结构上的问题，应当原样向上传播。

use thiserror::Error;
use uuid::Uuid;

/// 权限内核错误类型
#[derive(Debug, Error)]
pub enum AuthzError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Cannot resolve field `{field}` on {resource}")]
    Resolution { resource: String, field: String },

    #[error("Field `{field}` on {resource} resolved to {found}, expected a user or collection")]
    TypeMismatch {
        resource: String,
        field: String,
        found: String,
    },

    #[error("Hierarchy integrity violation: {0}")]
    Integrity(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: Uuid },

    #[error("Hierarchy store error: {0}")]
    Store(String),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("Access denied")]
    Forbidden,
}

impl AuthzError {
    /// 稳定的错误标签，用于日志和指标
    pub fn kind(&self) -> &'static str {
        match self {
            AuthzError::Configuration(_) => "configuration",
            AuthzError::Resolution { .. } => "resolution",
            AuthzError::TypeMismatch { .. } => "type_mismatch",
            AuthzError::Integrity(_) => "integrity",
            AuthzError::NotFound { .. } => "not_found",
            AuthzError::Store(_) => "store",
            AuthzError::Snapshot(_) => "snapshot",
            AuthzError::Forbidden => "forbidden",
        }
    }

    /// 调用方应当按内部错误（500）处理，而不是按拒绝访问（403）处理
    pub fn is_internal(&self) -> bool {
        !matches!(self, AuthzError::Forbidden | AuthzError::NotFound { .. })
    }

    pub(crate) fn resolution(resource: &str, field: &str) -> Self {
        AuthzError::Resolution {
            resource: resource.to_string(),
            field: field.to_string(),
        }
    }

    pub(crate) fn type_mismatch(resource: &str, field: &str, found: &str) -> Self {
        AuthzError::TypeMismatch {
            resource: resource.to_string(),
            field: field.to_string(),
            found: found.to_string(),
        }
    }
}

/// 从 config::ConfigError 转换
impl From<config::ConfigError> for AuthzError {
    fn from(e: config::ConfigError) -> Self {
        AuthzError::Configuration(e.to_string())
    }
}

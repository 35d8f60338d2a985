//! 错误处理单元测试
//!
//! 测试权限内核错误类型的各种行为

use kolibri_authz::error::AuthzError;
use uuid::Uuid;

// ==================== 错误分类测试 ====================

#[test]
fn test_error_kinds() {
    assert_eq!(AuthzError::Configuration("x".to_string()).kind(), "configuration");
    assert_eq!(
        AuthzError::Resolution {
            resource: "membership".to_string(),
            field: "collection".to_string(),
        }
        .kind(),
        "resolution"
    );
    assert_eq!(AuthzError::Integrity("cycle".to_string()).kind(), "integrity");
    assert_eq!(
        AuthzError::NotFound {
            kind: "user",
            id: Uuid::nil(),
        }
        .kind(),
        "not_found"
    );
    assert_eq!(AuthzError::Store("offline".to_string()).kind(), "store");
    assert_eq!(AuthzError::Forbidden.kind(), "forbidden");
}

#[test]
fn test_internal_errors() {
    // 配置与数据问题应当按内部错误处理
    assert!(AuthzError::Configuration("missing rule".to_string()).is_internal());
    assert!(AuthzError::Integrity("cycle".to_string()).is_internal());
    assert!(AuthzError::Store("offline".to_string()).is_internal());
    assert!(AuthzError::TypeMismatch {
        resource: "lesson".to_string(),
        field: "title".to_string(),
        found: "string".to_string(),
    }
    .is_internal());

    // 拒绝访问与资源不存在不是内部错误
    assert!(!AuthzError::Forbidden.is_internal());
    assert!(!AuthzError::NotFound {
        kind: "collection",
        id: Uuid::nil(),
    }
    .is_internal());
}

// ==================== 错误消息测试 ====================

#[test]
fn test_error_messages() {
    let err = AuthzError::Resolution {
        resource: "membership".to_string(),
        field: "collection".to_string(),
    };
    assert_eq!(err.to_string(), "Cannot resolve field `collection` on membership");

    let err = AuthzError::TypeMismatch {
        resource: "lesson".to_string(),
        field: "title".to_string(),
        found: "string".to_string(),
    };
    assert!(err.to_string().contains("expected a user or collection"));

    let id = Uuid::new_v4();
    let err = AuthzError::NotFound { kind: "facility", id };
    assert_eq!(err.to_string(), format!("facility not found: {}", id));

    assert_eq!(AuthzError::Forbidden.to_string(), "Access denied");
}

// ==================== 错误转换测试 ====================

#[test]
fn test_from_serde_json_error() {
    let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
    let err: AuthzError = json_err.into();
    assert!(matches!(err, AuthzError::Snapshot(_)));
    assert_eq!(err.kind(), "snapshot");
}

#[test]
fn test_from_config_error() {
    let config_err = config::ConfigError::Message("bad depth".to_string());
    let err: AuthzError = config_err.into();
    match err {
        AuthzError::Configuration(message) => assert!(message.contains("bad depth")),
        other => panic!("expected configuration error, got {:?}", other),
    }
}

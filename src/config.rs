//! 配置系统
//! 默认值 → 可选配置文件 → 环境变量（前缀 KOLIBRI_）

use crate::{
    permissions::{RoleBasedConfig, RoleBasedPermissions},
    repository::memory::DEFAULT_MAX_DEPTH,
};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::{collections::HashMap, path::Path};

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别: trace, debug, info, warn, error
    pub level: String,
    /// 日志格式: json, pretty
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// 祖先遍历的最大深度
    pub max_hierarchy_depth: usize,
    /// 是否在单次调用内缓存层级查询
    pub request_cache: bool,
    /// 层级快照文件（命令行工具使用）
    pub snapshot_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub engine: EngineConfig,
    /// 资源类型 → 基于角色的策略，覆盖内置默认策略
    #[serde(default)]
    pub policies: HashMap<String, RoleBasedConfig>,
}

impl AppConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// 从配置文件加载，环境变量仍然优先
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::load(Some(path.as_ref()))
    }

    fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut settings = Config::builder();

        // 添加默认配置
        settings = settings
            .set_default("logging.level", "info")?
            .set_default("logging.format", "json")?
            .set_default("engine.max_hierarchy_depth", DEFAULT_MAX_DEPTH as u64)?
            .set_default("engine.request_cache", true)?;

        if let Some(path) = path {
            settings = settings.add_source(File::from(path));
        }

        // 从环境变量加载配置（前缀为 KOLIBRI_）
        settings = settings.add_source(
            Environment::with_prefix("KOLIBRI")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = settings.build()?.try_deserialize()?;

        // 验证配置
        config.validate()?;

        Ok(config)
    }

    /// 验证配置合法性
    fn validate(&self) -> Result<(), ConfigError> {
        // 验证日志级别
        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                    self.logging.level
                )))
            }
        }

        // 验证日志格式
        match self.logging.format.to_lowercase().as_str() {
            "json" | "pretty" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid log format: {}. Must be one of: json, pretty",
                    self.logging.format
                )))
            }
        }

        // Facility → Classroom → LearnerGroup 至少需要 3 层
        if self.engine.max_hierarchy_depth < 3 || self.engine.max_hierarchy_depth > 64 {
            return Err(ConfigError::Message(
                "max_hierarchy_depth must be between 3 and 64".to_string(),
            ));
        }

        // 策略在启动时构建一次，提前暴露配置冲突
        for (kind, policy) in &self.policies {
            RoleBasedPermissions::new(policy.clone()).map_err(|e| {
                ConfigError::Message(format!("Invalid policy for {}: {}", kind, e))
            })?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RoleKind, RoleRequirement};
    use serial_test::serial;

    fn clear_env() {
        std::env::remove_var("KOLIBRI_LOGGING__LEVEL");
        std::env::remove_var("KOLIBRI_LOGGING__FORMAT");
        std::env::remove_var("KOLIBRI_ENGINE__MAX_HIERARCHY_DEPTH");
        std::env::remove_var("KOLIBRI_ENGINE__REQUEST_CACHE");
    }

    fn write_temp_config(contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("kolibri-authz-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    #[serial]
    fn test_config_defaults() {
        clear_env();

        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.engine.max_hierarchy_depth, DEFAULT_MAX_DEPTH);
        assert!(config.engine.request_cache);
        assert!(config.engine.snapshot_path.is_none());
        assert!(config.policies.is_empty());
    }

    #[test]
    #[serial]
    fn test_config_validation_invalid_log_level() {
        clear_env();
        std::env::set_var("KOLIBRI_LOGGING__LEVEL", "invalid");

        let result = AppConfig::from_env();
        assert!(result.is_err());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_config_validation_depth_too_small() {
        clear_env();
        std::env::set_var("KOLIBRI_ENGINE__MAX_HIERARCHY_DEPTH", "2");

        let result = AppConfig::from_env();
        assert!(result.is_err());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_config_file_policies() {
        clear_env();
        let path = write_temp_config(
            r#"
[engine]
request_cache = false

[policies.lesson]
target_field = "collection"
can_be_read_by = ["all"]
can_be_written_by = ["admin", "coach"]
"#,
        );

        let config = AppConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert!(!config.engine.request_cache);
        let lesson = &config.policies["lesson"];
        assert_eq!(lesson.target_field, "collection");
        assert_eq!(lesson.can_be_read_by, Some(vec![RoleRequirement::Anyone]));
        assert_eq!(
            lesson.can_be_written_by,
            Some(vec![RoleKind::Admin.into(), RoleKind::Coach.into()])
        );
    }

    #[test]
    #[serial]
    fn test_config_file_rejects_ambiguous_policy() {
        clear_env();
        let path = write_temp_config(
            r#"
[policies.lesson]
can_be_created_by = ["admin"]
can_be_written_by = ["admin"]
"#,
        );

        let result = AppConfig::from_file(&path);
        std::fs::remove_file(&path).ok();

        assert!(result.is_err());
    }
}

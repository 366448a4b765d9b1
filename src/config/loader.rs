//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `VOXBOOK_`，层级分隔符 `__`）
/// 2. 配置文件（config.toml 或 config.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `VOXBOOK_DATABASE__PATH=/data/voxbook.db`
/// - `VOXBOOK_SYNTHESIS__MAX_CONCURRENT=4`
/// - `VOXBOOK_SYNTHESIS__MAX_RETRIES=5`
/// - `VOXBOOK_LOG__LEVEL=debug`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 首先设置默认值（最低优先级）
    builder = builder
        .set_default("database.path", "data/voxbook.db")?
        .set_default("database.max_connections", 5)?
        .set_default("segmenter.min_chars", 20)?
        .set_default("synthesis.max_concurrent", 2)?
        .set_default("synthesis.max_retries", 3)?
        .set_default("synthesis.provider", "fake")?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    // 2. 添加配置文件（如果存在）
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 添加环境变量（最高优先级）
    // 前缀: VOXBOOK_，层级分隔符: __ (双下划线)
    // 例如: VOXBOOK_DATABASE__PATH=/data/voxbook.db
    builder = builder.add_source(
        Environment::with_prefix("VOXBOOK")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| ConfigError::ParseError(format!("Failed to deserialize config: {}", e)))?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.database.path.is_empty() {
        return Err(ConfigError::ValidationError(
            "Database path cannot be empty".to_string(),
        ));
    }

    if config.database.max_connections == 0 {
        return Err(ConfigError::ValidationError(
            "Database max_connections cannot be 0".to_string(),
        ));
    }

    if config.segmenter.min_chars == 0 {
        return Err(ConfigError::ValidationError(
            "Segmenter min_chars cannot be 0".to_string(),
        ));
    }

    if config.synthesis.max_concurrent == 0 {
        return Err(ConfigError::ValidationError(
            "Synthesis max_concurrent cannot be 0".to_string(),
        ));
    }

    if config.synthesis.provider.is_empty() {
        return Err(ConfigError::ValidationError(
            "Synthesis provider cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Database: {}", config.database.path);
    tracing::info!("Database Max Connections: {}", config.database.max_connections);
    tracing::info!("Segmenter Min Chars: {}", config.segmenter.min_chars);
    tracing::info!("Synthesis Provider: {}", config.synthesis.provider);
    tracing::info!("Synthesis Max Concurrent: {}", config.synthesis.max_concurrent);
    tracing::info!("Synthesis Max Retries: {}", config.synthesis.max_retries);
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.database.path, "data/voxbook.db");
        assert_eq!(config.synthesis.max_concurrent, 2);
    }

    #[test]
    fn test_validation_passes_for_valid_config() {
        let config = AppConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validation_error_for_empty_db_path() {
        let mut config = AppConfig::default();
        config.database.path = String::new();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_zero_concurrency() {
        let mut config = AppConfig::default();
        config.synthesis.max_concurrent = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_zero_min_chars() {
        let mut config = AppConfig::default();
        config.segmenter.min_chars = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_config_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[synthesis]\nmax_concurrent = 8\n\n[log]\nlevel = \"debug\"\n",
        )
        .unwrap();

        let config = load_config_from_path(Some(&path)).unwrap();
        assert_eq!(config.synthesis.max_concurrent, 8);
        assert_eq!(config.log.level, "debug");
        // 未出现在文件中的字段保持默认值
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no_such.toml");
        assert!(load_config_from_path(Some(&path)).is_err());
    }
}

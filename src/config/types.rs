//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 数据库配置
    #[serde(default)]
    pub database: DatabaseConfig,

    /// 分段器配置
    #[serde(default)]
    pub segmenter: SegmenterSettings,

    /// 合成配置
    #[serde(default)]
    pub synthesis: SynthesisConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 数据库配置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// 数据库文件路径
    #[serde(default = "default_db_path")]
    pub path: String,

    /// 最大连接数
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> String {
    "data/voxbook.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

impl DatabaseConfig {
    /// 获取数据库 URL
    pub fn database_url(&self) -> String {
        format!("sqlite:{}?mode=rwc", self.path)
    }

    /// 内存数据库（测试用）
    ///
    /// SQLite 内存库按连接隔离，必须限制为单连接。
    pub fn in_memory() -> Self {
        Self {
            path: ":memory:".to_string(),
            max_connections: 1,
        }
    }
}

/// 分段器配置
#[derive(Debug, Clone, Deserialize)]
pub struct SegmenterSettings {
    /// 片段最小字符数（不足则与后续内容合并）
    #[serde(default = "default_min_chars")]
    pub min_chars: usize,
}

fn default_min_chars() -> usize {
    20
}

impl Default for SegmenterSettings {
    fn default() -> Self {
        Self {
            min_chars: default_min_chars(),
        }
    }
}

/// 合成配置
#[derive(Debug, Clone, Deserialize)]
pub struct SynthesisConfig {
    /// 单任务内并发合成单元数
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// 瞬时失败的最大重试次数（超过后单元终止为 failed）
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// 默认 TTS 供应商标识
    #[serde(default = "default_provider")]
    pub provider: String,
}

fn default_max_concurrent() -> usize {
    2
}

fn default_max_retries() -> u32 {
    3
}

fn default_provider() -> String {
    "fake".to_string()
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            max_retries: default_max_retries(),
            provider: default_provider(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.database.path, "data/voxbook.db");
        assert_eq!(config.segmenter.min_chars, 20);
        assert_eq!(config.synthesis.max_retries, 3);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_database_url() {
        let config = DatabaseConfig::default();
        assert_eq!(config.database_url(), "sqlite:data/voxbook.db?mode=rwc");
    }

    #[test]
    fn test_in_memory_single_connection() {
        let config = DatabaseConfig::in_memory();
        assert_eq!(config.max_connections, 1);
    }
}

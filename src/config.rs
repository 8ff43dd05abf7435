use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

/// 程序配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 远程阶段服务的基础地址
    pub api_base_url: String,
    /// 单次阶段请求超时（秒）
    pub request_timeout_secs: u64,
    /// 是否尝试远程服务；关闭后直接使用本地模拟
    pub remote_enabled: bool,
    /// 参考答案、报表、会话的存放目录
    pub data_dir: PathBuf,
    /// 本地模拟的人为延迟（毫秒）
    pub mock_delay_ms: u64,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 远程服务的访问令牌
    pub api_token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8081".to_string(),
            request_timeout_secs: 30,
            remote_enabled: true,
            data_dir: PathBuf::from("assessai_data"),
            mock_delay_ms: 0,
            verbose_logging: false,
            api_token: None,
        }
    }
}

impl Config {
    /// 默认值 ← 配置文件（可选）← 环境变量
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        Ok(base.with_env_overrides())
    }

    /// 从 TOML 文件读取，缺省字段使用默认值
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::TomlParseFailed {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    fn with_env_overrides(self) -> Self {
        Self {
            api_base_url: std::env::var("ASSESS_API_BASE_URL").unwrap_or(self.api_base_url),
            request_timeout_secs: std::env::var("ASSESS_REQUEST_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(self.request_timeout_secs),
            remote_enabled: std::env::var("ASSESS_REMOTE_ENABLED").ok().and_then(|v| v.parse().ok()).unwrap_or(self.remote_enabled),
            data_dir: std::env::var("ASSESS_DATA_DIR").map(PathBuf::from).unwrap_or(self.data_dir),
            mock_delay_ms: std::env::var("ASSESS_MOCK_DELAY_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(self.mock_delay_ms),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(self.verbose_logging),
            api_token: std::env::var("ASSESS_API_TOKEN").ok().or(self.api_token),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn mock_delay(&self) -> Duration {
        Duration::from_millis(self.mock_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn file_values_override_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "api_base_url = \"http://grader:9000\"\nrequest_timeout_secs = 5\nremote_enabled = false"
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.api_base_url, "http://grader:9000");
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert!(!config.remote_enabled);
        assert_eq!(config.data_dir, PathBuf::from("assessai_data"));
    }

    #[test]
    fn invalid_toml_is_reported_with_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "request_timeout_secs = \"soon\"").unwrap();

        let err = Config::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::TomlParseFailed { .. }));
    }
}

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{AppError, AppResult, ConfigError, FileError};
use crate::services::availability_monitor::MonitorSettings;
use crate::services::progress_estimator::{ExpectedDurations, ProgressSettings};

/// 程序配置文件
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// 后端服务地址
    pub api_base_url: String,
    /// 单次请求超时（秒）
    pub request_timeout_secs: u64,
    /// 健康检查周期（秒）
    pub health_check_interval_secs: u64,
    /// 单次健康检查超时（毫秒）
    pub health_probe_timeout_ms: u64,
    /// 进度条刷新周期（毫秒）
    pub progress_tick_ms: u64,
    /// 进度条结束后保持显示的时间（毫秒）
    pub progress_reset_delay_ms: u64,
    /// 图片预计识别耗时（秒）
    pub expected_image_secs: u64,
    /// PDF 预计识别耗时（秒）
    pub expected_pdf_secs: u64,
    /// 界面偏好存储文件
    pub preference_file: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8000".to_string(),
            request_timeout_secs: 120,
            health_check_interval_secs: 10,
            health_probe_timeout_ms: 5000,
            progress_tick_ms: 100,
            progress_reset_delay_ms: 1500,
            expected_image_secs: 20,
            expected_pdf_secs: 60,
            preference_file: "preferences.toml".to_string(),
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 默认值 + 环境变量
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// 默认值 + 指定来源的变量
    pub(crate) fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let config = Self::default().with_overrides(lookup);
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文件加载配置，环境变量优先级高于文件
    pub fn from_file(path: &Path) -> AppResult<Self> {
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::file_read_failed(display.clone(), e))?;
        let config: Config = toml::from_str(&content).map_err(|e| FileError::TomlParseFailed {
            path: display,
            source: e,
        })?;

        let config = config.with_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    fn with_overrides(self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            api_base_url: lookup("LABEL_OCR_API_BASE_URL").unwrap_or(self.api_base_url),
            request_timeout_secs: env_or(&lookup, "LABEL_OCR_REQUEST_TIMEOUT_SECS", self.request_timeout_secs),
            health_check_interval_secs: env_or(&lookup, "LABEL_OCR_HEALTH_INTERVAL_SECS", self.health_check_interval_secs),
            health_probe_timeout_ms: env_or(&lookup, "LABEL_OCR_HEALTH_TIMEOUT_MS", self.health_probe_timeout_ms),
            progress_tick_ms: env_or(&lookup, "LABEL_OCR_PROGRESS_TICK_MS", self.progress_tick_ms),
            progress_reset_delay_ms: env_or(&lookup, "LABEL_OCR_PROGRESS_RESET_MS", self.progress_reset_delay_ms),
            expected_image_secs: env_or(&lookup, "LABEL_OCR_EXPECTED_IMAGE_SECS", self.expected_image_secs),
            expected_pdf_secs: env_or(&lookup, "LABEL_OCR_EXPECTED_PDF_SECS", self.expected_pdf_secs),
            preference_file: lookup("LABEL_OCR_PREFERENCE_FILE").unwrap_or(self.preference_file),
            verbose_logging: env_or(&lookup, "LABEL_OCR_VERBOSE", self.verbose_logging),
        }
    }

    /// 检查周期类配置，0 会让定时器空转
    pub fn validate(&self) -> Result<(), ConfigError> {
        let periods = [
            ("health_check_interval_secs", self.health_check_interval_secs),
            ("progress_tick_ms", self.progress_tick_ms),
            ("expected_image_secs", self.expected_image_secs),
            ("expected_pdf_secs", self.expected_pdf_secs),
        ];
        for (field, value) in periods {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    reason: "必须大于 0".to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn progress_settings(&self) -> ProgressSettings {
        ProgressSettings {
            tick: Duration::from_millis(self.progress_tick_ms),
            reset_delay: Duration::from_millis(self.progress_reset_delay_ms),
            expected: ExpectedDurations {
                image: Duration::from_secs(self.expected_image_secs),
                paged_document: Duration::from_secs(self.expected_pdf_secs),
            },
        }
    }

    pub fn monitor_settings(&self) -> MonitorSettings {
        MonitorSettings {
            period: Duration::from_secs(self.health_check_interval_secs),
            probe_timeout: Duration::from_millis(self.health_probe_timeout_ms),
        }
    }
}

/// 读取环境变量，解析失败时保留原值
fn env_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, var_name: &str, current: T) -> T {
    match lookup(var_name) {
        Some(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                warn!(
                    "{}",
                    ConfigError::EnvVarParseFailed {
                        var_name: var_name.to_string(),
                        value: raw,
                        expected_type: std::any::type_name::<T>().to_string(),
                    }
                );
                current
            }
        },
        None => current,
    }
}

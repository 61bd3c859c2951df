//! 界面偏好存储 - 业务能力层
//!
//! 只负责读写偏好文件（目前只有明暗主题），不影响识别流程

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{AppError, AppResult, FileError};
use crate::models::{Preferences, Theme};

/// 偏好存储
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    /// 使用指定文件路径创建
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 读取偏好，文件不存在时返回默认值
    pub async fn load(&self) -> AppResult<Preferences> {
        let path_display = self.path.display().to_string();
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("偏好文件不存在，使用默认值: {}", path_display);
                return Ok(Preferences::default());
            }
            Err(e) => return Err(AppError::file_read_failed(path_display, e)),
        };

        let preferences = toml::from_str(&content)
            .map_err(|e| FileError::TomlParseFailed { path: path_display, source: e })?;
        Ok(preferences)
    }

    /// 保存偏好
    pub async fn save(&self, preferences: &Preferences) -> AppResult<()> {
        let path_display = self.path.display().to_string();
        let content = toml::to_string(preferences).map_err(FileError::TomlSerializeFailed)?;

        tokio::fs::write(&self.path, content)
            .await
            .map_err(|e| AppError::file_write_failed(path_display, e))?;
        Ok(())
    }

    /// 设置主题并保存
    pub async fn set_theme(&self, theme: Theme) -> AppResult<Preferences> {
        let mut preferences = self.load().await?;
        preferences.theme = theme;
        self.save(&preferences).await?;
        info!("🎨 主题已切换为 {}", theme);
        Ok(preferences)
    }

    /// 切换明暗主题并保存
    pub async fn toggle_theme(&self) -> AppResult<Preferences> {
        let current = self.load().await?;
        self.set_theme(current.theme.toggled()).await
    }
}

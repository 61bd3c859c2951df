use serde::{Deserialize, Serialize};

use crate::models::MediaCategory;

/// 文字识别结果
///
/// 每次成功的识别请求只产生一次
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    #[serde(alias = "extracted_text")]
    pub text: String,
    #[serde(alias = "engine", default)]
    pub engine_name: String,
    #[serde(alias = "processing_time", default)]
    pub processing_time_seconds: f64,
    /// 仅 PDF 有页数
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages_processed: Option<u32>,
}

impl ExtractionResult {
    /// 是否识别出了可用于校验的文字（纯空白视为空）
    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }

    /// 按文档类别整理：图片不保留页数
    pub fn for_category(mut self, category: MediaCategory) -> Self {
        if category == MediaCategory::Image {
            self.pages_processed = None;
        }
        self
    }
}

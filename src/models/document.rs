//! 待识别文档
//!
//! 文档一旦选定就不可变；重新选择文件会整体替换它

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use phf::phf_map;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult, InputError};

/// 文档类别，决定预计耗时
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MediaCategory {
    /// 单张图片
    Image,
    /// 多页文档（PDF）
    PagedDocument,
}

impl MediaCategory {
    pub fn name(self) -> &'static str {
        match self {
            MediaCategory::Image => "图片",
            MediaCategory::PagedDocument => "PDF 文档",
        }
    }
}

impl fmt::Display for MediaCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 允许上传的文件类型
static ACCEPTED_MEDIA_TYPES: phf::Map<&'static str, MediaCategory> = phf_map! {
    "image/png" => MediaCategory::Image,
    "image/jpeg" => MediaCategory::Image,
    "image/jpg" => MediaCategory::Image,
    "image/bmp" => MediaCategory::Image,
    "image/tiff" => MediaCategory::Image,
    "application/pdf" => MediaCategory::PagedDocument,
};

/// 扩展名到声明类型
static EXTENSION_MEDIA_TYPES: phf::Map<&'static str, &'static str> = phf_map! {
    "png" => "image/png",
    "jpg" => "image/jpeg",
    "jpeg" => "image/jpeg",
    "bmp" => "image/bmp",
    "tif" => "image/tiff",
    "tiff" => "image/tiff",
    "pdf" => "application/pdf",
};

/// 根据声明的类型判断类别，不支持的类型返回 None
///
/// 忽略大小写和 `;` 之后的参数
pub fn category_for(content_type: &str) -> Option<MediaCategory> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    ACCEPTED_MEDIA_TYPES.get(essence.as_str()).copied()
}

/// 根据扩展名推断声明类型
pub fn content_type_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    EXTENSION_MEDIA_TYPES.get(ext.as_str()).copied()
}

/// 待识别文档
#[derive(Clone, PartialEq, Eq)]
pub struct Document {
    name: String,
    content_type: String,
    category: MediaCategory,
    bytes: Arc<[u8]>,
}

impl Document {
    /// 创建文档，类型不在白名单或内容为空时拒绝
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Result<Self, InputError> {
        let name = name.into();
        let content_type = content_type.into();
        let bytes = bytes.into();

        let category =
            category_for(&content_type).ok_or_else(|| InputError::UnsupportedMediaType {
                content_type: content_type.clone(),
            })?;

        if bytes.is_empty() {
            return Err(InputError::EmptyDocument { name });
        }

        Ok(Self {
            name,
            content_type,
            category,
            bytes,
        })
    }

    /// 从磁盘读取文档，类型由扩展名推断
    pub async fn from_path(path: &Path) -> AppResult<Self> {
        let display = path.display().to_string();
        let content_type = content_type_for_path(path).ok_or_else(|| {
            AppError::Input(InputError::UnknownExtension {
                path: display.clone(),
            })
        })?;

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| AppError::file_read_failed(display.clone(), e))?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or(display);

        Ok(Self::new(name, content_type, bytes)?)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn category(&self) -> MediaCategory {
        self.category
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("category", &self.category)
            .field("len", &self.bytes.len())
            .finish()
    }
}

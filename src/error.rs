use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// API 调用错误
    #[error("API错误: {0}")]
    Api(#[from] ApiError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 输入被拒绝（不支持的文件类型、空文件）
    #[error("输入错误: {0}")]
    Input(#[from] InputError),
    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(String),
}

/// API 调用错误
#[derive(Debug, Error)]
pub enum ApiError {
    /// 网络请求失败
    #[error("API请求失败 ({endpoint}): {source}")]
    RequestFailed {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    /// API 返回非 2xx 状态码
    #[error("API返回错误状态 ({endpoint}): HTTP {status}")]
    BadStatus { endpoint: String, status: u16 },
    /// API 返回 success=false
    #[error("API返回错误响应 ({endpoint}): {message}")]
    BadResponse { endpoint: String, message: String },
    /// JSON 解析失败
    #[error("JSON解析失败 ({endpoint}): {source}")]
    JsonParseFailed {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
    /// HTTP 客户端构建失败
    #[error("HTTP客户端初始化失败: {0}")]
    ClientBuildFailed(#[source] reqwest::Error),
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 文件不存在
    #[error("文件不存在: {path}")]
    NotFound { path: String },
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// TOML 序列化失败
    #[error("TOML序列化失败: {0}")]
    TomlSerializeFailed(#[source] toml::ser::Error),
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 配置值不合法
    #[error("配置项 {field} 不合法: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 输入被拒绝
///
/// 在本地处理，不会触发远程调用，也不会改变流程状态
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    /// 不支持的文件类型
    #[error("不支持的文件类型: {content_type}")]
    UnsupportedMediaType { content_type: String },
    /// 无法根据扩展名判断文件类型
    #[error("无法识别的文件扩展名: {path}")]
    UnknownExtension { path: String },
    /// 空文件
    #[error("文件内容为空: {name}")]
    EmptyDocument { name: String },
}

/// 远程调用失败（统一格式）
///
/// 所有传输错误、非 2xx 响应、解析错误都在调用边界被归一化为此类型，
/// 流程层永远不会看到原始的传输异常
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ServiceFailure {
    pub message: String,
}

impl ServiceFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<ApiError> for ServiceFailure {
    fn from(err: ApiError) -> Self {
        match err {
            // 后端给出的业务错误信息原样透出
            ApiError::BadResponse { message, .. } => ServiceFailure { message },
            other => ServiceFailure {
                message: other.to_string(),
            },
        }
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件读取错误
    pub fn file_read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source,
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

//! HTTP 执行器 - 基础设施层
//!
//! 持有唯一的 reqwest::Client 和后端地址，只暴露"发请求拿 JSON"的能力

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::ApiError;
use crate::models::Document;

/// HTTP 执行器
///
/// 职责：
/// - 持有唯一的 Client 资源（连接池）
/// - 暴露 GET / POST JSON / POST 文件 能力
/// - 统一检查状态码和 `success` 字段
/// - 不认识 ExtractionResult / ValidationResult
pub struct HttpExecutor {
    client: Client,
    base_url: String,
}

impl HttpExecutor {
    /// 创建新的 HTTP 执行器
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::ClientBuildFailed)?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// GET 请求并返回 JSON
    pub async fn get_json(&self, endpoint: &str) -> Result<JsonValue, ApiError> {
        debug!("GET {}", endpoint);
        let response = self
            .client
            .get(self.url(endpoint))
            .send()
            .await
            .map_err(|e| request_failed(endpoint, e))?;

        read_json(endpoint, response).await
    }

    /// POST JSON 请求体并返回 JSON
    pub async fn post_json(&self, endpoint: &str, body: &JsonValue) -> Result<JsonValue, ApiError> {
        debug!("POST {} (JSON)", endpoint);
        let response = self
            .client
            .post(self.url(endpoint))
            .json(body)
            .send()
            .await
            .map_err(|e| request_failed(endpoint, e))?;

        read_json(endpoint, response).await
    }

    /// 以 multipart 的 `file` 字段上传文档并返回 JSON
    pub async fn post_document(
        &self,
        endpoint: &str,
        document: &Document,
    ) -> Result<JsonValue, ApiError> {
        debug!(
            "POST {} (文件: {}, {} 字节, {})",
            endpoint,
            document.name(),
            document.len(),
            document.content_type()
        );

        let part = Part::bytes(document.bytes().to_vec())
            .file_name(document.name().to_string())
            .mime_str(document.content_type())
            .map_err(|e| request_failed(endpoint, e))?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(self.url(endpoint))
            .multipart(form)
            .send()
            .await
            .map_err(|e| request_failed(endpoint, e))?;

        read_json(endpoint, response).await
    }

    /// 仅检查是否返回 2xx，不关心响应内容
    pub async fn is_reachable(&self, endpoint: &str, timeout: Duration) -> bool {
        match self
            .client
            .get(self.url(endpoint))
            .timeout(timeout)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("健康检查请求失败: {}", e);
                false
            }
        }
    }
}

/// 把 JSON 反序列化为指定类型
pub fn decode<T: DeserializeOwned>(endpoint: &str, value: JsonValue) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| ApiError::JsonParseFailed {
        endpoint: endpoint.to_string(),
        source: e,
    })
}

fn request_failed(endpoint: &str, source: reqwest::Error) -> ApiError {
    ApiError::RequestFailed {
        endpoint: endpoint.to_string(),
        source,
    }
}

async fn read_json(endpoint: &str, response: Response) -> Result<JsonValue, ApiError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| request_failed(endpoint, e))?;

    if !status.is_success() {
        // 后端在错误状态码下通常也会带上说明
        let message = serde_json::from_str::<JsonValue>(&body)
            .ok()
            .and_then(|v| error_message(&v));
        return Err(match message {
            Some(message) => ApiError::BadResponse {
                endpoint: endpoint.to_string(),
                message,
            },
            None => ApiError::BadStatus {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            },
        });
    }

    let value: JsonValue = serde_json::from_str(&body).map_err(|e| ApiError::JsonParseFailed {
        endpoint: endpoint.to_string(),
        source: e,
    })?;

    check_envelope(endpoint, value)
}

/// 检查响应中的 `success` 字段
pub fn check_envelope(endpoint: &str, value: JsonValue) -> Result<JsonValue, ApiError> {
    if value.get("success").and_then(JsonValue::as_bool) == Some(false) {
        return Err(ApiError::BadResponse {
            endpoint: endpoint.to_string(),
            message: error_message(&value).unwrap_or_else(|| "未知错误".to_string()),
        });
    }
    Ok(value)
}

/// 依次尝试 `error` / `detail` / `message` 字段
fn error_message(value: &JsonValue) -> Option<String> {
    ["error", "detail", "message"]
        .iter()
        .find_map(|key| value.get(*key).and_then(JsonValue::as_str))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_false_becomes_bad_response() {
        let result = check_envelope(
            "/api/ocr/extract",
            json!({ "success": false, "error": "Failed to extract text" }),
        );

        match result {
            Err(ApiError::BadResponse { message, .. }) => {
                assert_eq!(message, "Failed to extract text")
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_detail_field_is_used_when_error_missing() {
        let result = check_envelope("/api/validate", json!({ "success": false, "detail": "boom" }));
        assert!(matches!(result, Err(ApiError::BadResponse { message, .. }) if message == "boom"));
    }

    #[test]
    fn test_envelope_without_success_flag_passes_through() {
        let value = json!({ "text": "hello" });
        let checked = check_envelope("/api/ocr/extract", value.clone()).unwrap();
        assert_eq!(checked, value);
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let executor = HttpExecutor::new("http://localhost:8000/", Duration::from_secs(1)).unwrap();
        assert_eq!(executor.base_url(), "http://localhost:8000");
        assert_eq!(executor.url("/api/health"), "http://localhost:8000/api/health");
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_not_reachable() {
        // 端口 9 (discard) 在测试环境中不会有 HTTP 服务
        let executor = HttpExecutor::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        assert!(!executor.is_reachable("/api/health", Duration::from_millis(500)).await);
    }
}

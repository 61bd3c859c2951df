/// 后端服务客户端
///
/// 封装识别、校验、比对、核准样本、健康检查五个接口。
/// 对流程层只暴露 `RemoteService` trait，所有失败在这里被归一化为 `ServiceFailure`
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::{json, Value as JsonValue};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{ApiError, ServiceFailure};
use crate::infrastructure::http_executor::{decode, HttpExecutor};
use crate::models::{ComparisonReport, Document, ExtractionResult, ValidationResult, VerifiedControl};
use crate::utils::truncate_text;

const EXTRACT_ENDPOINT: &str = "/api/ocr/extract";
const VALIDATE_ENDPOINT: &str = "/api/validate";
const CONTROLS_ENDPOINT: &str = "/api/verified-controls";
const COMPARE_ENDPOINT: &str = "/api/compare";
const HEALTH_ENDPOINT: &str = "/api/health";

/// 远程服务契约
///
/// 每个调用要么返回成功结果，要么返回 `ServiceFailure`，不会 panic，也不会抛出传输层错误
pub trait RemoteService: Send + Sync {
    /// 提交文档进行文字识别
    fn submit_document<'a>(
        &'a self,
        document: &'a Document,
    ) -> BoxFuture<'a, Result<ExtractionResult, ServiceFailure>>;

    /// 对识别出的文字做合规校验
    fn validate_text<'a>(
        &'a self,
        text: &'a str,
    ) -> BoxFuture<'a, Result<ValidationResult, ServiceFailure>>;

    /// 已核准的标签样本列表
    fn list_verified_controls(&self) -> BoxFuture<'_, Result<Vec<VerifiedControl>, ServiceFailure>>;

    /// 与已核准样本比对
    fn run_comparison<'a>(
        &'a self,
        document: &'a Document,
    ) -> BoxFuture<'a, Result<ComparisonReport, ServiceFailure>>;

    /// 后端是否可达
    fn probe_health(&self) -> BoxFuture<'_, bool>;
}

/// 基于 HTTP 的后端客户端
pub struct HttpRemoteService {
    executor: HttpExecutor,
    probe_timeout: Duration,
}

impl HttpRemoteService {
    /// 创建新的后端客户端
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        Ok(Self {
            executor: HttpExecutor::new(&config.api_base_url, config.request_timeout())?,
            probe_timeout: Duration::from_millis(config.health_probe_timeout_ms),
        })
    }

    pub fn base_url(&self) -> &str {
        self.executor.base_url()
    }

    async fn extract(&self, document: &Document) -> Result<ExtractionResult, ApiError> {
        let value = self.executor.post_document(EXTRACT_ENDPOINT, document).await?;
        let result: ExtractionResult = decode(EXTRACT_ENDPOINT, payload(value))?;

        debug!(
            "识别结果: 引擎 {} | 耗时 {:.2}s | 文本: {}",
            result.engine_name,
            result.processing_time_seconds,
            truncate_text(&result.text, 80)
        );

        Ok(result.for_category(document.category()))
    }

    async fn validate(&self, text: &str) -> Result<ValidationResult, ApiError> {
        let value = self
            .executor
            .post_json(VALIDATE_ENDPOINT, &json!({ "text": text }))
            .await?;
        decode(VALIDATE_ENDPOINT, payload(value))
    }

    async fn controls(&self) -> Result<Vec<VerifiedControl>, ApiError> {
        let value = self.executor.get_json(CONTROLS_ENDPOINT).await?;
        // 兼容 `[...]`、`{controls: [...]}`、`{data: [...]}` 三种形式
        let list = match value {
            JsonValue::Object(mut map) => match map.remove("controls") {
                Some(controls) => controls,
                None => payload(JsonValue::Object(map)),
            },
            other => other,
        };
        decode(CONTROLS_ENDPOINT, list)
    }

    async fn compare(&self, document: &Document) -> Result<ComparisonReport, ApiError> {
        let value = self.executor.post_document(COMPARE_ENDPOINT, document).await?;
        decode(COMPARE_ENDPOINT, payload(value))
    }
}

/// 有 `data` 字段时取 `data`，否则整个对象就是结果
fn payload(value: JsonValue) -> JsonValue {
    match value {
        JsonValue::Object(mut map) => match map.remove("data") {
            Some(data) if !data.is_null() => data,
            _ => JsonValue::Object(map),
        },
        other => other,
    }
}

fn normalize<T>(operation: &str, result: Result<T, ApiError>) -> Result<T, ServiceFailure> {
    result.map_err(|e| {
        warn!("⚠️ {} 失败: {}", operation, e);
        ServiceFailure::from(e)
    })
}

impl RemoteService for HttpRemoteService {
    fn submit_document<'a>(
        &'a self,
        document: &'a Document,
    ) -> BoxFuture<'a, Result<ExtractionResult, ServiceFailure>> {
        async move { normalize("文字识别", self.extract(document).await) }.boxed()
    }

    fn validate_text<'a>(
        &'a self,
        text: &'a str,
    ) -> BoxFuture<'a, Result<ValidationResult, ServiceFailure>> {
        async move { normalize("合规校验", self.validate(text).await) }.boxed()
    }

    fn list_verified_controls(&self) -> BoxFuture<'_, Result<Vec<VerifiedControl>, ServiceFailure>> {
        async move { normalize("获取核准样本", self.controls().await) }.boxed()
    }

    fn run_comparison<'a>(
        &'a self,
        document: &'a Document,
    ) -> BoxFuture<'a, Result<ComparisonReport, ServiceFailure>> {
        async move { normalize("标签比对", self.compare(document).await) }.boxed()
    }

    fn probe_health(&self) -> BoxFuture<'_, bool> {
        async move {
            self.executor
                .is_reachable(HEALTH_ENDPOINT, self.probe_timeout)
                .await
        }
        .boxed()
    }
}

//! 文档处理流程 - 流程层
//!
//! 核心职责：编排"一个文档"的完整处理流程
//!
//! 流程顺序：
//! 1. 选择文件（任何阶段都可以重新选择，立即取消进度模拟）
//! 2. 识别（同时启动进度估算）
//! 3. 识别出非空文本 → 自动校验（无需用户操作）
//! 4. 完成 / 失败
//!
//! 所有状态修改都在同一个驱动任务里完成；远程调用在独立任务中执行，
//! 结果带着发出时的文档编号回到驱动任务，编号过期的结果直接丢弃。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::clients::RemoteService;
use crate::error::{InputError, ServiceFailure};
use crate::infrastructure::ScheduledTask;
use crate::models::{Document, ExtractionResult, ProgressSnapshot, ValidationResult};
use crate::services::{ProgressEstimator, ProgressSettings};
use crate::utils::truncate_text;
use crate::workflow::workflow_state::{DocumentId, WorkflowState};

/// 用户命令
#[derive(Debug)]
enum FlowCommand {
    Select { id: DocumentId, document: Document },
    Extract,
}

/// 远程调用完成
#[derive(Debug)]
enum Completion {
    Extraction {
        id: DocumentId,
        outcome: Result<ExtractionResult, ServiceFailure>,
    },
    Validation {
        id: DocumentId,
        outcome: Result<ValidationResult, ServiceFailure>,
    },
}

/// 文档处理流程
///
/// - 对外只暴露命令和只读的状态订阅
/// - 不持有 WorkflowState 的可写副本
/// - drop 时停止驱动任务、进度定时器和未完成的调用
pub struct DocumentFlow {
    commands: mpsc::UnboundedSender<FlowCommand>,
    state: watch::Receiver<WorkflowState>,
    progress: watch::Receiver<ProgressSnapshot>,
    next_id: AtomicU64,
    driver: ScheduledTask,
}

impl DocumentFlow {
    /// 启动流程
    pub fn spawn(service: Arc<dyn RemoteService>, settings: ProgressSettings) -> Self {
        let (commands, inbox) = mpsc::unbounded_channel();
        let (publisher, state) = watch::channel(WorkflowState::default());
        let estimator = ProgressEstimator::new(settings);
        let progress = estimator.subscribe();

        let driver = FlowDriver {
            state: WorkflowState::default(),
            publisher,
            estimator,
            service,
            calls: JoinSet::new(),
        };

        Self {
            commands,
            state,
            progress,
            next_id: AtomicU64::new(0),
            driver: ScheduledTask::spawn("document-flow", driver.run(inbox)),
        }
    }

    /// 选择文档，返回本次选择的编号
    pub fn select(&self, document: Document) -> DocumentId {
        let id = DocumentId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.send(FlowCommand::Select { id, document });
        id
    }

    /// 选择上传的文件（拖拽 / 文件选择框）
    ///
    /// 类型不支持或内容为空时在本地拒绝，不发请求，也不改变状态
    pub fn select_upload(
        &self,
        name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<DocumentId, InputError> {
        let document = Document::new(name, content_type, bytes).map_err(|e| {
            warn!("⚠️ 文件被拒绝: {}", e);
            e
        })?;
        Ok(self.select(document))
    }

    /// 开始识别当前选中的文档
    pub fn extract(&self) {
        self.send(FlowCommand::Extract);
    }

    /// 当前状态快照
    pub fn snapshot(&self) -> WorkflowState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<WorkflowState> {
        self.state.clone()
    }

    pub fn progress(&self) -> watch::Receiver<ProgressSnapshot> {
        self.progress.clone()
    }

    /// 等待指定文档的这一轮不再自动推进
    ///
    /// 如果期间又选择了更新的文档，返回那时的状态
    pub async fn wait_until_settled(&self, id: DocumentId) -> WorkflowState {
        let mut state = self.state.clone();
        let settled = state
            .wait_for(|s| match s.document_id() {
                Some(current) if current == id => s.is_settled(),
                Some(current) => current > id,
                None => false,
            })
            .await
            .map(|s| s.clone());

        match settled {
            Ok(s) => s,
            Err(_) => self.snapshot(),
        }
    }

    /// 停止流程
    pub fn shutdown(self) {
        debug!("停止流程: {}", self.driver.name());
        self.driver.cancel();
    }

    fn send(&self, command: FlowCommand) {
        if self.commands.send(command).is_err() {
            error!("流程已停止，命令被忽略");
        }
    }
}

/// 驱动任务：WorkflowState 的唯一所有者
struct FlowDriver {
    state: WorkflowState,
    publisher: watch::Sender<WorkflowState>,
    estimator: ProgressEstimator,
    service: Arc<dyn RemoteService>,
    calls: JoinSet<Completion>,
}

impl FlowDriver {
    async fn run(mut self, mut inbox: mpsc::UnboundedReceiver<FlowCommand>) {
        loop {
            tokio::select! {
                command = inbox.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(joined) = self.calls.join_next(), if !self.calls.is_empty() => match joined {
                    Ok(completion) => self.handle_completion(completion),
                    Err(e) => error!("远程调用任务异常结束: {}", e),
                },
            }
        }
        debug!("流程驱动任务结束");
    }

    fn handle_command(&mut self, command: FlowCommand) {
        match command {
            FlowCommand::Select { id, document } => self.on_select(id, document),
            FlowCommand::Extract => self.on_extract(),
        }
    }

    fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Extraction { id, outcome } => self.on_extraction_finished(id, outcome),
            Completion::Validation { id, outcome } => self.on_validation_finished(id, outcome),
        }
    }

    fn on_select(&mut self, id: DocumentId, document: Document) {
        info!(
            "📄 已选择文件 {}: {} ({}, {} 字节)",
            id,
            document.name(),
            document.category(),
            document.len()
        );
        // 进度模拟立即停止；已发出的请求不取消，返回后按编号丢弃
        self.estimator.cancel();
        self.state.select(id, document);
        self.publish();
    }

    fn on_extract(&mut self) {
        let Some((id, document)) = self.state.begin_extraction() else {
            warn!("⚠️ 当前状态为「{}」，不能开始识别", self.state.phase());
            return;
        };

        info!("🔍 开始识别 {}: {}", id, document.name());
        self.estimator.start(document.category());
        self.publish();

        let service = Arc::clone(&self.service);
        self.calls.spawn(async move {
            let outcome = service.submit_document(&document).await;
            Completion::Extraction { id, outcome }
        });
    }

    fn on_extraction_finished(&mut self, id: DocumentId, outcome: Result<ExtractionResult, ServiceFailure>) {
        match outcome {
            Ok(result) => {
                let preview = truncate_text(&result.text, 60);
                let engine = result.engine_name.clone();
                if !self.state.record_extraction(id, result) {
                    debug!("丢弃过期的识别结果 {}", id);
                    return;
                }
                self.estimator.succeed();
                self.publish();
                info!("✓ 识别完成 {} (引擎: {}): {}", id, engine, preview);

                // 识别结果已发布，才开始校验
                self.start_validation();
            }
            Err(failure) => {
                let message = failure.message.clone();
                if !self.state.record_extraction_failure(id, failure) {
                    debug!("丢弃过期的识别失败 {}: {}", id, message);
                    return;
                }
                self.estimator.fail();
                self.publish();
                warn!("❌ 识别失败 {}: {}", id, message);
            }
        }
    }

    /// Extracted → Validating
    fn start_validation(&mut self) {
        let Some((id, text)) = self.state.begin_validation() else {
            info!("识别文本为空，跳过合规校验");
            return;
        };

        info!("🧪 自动开始合规校验 {}", id);
        self.publish();

        let service = Arc::clone(&self.service);
        self.calls.spawn(async move {
            let outcome = service.validate_text(&text).await;
            Completion::Validation { id, outcome }
        });
    }

    fn on_validation_finished(&mut self, id: DocumentId, outcome: Result<ValidationResult, ServiceFailure>) {
        match outcome {
            Ok(result) => {
                let risk = result.risk_level.clone();
                if !self.state.record_validation(id, result) {
                    debug!("丢弃过期的校验结果 {}", id);
                    return;
                }
                self.publish();
                info!("✅ 校验完成 {}: 风险等级 {}", id, risk);
            }
            Err(failure) => {
                let message = failure.message.clone();
                if !self.state.record_validation_failure(id, failure) {
                    debug!("丢弃过期的校验失败 {}: {}", id, message);
                    return;
                }
                self.publish();
                warn!("⚠️ 校验失败 {}，保留识别结果: {}", id, message);
            }
        }
    }

    fn publish(&self) {
        self.publisher.send_replace(self.state.clone());
    }
}

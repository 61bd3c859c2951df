//! 流程状态
//!
//! 一次"选文件 → 识别 → 自动校验 → 结果"的完整状态，以及所有合法的状态迁移。
//! 这里只有纯数据操作，不发请求、不碰定时器；不匹配当前阶段或文档编号的迁移一律拒绝。

use std::fmt;

use crate::error::ServiceFailure;
use crate::models::{Document, ExtractionResult, ValidationResult};

/// 流程阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Selected,
    Extracting,
    Extracted,
    Validating,
    Completed,
    Failed,
}

impl Phase {
    pub fn name(self) -> &'static str {
        match self {
            Phase::Idle => "等待选择文件",
            Phase::Selected => "已选择文件",
            Phase::Extracting => "识别中",
            Phase::Extracted => "识别完成",
            Phase::Validating => "校验中",
            Phase::Completed => "已完成",
            Phase::Failed => "失败",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 文档编号
///
/// 每次选择文件递增；远程调用带着发出时的编号，返回时编号不一致就丢弃
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(pub u64);

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 出错的环节
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStage {
    Extraction,
    Validation,
}

/// 最近一次错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowError {
    pub stage: FlowStage,
    pub message: String,
}

impl fmt::Display for FlowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.stage {
            FlowStage::Extraction => write!(f, "识别失败: {}", self.message),
            FlowStage::Validation => write!(f, "校验失败: {}", self.message),
        }
    }
}

/// 流程状态（唯一数据源）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkflowState {
    phase: Phase,
    document_id: Option<DocumentId>,
    document: Option<Document>,
    extraction: Option<ExtractionResult>,
    validation: Option<ValidationResult>,
    last_error: Option<FlowError>,
}

impl WorkflowState {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn document_id(&self) -> Option<DocumentId> {
        self.document_id
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    pub fn extraction(&self) -> Option<&ExtractionResult> {
        self.extraction.as_ref()
    }

    pub fn validation(&self) -> Option<&ValidationResult> {
        self.validation.as_ref()
    }

    pub fn last_error(&self) -> Option<&FlowError> {
        self.last_error.as_ref()
    }

    /// 本轮不会再自动推进
    ///
    /// 识别出空文本时停在 `Extracted`；有文本时 `Extracted` 之后必然进入 `Validating`
    pub fn is_settled(&self) -> bool {
        match self.phase {
            Phase::Completed | Phase::Failed => true,
            Phase::Extracted => !self.extraction.as_ref().is_some_and(ExtractionResult::has_text),
            _ => false,
        }
    }

    /// 选择新文档：任何阶段都可以，一次性清空所有派生数据
    pub(crate) fn select(&mut self, id: DocumentId, document: Document) {
        *self = WorkflowState {
            phase: Phase::Selected,
            document_id: Some(id),
            document: Some(document),
            ..WorkflowState::default()
        };
    }

    /// Selected → Extracting，返回需要提交的文档
    pub(crate) fn begin_extraction(&mut self) -> Option<(DocumentId, Document)> {
        if self.phase != Phase::Selected {
            return None;
        }
        let id = self.document_id?;
        let document = self.document.clone()?;
        self.phase = Phase::Extracting;
        Some((id, document))
    }

    /// Extracting → Extracted
    pub(crate) fn record_extraction(&mut self, id: DocumentId, result: ExtractionResult) -> bool {
        if !self.expects(Phase::Extracting, id) {
            return false;
        }
        self.extraction = Some(result);
        self.phase = Phase::Extracted;
        true
    }

    /// Extracting → Failed
    pub(crate) fn record_extraction_failure(&mut self, id: DocumentId, failure: ServiceFailure) -> bool {
        if !self.expects(Phase::Extracting, id) {
            return false;
        }
        self.phase = Phase::Failed;
        self.last_error = Some(FlowError {
            stage: FlowStage::Extraction,
            message: failure.message,
        });
        true
    }

    /// Extracted → Validating，文本为空时不迁移
    pub(crate) fn begin_validation(&mut self) -> Option<(DocumentId, String)> {
        if self.phase != Phase::Extracted {
            return None;
        }
        let id = self.document_id?;
        let text = self
            .extraction
            .as_ref()
            .filter(|e| e.has_text())
            .map(|e| e.text.clone())?;
        self.phase = Phase::Validating;
        Some((id, text))
    }

    /// Validating → Completed
    pub(crate) fn record_validation(&mut self, id: DocumentId, result: ValidationResult) -> bool {
        if !self.expects(Phase::Validating, id) {
            return false;
        }
        self.validation = Some(result);
        self.phase = Phase::Completed;
        true
    }

    /// Validating → Completed（降级）：保留识别结果，记录校验错误
    pub(crate) fn record_validation_failure(&mut self, id: DocumentId, failure: ServiceFailure) -> bool {
        if !self.expects(Phase::Validating, id) {
            return false;
        }
        self.validation = None;
        self.phase = Phase::Completed;
        self.last_error = Some(FlowError {
            stage: FlowStage::Validation,
            message: failure.message,
        });
        true
    }

    fn expects(&self, phase: Phase, id: DocumentId) -> bool {
        self.phase == phase && self.document_id == Some(id)
    }
}

//! # Label OCR Client
//!
//! 药品标签识别与合规校验客户端
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源，只暴露能力
//! - `HttpExecutor` - 唯一的 HTTP client owner，提供 GET / POST / multipart 能力
//! - `ScheduledTask` - drop 即取消的后台任务
//!
//! ### ② 远程服务（Clients）
//! - `RemoteService` - 识别 / 校验 / 比对 / 核准样本 / 健康检查
//! - 所有失败统一为 `ServiceFailure { message }`
//!
//! ### ③ 业务能力层（Services）
//! - `ProgressEstimator` - 模拟识别进度
//! - `AvailabilityMonitor` - 周期性健康检查
//! - `PreferenceStore` - 界面主题
//!
//! ### ④ 流程层（Workflow）
//! - `WorkflowState` - 状态与合法迁移
//! - `DocumentFlow` - 选择 → 识别 → 自动校验 → 结果
//!
//! ### ⑤ 编排层（Orchestration）
//! - `orchestrator/app` - 命令行应用
//! - `orchestrator/renderer` - 终端渲染
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::{HttpRemoteService, RemoteService};
pub use config::Config;
pub use error::{AppError, AppResult, ServiceFailure};
pub use models::{Document, MediaCategory};
pub use orchestrator::{App, Command};
pub use workflow::{DocumentFlow, DocumentId, Phase, WorkflowState};

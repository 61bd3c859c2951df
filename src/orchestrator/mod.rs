//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 把命令行命令翻译成对流程层和远程服务的调用，并把结果渲染到终端。
//!
//! ## 模块划分
//!
//! ### `app` - 命令行应用
//! - 管理应用生命周期（初始化、运行、停止后台任务）
//! - 持有 RemoteService 和 AvailabilityMonitor
//! - verify 命令驱动 DocumentFlow 并实时显示进度
//!
//! ### `renderer` - 终端渲染
//! - 纯函数，按主题把状态和进度映射为带颜色的文本
//!
//! ## 层次关系
//!
//! ```text
//! app (处理一条命令)
//!     ↓
//! workflow::DocumentFlow (处理单个文档)
//!     ↓
//! services (能力层：进度估算 / 健康检查 / 偏好)
//!     ↓
//! clients (RemoteService)
//!     ↓
//! infrastructure (基础设施：HttpExecutor / ScheduledTask)
//! ```

pub mod app;
pub mod renderer;

// 重新导出主要类型
pub use app::{App, Command, ThemeChoice};

//! 可取消的后台任务 - 基础设施层
//!
//! 进度条刷新、健康检查、延迟重置都是 tokio 任务。
//! 它们必须有明确的所有者，所有者被销毁时任务随之停止，不能靠进程退出兜底。

use std::future::Future;

use tokio::task::JoinHandle;

/// 持有一个后台任务，drop 时自动 abort
#[derive(Debug)]
pub struct ScheduledTask {
    name: &'static str,
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    /// 启动一个后台任务
    pub fn spawn<F>(name: &'static str, future: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::debug!("启动后台任务: {}", name);
        Self {
            name,
            handle: tokio::spawn(future),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 任务是否已经结束（正常结束或被取消）
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// 立即取消任务
    pub fn cancel(self) {
        // drop 负责 abort
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        if !self.handle.is_finished() {
            tracing::debug!("停止后台任务: {}", self.name);
            self.handle.abort();
        }
    }
}

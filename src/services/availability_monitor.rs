//! 后端可用性监控 - 业务能力层
//!
//! 启动时立即探测一次，之后按固定周期探测，与用户操作完全无关。
//! 任何失败（返回 false、超时、传输错误）都视为离线，不区分原因，不重试。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::clients::RemoteService;
use crate::infrastructure::ScheduledTask;
use crate::models::AvailabilitySignal;

/// interval 不接受 0
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// 监控配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorSettings {
    /// 探测周期
    pub period: Duration,
    /// 单次探测超时
    pub probe_timeout: Duration,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(10),
            probe_timeout: Duration::from_secs(5),
        }
    }
}

/// 可用性监控
///
/// 持有周期任务；drop 或 `shutdown` 时停止探测
pub struct AvailabilityMonitor {
    signal: watch::Receiver<AvailabilitySignal>,
    task: ScheduledTask,
}

impl AvailabilityMonitor {
    /// 启动监控
    pub fn start(service: Arc<dyn RemoteService>, settings: MonitorSettings) -> Self {
        let (sender, signal) = watch::channel(AvailabilitySignal::default());

        info!(
            "🩺 启动后端健康检查，周期 {:?}，超时 {:?}",
            settings.period, settings.probe_timeout
        );

        let task = ScheduledTask::spawn("availability-probe", async move {
            // interval 的第一次 tick 立即完成，即启动时的那次探测
            let mut interval = tokio::time::interval(settings.period.max(MIN_PERIOD));
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                let online = probe_once(service.as_ref(), settings.probe_timeout).await;
                let previous = sender.send_replace(AvailabilitySignal::probed(online));

                if previous.checked_at.is_some() && previous.online != online {
                    if online {
                        info!("✓ 后端已恢复在线");
                    } else {
                        warn!("⚠️ 后端离线");
                    }
                }
            }
        });

        Self { signal, task }
    }

    /// 当前信号
    pub fn signal(&self) -> AvailabilitySignal {
        *self.signal.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<AvailabilitySignal> {
        self.signal.clone()
    }

    /// 等待第一次探测完成
    pub async fn first_reading(&self) -> AvailabilitySignal {
        let mut signal = self.signal.clone();
        let reading = match signal.wait_for(|s| s.checked_at.is_some()).await {
            Ok(reading) => *reading,
            // 任务已停止，只能返回最后的值
            Err(_) => *self.signal.borrow(),
        };
        reading
    }

    /// 停止监控
    pub fn shutdown(self) {
        debug!("停止健康检查: {}", self.task.name());
        self.task.cancel();
    }
}

/// 单次探测，超时视为离线
async fn probe_once(service: &dyn RemoteService, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, service.probe_health()).await {
        Ok(online) => {
            debug!("健康检查结果: {}", if online { "在线" } else { "离线" });
            online
        }
        Err(_) => {
            debug!("健康检查超时 ({:?})", timeout);
            false
        }
    }
}

//! 进度估算服务 - 业务能力层
//!
//! 识别接口没有真实进度，这里按"已用时间 / 预计耗时"线性模拟一个确定进度条。
//! 只负责产生 `ProgressSnapshot`，不关心界面怎么画。
//!
//! 规则：
//! 1. 进度 = 已用时间占预计耗时的百分比，请求未返回前最多到 95，之后冻结并切换为"仍在处理"提示
//! 2. 成功 / 失败时立即填满到 100，保持一段时间后重置
//! 3. 取消时立即重置，没有延迟

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use crate::infrastructure::ScheduledTask;
use crate::models::{MediaCategory, ProgressSnapshot, ProgressTone};

/// 请求未返回前的进度上限
pub const PROGRESS_CEILING: f64 = 95.0;

const LABEL_SUCCESS: &str = "识别完成";
const LABEL_FAILURE: &str = "识别失败";

/// 各类文档的预计耗时
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpectedDurations {
    pub image: Duration,
    pub paged_document: Duration,
}

impl ExpectedDurations {
    pub fn for_category(&self, category: MediaCategory) -> Duration {
        match category {
            MediaCategory::Image => self.image,
            MediaCategory::PagedDocument => self.paged_document,
        }
    }
}

impl Default for ExpectedDurations {
    fn default() -> Self {
        Self {
            image: Duration::from_secs(20),
            paged_document: Duration::from_secs(60),
        }
    }
}

/// 进度估算配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSettings {
    /// 刷新周期
    pub tick: Duration,
    /// 结束后保持显示的时间
    pub reset_delay: Duration,
    pub expected: ExpectedDurations,
}

impl Default for ProgressSettings {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(100),
            reset_delay: Duration::from_millis(1500),
            expected: ExpectedDurations::default(),
        }
    }
}

/// 根据已用时间估算进度
///
/// 按已用时间占预计耗时的百分比线性增长，封顶 95；
/// 到达 95 后冻结，提示剩余 `max(预计 - 已用, 0)` 秒
pub fn estimate(elapsed: Duration, expected: Duration) -> ProgressSnapshot {
    let elapsed_secs = elapsed.as_secs_f64();
    let expected_secs = expected.as_secs_f64();

    let fraction = if expected_secs > 0.0 {
        (elapsed_secs / expected_secs * 100.0).min(PROGRESS_CEILING)
    } else {
        PROGRESS_CEILING
    };

    if fraction >= PROGRESS_CEILING {
        let remaining = (expected_secs - elapsed_secs).max(0.0);
        ProgressSnapshot {
            fraction: PROGRESS_CEILING,
            label: format!("仍在处理中，预计剩余约 {} 秒", remaining.ceil() as u64),
            terminal: false,
            tone: ProgressTone::Pulsing,
        }
    } else {
        ProgressSnapshot {
            fraction,
            label: format!("正在识别… {:.0}%", fraction),
            terminal: false,
            tone: ProgressTone::Working,
        }
    }
}

/// 进度估算器
///
/// 职责：
/// - 持有刷新任务和延迟重置任务
/// - 通过 watch 通道发布快照
/// - 被销毁时停止所有定时任务
pub struct ProgressEstimator {
    settings: ProgressSettings,
    snapshot: Arc<watch::Sender<ProgressSnapshot>>,
    /// 每次 start / finish / cancel 递增，旧任务写入前必须比对
    run: Arc<AtomicU64>,
    ticker: Option<ScheduledTask>,
    reset: Option<ScheduledTask>,
}

impl ProgressEstimator {
    /// 创建新的进度估算器
    pub fn new(settings: ProgressSettings) -> Self {
        let (sender, _) = watch::channel(ProgressSnapshot::default());
        Self {
            settings,
            snapshot: Arc::new(sender),
            run: Arc::new(AtomicU64::new(0)),
            ticker: None,
            reset: None,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ProgressSnapshot> {
        self.snapshot.subscribe()
    }

    pub fn current(&self) -> ProgressSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        self.ticker.is_some()
    }

    /// 开始模拟进度
    pub fn start(&mut self, category: MediaCategory) {
        let run = self.stop_timers();
        let expected = self.settings.expected.for_category(category);
        debug!("进度估算开始: {} | 预计 {:?}", category, expected);

        self.snapshot.send_replace(estimate(Duration::ZERO, expected));

        let sender = Arc::clone(&self.snapshot);
        let run_counter = Arc::clone(&self.run);
        let tick = self.settings.tick;
        let started = Instant::now();

        self.ticker = Some(ScheduledTask::spawn("progress-tick", async move {
            let mut interval = tokio::time::interval(tick.max(Duration::from_millis(1)));
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let next = estimate(started.elapsed(), expected);
                sender.send_if_modified(|current| {
                    // 只前进，不后退
                    if run_counter.load(Ordering::SeqCst) != run
                        || next.fraction < current.fraction
                        || *current == next
                    {
                        return false;
                    }
                    *current = next;
                    true
                });
            }
        }));
    }

    /// 请求成功：填满并延迟重置
    pub fn succeed(&mut self) {
        self.finish(ProgressTone::Success, LABEL_SUCCESS);
    }

    /// 请求失败：填满（失败样式）并延迟重置
    pub fn fail(&mut self) {
        self.finish(ProgressTone::Failure, LABEL_FAILURE);
    }

    /// 取消：立即停止并重置
    pub fn cancel(&mut self) {
        self.stop_timers();
        self.snapshot.send_replace(ProgressSnapshot::default());
        debug!("进度估算已取消");
    }

    fn finish(&mut self, tone: ProgressTone, label: &str) {
        let run = self.stop_timers();
        self.snapshot.send_replace(ProgressSnapshot {
            fraction: 100.0,
            label: label.to_string(),
            terminal: true,
            tone,
        });

        let sender = Arc::clone(&self.snapshot);
        let run_counter = Arc::clone(&self.run);
        let delay = self.settings.reset_delay;

        self.reset = Some(ScheduledTask::spawn("progress-reset", async move {
            tokio::time::sleep(delay).await;
            sender.send_if_modified(|current| {
                if run_counter.load(Ordering::SeqCst) != run {
                    return false;
                }
                *current = ProgressSnapshot::default();
                true
            });
        }));
    }

    /// 停止所有定时任务，返回新的运行编号
    fn stop_timers(&mut self) -> u64 {
        let run = self.run.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(ticker) = self.ticker.take() {
            ticker.cancel();
        }
        if let Some(reset) = self.reset.take() {
            reset.cancel();
        }
        run
    }
}

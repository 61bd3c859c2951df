use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// 后端可用性信号
///
/// 每次探测整体覆盖，不保留历史
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AvailabilitySignal {
    pub online: bool,
    /// 最近一次探测时间，尚未探测时为 None
    pub checked_at: Option<DateTime<Local>>,
}

impl AvailabilitySignal {
    pub fn probed(online: bool) -> Self {
        Self {
            online,
            checked_at: Some(Local::now()),
        }
    }
}

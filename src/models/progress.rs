use serde::{Deserialize, Serialize};

/// 进度条的展示提示，只由渲染层解释
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProgressTone {
    /// 未开始 / 已重置
    #[default]
    Idle,
    /// 正常推进
    Working,
    /// 到达上限后仍在等待，提示用户注意
    Pulsing,
    /// 成功完成
    Success,
    /// 失败（进度条填满但用失败样式）
    Failure,
}

/// 进度快照
///
/// `fraction` 取值 [0, 100]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub fraction: f64,
    pub label: String,
    pub terminal: bool,
    pub tone: ProgressTone,
}

impl ProgressSnapshot {
    /// 是否处于初始（已重置）状态
    pub fn is_reset(&self) -> bool {
        *self == Self::default()
    }
}

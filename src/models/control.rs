use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 核准状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ControlStatus {
    Approved,
    Pending,
    Rejected,
    Unknown(String),
}

impl From<String> for ControlStatus {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "approved" => ControlStatus::Approved,
            "pending" => ControlStatus::Pending,
            "rejected" => ControlStatus::Rejected,
            _ => ControlStatus::Unknown(value),
        }
    }
}

impl From<ControlStatus> for String {
    fn from(status: ControlStatus) -> Self {
        match status {
            ControlStatus::Approved => "approved".to_string(),
            ControlStatus::Pending => "pending".to_string(),
            ControlStatus::Rejected => "rejected".to_string(),
            ControlStatus::Unknown(raw) => raw,
        }
    }
}

/// 已核准的标签样本
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedControl {
    pub control_name: String,
    #[serde(default)]
    pub verified_text: String,
    pub status: ControlStatus,
    #[serde(default)]
    pub approved_at: Option<DateTime<Utc>>,
}

use std::fmt;

use serde::{Deserialize, Serialize};

/// 风险等级
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    /// 后端返回了未知的等级，原样保留
    Unknown(String),
}

impl Default for RiskLevel {
    fn default() -> Self {
        RiskLevel::Unknown(String::new())
    }
}

impl From<String> for RiskLevel {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "LOW" => RiskLevel::Low,
            "MEDIUM" => RiskLevel::Medium,
            "HIGH" => RiskLevel::High,
            _ => RiskLevel::Unknown(value),
        }
    }
}

impl From<RiskLevel> for String {
    fn from(level: RiskLevel) -> Self {
        match level {
            RiskLevel::Low => "LOW".to_string(),
            RiskLevel::Medium => "MEDIUM".to_string(),
            RiskLevel::High => "HIGH".to_string(),
            RiskLevel::Unknown(raw) => raw,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "LOW"),
            RiskLevel::Medium => write!(f, "MEDIUM"),
            RiskLevel::High => write!(f, "HIGH"),
            RiskLevel::Unknown(raw) if raw.is_empty() => write!(f, "UNKNOWN"),
            RiskLevel::Unknown(raw) => write!(f, "{}", raw),
        }
    }
}

/// 合规校验结果
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    #[serde(default)]
    pub drug_name: Option<String>,
    #[serde(default)]
    pub strength: Option<String>,
    #[serde(default)]
    pub batch_number: Option<String>,
    #[serde(default)]
    pub expiry_date: Option<String>,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub license_number: Option<String>,
    #[serde(default)]
    pub serialization_present: Option<bool>,
    #[serde(default)]
    pub missing_fields: Vec<String>,
    #[serde(default)]
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub confidence_score: Option<f64>,
    #[serde(default)]
    pub analysis_summary: Option<String>,
}

impl ValidationResult {
    /// 标签字段列表（名称, 值），用于展示
    pub fn fields(&self) -> Vec<(&'static str, Option<&str>)> {
        vec![
            ("药品名称", self.drug_name.as_deref()),
            ("规格", self.strength.as_deref()),
            ("批号", self.batch_number.as_deref()),
            ("有效期", self.expiry_date.as_deref()),
            ("生产企业", self.manufacturer.as_deref()),
            ("许可证号", self.license_number.as_deref()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_risk_level_parsing_is_case_insensitive() {
        assert_eq!(RiskLevel::from("low".to_string()), RiskLevel::Low);
        assert_eq!(RiskLevel::from("Medium".to_string()), RiskLevel::Medium);
        assert_eq!(RiskLevel::from("HIGH".to_string()), RiskLevel::High);
        assert_eq!(
            RiskLevel::from("CRITICAL".to_string()),
            RiskLevel::Unknown("CRITICAL".to_string())
        );
    }

    #[test]
    fn test_partial_payload_uses_defaults() {
        let result: ValidationResult = serde_json::from_value(json!({
            "drug_name": "Amoxicillin",
            "missing_fields": ["license_number"],
            "risk_level": "MEDIUM"
        }))
        .unwrap();

        assert_eq!(result.drug_name.as_deref(), Some("Amoxicillin"));
        assert_eq!(result.missing_fields, vec!["license_number".to_string()]);
        assert_eq!(result.risk_level, RiskLevel::Medium);
        assert_eq!(result.serialization_present, None);
    }

    #[test]
    fn test_missing_risk_level_is_unknown() {
        let result: ValidationResult = serde_json::from_value(json!({})).unwrap();
        assert_eq!(result.risk_level.to_string(), "UNKNOWN");
    }
}

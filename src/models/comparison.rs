use serde::{Deserialize, Serialize};

/// 比对结论
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Decision {
    Valid,
    Other(String),
}

impl From<String> for Decision {
    fn from(value: String) -> Self {
        if value.eq_ignore_ascii_case("VALID") {
            Decision::Valid
        } else {
            Decision::Other(value)
        }
    }
}

impl From<Decision> for String {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Valid => "VALID".to_string(),
            Decision::Other(raw) => raw,
        }
    }
}

/// 各项格式检查
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationDetails {
    #[serde(default)]
    pub dosage_format: bool,
    #[serde(default)]
    pub expiry_format: bool,
    #[serde(default)]
    pub batch_number: bool,
    #[serde(default)]
    pub manufacturer_presence: bool,
}

impl ValidationDetails {
    pub fn checks(&self) -> [(&'static str, bool); 4] {
        [
            ("剂量格式", self.dosage_format),
            ("有效期格式", self.expiry_format),
            ("批号", self.batch_number),
            ("生产企业", self.manufacturer_presence),
        ]
    }
}

/// 与已核准标签的比对报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub decision: Decision,
    #[serde(default)]
    pub similarity_score: f64,
    #[serde(default)]
    pub authenticity_score: f64,
    #[serde(default)]
    pub validation_details: ValidationDetails,
    #[serde(default)]
    pub extracted_text: Option<String>,
}
